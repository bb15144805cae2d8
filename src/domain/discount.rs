use {
    super::error::{BookingError, DiscountError},
    super::id::DiscountCode,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DiscountKind {
    /// Whole percent of the subtotal, 0..=100.
    Percent(u32),
    /// Fixed amount off, capped at the subtotal.
    Amount(MoneyAmount),
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percent(_) => "percent",
            Self::Amount(_) => "amount",
        }
    }

    /// Rebuild from the stored `(kind, value)` column pair.
    pub fn from_parts(kind: &str, value: i64) -> Result<Self, BookingError> {
        match kind {
            "percent" => {
                let pct = u32::try_from(value)
                    .ok()
                    .filter(|p| *p <= 100)
                    .ok_or_else(|| {
                        BookingError::Validation(format!("percent out of range: {value}"))
                    })?;
                Ok(Self::Percent(pct))
            }
            "amount" => Ok(Self::Amount(MoneyAmount::new(value)?)),
            other => Err(BookingError::Validation(format!(
                "unknown discount kind: {other}"
            ))),
        }
    }

    pub fn value(&self) -> i64 {
        match self {
            Self::Percent(p) => i64::from(*p),
            Self::Amount(a) => a.cents(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Discount {
    pub id: Uuid,
    pub code: DiscountCode,
    pub kind: DiscountKind,
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    /// Scoped to one event when set.
    pub event_id: Option<Uuid>,
}

impl Discount {
    pub fn has_uses_left(&self) -> bool {
        self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }
}

/// Check a looked-up discount against the booking's event at `now`.
///
/// Does not touch `used_count`; usage is taken when the reservation is
/// persisted.
pub fn validate_discount(
    discount: Option<&Discount>,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> Result<DiscountKind, DiscountError> {
    let discount = discount.ok_or(DiscountError::NotFound)?;

    if !discount.active {
        return Err(DiscountError::Inactive);
    }
    if now < discount.valid_from || now > discount.valid_to {
        return Err(DiscountError::Expired);
    }
    if !discount.has_uses_left() {
        return Err(DiscountError::LimitReached);
    }
    if discount.event_id.is_some_and(|scoped| scoped != event_id) {
        return Err(DiscountError::EventMismatch);
    }

    Ok(discount.kind)
}
