use {
    super::error::BookingError,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub sales_end_at: Option<DateTime<Utc>>,
    pub published: bool,
}

impl Event {
    /// Published and still selling at `now`.
    pub fn ensure_on_sale(&self, now: DateTime<Utc>) -> Result<(), BookingError> {
        if !self.published {
            return Err(BookingError::Validation(format!(
                "event {} is not published",
                self.id
            )));
        }
        let sales_end = self.sales_end_at.unwrap_or(self.starts_at);
        if now >= sales_end {
            return Err(BookingError::Validation(format!(
                "ticket sales for event {} have ended",
                self.id
            )));
        }
        Ok(())
    }
}

/// Price/stock bucket of an event. `stock` is a ceiling; it is never
/// decremented. Availability is derived from issued ticket rows.
#[derive(Debug, Clone, Serialize)]
pub struct PriceTier {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category: String,
    pub price: MoneyAmount,
    pub stock: i64,
    pub active: bool,
    pub min_per_order: Option<i64>,
    pub max_per_order: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl PriceTier {
    pub fn is_sellable_at(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.valid_from.is_none_or(|from| now >= from)
            && self.valid_to.is_none_or(|to| now <= to)
    }
}

/// A tier together with the number of ticket rows already issued against it.
#[derive(Debug, Clone, Serialize)]
pub struct TierStock {
    pub tier: PriceTier,
    pub issued: i64,
}

impl TierStock {
    pub fn available(&self) -> i64 {
        availability(self.tier.stock, self.issued)
    }
}

/// `stock - issued`, never below zero.
pub fn availability(stock: i64, issued: i64) -> i64 {
    (stock - issued).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(published: bool, starts_in_hours: i64) -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Show".into(),
            venue: "Hall".into(),
            starts_at: Utc::now() + Duration::hours(starts_in_hours),
            sales_end_at: None,
            published,
        }
    }

    #[test]
    fn unpublished_event_is_not_on_sale() {
        assert!(event(false, 48).ensure_on_sale(Utc::now()).is_err());
    }

    #[test]
    fn sales_stop_at_start_without_explicit_end() {
        assert!(event(true, 48).ensure_on_sale(Utc::now()).is_ok());
        assert!(event(true, -1).ensure_on_sale(Utc::now()).is_err());
    }

    #[test]
    fn availability_never_negative() {
        assert_eq!(availability(5, 2), 3);
        assert_eq!(availability(1, 3), 0);
    }
}
