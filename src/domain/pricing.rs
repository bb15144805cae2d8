use {
    super::catalog::{PriceTier, TierStock},
    super::discount::DiscountKind,
    super::error::BookingError,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSelection {
    pub tier_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteLine {
    pub tier_id: Uuid,
    pub category: String,
    pub unit_price: MoneyAmount,
    pub quantity: i64,
    pub line_total: MoneyAmount,
}

/// Pricing snapshot taken at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub subtotal: MoneyAmount,
    pub discount: MoneyAmount,
    pub total: MoneyAmount,
}

impl Quote {
    pub fn ticket_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Merge repeated tiers into one selection each, ordered by tier id.
/// The ordering doubles as the lock order for the reservation.
pub fn normalize_selections(
    selections: &[TierSelection],
) -> Result<Vec<TierSelection>, BookingError> {
    if selections.is_empty() {
        return Err(BookingError::Validation("no tickets selected".into()));
    }

    let mut merged: BTreeMap<Uuid, i64> = BTreeMap::new();
    for s in selections {
        if s.quantity <= 0 {
            return Err(BookingError::Validation(format!(
                "quantity must be positive for tier {}, got {}",
                s.tier_id, s.quantity
            )));
        }
        let entry = merged.entry(s.tier_id).or_default();
        *entry = entry
            .checked_add(s.quantity)
            .ok_or_else(|| BookingError::Validation("quantity overflow".into()))?;
    }

    Ok(merged
        .into_iter()
        .map(|(tier_id, quantity)| TierSelection { tier_id, quantity })
        .collect())
}

fn check_tier_rules(
    tier: &PriceTier,
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    if !tier.is_sellable_at(now) {
        return Err(BookingError::Validation(format!(
            "tier {} ({}) is not on sale",
            tier.id, tier.category
        )));
    }
    if let Some(max) = tier.max_per_order.filter(|max| quantity > *max) {
        return Err(BookingError::Validation(format!(
            "at most {max} tickets per order for {}",
            tier.category
        )));
    }
    if let Some(min) = tier.min_per_order.filter(|min| quantity < *min) {
        return Err(BookingError::Validation(format!(
            "at least {min} tickets per order for {}",
            tier.category
        )));
    }
    Ok(())
}

/// Sum of `price * quantity` over normalized selections. Every tier must
/// belong to `tiers`, be on sale, and respect its per-order limits.
pub fn compute_subtotal(
    tiers: &[TierStock],
    selections: &[TierSelection],
    now: DateTime<Utc>,
) -> Result<(Vec<QuoteLine>, MoneyAmount), BookingError> {
    let mut lines = Vec::with_capacity(selections.len());
    let mut subtotal = MoneyAmount::ZERO;

    for s in selections {
        let tier = tiers
            .iter()
            .map(|t| &t.tier)
            .find(|t| t.id == s.tier_id)
            .ok_or_else(|| {
                BookingError::Validation(format!("tier {} does not exist", s.tier_id))
            })?;
        check_tier_rules(tier, s.quantity, now)?;

        let line_total = tier
            .price
            .checked_mul(s.quantity)
            .ok_or_else(|| BookingError::Validation("line total overflow".into()))?;
        subtotal = subtotal
            .checked_add(line_total)
            .ok_or_else(|| BookingError::Validation("subtotal overflow".into()))?;

        lines.push(QuoteLine {
            tier_id: tier.id,
            category: tier.category.clone(),
            unit_price: tier.price,
            quantity: s.quantity,
            line_total,
        });
    }

    Ok((lines, subtotal))
}

/// Fails with `InventoryExhausted` on the first tier that cannot cover its
/// selection. Advisory only: the store repeats this check under lock.
pub fn check_availability(
    tiers: &[TierStock],
    selections: &[TierSelection],
) -> Result<(), BookingError> {
    for s in selections {
        let Some(stock) = tiers.iter().find(|t| t.tier.id == s.tier_id) else {
            continue;
        };
        let available = stock.available();
        if available < s.quantity {
            return Err(BookingError::InventoryExhausted {
                tier_id: s.tier_id,
                requested: s.quantity,
                available,
            });
        }
    }
    Ok(())
}

/// Amount taken off `subtotal`. Never more than the subtotal.
pub fn compute_discount(subtotal: MoneyAmount, kind: &DiscountKind) -> MoneyAmount {
    match kind {
        DiscountKind::Percent(p) => subtotal.percent(*p),
        DiscountKind::Amount(a) => (*a).min(subtotal),
    }
}

pub fn build_quote(
    tiers: &[TierStock],
    selections: &[TierSelection],
    discount: Option<&DiscountKind>,
    now: DateTime<Utc>,
) -> Result<Quote, BookingError> {
    let (lines, subtotal) = compute_subtotal(tiers, selections, now)?;
    let discount = discount
        .map(|k| compute_discount(subtotal, k))
        .unwrap_or(MoneyAmount::ZERO);
    Ok(Quote {
        lines,
        subtotal,
        discount,
        total: subtotal.saturating_sub(discount),
    })
}
