use {super::money::Money, serde::Serialize};

/// Two accrual rules, both applied on every confirmed booking.
/// Set either rate to 0 to switch that rule off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoyaltyRules {
    /// Points per whole currency unit of the booking total.
    pub points_per_unit: i64,
    pub points_per_ticket: i64,
}

impl Default for LoyaltyRules {
    fn default() -> Self {
        Self {
            points_per_unit: 1,
            points_per_ticket: 10,
        }
    }
}

/// One ledger adjustment, applied exactly once per confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoyaltyAward {
    pub amount_points: i64,
    pub ticket_points: i64,
    pub description: String,
}

impl LoyaltyAward {
    pub fn total(&self) -> i64 {
        self.amount_points + self.ticket_points
    }
}

impl LoyaltyRules {
    pub fn award(&self, total: Money, tickets: usize, reference: &str) -> LoyaltyAward {
        let tickets = i64::try_from(tickets).unwrap_or(i64::MAX);
        let amount_points = total
            .amount()
            .major_units(total.currency())
            .saturating_mul(self.points_per_unit);
        let ticket_points = tickets.saturating_mul(self.points_per_ticket);
        LoyaltyAward {
            amount_points,
            ticket_points,
            description: format!(
                "booking {reference}: {amount_points} points for spend, {ticket_points} points for {tickets} tickets"
            ),
        }
    }
}
