use {
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Gateway-side customer handle, resolved lazily at first checkout.
    pub payment_customer_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoyaltyAccount {
    pub customer_id: Uuid,
    pub points: i64,
    pub last_updated: DateTime<Utc>,
    pub description: String,
}
