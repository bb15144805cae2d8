use {thiserror::Error, uuid::Uuid};

/// Why a discount code was rejected. User-correctable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiscountError {
    #[error("discount code not found")]
    NotFound,

    #[error("discount code is not active")]
    Inactive,

    #[error("discount code is not valid at this time")]
    Expired,

    #[error("discount code usage limit reached")]
    LimitReached,

    #[error("discount code does not apply to this event")]
    EventMismatch,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("discount: {0}")]
    Discount(#[from] DiscountError),

    #[error("inventory exhausted for tier {tier_id}: requested {requested}, available {available}")]
    InventoryExhausted {
        tier_id: Uuid,
        requested: i64,
        available: i64,
    },

    #[error("payment gateway: {0}")]
    Gateway(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: {from} → {to}")]
    InvalidTransition { from: String, to: String },

    #[error("cancellation window closed: event starts within 24 hours")]
    CancellationWindowClosed,

    #[error("webhook signature: {0}")]
    WebhookSignature(String),

    #[error("ticket issuance: {0}")]
    Issuance(String),
}

impl BookingError {
    /// Errors the buyer can fix by changing their request.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Discount(_)
                | Self::InventoryExhausted { .. }
                | Self::NotFound(_)
                | Self::InvalidTransition { .. }
                | Self::CancellationWindowClosed
        )
    }

    /// Message safe to show an end user. Internal failures collapse into a
    /// generic retry hint; the detail only goes to logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Discount(e) => e.to_string(),
            Self::InventoryExhausted { .. } => {
                "not enough tickets left for this selection, please choose a different quantity or tier"
                    .to_string()
            }
            Self::NotFound(what) => format!("{what} not found"),
            Self::InvalidTransition { from, .. } => {
                format!("booking cannot be changed while it is {from}")
            }
            Self::CancellationWindowClosed => self.to_string(),
            Self::WebhookSignature(_) => "invalid webhook signature".to_string(),
            Self::Gateway(_)
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Issuance(_) => "something went wrong, please try again".to_string(),
        }
    }
}
