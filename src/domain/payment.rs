use {
    super::error::BookingError,
    super::id::TransactionId,
    super::money::Money,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Pending → Completed | Failed, Completed → Refunded.
    /// Failed → Refunded covers money captured after the hold was released.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed)
                | (Self::Pending, Self::Failed)
                | (Self::Completed, Self::Refunded)
                | (Self::Failed, Self::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = BookingError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(BookingError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub transaction_id: TransactionId,
    pub money: Money,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Pending payment row for a freshly created gateway intent.
    pub fn pending(booking_id: Uuid, transaction_id: TransactionId, money: Money) -> Self {
        Self {
            id: Uuid::now_v7(),
            booking_id,
            transaction_id,
            money,
            status: PaymentStatus::Pending,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn transition_status(&mut self, new: PaymentStatus) -> Result<(), BookingError> {
        if !self.status.can_transition_to(&new) {
            return Err(BookingError::InvalidTransition {
                from: self.status.to_string(),
                to: new.to_string(),
            });
        }
        self.status = new;
        Ok(())
    }
}
