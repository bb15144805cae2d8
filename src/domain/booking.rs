use {
    super::catalog::Event,
    super::customer::Customer,
    super::error::BookingError,
    super::id::BookingReference,
    super::money::MoneyAmount,
    super::payment::Payment,
    super::pricing::Quote,
    chrono::{DateTime, Duration, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

/// Customers may cancel until this long before the event starts.
pub const CANCELLATION_CUTOFF_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    /// Reservation released without payment (gateway failure or lapsed hold).
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Pending → Confirmed | Expired, Confirmed → Cancelled.
    pub fn can_transition_to(&self, next: &BookingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Expired)
                | (Self::Confirmed, Self::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }

    /// Guard for a transition, reporting the rejected edge.
    pub fn ensure_transition(&self, next: BookingStatus) -> Result<(), BookingError> {
        if self.can_transition_to(&next) {
            Ok(())
        } else {
            Err(BookingError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for BookingStatus {
    type Error = BookingError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(BookingError::Validation(format!(
                "unknown booking status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: BookingReference,
    pub customer_id: Uuid,
    pub event_id: Uuid,
    pub status: BookingStatus,
    pub subtotal: MoneyAmount,
    pub discount_amount: MoneyAmount,
    pub total: MoneyAmount,
    pub discount_id: Option<Uuid>,
    pub reserved_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub tier_id: Uuid,
    pub ticket_number: String,
    pub price: MoneyAmount,
    /// Storage reference of the issued code. `None` until issued.
    pub qr_ref: Option<String>,
    pub is_paid: bool,
    /// Also set when the booking is cancelled, so scanners reject it.
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

/// Deterministic ticket number: reference, short tier id, per-tier sequence.
pub fn ticket_number(reference: &BookingReference, tier_id: Uuid, seq: i64) -> String {
    let tier = tier_id.simple().to_string().to_uppercase();
    format!("{}-{}-{seq:03}", reference.as_str(), &tier[..8])
}

/// Everything the store needs to persist a pending reservation atomically.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub booking: Booking,
    pub tickets: Vec<Ticket>,
    pub discount_id: Option<Uuid>,
}

impl NewReservation {
    /// Expand a priced quote into a pending booking with one ticket per unit.
    pub fn from_quote(
        customer_id: Uuid,
        event_id: Uuid,
        quote: &Quote,
        discount_id: Option<Uuid>,
        now: DateTime<Utc>,
        hold: Duration,
    ) -> Self {
        let booking_id = Uuid::now_v7();
        let reference = BookingReference::generate();

        let tickets = quote
            .lines
            .iter()
            .flat_map(|line| {
                let reference = &reference;
                (1..=line.quantity).map(move |seq| Ticket {
                    id: Uuid::now_v7(),
                    booking_id,
                    tier_id: line.tier_id,
                    ticket_number: ticket_number(reference, line.tier_id, seq),
                    price: line.unit_price,
                    qr_ref: None,
                    is_paid: false,
                    used: false,
                    used_at: None,
                })
            })
            .collect();

        let booking = Booking {
            id: booking_id,
            reference,
            customer_id,
            event_id,
            status: BookingStatus::Pending,
            subtotal: quote.subtotal,
            discount_amount: quote.discount,
            total: quote.total,
            discount_id,
            reserved_until: now + hold,
            created_at: now,
            updated_at: now,
        };

        Self {
            booking,
            tickets,
            discount_id,
        }
    }

    /// Requested quantity per tier, in lock order.
    pub fn demand(&self) -> Vec<(Uuid, i64)> {
        let mut demand: Vec<(Uuid, i64)> = Vec::new();
        for t in &self.tickets {
            match demand.iter_mut().find(|(id, _)| *id == t.tier_id) {
                Some((_, n)) => *n += 1,
                None => demand.push((t.tier_id, 1)),
            }
        }
        demand.sort_by_key(|(id, _)| *id);
        demand
    }
}

/// Booking aggregate as loaded for confirmation, cancellation and refund.
#[derive(Debug, Clone)]
pub struct BookingDetails {
    pub booking: Booking,
    pub tickets: Vec<Ticket>,
    pub event: Event,
    pub customer: Customer,
    pub payment: Option<Payment>,
    /// Tier category per ticket tier, for rendering.
    pub tier_names: Vec<(Uuid, String)>,
}

impl BookingDetails {
    pub fn tier_name(&self, tier_id: Uuid) -> &str {
        self.tier_names
            .iter()
            .find(|(id, _)| *id == tier_id)
            .map(|(_, name)| name.as_str())
            .unwrap_or("Ticket")
    }
}

/// Confirmed bookings may be cancelled until the cutoff before the event.
pub fn ensure_cancellable(
    status: BookingStatus,
    event_starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    status.ensure_transition(BookingStatus::Cancelled)?;
    if now >= event_starts_at - Duration::hours(CANCELLATION_CUTOFF_HOURS) {
        return Err(BookingError::CancellationWindowClosed);
    }
    Ok(())
}
