use {
    crate::domain::{
        booking::{BookingStatus, ensure_cancellable},
        error::BookingError,
        gateway::PaymentGateway,
        payment::PaymentStatus,
        store::BookingStore,
    },
    crate::services::checkout::with_timeout,
    chrono::{DateTime, Utc},
    std::sync::Arc,
    uuid::Uuid,
};

pub struct CancellationService {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    gateway_timeout: std::time::Duration,
}

impl CancellationService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        gateway_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            gateway_timeout,
        }
    }

    /// Customer-initiated `Confirmed → Cancelled`, allowed until 24h before
    /// the event. All tickets are invalidated (`used = true`).
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BookingStatus, BookingError> {
        let details = self
            .store
            .load_booking(booking_id)
            .await?
            .filter(|d| d.booking.customer_id == customer_id)
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;

        ensure_cancellable(details.booking.status, details.event.starts_at, now)?;

        if !self.store.cancel(booking_id, now).await? {
            let current = self
                .store
                .load_booking(booking_id)
                .await?
                .map(|d| d.booking.status.to_string())
                .unwrap_or_else(|| "missing".to_string());
            return Err(BookingError::InvalidTransition {
                from: current,
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        tracing::info!(
            booking_id = %booking_id,
            reference = %details.booking.reference,
            tickets = details.tickets.len(),
            "booking cancelled, tickets invalidated"
        );
        Ok(BookingStatus::Cancelled)
    }

    /// Refund the payment of a cancelled booking. Repeating the call after
    /// success is a no-op that reports `Refunded`.
    pub async fn refund_booking(&self, booking_id: Uuid) -> Result<PaymentStatus, BookingError> {
        let details = self
            .store
            .load_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;

        if details.booking.status != BookingStatus::Cancelled {
            return Err(BookingError::InvalidTransition {
                from: details.booking.status.to_string(),
                to: "refunded".to_string(),
            });
        }
        let payment = details
            .payment
            .ok_or_else(|| BookingError::NotFound(format!("payment for booking {booking_id}")))?;

        match payment.status {
            PaymentStatus::Refunded => return Ok(PaymentStatus::Refunded),
            PaymentStatus::Completed => {}
            other => {
                return Err(BookingError::InvalidTransition {
                    from: other.to_string(),
                    to: PaymentStatus::Refunded.to_string(),
                });
            }
        }

        let accepted = with_timeout(
            self.gateway_timeout,
            self.gateway.refund(&payment.transaction_id, None),
        )
        .await?;
        if !accepted {
            return Err(BookingError::Gateway(format!(
                "refund declined for {}",
                payment.transaction_id
            )));
        }

        self.store.mark_payment_refunded(booking_id).await?;
        tracing::info!(
            booking_id = %booking_id,
            transaction_id = %payment.transaction_id,
            amount = %payment.money,
            "payment refunded"
        );
        Ok(PaymentStatus::Refunded)
    }
}
