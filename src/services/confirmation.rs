use {
    crate::domain::{
        booking::{BookingDetails, BookingStatus},
        error::BookingError,
        gateway::PaymentGateway,
        id::TransactionId,
        issuance::{IssuanceReport, Notifier, TicketCodeRequest, TicketCodeStore, TicketIssuance},
        loyalty::LoyaltyRules,
        money::Money,
        notification::render_confirmation,
        payment::Payment,
        store::{BookingStore, ConfirmTransition},
    },
    crate::services::checkout::with_timeout,
    chrono::{DateTime, Utc},
    std::sync::Arc,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Gateway does not report the transaction as succeeded.
    PaymentNotSucceeded,
    /// Transaction id differs from the one stored for the booking.
    TransactionMismatch,
    /// Booking has no payment recorded.
    NoPayment,
    /// Booking is cancelled or its reservation expired.
    BookingClosed(BookingStatus),
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    /// This call performed the transition and its side effects.
    Confirmed(IssuanceReport),
    /// Confirmed earlier; no side effects repeated.
    AlreadyConfirmed,
    Rejected(RejectReason),
}

impl ConfirmOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_) | Self::AlreadyConfirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::AlreadyConfirmed => "already_confirmed",
            Self::Rejected(RejectReason::PaymentNotSucceeded) => "payment_not_succeeded",
            Self::Rejected(RejectReason::TransactionMismatch) => "transaction_mismatch",
            Self::Rejected(RejectReason::NoPayment) => "no_payment",
            Self::Rejected(RejectReason::BookingClosed(_)) => "booking_closed",
        }
    }
}

pub struct ConfirmationService {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    codes: Arc<dyn TicketCodeStore>,
    notifier: Arc<dyn Notifier>,
    loyalty: LoyaltyRules,
    gateway_timeout: std::time::Duration,
}

impl ConfirmationService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        codes: Arc<dyn TicketCodeStore>,
        notifier: Arc<dyn Notifier>,
        loyalty: LoyaltyRules,
        gateway_timeout: std::time::Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            codes,
            notifier,
            loyalty,
            gateway_timeout,
        }
    }

    /// Apply a payment-succeeded signal to a booking.
    ///
    /// Safe to call repeatedly and concurrently for the same booking: the
    /// store's guarded transition lets exactly one caller through, and only
    /// that caller issues codes, accrues loyalty and notifies.
    #[tracing::instrument(
        name = "confirm",
        skip_all,
        fields(booking_id = %booking_id, transaction_id = %transaction_id, actor = %actor)
    )]
    pub async fn confirm_payment(
        &self,
        transaction_id: &TransactionId,
        booking_id: Uuid,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, BookingError> {
        let succeeded = with_timeout(
            self.gateway_timeout,
            self.gateway.verify_succeeded(transaction_id),
        )
        .await?;
        if !succeeded {
            tracing::warn!("gateway does not report payment as succeeded");
            return Ok(ConfirmOutcome::Rejected(RejectReason::PaymentNotSucceeded));
        }

        let details = self
            .store
            .load_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;

        let Some(payment) = details.payment.clone() else {
            tracing::error!("payment succeeded but booking has no payment row");
            return Ok(ConfirmOutcome::Rejected(RejectReason::NoPayment));
        };
        if payment.transaction_id != *transaction_id {
            tracing::warn!(expected = %payment.transaction_id, "transaction does not belong to booking");
            return Ok(ConfirmOutcome::Rejected(RejectReason::TransactionMismatch));
        }

        match details.booking.status {
            BookingStatus::Pending => {}
            BookingStatus::Confirmed => return Ok(ConfirmOutcome::AlreadyConfirmed),
            BookingStatus::Expired => {
                self.refund_late_payment(&details, &payment).await;
                return Ok(ConfirmOutcome::Rejected(RejectReason::BookingClosed(
                    BookingStatus::Expired,
                )));
            }
            status @ BookingStatus::Cancelled => {
                return Ok(ConfirmOutcome::Rejected(RejectReason::BookingClosed(status)));
            }
        }

        let award = self.loyalty.award(
            Money::new(details.booking.total, payment.money.currency()),
            details.tickets.len(),
            details.booking.reference.as_str(),
        );
        match self.store.confirm(booking_id, &award, now).await? {
            ConfirmTransition::Confirmed => {}
            ConfirmTransition::AlreadyConfirmed => {
                tracing::info!("lost confirmation race, already confirmed");
                return Ok(ConfirmOutcome::AlreadyConfirmed);
            }
            ConfirmTransition::NotPending(BookingStatus::Expired) => {
                self.refund_late_payment(&details, &payment).await;
                return Ok(ConfirmOutcome::Rejected(RejectReason::BookingClosed(
                    BookingStatus::Expired,
                )));
            }
            ConfirmTransition::NotPending(status) => {
                return Ok(ConfirmOutcome::Rejected(RejectReason::BookingClosed(status)));
            }
        }
        tracing::info!(
            reference = %details.booking.reference,
            loyalty_points = award.total(),
            "booking confirmed"
        );

        let report = self.issue_codes(&details, now).await;
        self.notify(&details, &report).await;

        Ok(ConfirmOutcome::Confirmed(report))
    }

    /// Retry code issuance for paid tickets still missing a code.
    pub async fn reissue_missing_codes(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<IssuanceReport, BookingError> {
        let mut details = self
            .store
            .load_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;
        if details.booking.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: details.booking.status.to_string(),
                to: "reissued".to_string(),
            });
        }
        details.tickets.retain(|t| t.qr_ref.is_none());
        Ok(self.issue_codes(&details, now).await)
    }

    /// One code per ticket; a failure is recorded and the loop moves on.
    async fn issue_codes(&self, details: &BookingDetails, now: DateTime<Utc>) -> IssuanceReport {
        let mut report = IssuanceReport::default();

        for request in TicketCodeRequest::for_booking(details, now) {
            let ticket_id = request.payload.ticket_id;
            let result = match self.codes.generate_and_store(&request).await {
                Ok(storage_ref) => self
                    .store
                    .record_ticket_code(ticket_id, &storage_ref)
                    .await
                    .map(|_| storage_ref),
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                tracing::warn!(
                    ticket_id = %ticket_id,
                    ticket_number = %request.payload.ticket_number,
                    error = %e,
                    "ticket code issuance failed, continuing"
                );
            }
            report.tickets.push(TicketIssuance {
                ticket_id,
                ticket_number: request.payload.ticket_number,
                result,
            });
        }

        if report.failed() > 0 {
            tracing::warn!(
                issued = report.issued(),
                failed = report.failed(),
                "ticket codes partially issued"
            );
        }
        report
    }

    async fn notify(&self, details: &BookingDetails, report: &IssuanceReport) {
        let message = render_confirmation(details, |ticket| {
            report
                .storage_ref(ticket.id)
                .map(|storage_ref| self.codes.display_url(storage_ref))
        });
        if let Err(e) = self
            .notifier
            .send(&details.customer.email, &message.subject, &message.html)
            .await
        {
            tracing::warn!(error = %e, "confirmation notification failed");
        }
    }

    /// Money arrived for a reservation that was already released. Give it
    /// back; failures here need manual follow-up.
    async fn refund_late_payment(&self, details: &BookingDetails, payment: &Payment) {
        tracing::warn!(
            reference = %details.booking.reference,
            "payment succeeded after reservation expired, refunding"
        );
        let refunded = with_timeout(
            self.gateway_timeout,
            self.gateway.refund(&payment.transaction_id, None),
        )
        .await;
        match refunded {
            Ok(true) => match self.store.mark_payment_refunded(details.booking.id).await {
                Ok(_) => tracing::info!("late payment refunded"),
                Err(e) => tracing::error!(error = %e, "late payment refunded but not recorded"),
            },
            Ok(false) => tracing::error!("gateway declined refund of late payment"),
            Err(e) => tracing::error!(error = %e, "refund of late payment failed"),
        }
    }
}
