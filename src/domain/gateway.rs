use {
    super::BoxFuture,
    super::customer::Customer,
    super::error::BookingError,
    super::id::TransactionId,
    super::money::{Money, MoneyAmount},
    uuid::Uuid,
};

/// What the orchestrator asks the gateway to authorize.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub amount: Money,
    pub customer_ref: String,
    pub booking_id: Uuid,
    pub event_id: Uuid,
    pub reference: String,
}

/// Gateway response to an intent request.
#[derive(Debug, Clone)]
pub struct CreatedIntent {
    pub transaction_id: TransactionId,
    /// Handed to the buyer's client to complete payment out-of-band.
    pub client_secret: String,
}

/// External payment processor. Every call is I/O with its own timeout at
/// the implementation; callers treat an `Err` as terminal for the attempt.
pub trait PaymentGateway: Send + Sync {
    fn resolve_customer<'a>(
        &'a self,
        customer: &'a Customer,
    ) -> BoxFuture<'a, Result<String, BookingError>>;

    fn create_payment_intent<'a>(
        &'a self,
        request: &'a IntentRequest,
    ) -> BoxFuture<'a, Result<CreatedIntent, BookingError>>;

    /// `true` only when the provider reports the transaction as succeeded.
    fn verify_succeeded<'a>(
        &'a self,
        transaction_id: &'a TransactionId,
    ) -> BoxFuture<'a, Result<bool, BookingError>>;

    /// Full refund when `amount` is `None`.
    fn refund<'a>(
        &'a self,
        transaction_id: &'a TransactionId,
        amount: Option<MoneyAmount>,
    ) -> BoxFuture<'a, Result<bool, BookingError>>;
}
