use {
    crate::domain::{
        booking::NewReservation,
        customer::Customer,
        discount::validate_discount,
        error::BookingError,
        gateway::{CreatedIntent, IntentRequest, PaymentGateway},
        id::DiscountCode,
        money::{Currency, Money, MoneyAmount},
        payment::Payment,
        pricing::{Quote, TierSelection, build_quote, check_availability, normalize_selections},
        store::BookingStore,
    },
    chrono::{DateTime, Duration, Utc},
    serde::{Deserialize, Serialize},
    std::{future::Future, sync::Arc},
    uuid::Uuid,
};

const ACTOR: &str = "checkout";

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub currency: Currency,
    /// How long a pending booking holds its tickets.
    pub reservation_ttl: Duration,
    pub gateway_timeout: std::time::Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: Currency::Usd,
            reservation_ttl: Duration::minutes(15),
            gateway_timeout: std::time::Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub event_id: Uuid,
    pub customer_id: Uuid,
    pub selections: Vec<TierSelection>,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub booking_id: Uuid,
    pub reference: String,
    pub client_secret: String,
    pub quote: Quote,
}

/// Structured result handed back to the caller; failures never escape as
/// raw errors.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: String,
    pub booking_id: Option<Uuid>,
    pub reference: Option<String>,
    pub client_secret: Option<String>,
    pub total: Option<MoneyAmount>,
    /// Failure was on our side rather than in the request.
    #[serde(skip)]
    pub internal_failure: bool,
}

impl CheckoutResponse {
    fn accepted(receipt: CheckoutReceipt) -> Self {
        Self {
            success: true,
            message: "booking reserved, complete payment to confirm".to_string(),
            booking_id: Some(receipt.booking_id),
            reference: Some(receipt.reference),
            client_secret: Some(receipt.client_secret),
            total: Some(receipt.quote.total),
            internal_failure: false,
        }
    }

    fn rejected(error: &BookingError) -> Self {
        Self {
            success: false,
            message: error.public_message(),
            booking_id: None,
            reference: None,
            client_secret: None,
            total: None,
            internal_failure: !error.is_user_correctable(),
        }
    }
}

/// Bound a gateway call; a timeout is a gateway failure.
pub(crate) async fn with_timeout<T>(
    limit: std::time::Duration,
    call: impl Future<Output = Result<T, BookingError>>,
) -> Result<T, BookingError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| BookingError::Gateway(format!("gateway call timed out after {limit:?}")))?
}

pub struct CheckoutService {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// Entry point for the controller layer. Logs and folds every failure
    /// into a `success = false` response with a public message.
    pub async fn process_checkout(
        &self,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> CheckoutResponse {
        match self.try_checkout(request, now).await {
            Ok(receipt) => {
                tracing::info!(
                    booking_id = %receipt.booking_id,
                    reference = %receipt.reference,
                    total = receipt.quote.total.cents(),
                    "checkout reserved"
                );
                CheckoutResponse::accepted(receipt)
            }
            Err(e) if e.is_user_correctable() => {
                tracing::info!(
                    event_id = %request.event_id,
                    customer_id = %request.customer_id,
                    error = %e,
                    "checkout rejected"
                );
                CheckoutResponse::rejected(&e)
            }
            Err(e) => {
                tracing::error!(
                    event_id = %request.event_id,
                    customer_id = %request.customer_id,
                    error = %e,
                    "checkout failed"
                );
                CheckoutResponse::rejected(&e)
            }
        }
    }

    /// Validate, price, reserve, then open a payment intent.
    ///
    /// After the reservation is written, any failure releases it again so
    /// no pending booking is left without a payment path.
    pub async fn try_checkout(
        &self,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckoutReceipt, BookingError> {
        let event = self
            .store
            .get_event(request.event_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("event {}", request.event_id)))?;
        event.ensure_on_sale(now)?;

        let selections = normalize_selections(&request.selections)?;
        let tiers = self.store.tier_stock(event.id).await?;
        if tiers.is_empty() {
            return Err(BookingError::Validation(format!(
                "event {} has no price tiers",
                event.id
            )));
        }
        if tiers.iter().all(|t| t.available() == 0) {
            if let Some(first) = selections.first() {
                tracing::info!(event_id = %event.id, "event sold out");
                return Err(BookingError::InventoryExhausted {
                    tier_id: first.tier_id,
                    requested: first.quantity,
                    available: 0,
                });
            }
        }

        let discount = match request.discount_code.as_deref() {
            Some(raw) => {
                let code = DiscountCode::new(raw)?;
                let found = self.store.find_discount(&code).await?;
                let kind = validate_discount(found.as_ref(), event.id, now)?;
                found.map(|d| (d.id, kind))
            }
            None => None,
        };

        let quote = build_quote(&tiers, &selections, discount.as_ref().map(|(_, k)| k), now)?;
        check_availability(&tiers, &selections)?;
        // the gateway cannot open an intent for nothing
        if quote.total == MoneyAmount::ZERO {
            return Err(BookingError::Validation(
                "order total is zero, free orders are not supported".into(),
            ));
        }

        let customer = self
            .store
            .get_customer(request.customer_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("customer {}", request.customer_id)))?;
        let customer_ref = self.resolve_customer_ref(&customer).await?;

        let reservation = NewReservation::from_quote(
            customer.id,
            event.id,
            &quote,
            discount.map(|(id, _)| id),
            now,
            self.config.reservation_ttl,
        );
        self.store.reserve(&reservation).await?;
        let booking = &reservation.booking;

        let money = Money::new(quote.total, self.config.currency);
        let intent_request = IntentRequest {
            amount: money,
            customer_ref,
            booking_id: booking.id,
            event_id: event.id,
            reference: booking.reference.to_string(),
        };
        let intent = match self.open_intent(&intent_request).await {
            Ok(intent) => intent,
            Err(e) => {
                self.rollback(booking.id, &e).await;
                return Err(e);
            }
        };

        let payment = Payment::pending(booking.id, intent.transaction_id.clone(), money);
        if let Err(e) = self.store.attach_payment(&payment).await {
            tracing::error!(
                booking_id = %booking.id,
                transaction_id = %intent.transaction_id,
                "payment intent created but not recorded, needs reconciliation"
            );
            self.rollback(booking.id, &e).await;
            return Err(e);
        }

        Ok(CheckoutReceipt {
            booking_id: booking.id,
            reference: booking.reference.to_string(),
            client_secret: intent.client_secret,
            quote,
        })
    }

    async fn resolve_customer_ref(&self, customer: &Customer) -> Result<String, BookingError> {
        if let Some(existing) = &customer.payment_customer_ref {
            return Ok(existing.clone());
        }
        let created = with_timeout(
            self.config.gateway_timeout,
            self.gateway.resolve_customer(customer),
        )
        .await?;
        self.store
            .set_payment_customer_ref(customer.id, &created)
            .await?;
        Ok(created)
    }

    async fn open_intent(&self, request: &IntentRequest) -> Result<CreatedIntent, BookingError> {
        with_timeout(
            self.config.gateway_timeout,
            self.gateway.create_payment_intent(request),
        )
        .await
    }

    async fn rollback(&self, booking_id: Uuid, cause: &BookingError) {
        match self.store.release_reservation(booking_id, ACTOR).await {
            Ok(Some(released)) => tracing::warn!(
                booking_id = %booking_id,
                tickets = released.tickets_released,
                cause = %cause,
                "checkout aborted, reservation released"
            ),
            Ok(None) => tracing::warn!(
                booking_id = %booking_id,
                cause = %cause,
                "checkout aborted, reservation already settled"
            ),
            Err(e) => tracing::error!(
                booking_id = %booking_id,
                cause = %cause,
                error = %e,
                "checkout aborted and release failed, sweeper will expire it"
            ),
        }
    }
}
