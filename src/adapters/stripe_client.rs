use {
    crate::domain::{
        BoxFuture,
        customer::Customer,
        error::BookingError,
        gateway::{CreatedIntent, IntentRequest, PaymentGateway},
        id::TransactionId,
        money::{Currency, MoneyAmount},
    },
    std::collections::HashMap,
};

/// `PaymentGateway` over the Stripe API: customers, PaymentIntents, refunds.
pub struct StripeGateway {
    client: stripe::Client,
}

impl StripeGateway {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
        }
    }
}

fn api_error(e: stripe::StripeError) -> BookingError {
    BookingError::Gateway(format!("Stripe API: {e}"))
}

fn payment_intent_id(id: &TransactionId) -> Result<stripe::PaymentIntentId, BookingError> {
    id.as_str()
        .parse::<stripe::PaymentIntentId>()
        .map_err(|e| BookingError::Gateway(format!("invalid PaymentIntent id: {e}")))
}

impl PaymentGateway for StripeGateway {
    fn resolve_customer<'a>(
        &'a self,
        customer: &'a Customer,
    ) -> BoxFuture<'a, Result<String, BookingError>> {
        Box::pin(async move {
            let params = stripe::CreateCustomer {
                email: Some(customer.email.as_str()),
                name: Some(customer.name.as_str()),
                ..Default::default()
            };
            let created = stripe::Customer::create(&self.client, params)
                .await
                .map_err(api_error)?;
            tracing::info!(customer_id = %customer.id, stripe_customer = %created.id, "stripe customer created");
            Ok(created.id.to_string())
        })
    }

    fn create_payment_intent<'a>(
        &'a self,
        request: &'a IntentRequest,
    ) -> BoxFuture<'a, Result<CreatedIntent, BookingError>> {
        Box::pin(async move {
            let customer = request
                .customer_ref
                .parse::<stripe::CustomerId>()
                .map_err(|e| BookingError::Gateway(format!("invalid Customer id: {e}")))?;

            let metadata = HashMap::from([
                ("booking_id".to_string(), request.booking_id.to_string()),
                ("event_id".to_string(), request.event_id.to_string()),
                ("reference".to_string(), request.reference.clone()),
            ]);

            let mut params = stripe::CreatePaymentIntent::new(
                request.amount.amount().cents(),
                to_stripe_currency(request.amount.currency()),
            );
            params.customer = Some(customer);
            params.metadata = Some(metadata);

            let pi = stripe::PaymentIntent::create(&self.client, params)
                .await
                .map_err(api_error)?;
            let client_secret = pi.client_secret.ok_or_else(|| {
                BookingError::Gateway(format!("PaymentIntent {} has no client secret", pi.id))
            })?;

            Ok(CreatedIntent {
                transaction_id: TransactionId::new(pi.id.to_string())?,
                client_secret,
            })
        })
    }

    fn verify_succeeded<'a>(
        &'a self,
        transaction_id: &'a TransactionId,
    ) -> BoxFuture<'a, Result<bool, BookingError>> {
        Box::pin(async move {
            let pi_id = payment_intent_id(transaction_id)?;
            let pi = stripe::PaymentIntent::retrieve(&self.client, &pi_id, &[])
                .await
                .map_err(api_error)?;
            if let Err(e) = convert_currency(pi.currency) {
                tracing::warn!(transaction_id = %transaction_id, error = %e, "unexpected currency on intent");
            }
            Ok(pi.status == stripe::PaymentIntentStatus::Succeeded)
        })
    }

    fn refund<'a>(
        &'a self,
        transaction_id: &'a TransactionId,
        amount: Option<MoneyAmount>,
    ) -> BoxFuture<'a, Result<bool, BookingError>> {
        Box::pin(async move {
            let mut params = stripe::CreateRefund::new();
            params.payment_intent = Some(payment_intent_id(transaction_id)?);
            params.amount = amount.map(|a| a.cents());

            let refund = stripe::Refund::create(&self.client, params)
                .await
                .map_err(api_error)?;
            Ok(refund_accepted(refund.status.as_deref()))
        })
    }
}

// ── Conversion helpers ──────────────────────────────────────────────────────

pub fn to_stripe_currency(c: Currency) -> stripe::Currency {
    match c {
        Currency::Usd => stripe::Currency::USD,
        Currency::Eur => stripe::Currency::EUR,
        Currency::Gbp => stripe::Currency::GBP,
        Currency::Jpy => stripe::Currency::JPY,
    }
}

pub fn convert_currency(c: stripe::Currency) -> Result<Currency, BookingError> {
    match c {
        stripe::Currency::USD => Ok(Currency::Usd),
        stripe::Currency::EUR => Ok(Currency::Eur),
        stripe::Currency::GBP => Ok(Currency::Gbp),
        stripe::Currency::JPY => Ok(Currency::Jpy),
        other => Err(BookingError::Validation(format!(
            "unsupported currency: {other:?}"
        ))),
    }
}

/// Pending refunds settle asynchronously; only an explicit failure is a decline.
pub fn refund_accepted(status: Option<&str>) -> bool {
    !matches!(status, Some("failed") | Some("canceled"))
}
