use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::BookingError,
            id::{EventId, TransactionId},
        },
    },
    axum::{Json, extract::State, http::HeaderMap},
    chrono::Utc,
    uuid::Uuid,
};

const ACTOR: &str = "webhook:stripe";
const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

fn ack(status: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": status }))
}

/// Stripe delivers at least once and in any order relative to the client's
/// own confirm call; both paths converge on the same guarded confirmation.
#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn wh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sig = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| BookingError::WebhookSignature("missing Stripe-Signature header".into()))?;

    let event = stripe::Webhook::construct_event(&body, sig, &state.stripe_webhook_secret)
        .map_err(|e| BookingError::WebhookSignature(e.to_string()))?;

    let event_id = EventId::new(event.id.to_string())?;
    let raw_event: serde_json::Value = serde_json::from_str(&body).map_err(BookingError::from)?;
    let event_type = raw_event
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    tracing::Span::current()
        .record("event_id", tracing::field::display(&event_id))
        .record("event_type", tracing::field::display(&event_type));

    if event_type != PAYMENT_SUCCEEDED {
        tracing::info!("unhandled event type, acknowledged");
        return Ok(ack("ignored"));
    }

    let stripe::EventObject::PaymentIntent(pi) = event.data.object else {
        tracing::warn!("payment event without PaymentIntent object");
        return Ok(ack("ignored_invalid_data"));
    };

    let Some(booking_id) = pi
        .metadata
        .get("booking_id")
        .and_then(|v| Uuid::parse_str(v).ok())
    else {
        tracing::warn!(payment_intent = %pi.id, "PaymentIntent has no booking_id metadata");
        return Ok(ack("ignored_invalid_data"));
    };
    let transaction_id = TransactionId::new(pi.id.to_string())?;

    match state
        .confirmation
        .confirm_payment(&transaction_id, booking_id, ACTOR, Utc::now())
        .await
    {
        Ok(outcome) => {
            tracing::info!(booking_id = %booking_id, outcome = outcome.as_str(), "payment event applied");
            Ok(ack(outcome.as_str()))
        }
        Err(BookingError::NotFound(what)) => {
            tracing::warn!(booking_id = %booking_id, "{what} not found, acknowledging");
            Ok(ack("unknown_booking"))
        }
        // Anything else is returned as 5xx so Stripe redelivers.
        Err(e) => Err(e.into()),
    }
}
