use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{error::BookingError, id::TransactionId},
        services::{
            checkout::{CheckoutRequest, CheckoutResponse},
            confirmation::ConfirmOutcome,
        },
    },
    axum::{
        Json,
        extract::{Path, State},
        http::StatusCode,
    },
    chrono::Utc,
    serde::Deserialize,
    serde_json::{Value, json},
    uuid::Uuid,
};

pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> (StatusCode, Json<CheckoutResponse>) {
    let response = state.checkout.process_checkout(&request, Utc::now()).await;
    let status = if response.success {
        StatusCode::CREATED
    } else if response.internal_failure {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    pub transaction_id: String,
}

pub async fn confirm(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<ConfirmBody>,
) -> Result<Json<Value>, ApiError> {
    let transaction_id = TransactionId::new(body.transaction_id)?;
    let outcome = state
        .confirmation
        .confirm_payment(&transaction_id, booking_id, "client", Utc::now())
        .await?;

    let body = match &outcome {
        ConfirmOutcome::Confirmed(report) => json!({
            "status": outcome.as_str(),
            "confirmed": true,
            "tickets_issued": report.issued(),
            "tickets_pending_code": report.failed(),
        }),
        other => json!({
            "status": other.as_str(),
            "confirmed": other.is_confirmed(),
        }),
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub customer_id: Uuid,
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<CancelBody>,
) -> Result<Json<Value>, ApiError> {
    let status = state
        .cancellation
        .cancel_booking(booking_id, body.customer_id, Utc::now())
        .await?;
    Ok(Json(json!({ "booking_id": booking_id, "status": status })))
}

pub async fn refund(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let payment_status = state.cancellation.refund_booking(booking_id).await?;
    Ok(Json(json!({ "booking_id": booking_id, "payment_status": payment_status })))
}

pub async fn reissue(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let report = state
        .confirmation
        .reissue_missing_codes(booking_id, Utc::now())
        .await?;
    Ok(Json(json!({
        "booking_id": booking_id,
        "issued": report.issued(),
        "failed": report.failed(),
    })))
}

pub async fn tier_availability(
    State(state): State<AppState>,
    Path(tier_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let available = state
        .store
        .tier_availability(tier_id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("tier {tier_id}")))?;
    Ok(Json(json!({ "tier_id": tier_id, "available": available })))
}

pub async fn loyalty(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let account = state.store.loyalty_account(customer_id).await?;
    let body = match account {
        Some(a) => json!({
            "customer_id": customer_id,
            "points": a.points,
            "last_updated": a.last_updated,
            "description": a.description,
        }),
        None => json!({ "customer_id": customer_id, "points": 0 }),
    };
    Ok(Json(body))
}
