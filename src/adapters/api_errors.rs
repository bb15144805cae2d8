use {
    crate::domain::error::BookingError,
    axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    },
};

/// Newtype over the domain error so axum can render it.
pub struct ApiError(pub BookingError);

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            BookingError::Validation(_) | BookingError::Discount(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            BookingError::InventoryExhausted { .. }
            | BookingError::InvalidTransition { .. }
            | BookingError::CancellationWindowClosed => StatusCode::CONFLICT,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::WebhookSignature(_) => StatusCode::BAD_REQUEST,
            BookingError::Gateway(_) => StatusCode::BAD_GATEWAY,
            BookingError::Database(_)
            | BookingError::Serialization(_)
            | BookingError::Issuance(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match &self.0 {
            BookingError::Validation(_) => "validation_error",
            BookingError::Discount(_) => "discount_error",
            BookingError::InventoryExhausted { .. } => "inventory_exhausted",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::CancellationWindowClosed => "cancellation_window_closed",
            BookingError::NotFound(_) => "not_found",
            BookingError::WebhookSignature(_) => "webhook_error",
            BookingError::Gateway(_) => "gateway_error",
            BookingError::Database(_)
            | BookingError::Serialization(_)
            | BookingError::Issuance(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = serde_json::json!({
            "error_code": self.error_code(),
            "message": self.0.public_message(),
        });

        (status, Json(body)).into_response()
    }
}
