use {super::booking::BookingStatus, uuid::Uuid};

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: String,
    pub actor: String,
    pub detail: serde_json::Value,
}

impl NewAuditEntry {
    /// Row describing a booking status change.
    pub fn booking_transition(
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
        actor: &str,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            entity_type: "booking".to_string(),
            entity_id: booking_id,
            action: to.as_str().to_string(),
            actor: actor.to_string(),
            detail: serde_json::json!({
                "old_status": from.as_str(),
                "new_status": to.as_str(),
                "detail": detail,
            }),
        }
    }

    pub fn booking_created(booking_id: Uuid, actor: &str, detail: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            entity_type: "booking".to_string(),
            entity_id: booking_id,
            action: "created".to_string(),
            actor: actor.to_string(),
            detail,
        }
    }

    pub fn payment_refunded(payment_id: Uuid, actor: &str, detail: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            entity_type: "payment".to_string(),
            entity_id: payment_id,
            action: "refunded".to_string(),
            actor: actor.to_string(),
            detail,
        }
    }
}
