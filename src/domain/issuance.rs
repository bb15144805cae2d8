use {
    super::BoxFuture,
    super::booking::BookingDetails,
    super::error::BookingError,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

/// Identity embedded in a ticket's scannable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCodePayload {
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub event_id: Uuid,
    pub customer_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

/// Input for one ticket code: the payload plus display fields.
#[derive(Debug, Clone)]
pub struct TicketCodeRequest {
    pub payload: TicketCodePayload,
    pub event_title: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub holder_name: String,
    pub tier: String,
}

impl TicketCodeRequest {
    /// One request per ticket of the booking, all stamped with `now`.
    pub fn for_booking(details: &BookingDetails, now: DateTime<Utc>) -> Vec<Self> {
        details
            .tickets
            .iter()
            .map(|t| Self {
                payload: TicketCodePayload {
                    ticket_id: t.id,
                    ticket_number: t.ticket_number.clone(),
                    event_id: details.event.id,
                    customer_id: details.customer.id,
                    issued_at: now,
                },
                event_title: details.event.title.clone(),
                venue: details.event.venue.clone(),
                starts_at: details.event.starts_at,
                holder_name: details.customer.name.clone(),
                tier: details.tier_name(t.tier_id).to_string(),
            })
            .collect()
    }
}

/// Generates a ticket code and puts it in durable storage.
pub trait TicketCodeStore: Send + Sync {
    /// Returns the storage reference of the stored code.
    fn generate_and_store<'a>(
        &'a self,
        request: &'a TicketCodeRequest,
    ) -> BoxFuture<'a, Result<String, BookingError>>;

    fn display_url(&self, storage_ref: &str) -> String;
}

/// Outbound customer messages. Fire-and-forget from the core's view.
pub trait Notifier: Send + Sync {
    fn send<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        html_body: &'a str,
    ) -> BoxFuture<'a, Result<(), BookingError>>;
}

#[derive(Debug)]
pub struct TicketIssuance {
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub result: Result<String, BookingError>,
}

/// Per-ticket outcome of code issuance. Failures stay isolated.
#[derive(Debug, Default)]
pub struct IssuanceReport {
    pub tickets: Vec<TicketIssuance>,
}

impl IssuanceReport {
    pub fn issued(&self) -> usize {
        self.tickets.iter().filter(|t| t.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.tickets.len() - self.issued()
    }

    pub fn storage_ref(&self, ticket_id: Uuid) -> Option<&str> {
        self.tickets
            .iter()
            .find(|t| t.ticket_id == ticket_id)
            .and_then(|t| t.result.as_ref().ok())
            .map(String::as_str)
    }
}
