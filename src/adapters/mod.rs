pub mod api_errors;
pub mod http;
pub mod notifier;
pub mod stripe_client;
pub mod stripe_webhook;
pub mod ticket_codes;
