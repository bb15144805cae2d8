use crate::domain::{BoxFuture, error::BookingError, issuance::Notifier};

/// Writes outbound messages to the log instead of a mail relay.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        html_body: &'a str,
    ) -> BoxFuture<'a, Result<(), BookingError>> {
        Box::pin(async move {
            tracing::info!(to, subject, body_bytes = html_body.len(), "notification sent");
            Ok(())
        })
    }
}
