use {
    crate::domain::{error::BookingError, store::BookingStore},
    chrono::{DateTime, Utc},
    std::{sync::Arc, time::Duration},
    tokio::sync::watch,
};

const BATCH: i64 = 100;

/// Periodically release pending reservations whose hold has lapsed.
pub async fn run_reservation_sweeper(
    store: Arc<dyn BookingStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "reservation sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("reservation sweeper shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match sweep_once(&*store, Utc::now()).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "expired stale reservations"),
            Err(e) => tracing::error!(error = %e, "sweeper error"),
        }
    }
}

/// Drain every reservation whose hold lapsed before `now`, in batches.
/// Returns how many were released.
pub async fn sweep_once(store: &dyn BookingStore, now: DateTime<Utc>) -> Result<usize, BookingError> {
    let mut total = 0;
    loop {
        let released = store.expire_stale(now, BATCH).await?;
        for r in &released {
            tracing::debug!(booking_id = %r.booking_id, tickets = r.tickets_released, "reservation expired");
        }
        total += released.len();
        if released.len() < BATCH as usize {
            return Ok(total);
        }
    }
}
