mod common;

use box_office::domain::booking::BookingStatus;
use box_office::domain::error::BookingError;
use box_office::domain::payment::PaymentStatus;
use chrono::Duration;
use common::*;
use std::sync::atomic::Ordering;
use uuid::Uuid;

/// Reserve and confirm one booking of `qty` tickets.
async fn confirmed_booking(w: &World, qty: i64) -> Uuid {
    let tier = w.add_tier("General", 3000, 100);
    let receipt = w.reserve(&[(tier.id, qty)]).await;
    let outcome = w
        .confirmation_service()
        .confirm_payment(&transaction_for(receipt.booking_id), receipt.booking_id, "client", w.now)
        .await
        .unwrap();
    assert!(outcome.is_confirmed());
    receipt.booking_id
}

// ── 15. cancel_inside_cutoff_is_refused ────────────────────────────────────
// Event starts in 23 hours; the 24h window has closed.

#[tokio::test]
async fn cancel_inside_cutoff_is_refused() {
    let w = World::new();
    let booking_id = confirmed_booking(&w, 2).await;
    let late = w.event.starts_at - Duration::hours(23);

    let result = w
        .cancellation_service()
        .cancel_booking(booking_id, w.customer.id, late)
        .await;

    assert!(matches!(result, Err(BookingError::CancellationWindowClosed)));
    assert_eq!(w.store.booking(booking_id).unwrap().status, BookingStatus::Confirmed);
    assert!(w.store.tickets_for(booking_id).iter().all(|t| !t.used));
}

// ── 16. cancel_before_cutoff_invalidates_tickets ───────────────────────────

#[tokio::test]
async fn cancel_before_cutoff_invalidates_tickets() {
    let w = World::new();
    let booking_id = confirmed_booking(&w, 3).await;
    let at = w.event.starts_at - Duration::hours(48);

    let status = w
        .cancellation_service()
        .cancel_booking(booking_id, w.customer.id, at)
        .await
        .unwrap();

    assert_eq!(status, BookingStatus::Cancelled);
    assert_eq!(w.store.booking(booking_id).unwrap().status, BookingStatus::Cancelled);
    let tickets = w.store.tickets_for(booking_id);
    assert_eq!(tickets.len(), 3);
    assert!(tickets.iter().all(|t| t.used && t.used_at == Some(at)));

    // second cancel is an invalid transition, not a silent success
    let again = w
        .cancellation_service()
        .cancel_booking(booking_id, w.customer.id, at)
        .await;
    assert!(matches!(again, Err(BookingError::InvalidTransition { .. })));
}

#[tokio::test]
async fn only_owner_can_cancel() {
    let w = World::new();
    let booking_id = confirmed_booking(&w, 1).await;
    let mallory = w.add_customer("Mallory");

    let result = w
        .cancellation_service()
        .cancel_booking(booking_id, mallory.id, w.now)
        .await;

    assert!(matches!(result, Err(BookingError::NotFound(_))));
    assert_eq!(w.store.booking(booking_id).unwrap().status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn pending_booking_cannot_be_cancelled() {
    let w = World::new();
    let tier = w.add_tier("General", 3000, 100);
    let receipt = w.reserve(&[(tier.id, 1)]).await;

    let result = w
        .cancellation_service()
        .cancel_booking(receipt.booking_id, w.customer.id, w.now)
        .await;

    assert!(matches!(result, Err(BookingError::InvalidTransition { .. })));
}

// ── 17. refund_rules ───────────────────────────────────────────────────────

#[tokio::test]
async fn refund_of_cancelled_booking() {
    let w = World::new();
    let booking_id = confirmed_booking(&w, 2).await;
    let cancellation = w.cancellation_service();
    cancellation
        .cancel_booking(booking_id, w.customer.id, w.now)
        .await
        .unwrap();

    let status = cancellation.refund_booking(booking_id).await.unwrap();
    assert_eq!(status, PaymentStatus::Refunded);
    assert_eq!(
        w.store.payment(booking_id).unwrap().status,
        PaymentStatus::Refunded
    );
    assert_eq!(w.gateway.refunds(), vec![transaction_for(booking_id)]);

    // repeat is a no-op
    let again = cancellation.refund_booking(booking_id).await.unwrap();
    assert_eq!(again, PaymentStatus::Refunded);
    assert_eq!(w.gateway.refunds().len(), 1);

    let payment_id = w.store.payment(booking_id).unwrap().id;
    assert_eq!(w.store.audit_for(payment_id).len(), 1);
}

#[tokio::test]
async fn refund_requires_cancellation_first() {
    let w = World::new();
    let booking_id = confirmed_booking(&w, 1).await;

    let result = w.cancellation_service().refund_booking(booking_id).await;

    assert!(matches!(result, Err(BookingError::InvalidTransition { .. })));
    assert_eq!(
        w.store.payment(booking_id).unwrap().status,
        PaymentStatus::Completed
    );
    assert!(w.gateway.refunds().is_empty());
}

#[tokio::test]
async fn declined_refund_leaves_payment_completed() {
    let w = World::new();
    let booking_id = confirmed_booking(&w, 1).await;
    let cancellation = w.cancellation_service();
    cancellation
        .cancel_booking(booking_id, w.customer.id, w.now)
        .await
        .unwrap();
    w.gateway.refunds_declined.store(true, Ordering::SeqCst);

    let result = cancellation.refund_booking(booking_id).await;

    assert!(matches!(result, Err(BookingError::Gateway(_))));
    assert_eq!(
        w.store.payment(booking_id).unwrap().status,
        PaymentStatus::Completed
    );
}
