mod common;

use box_office::domain::booking::BookingStatus;
use box_office::domain::discount::DiscountKind;
use box_office::domain::error::{BookingError, DiscountError};
use box_office::domain::money::MoneyAmount;
use box_office::domain::payment::PaymentStatus;
use common::*;
use std::sync::atomic::Ordering;

// ── 1. last_ticket_goes_to_first_buyer ─────────────────────────────────────
// One tier, stock 1, price 1000. A takes it while still unpaid; B is told
// inventory is exhausted and no ticket rows are written for B.

#[tokio::test]
async fn last_ticket_goes_to_first_buyer() {
    let w = World::new();
    let front_row = w.add_tier("Front Row", 1000, 1);
    let bob = w.add_customer("Bob");
    let checkout = w.checkout_service();

    let a = checkout
        .try_checkout(&w.request(&[(front_row.id, 1)], None), w.now)
        .await
        .unwrap();
    let b = checkout
        .try_checkout(&w.request_for(bob.id, &[(front_row.id, 1)], None), w.now)
        .await;

    assert!(
        matches!(
            b,
            Err(BookingError::InventoryExhausted { requested: 1, available: 0, .. })
        ),
        "got {b:?}"
    );
    assert_eq!(w.store.issued_for_tier(front_row.id), 1);
    assert_eq!(w.store.tickets_for(a.booking_id).len(), 1);
    assert_eq!(w.store.bookings().len(), 1);
}

// ── 2. successful_checkout_leaves_pending_booking ──────────────────────────

#[tokio::test]
async fn successful_checkout_leaves_pending_booking() {
    let w = World::new();
    let tier = w.add_tier("General", 2500, 100);

    let receipt = w.reserve(&[(tier.id, 3)]).await;

    let booking = w.store.booking(receipt.booking_id).unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total.cents(), 7500);
    assert!(booking.reserved_until > w.now);
    assert_eq!(booking.reference.as_str(), receipt.reference);

    let tickets = w.store.tickets_for(receipt.booking_id);
    assert_eq!(tickets.len(), 3);
    assert!(tickets.iter().all(|t| !t.is_paid && t.qr_ref.is_none()));

    let payment = w.store.payment(receipt.booking_id).unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.transaction_id, transaction_for(receipt.booking_id));
    assert_eq!(payment.money.amount().cents(), 7500);
    assert!(receipt.client_secret.ends_with("_secret"));

    // customer ref cached after the first checkout
    let customer = w.store.customer(w.customer.id).unwrap();
    assert!(customer.payment_customer_ref.is_some());
    w.reserve(&[(tier.id, 1)]).await;
    assert_eq!(w.gateway.customers_created.load(Ordering::SeqCst), 1);

    assert_eq!(w.store.audit_for(receipt.booking_id)[0].action, "created");
}

// ── 3. single_use_discount_is_consumed_once ────────────────────────────────

#[tokio::test]
async fn single_use_discount_is_consumed_once() {
    let w = World::new();
    let tier = w.add_tier("General", 1000, 100);
    let save10 = w.add_discount("SAVE10", DiscountKind::Percent(10), Some(1));
    let checkout = w.checkout_service();

    let first = checkout
        .try_checkout(&w.request(&[(tier.id, 1)], Some("SAVE10")), w.now)
        .await
        .unwrap();
    assert_eq!(first.quote.total.cents(), 900);
    assert_eq!(w.store.discount(save10.id).unwrap().used_count, 1);

    let second = checkout
        .try_checkout(&w.request(&[(tier.id, 1)], Some("SAVE10")), w.now)
        .await;
    assert!(
        matches!(second, Err(BookingError::Discount(DiscountError::LimitReached))),
        "got {second:?}"
    );
    assert_eq!(w.store.discount(save10.id).unwrap().used_count, 1);
    assert_eq!(w.store.bookings().len(), 1);
}

// ── 4. unknown_code_fails_whole_checkout ───────────────────────────────────

#[tokio::test]
async fn unknown_code_fails_whole_checkout() {
    let w = World::new();
    let tier = w.add_tier("General", 1000, 100);

    let result = w
        .checkout_service()
        .try_checkout(&w.request(&[(tier.id, 2)], Some("NOPE")), w.now)
        .await;

    assert!(matches!(result, Err(BookingError::Discount(DiscountError::NotFound))));
    assert!(w.store.bookings().is_empty());
    assert_eq!(w.store.issued_for_tier(tier.id), 0);
    assert_eq!(w.gateway.intents_created.load(Ordering::SeqCst), 0);
}

// ── 5. gateway_failure_releases_reservation ────────────────────────────────
// Intent creation fails after the reservation is written. The booking is
// expired, its tickets are freed and the discount use is handed back.

#[tokio::test]
async fn gateway_failure_releases_reservation() {
    let w = World::new();
    let tier = w.add_tier("General", 1000, 5);
    let promo = w.add_discount("PROMO", DiscountKind::Percent(50), Some(10));
    w.gateway.fail_intents.store(true, Ordering::SeqCst);

    let result = w
        .checkout_service()
        .try_checkout(&w.request(&[(tier.id, 2)], Some("PROMO")), w.now)
        .await;
    assert!(matches!(result, Err(BookingError::Gateway(_))));

    let bookings = w.store.bookings();
    assert_eq!(bookings.len(), 1);
    let booking = &bookings[0];
    assert_eq!(booking.status, BookingStatus::Expired);
    assert!(w.store.tickets_for(booking.id).is_empty());
    assert_eq!(w.store.issued_for_tier(tier.id), 0);
    assert_eq!(w.store.discount(promo.id).unwrap().used_count, 0);
    assert!(w.store.payment(booking.id).is_none());

    // stock is usable again once the gateway recovers
    w.gateway.fail_intents.store(false, Ordering::SeqCst);
    w.reserve(&[(tier.id, 5)]).await;
    assert_eq!(w.store.issued_for_tier(tier.id), 5);
}

// ── 6. per_order_limits_and_inactive_tiers ─────────────────────────────────

#[tokio::test]
async fn per_order_limits_and_inactive_tiers() {
    let w = World::new();
    let limited = w.add_tier_with("VIP", 10_000, 50, |t| t.max_per_order = Some(4));
    let retired = w.add_tier_with("Early Bird", 500, 50, |t| t.active = false);
    let checkout = w.checkout_service();

    let too_many = checkout
        .try_checkout(&w.request(&[(limited.id, 3), (limited.id, 2)], None), w.now)
        .await;
    match too_many {
        Err(BookingError::Validation(msg)) => assert!(msg.contains("at most 4"), "{msg}"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let inactive = checkout
        .try_checkout(&w.request(&[(retired.id, 1)], None), w.now)
        .await;
    match inactive {
        Err(BookingError::Validation(msg)) => assert!(msg.contains("not on sale"), "{msg}"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let zero = checkout
        .try_checkout(&w.request(&[(limited.id, 0)], None), w.now)
        .await;
    assert!(matches!(zero, Err(BookingError::Validation(_))));
    assert!(w.store.bookings().is_empty());
}

// ── 7. discount_arithmetic ─────────────────────────────────────────────────
// 10% off 1000 is 900. A fixed 200 off two 150 tickets leaves 100.

#[tokio::test]
async fn discount_arithmetic() {
    let w = World::new();
    let general = w.add_tier("General", 1000, 100);
    let cheap = w.add_tier("Standing", 150, 100);
    w.add_discount("TENOFF", DiscountKind::Percent(10), None);
    w.add_discount(
        "FLAT200",
        DiscountKind::Amount(MoneyAmount::new(200).unwrap()),
        None,
    );
    let checkout = w.checkout_service();

    let pct = checkout
        .try_checkout(&w.request(&[(general.id, 1)], Some("tenoff")), w.now)
        .await
        .unwrap();
    assert_eq!(pct.quote.subtotal.cents(), 1000);
    assert_eq!(pct.quote.discount.cents(), 100);
    assert_eq!(pct.quote.total.cents(), 900);

    // two Standing tickets: 300 - 200
    let flat = checkout
        .try_checkout(&w.request(&[(cheap.id, 2)], Some("FLAT200")), w.now)
        .await
        .unwrap();
    assert_eq!(flat.quote.discount.cents(), 200);
    assert_eq!(flat.quote.total.cents(), 100);
    assert_eq!(w.store.payment(flat.booking_id).unwrap().money.amount().cents(), 100);
}

// ── 7b. free_orders_are_rejected_before_reserving ──────────────────────────
// A fixed 200 off a 150 order caps the discount at 150, leaving nothing to
// charge. No booking is written and the code stays unused.

#[tokio::test]
async fn free_orders_are_rejected_before_reserving() {
    let w = World::new();
    let cheap = w.add_tier("Standing", 150, 100);
    let flat = w.add_discount(
        "FLAT200",
        DiscountKind::Amount(MoneyAmount::new(200).unwrap()),
        Some(5),
    );
    w.add_discount("ONTHEHOUSE", DiscountKind::Percent(100), None);
    let checkout = w.checkout_service();

    for code in ["FLAT200", "ONTHEHOUSE"] {
        let result = checkout
            .try_checkout(&w.request(&[(cheap.id, 1)], Some(code)), w.now)
            .await;
        match result {
            Err(BookingError::Validation(msg)) => assert!(msg.contains("total is zero"), "{msg}"),
            other => panic!("expected zero-total rejection for {code}, got {other:?}"),
        }
    }

    assert!(w.store.bookings().is_empty());
    assert_eq!(w.store.issued_for_tier(cheap.id), 0);
    assert_eq!(w.store.discount(flat.id).unwrap().used_count, 0);
    assert_eq!(w.gateway.intents_created.load(Ordering::SeqCst), 0);

    let response = checkout
        .process_checkout(&w.request(&[(cheap.id, 1)], Some("FLAT200")), w.now)
        .await;
    assert!(!response.success);
    assert!(!response.internal_failure);
}

// ── 8. event_gates ─────────────────────────────────────────────────────────

#[tokio::test]
async fn sold_out_event_is_rejected_up_front() {
    let w = World::new();
    let tier = w.add_tier("General", 1000, 2);
    w.reserve(&[(tier.id, 2)]).await;

    let result = w
        .checkout_service()
        .try_checkout(&w.request(&[(tier.id, 1)], None), w.now)
        .await;
    match result {
        Err(BookingError::InventoryExhausted {
            tier_id,
            requested,
            available,
        }) => {
            assert_eq!(tier_id, tier.id);
            assert_eq!(requested, 1);
            assert_eq!(available, 0);
        }
        other => panic!("expected inventory exhausted, got {other:?}"),
    }
    assert_eq!(w.store.issued_for_tier(tier.id), 2);
}

#[tokio::test]
async fn event_without_tiers_is_rejected() {
    let w = World::new();

    let result = w
        .checkout_service()
        .try_checkout(&w.request(&[(uuid::Uuid::new_v4(), 1)], None), w.now)
        .await;
    match result {
        Err(BookingError::Validation(msg)) => assert!(msg.contains("no price tiers"), "{msg}"),
        other => panic!("expected no price tiers, got {other:?}"),
    }
    assert!(w.store.bookings().is_empty());
}

#[tokio::test]
async fn unknown_event_and_customer() {
    let w = World::new();
    let tier = w.add_tier("General", 1000, 10);
    let checkout = w.checkout_service();

    let mut request = w.request(&[(tier.id, 1)], None);
    request.event_id = uuid::Uuid::new_v4();
    assert!(matches!(
        checkout.try_checkout(&request, w.now).await,
        Err(BookingError::NotFound(_))
    ));

    let stranger = w.request_for(uuid::Uuid::new_v4(), &[(tier.id, 1)], None);
    assert!(matches!(
        checkout.try_checkout(&stranger, w.now).await,
        Err(BookingError::NotFound(_))
    ));
    assert!(w.store.bookings().is_empty());
}

// ── 9. process_checkout_response ───────────────────────────────────────────

#[tokio::test]
async fn process_checkout_reports_structured_outcome() {
    let w = World::new();
    let tier = w.add_tier("General", 1200, 10);
    let checkout = w.checkout_service();

    let ok = checkout
        .process_checkout(&w.request(&[(tier.id, 2)], None), w.now)
        .await;
    assert!(ok.success);
    assert!(ok.booking_id.is_some());
    assert!(ok.client_secret.is_some());
    assert_eq!(ok.total.map(|t| t.cents()), Some(2400));

    let rejected = checkout
        .process_checkout(&w.request(&[(tier.id, 2)], Some("MISSING")), w.now)
        .await;
    assert!(!rejected.success);
    assert!(!rejected.internal_failure);
    assert!(rejected.booking_id.is_none());
    assert!(!rejected.message.is_empty());

    w.gateway.fail_intents.store(true, Ordering::SeqCst);
    let failed = checkout
        .process_checkout(&w.request(&[(tier.id, 1)], None), w.now)
        .await;
    assert!(!failed.success);
    assert!(failed.internal_failure);
    assert!(!failed.message.contains("card network"));
}
