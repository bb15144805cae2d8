use box_office::domain::booking::BookingStatus;
use box_office::domain::catalog::availability;
use box_office::domain::discount::DiscountKind;
use box_office::domain::money::MoneyAmount;
use box_office::domain::payment::PaymentStatus;
use box_office::domain::pricing::{TierSelection, compute_discount, normalize_selections};
use proptest::prelude::*;
use uuid::Uuid;

fn arb_booking_status() -> impl Strategy<Value = BookingStatus> {
    prop_oneof![
        Just(BookingStatus::Pending),
        Just(BookingStatus::Confirmed),
        Just(BookingStatus::Cancelled),
        Just(BookingStatus::Expired),
    ]
}

fn arb_payment_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Completed),
        Just(PaymentStatus::Failed),
        Just(PaymentStatus::Refunded),
    ]
}

fn arb_discount() -> impl Strategy<Value = DiscountKind> {
    prop_oneof![
        (0u32..=100).prop_map(DiscountKind::Percent),
        (0i64..10_000_000).prop_map(|c| DiscountKind::Amount(MoneyAmount::new(c).unwrap())),
    ]
}

proptest! {
    /// Cancelled and Expired bookings never move again.
    #[test]
    fn terminal_bookings_reject_all_transitions(target in arb_booking_status()) {
        for terminal in [BookingStatus::Cancelled, BookingStatus::Expired] {
            prop_assert!(terminal.is_terminal());
            prop_assert!(!terminal.can_transition_to(&target));
        }
    }

    /// Any walk from Pending takes at most two steps (confirm, then cancel)
    /// and never returns to Pending.
    #[test]
    fn booking_walk_is_bounded(steps in prop::collection::vec(arb_booking_status(), 1..20)) {
        let mut current = BookingStatus::Pending;
        let mut transitions = 0u32;
        for next in &steps {
            if current.can_transition_to(next) {
                prop_assert_ne!(*next, BookingStatus::Pending);
                current = *next;
                transitions += 1;
            }
        }
        prop_assert!(transitions <= 2, "got {transitions} transitions in walk: {steps:?}");
    }

    /// Refunded is only reachable through Completed or Failed, and is final.
    #[test]
    fn refunded_is_final(target in arb_payment_status(), from in arb_payment_status()) {
        prop_assert!(!PaymentStatus::Refunded.can_transition_to(&target));
        if from.can_transition_to(&PaymentStatus::Refunded) {
            prop_assert!(matches!(from, PaymentStatus::Completed | PaymentStatus::Failed));
        }
    }

    #[test]
    fn status_roundtrip(b in arb_booking_status(), p in arb_payment_status()) {
        prop_assert_eq!(BookingStatus::try_from(b.as_str()).unwrap(), b);
        prop_assert_eq!(PaymentStatus::try_from(p.as_str()).unwrap(), p);
    }

    /// Discount never exceeds the subtotal, so totals never go negative.
    #[test]
    fn discount_never_exceeds_subtotal(subtotal in 0i64..100_000_000, kind in arb_discount()) {
        let subtotal = MoneyAmount::new(subtotal).unwrap();
        let discount = compute_discount(subtotal, &kind);
        prop_assert!(discount <= subtotal);
        prop_assert_eq!(subtotal.saturating_sub(discount).cents(), subtotal.cents() - discount.cents());
    }

    #[test]
    fn availability_is_never_negative(stock in 0i64..1_000_000, issued in 0i64..2_000_000) {
        let available = availability(stock, issued);
        prop_assert!(available >= 0);
        prop_assert!(available <= stock);
    }

    /// Merging selections preserves the total quantity per tier.
    #[test]
    fn normalize_preserves_quantities(quantities in prop::collection::vec((0usize..3, 1i64..50), 1..12)) {
        let tiers = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let selections: Vec<TierSelection> = quantities
            .iter()
            .map(|&(i, quantity)| TierSelection { tier_id: tiers[i], quantity })
            .collect();

        let merged = normalize_selections(&selections).unwrap();
        prop_assert!(merged.windows(2).all(|w| w[0].tier_id < w[1].tier_id));
        let before: i64 = selections.iter().map(|s| s.quantity).sum();
        let after: i64 = merged.iter().map(|s| s.quantity).sum();
        prop_assert_eq!(before, after);
    }

    /// Negative amounts are rejected at construction.
    #[test]
    fn money_amount_rejects_negatives(cents in i64::MIN..0) {
        prop_assert!(MoneyAmount::new(cents).is_err());
    }

    /// checked_add matches i64::checked_add and never silently overflows.
    #[test]
    fn money_add_never_silently_overflows(a in 0i64..=i64::MAX, b in 0i64..=i64::MAX) {
        let result = MoneyAmount::new(a).unwrap().checked_add(MoneyAmount::new(b).unwrap());
        match a.checked_add(b) {
            Some(expected) => prop_assert_eq!(result.unwrap().cents(), expected),
            None => prop_assert!(result.is_none()),
        }
    }
}
