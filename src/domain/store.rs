use {
    super::BoxFuture,
    super::booking::{BookingDetails, BookingStatus, NewReservation},
    super::catalog::{Event, TierStock},
    super::customer::{Customer, LoyaltyAccount},
    super::discount::Discount,
    super::error::BookingError,
    super::id::DiscountCode,
    super::loyalty::LoyaltyAward,
    super::payment::Payment,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, BookingError>>;

/// Result of the guarded `Pending → Confirmed` update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmTransition {
    /// This caller won the transition and applied its side effects.
    Confirmed,
    /// Another caller confirmed first; nothing was changed.
    AlreadyConfirmed,
    /// Booking is in a state that can never confirm.
    NotPending(BookingStatus),
}

/// A pending reservation given back: tickets deleted, discount use returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedReservation {
    pub booking_id: Uuid,
    pub tickets_released: u64,
}

/// Transactional persistence for the booking core.
///
/// Every state change is a single conditional update guarded by the
/// current status, so concurrent callers can race safely: exactly one wins
/// and the rest observe the outcome.
pub trait BookingStore: Send + Sync {
    fn get_event(&self, event_id: Uuid) -> StoreFuture<'_, Option<Event>>;

    /// All tiers of the event with their issued ticket counts.
    fn tier_stock(&self, event_id: Uuid) -> StoreFuture<'_, Vec<TierStock>>;

    /// `stock - issued` for one tier, `None` if the tier does not exist.
    fn tier_availability(&self, tier_id: Uuid) -> StoreFuture<'_, Option<i64>>;

    fn find_discount<'a>(&'a self, code: &'a DiscountCode) -> StoreFuture<'a, Option<Discount>>;

    fn get_customer(&self, customer_id: Uuid) -> StoreFuture<'_, Option<Customer>>;

    fn set_payment_customer_ref<'a>(
        &'a self,
        customer_id: Uuid,
        customer_ref: &'a str,
    ) -> StoreFuture<'a, ()>;

    /// Atomically re-check availability under lock, take one discount use,
    /// and insert the pending booking with its tickets.
    ///
    /// Fails with `InventoryExhausted` or `Discount(LimitReached)` without
    /// writing anything.
    fn reserve<'a>(&'a self, reservation: &'a NewReservation) -> StoreFuture<'a, ()>;

    fn attach_payment<'a>(&'a self, payment: &'a Payment) -> StoreFuture<'a, ()>;

    /// `Pending → Expired`: delete tickets, fail the payment, return the
    /// discount use. `None` when the booking is no longer pending.
    fn release_reservation<'a>(
        &'a self,
        booking_id: Uuid,
        actor: &'a str,
    ) -> StoreFuture<'a, Option<ReleasedReservation>>;

    fn load_booking(&self, booking_id: Uuid) -> StoreFuture<'_, Option<BookingDetails>>;

    /// `Pending → Confirmed` with payment completed, tickets paid and the
    /// loyalty award applied in the same transaction.
    fn confirm<'a>(
        &'a self,
        booking_id: Uuid,
        award: &'a LoyaltyAward,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, ConfirmTransition>;

    /// Sets the ticket's code only if it has none yet.
    fn record_ticket_code<'a>(
        &'a self,
        ticket_id: Uuid,
        storage_ref: &'a str,
    ) -> StoreFuture<'a, bool>;

    /// `Confirmed → Cancelled`, tickets marked used at `now`.
    fn cancel(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, bool>;

    /// Payment `Completed | Failed → Refunded`.
    fn mark_payment_refunded(&self, booking_id: Uuid) -> StoreFuture<'_, bool>;

    /// Release up to `limit` pending reservations whose hold lapsed before `now`.
    fn expire_stale(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreFuture<'_, Vec<ReleasedReservation>>;

    fn loyalty_account(&self, customer_id: Uuid) -> StoreFuture<'_, Option<LoyaltyAccount>>;
}
