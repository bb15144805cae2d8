pub mod audit_repo;
pub mod booking_repo;
pub mod catalog_repo;
pub mod customer_repo;
pub mod payment_repo;

use {
    crate::domain::{
        booking::{BookingDetails, NewReservation},
        catalog::{Event, TierStock},
        customer::{Customer, LoyaltyAccount},
        discount::Discount,
        id::DiscountCode,
        loyalty::LoyaltyAward,
        payment::Payment,
        store::{BookingStore, ConfirmTransition, ReleasedReservation, StoreFuture},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

/// `BookingStore` backed by Postgres. Each mutating call is one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl BookingStore for PgStore {
    fn get_event(&self, event_id: Uuid) -> StoreFuture<'_, Option<Event>> {
        Box::pin(catalog_repo::get_event(&self.pool, event_id))
    }

    fn tier_stock(&self, event_id: Uuid) -> StoreFuture<'_, Vec<TierStock>> {
        Box::pin(catalog_repo::tier_stock(&self.pool, event_id))
    }

    fn tier_availability(&self, tier_id: Uuid) -> StoreFuture<'_, Option<i64>> {
        Box::pin(catalog_repo::tier_availability(&self.pool, tier_id))
    }

    fn find_discount<'a>(&'a self, code: &'a DiscountCode) -> StoreFuture<'a, Option<Discount>> {
        Box::pin(catalog_repo::find_discount(&self.pool, code))
    }

    fn get_customer(&self, customer_id: Uuid) -> StoreFuture<'_, Option<Customer>> {
        Box::pin(customer_repo::get_customer(&self.pool, customer_id))
    }

    fn set_payment_customer_ref<'a>(
        &'a self,
        customer_id: Uuid,
        customer_ref: &'a str,
    ) -> StoreFuture<'a, ()> {
        Box::pin(customer_repo::set_payment_customer_ref(
            &self.pool,
            customer_id,
            customer_ref,
        ))
    }

    fn reserve<'a>(&'a self, reservation: &'a NewReservation) -> StoreFuture<'a, ()> {
        Box::pin(booking_repo::reserve(&self.pool, reservation))
    }

    fn attach_payment<'a>(&'a self, payment: &'a Payment) -> StoreFuture<'a, ()> {
        Box::pin(payment_repo::insert(&self.pool, payment))
    }

    fn release_reservation<'a>(
        &'a self,
        booking_id: Uuid,
        actor: &'a str,
    ) -> StoreFuture<'a, Option<ReleasedReservation>> {
        Box::pin(booking_repo::release_reservation(&self.pool, booking_id, actor))
    }

    fn load_booking(&self, booking_id: Uuid) -> StoreFuture<'_, Option<BookingDetails>> {
        Box::pin(booking_repo::load_booking(&self.pool, booking_id))
    }

    fn confirm<'a>(
        &'a self,
        booking_id: Uuid,
        award: &'a LoyaltyAward,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, ConfirmTransition> {
        Box::pin(booking_repo::confirm(&self.pool, booking_id, award, now))
    }

    fn record_ticket_code<'a>(
        &'a self,
        ticket_id: Uuid,
        storage_ref: &'a str,
    ) -> StoreFuture<'a, bool> {
        Box::pin(booking_repo::record_ticket_code(&self.pool, ticket_id, storage_ref))
    }

    fn cancel(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, bool> {
        Box::pin(booking_repo::cancel(&self.pool, booking_id, now))
    }

    fn mark_payment_refunded(&self, booking_id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(payment_repo::mark_refunded(&self.pool, booking_id))
    }

    fn expire_stale(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreFuture<'_, Vec<ReleasedReservation>> {
        Box::pin(booking_repo::expire_stale(&self.pool, now, limit))
    }

    fn loyalty_account(&self, customer_id: Uuid) -> StoreFuture<'_, Option<LoyaltyAccount>> {
        Box::pin(customer_repo::loyalty_account(&self.pool, customer_id))
    }
}
