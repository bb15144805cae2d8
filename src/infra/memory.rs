use {
    crate::domain::{
        audit::NewAuditEntry,
        booking::{Booking, BookingDetails, BookingStatus, NewReservation, Ticket},
        catalog::{Event, PriceTier, TierStock, availability},
        customer::{Customer, LoyaltyAccount},
        discount::Discount,
        error::{BookingError, DiscountError},
        id::DiscountCode,
        loyalty::LoyaltyAward,
        payment::{Payment, PaymentStatus},
        store::{BookingStore, ConfirmTransition, ReleasedReservation, StoreFuture},
    },
    chrono::{DateTime, Utc},
    std::{
        collections::HashMap,
        sync::{Arc, PoisonError, RwLock},
    },
    uuid::Uuid,
};

#[derive(Debug, Default)]
struct State {
    events: HashMap<Uuid, Event>,
    tiers: HashMap<Uuid, PriceTier>,
    customers: HashMap<Uuid, Customer>,
    discounts: HashMap<Uuid, Discount>,
    bookings: HashMap<Uuid, Booking>,
    tickets: HashMap<Uuid, Ticket>,
    /// Keyed by booking id.
    payments: HashMap<Uuid, Payment>,
    loyalty: HashMap<Uuid, LoyaltyAccount>,
    audit: Vec<NewAuditEntry>,
}

impl State {
    fn issued(&self, tier_id: Uuid) -> i64 {
        let n = self.tickets.values().filter(|t| t.tier_id == tier_id).count();
        i64::try_from(n).unwrap_or(i64::MAX)
    }

    fn release(&mut self, booking_id: Uuid, actor: &str) -> Option<ReleasedReservation> {
        let booking = self
            .bookings
            .get_mut(&booking_id)
            .filter(|b| b.status == BookingStatus::Pending)?;
        booking.status = BookingStatus::Expired;
        booking.updated_at = Utc::now();
        let discount_id = booking.discount_id;

        let before = self.tickets.len();
        self.tickets.retain(|_, t| t.booking_id != booking_id);
        let tickets_released = (before - self.tickets.len()) as u64;

        if let Some(payment) = self
            .payments
            .get_mut(&booking_id)
            .filter(|p| p.status == PaymentStatus::Pending)
        {
            payment.status = PaymentStatus::Failed;
        }
        if let Some(discount) = discount_id.and_then(|id| self.discounts.get_mut(&id)) {
            discount.used_count = (discount.used_count - 1).max(0);
        }

        self.audit.push(NewAuditEntry::booking_transition(
            booking_id,
            BookingStatus::Pending,
            BookingStatus::Expired,
            actor,
            serde_json::json!({ "tickets_released": tickets_released }),
        ));
        Some(ReleasedReservation {
            booking_id,
            tickets_released,
        })
    }
}

/// Process-local `BookingStore`. One lock guards every table, so each
/// operation is atomic the way a single database transaction would be.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

fn ready<'a, T: Send + 'a>(result: Result<T, BookingError>) -> StoreFuture<'a, T> {
    Box::pin(std::future::ready(result))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    // ── Seeding ─────────────────────────────────────────────────────────

    pub fn insert_event(&self, event: Event) {
        self.write(|s| s.events.insert(event.id, event));
    }

    pub fn insert_tier(&self, tier: PriceTier) {
        self.write(|s| s.tiers.insert(tier.id, tier));
    }

    pub fn insert_customer(&self, customer: Customer) {
        self.write(|s| s.customers.insert(customer.id, customer));
    }

    pub fn insert_discount(&self, discount: Discount) {
        self.write(|s| s.discounts.insert(discount.id, discount));
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn booking(&self, booking_id: Uuid) -> Option<Booking> {
        self.read(|s| s.bookings.get(&booking_id).cloned())
    }

    pub fn bookings(&self) -> Vec<Booking> {
        self.read(|s| s.bookings.values().cloned().collect())
    }

    pub fn tickets_for(&self, booking_id: Uuid) -> Vec<Ticket> {
        self.read(|s| {
            let mut tickets: Vec<Ticket> = s
                .tickets
                .values()
                .filter(|t| t.booking_id == booking_id)
                .cloned()
                .collect();
            tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));
            tickets
        })
    }

    pub fn issued_for_tier(&self, tier_id: Uuid) -> i64 {
        self.read(|s| s.issued(tier_id))
    }

    pub fn payment(&self, booking_id: Uuid) -> Option<Payment> {
        self.read(|s| s.payments.get(&booking_id).cloned())
    }

    pub fn discount(&self, discount_id: Uuid) -> Option<Discount> {
        self.read(|s| s.discounts.get(&discount_id).cloned())
    }

    pub fn customer(&self, customer_id: Uuid) -> Option<Customer> {
        self.read(|s| s.customers.get(&customer_id).cloned())
    }

    pub fn audit_for(&self, entity_id: Uuid) -> Vec<NewAuditEntry> {
        self.read(|s| {
            s.audit
                .iter()
                .filter(|e| e.entity_id == entity_id)
                .cloned()
                .collect()
        })
    }

    pub fn set_reserved_until(&self, booking_id: Uuid, until: DateTime<Utc>) {
        self.write(|s| {
            if let Some(b) = s.bookings.get_mut(&booking_id) {
                b.reserved_until = until;
            }
        });
    }

    fn reserve_inner(&self, reservation: &NewReservation) -> Result<(), BookingError> {
        self.write(|s| {
            for (tier_id, requested) in reservation.demand() {
                let tier = s
                    .tiers
                    .get(&tier_id)
                    .filter(|t| t.event_id == reservation.booking.event_id)
                    .ok_or_else(|| BookingError::NotFound(format!("tier {tier_id}")))?;
                let available = availability(tier.stock, s.issued(tier_id));
                if requested > available {
                    return Err(BookingError::InventoryExhausted {
                        tier_id,
                        requested,
                        available,
                    });
                }
            }

            if let Some(discount_id) = reservation.discount_id {
                let discount = s
                    .discounts
                    .get_mut(&discount_id)
                    .ok_or(DiscountError::NotFound)?;
                if !discount.has_uses_left() {
                    return Err(DiscountError::LimitReached.into());
                }
                discount.used_count += 1;
            }

            let booking = &reservation.booking;
            s.bookings.insert(booking.id, booking.clone());
            for ticket in &reservation.tickets {
                s.tickets.insert(ticket.id, ticket.clone());
            }
            s.audit.push(NewAuditEntry::booking_created(
                booking.id,
                "checkout",
                serde_json::json!({
                    "reference": booking.reference.as_str(),
                    "tickets": reservation.tickets.len(),
                    "total": booking.total.cents(),
                }),
            ));
            Ok(())
        })
    }

    fn load_inner(&self, booking_id: Uuid) -> Result<Option<BookingDetails>, BookingError> {
        self.read(|s| {
            let Some(booking) = s.bookings.get(&booking_id).cloned() else {
                return Ok(None);
            };
            let event = s
                .events
                .get(&booking.event_id)
                .cloned()
                .ok_or_else(|| BookingError::NotFound(format!("event {}", booking.event_id)))?;
            let customer = s
                .customers
                .get(&booking.customer_id)
                .cloned()
                .ok_or_else(|| {
                    BookingError::NotFound(format!("customer {}", booking.customer_id))
                })?;
            let mut tickets: Vec<Ticket> = s
                .tickets
                .values()
                .filter(|t| t.booking_id == booking_id)
                .cloned()
                .collect();
            tickets.sort_by(|a, b| a.ticket_number.cmp(&b.ticket_number));
            let tier_names = s
                .tiers
                .values()
                .filter(|t| t.event_id == booking.event_id)
                .map(|t| (t.id, t.category.clone()))
                .collect();
            Ok(Some(BookingDetails {
                payment: s.payments.get(&booking_id).cloned(),
                booking,
                tickets,
                event,
                customer,
                tier_names,
            }))
        })
    }

    fn confirm_inner(
        &self,
        booking_id: Uuid,
        award: &LoyaltyAward,
        now: DateTime<Utc>,
    ) -> Result<ConfirmTransition, BookingError> {
        self.write(|s| {
            let booking = s
                .bookings
                .get_mut(&booking_id)
                .ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;
            match booking.status {
                BookingStatus::Pending => {}
                BookingStatus::Confirmed => return Ok(ConfirmTransition::AlreadyConfirmed),
                other => return Ok(ConfirmTransition::NotPending(other)),
            }
            // payment first: a rejected transition leaves nothing half-confirmed
            if let Some(payment) = s.payments.get_mut(&booking_id) {
                payment.transition_status(PaymentStatus::Completed)?;
                payment.paid_at = Some(now);
            }
            booking.status = BookingStatus::Confirmed;
            booking.updated_at = now;
            let customer_id = booking.customer_id;
            for ticket in s.tickets.values_mut().filter(|t| t.booking_id == booking_id) {
                ticket.is_paid = true;
            }

            let account = s
                .loyalty
                .entry(customer_id)
                .or_insert_with(|| LoyaltyAccount {
                    customer_id,
                    points: 0,
                    last_updated: now,
                    description: String::new(),
                });
            account.points += award.total();
            account.last_updated = now;
            account.description = award.description.clone();

            s.audit.push(NewAuditEntry::booking_transition(
                booking_id,
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                "confirmation",
                serde_json::json!({ "loyalty_points": award.total() }),
            ));
            Ok(ConfirmTransition::Confirmed)
        })
    }
}

impl BookingStore for MemoryStore {
    fn get_event(&self, event_id: Uuid) -> StoreFuture<'_, Option<Event>> {
        ready(Ok(self.read(|s| s.events.get(&event_id).cloned())))
    }

    fn tier_stock(&self, event_id: Uuid) -> StoreFuture<'_, Vec<TierStock>> {
        let mut stock: Vec<TierStock> = self.read(|s| {
            s.tiers
                .values()
                .filter(|t| t.event_id == event_id)
                .map(|t| TierStock {
                    tier: t.clone(),
                    issued: s.issued(t.id),
                })
                .collect()
        });
        stock.sort_by_key(|t| t.tier.id);
        ready(Ok(stock))
    }

    fn tier_availability(&self, tier_id: Uuid) -> StoreFuture<'_, Option<i64>> {
        ready(Ok(self.read(|s| {
            s.tiers
                .get(&tier_id)
                .map(|t| availability(t.stock, s.issued(tier_id)))
        })))
    }

    fn find_discount<'a>(&'a self, code: &'a DiscountCode) -> StoreFuture<'a, Option<Discount>> {
        ready(Ok(self.read(|s| {
            s.discounts.values().find(|d| d.code == *code).cloned()
        })))
    }

    fn get_customer(&self, customer_id: Uuid) -> StoreFuture<'_, Option<Customer>> {
        ready(Ok(self.customer(customer_id)))
    }

    fn set_payment_customer_ref<'a>(
        &'a self,
        customer_id: Uuid,
        customer_ref: &'a str,
    ) -> StoreFuture<'a, ()> {
        ready(self.write(|s| {
            let customer = s
                .customers
                .get_mut(&customer_id)
                .ok_or_else(|| BookingError::NotFound(format!("customer {customer_id}")))?;
            customer.payment_customer_ref = Some(customer_ref.to_string());
            Ok(())
        }))
    }

    fn reserve<'a>(&'a self, reservation: &'a NewReservation) -> StoreFuture<'a, ()> {
        ready(self.reserve_inner(reservation))
    }

    fn attach_payment<'a>(&'a self, payment: &'a Payment) -> StoreFuture<'a, ()> {
        ready(self.write(|s| {
            if !s.bookings.contains_key(&payment.booking_id) {
                return Err(BookingError::NotFound(format!(
                    "booking {}",
                    payment.booking_id
                )));
            }
            s.payments.insert(payment.booking_id, payment.clone());
            Ok(())
        }))
    }

    fn release_reservation<'a>(
        &'a self,
        booking_id: Uuid,
        actor: &'a str,
    ) -> StoreFuture<'a, Option<ReleasedReservation>> {
        ready(Ok(self.write(|s| s.release(booking_id, actor))))
    }

    fn load_booking(&self, booking_id: Uuid) -> StoreFuture<'_, Option<BookingDetails>> {
        ready(self.load_inner(booking_id))
    }

    fn confirm<'a>(
        &'a self,
        booking_id: Uuid,
        award: &'a LoyaltyAward,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, ConfirmTransition> {
        ready(self.confirm_inner(booking_id, award, now))
    }

    fn record_ticket_code<'a>(
        &'a self,
        ticket_id: Uuid,
        storage_ref: &'a str,
    ) -> StoreFuture<'a, bool> {
        ready(Ok(self.write(|s| {
            match s.tickets.get_mut(&ticket_id).filter(|t| t.qr_ref.is_none()) {
                Some(ticket) => {
                    ticket.qr_ref = Some(storage_ref.to_string());
                    true
                }
                None => false,
            }
        })))
    }

    fn cancel(&self, booking_id: Uuid, now: DateTime<Utc>) -> StoreFuture<'_, bool> {
        ready(Ok(self.write(|s| {
            let Some(booking) = s
                .bookings
                .get_mut(&booking_id)
                .filter(|b| b.status == BookingStatus::Confirmed)
            else {
                return false;
            };
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = now;
            for ticket in s.tickets.values_mut().filter(|t| t.booking_id == booking_id) {
                ticket.used = true;
                ticket.used_at = Some(now);
            }
            s.audit.push(NewAuditEntry::booking_transition(
                booking_id,
                BookingStatus::Confirmed,
                BookingStatus::Cancelled,
                "customer",
                serde_json::Value::Null,
            ));
            true
        })))
    }

    fn mark_payment_refunded(&self, booking_id: Uuid) -> StoreFuture<'_, bool> {
        ready(Ok(self.write(|s| {
            let Some(payment) = s.payments.get_mut(&booking_id).filter(|p| {
                matches!(p.status, PaymentStatus::Completed | PaymentStatus::Failed)
            }) else {
                return false;
            };
            payment.status = PaymentStatus::Refunded;
            let entry = NewAuditEntry::payment_refunded(
                payment.id,
                "refund",
                serde_json::json!({ "transaction_id": payment.transaction_id.as_str() }),
            );
            s.audit.push(entry);
            true
        })))
    }

    fn expire_stale(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> StoreFuture<'_, Vec<ReleasedReservation>> {
        ready(Ok(self.write(|s| {
            let mut lapsed: Vec<(DateTime<Utc>, Uuid)> = s
                .bookings
                .values()
                .filter(|b| b.status == BookingStatus::Pending && b.reserved_until < now)
                .map(|b| (b.reserved_until, b.id))
                .collect();
            lapsed.sort();
            lapsed
                .into_iter()
                .take(usize::try_from(limit).unwrap_or(0))
                .filter_map(|(_, id)| s.release(id, "sweeper"))
                .collect()
        })))
    }

    fn loyalty_account(&self, customer_id: Uuid) -> StoreFuture<'_, Option<LoyaltyAccount>> {
        ready(Ok(self.read(|s| s.loyalty.get(&customer_id).cloned())))
    }
}
