#![allow(dead_code)]

use box_office::domain::BoxFuture;
use box_office::domain::catalog::{Event, PriceTier};
use box_office::domain::customer::Customer;
use box_office::domain::discount::{Discount, DiscountKind};
use box_office::domain::error::BookingError;
use box_office::domain::gateway::{CreatedIntent, IntentRequest, PaymentGateway};
use box_office::domain::id::{DiscountCode, TransactionId};
use box_office::domain::issuance::{Notifier, TicketCodeRequest, TicketCodeStore};
use box_office::domain::loyalty::LoyaltyRules;
use box_office::domain::money::MoneyAmount;
use box_office::domain::pricing::TierSelection;
use box_office::infra::memory::MemoryStore;
use box_office::services::cancellation::CancellationService;
use box_office::services::checkout::{CheckoutConfig, CheckoutReceipt, CheckoutRequest, CheckoutService};
use box_office::services::confirmation::ConfirmationService;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const GATEWAY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

// ── Mock collaborators ─────────────────────────────────────────────────────

/// Deterministic gateway: the intent for booking `b` is `pi_test_{b}`.
#[derive(Default)]
pub struct MockGateway {
    pub fail_intents: AtomicBool,
    pub payments_declined: AtomicBool,
    pub refunds_declined: AtomicBool,
    pub customers_created: AtomicUsize,
    pub intents_created: AtomicUsize,
    pub verifications: AtomicUsize,
    refunds: Mutex<Vec<TransactionId>>,
}

impl MockGateway {
    pub fn refunds(&self) -> Vec<TransactionId> {
        self.refunds.lock().unwrap().clone()
    }
}

pub fn transaction_for(booking_id: Uuid) -> TransactionId {
    TransactionId::new(format!("pi_test_{}", booking_id.simple())).unwrap()
}

impl PaymentGateway for MockGateway {
    fn resolve_customer<'a>(
        &'a self,
        customer: &'a Customer,
    ) -> BoxFuture<'a, Result<String, BookingError>> {
        Box::pin(async move {
            self.customers_created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("cus_test_{}", customer.id.simple()))
        })
    }

    fn create_payment_intent<'a>(
        &'a self,
        request: &'a IntentRequest,
    ) -> BoxFuture<'a, Result<CreatedIntent, BookingError>> {
        Box::pin(async move {
            if self.fail_intents.load(Ordering::SeqCst) {
                return Err(BookingError::Gateway("card network unavailable".into()));
            }
            self.intents_created.fetch_add(1, Ordering::SeqCst);
            let transaction_id = transaction_for(request.booking_id);
            Ok(CreatedIntent {
                client_secret: format!("{transaction_id}_secret"),
                transaction_id,
            })
        })
    }

    fn verify_succeeded<'a>(
        &'a self,
        _transaction_id: &'a TransactionId,
    ) -> BoxFuture<'a, Result<bool, BookingError>> {
        Box::pin(async move {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            Ok(!self.payments_declined.load(Ordering::SeqCst))
        })
    }

    fn refund<'a>(
        &'a self,
        transaction_id: &'a TransactionId,
        _amount: Option<MoneyAmount>,
    ) -> BoxFuture<'a, Result<bool, BookingError>> {
        Box::pin(async move {
            if self.refunds_declined.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.refunds.lock().unwrap().push(transaction_id.clone());
            Ok(true)
        })
    }
}

/// Fails for the ticket numbers in `fail_for`, succeeds otherwise.
#[derive(Default)]
pub struct MockCodeStore {
    pub fail_for: Mutex<HashSet<String>>,
    pub generated: AtomicUsize,
}

impl MockCodeStore {
    pub fn fail_ticket(&self, ticket_number: &str) {
        self.fail_for.lock().unwrap().insert(ticket_number.to_string());
    }

    pub fn heal(&self) {
        self.fail_for.lock().unwrap().clear();
    }
}

impl TicketCodeStore for MockCodeStore {
    fn generate_and_store<'a>(
        &'a self,
        request: &'a TicketCodeRequest,
    ) -> BoxFuture<'a, Result<String, BookingError>> {
        Box::pin(async move {
            let number = &request.payload.ticket_number;
            if self.fail_for.lock().unwrap().contains(number) {
                return Err(BookingError::Issuance(format!("upload failed for {number}")));
            }
            self.generated.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{number}.png"))
        })
    }

    fn display_url(&self, storage_ref: &str) -> String {
        format!("https://codes.test/{storage_ref}")
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Records every message. With `fail` set, sends error out instead.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: AtomicBool,
    pub attempts: AtomicUsize,
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(
        &'a self,
        to: &'a str,
        subject: &'a str,
        html_body: &'a str,
    ) -> BoxFuture<'a, Result<(), BookingError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(BookingError::Gateway("smtp relay unavailable".into()));
            }
            self.sent.lock().unwrap().push(SentMessage {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html_body.to_string(),
            });
            Ok(())
        })
    }
}

// ── Seeded world ───────────────────────────────────────────────────────────

/// One published event 30 days out, one customer, and mock collaborators.
pub struct World {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub codes: Arc<MockCodeStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub event: Event,
    pub customer: Customer,
    pub now: DateTime<Utc>,
}

impl World {
    pub fn new() -> Self {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        let event = Event {
            id: Uuid::new_v4(),
            title: "Night at the Opera".into(),
            venue: "Grand Hall".into(),
            starts_at: now + Duration::days(30),
            sales_end_at: None,
            published: true,
        };
        store.insert_event(event.clone());

        let world = Self {
            store,
            gateway: Arc::new(MockGateway::default()),
            codes: Arc::new(MockCodeStore::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            event,
            customer: placeholder_customer(),
            now,
        };
        let customer = world.add_customer("Ada Lovelace");
        Self { customer, ..world }
    }

    pub fn add_customer(&self, name: &str) -> Customer {
        let id = Uuid::new_v4();
        let customer = Customer {
            id,
            email: format!("{}@example.test", id.simple()),
            name: name.into(),
            payment_customer_ref: None,
        };
        self.store.insert_customer(customer.clone());
        customer
    }

    pub fn add_tier(&self, category: &str, price_cents: i64, stock: i64) -> PriceTier {
        self.add_tier_with(category, price_cents, stock, |_| {})
    }

    pub fn add_tier_with(
        &self,
        category: &str,
        price_cents: i64,
        stock: i64,
        customize: impl FnOnce(&mut PriceTier),
    ) -> PriceTier {
        let mut tier = PriceTier {
            id: Uuid::new_v4(),
            event_id: self.event.id,
            category: category.into(),
            price: MoneyAmount::new(price_cents).unwrap(),
            stock,
            active: true,
            min_per_order: None,
            max_per_order: None,
            valid_from: None,
            valid_to: None,
        };
        customize(&mut tier);
        self.store.insert_tier(tier.clone());
        tier
    }

    pub fn add_discount(&self, code: &str, kind: DiscountKind, usage_limit: Option<i64>) -> Discount {
        let discount = Discount {
            id: Uuid::new_v4(),
            code: DiscountCode::new(code).unwrap(),
            kind,
            active: true,
            valid_from: self.now - Duration::days(1),
            valid_to: self.now + Duration::days(1),
            usage_limit,
            used_count: 0,
            event_id: None,
        };
        self.store.insert_discount(discount.clone());
        discount
    }

    pub fn checkout_service(&self) -> CheckoutService {
        CheckoutService::new(
            self.store.clone(),
            self.gateway.clone(),
            CheckoutConfig {
                gateway_timeout: GATEWAY_TIMEOUT,
                ..CheckoutConfig::default()
            },
        )
    }

    pub fn confirmation_service(&self) -> ConfirmationService {
        ConfirmationService::new(
            self.store.clone(),
            self.gateway.clone(),
            self.codes.clone(),
            self.notifier.clone(),
            LoyaltyRules::default(),
            GATEWAY_TIMEOUT,
        )
    }

    pub fn cancellation_service(&self) -> CancellationService {
        CancellationService::new(self.store.clone(), self.gateway.clone(), GATEWAY_TIMEOUT)
    }

    pub fn request(&self, selections: &[(Uuid, i64)], code: Option<&str>) -> CheckoutRequest {
        self.request_for(self.customer.id, selections, code)
    }

    pub fn request_for(
        &self,
        customer_id: Uuid,
        selections: &[(Uuid, i64)],
        code: Option<&str>,
    ) -> CheckoutRequest {
        CheckoutRequest {
            event_id: self.event.id,
            customer_id,
            selections: selections
                .iter()
                .map(|&(tier_id, quantity)| TierSelection { tier_id, quantity })
                .collect(),
            discount_code: code.map(str::to_string),
        }
    }

    /// Checkout that must succeed.
    pub async fn reserve(&self, selections: &[(Uuid, i64)]) -> CheckoutReceipt {
        self.checkout_service()
            .try_checkout(&self.request(selections, None), self.now)
            .await
            .expect("checkout should succeed")
    }
}

fn placeholder_customer() -> Customer {
    Customer {
        id: Uuid::nil(),
        email: String::new(),
        name: String::new(),
        payment_customer_ref: None,
    }
}
