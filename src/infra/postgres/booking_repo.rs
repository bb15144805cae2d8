use {
    super::{audit_repo::insert_audit_entry, catalog_repo, customer_repo, payment_repo},
    crate::domain::{
        audit::NewAuditEntry,
        booking::{Booking, BookingDetails, BookingStatus, NewReservation, Ticket},
        catalog::availability,
        error::{BookingError, DiscountError},
        id::BookingReference,
        loyalty::LoyaltyAward,
        money::MoneyAmount,
        store::{ConfirmTransition, ReleasedReservation},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

type Tx<'c> = sqlx::Transaction<'c, sqlx::Postgres>;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    customer_id: Uuid,
    event_id: Uuid,
    status: String,
    subtotal: i64,
    discount_amount: i64,
    total: i64,
    discount_id: Option<Uuid>,
    reserved_until: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(r: BookingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            reference: BookingReference::parse(r.reference)?,
            customer_id: r.customer_id,
            event_id: r.event_id,
            status: BookingStatus::try_from(r.status.as_str())?,
            subtotal: MoneyAmount::new(r.subtotal)?,
            discount_amount: MoneyAmount::new(r.discount_amount)?,
            total: MoneyAmount::new(r.total)?,
            discount_id: r.discount_id,
            reserved_until: r.reserved_until,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    booking_id: Uuid,
    tier_id: Uuid,
    ticket_number: String,
    price: i64,
    qr_ref: Option<String>,
    is_paid: bool,
    used: bool,
    used_at: Option<DateTime<Utc>>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = BookingError;

    fn try_from(r: TicketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            booking_id: r.booking_id,
            tier_id: r.tier_id,
            ticket_number: r.ticket_number,
            price: MoneyAmount::new(r.price)?,
            qr_ref: r.qr_ref,
            is_paid: r.is_paid,
            used: r.used,
            used_at: r.used_at,
        })
    }
}

/// Lock the requested tiers in id order, re-check availability against the
/// committed ticket rows, take a discount use, then insert the booking.
pub async fn reserve(pool: &PgPool, reservation: &NewReservation) -> Result<(), BookingError> {
    let booking = &reservation.booking;
    let mut tx = pool.begin().await?;

    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;

    // demand() is sorted by tier id, so concurrent reservations lock in the same order.
    for (tier_id, requested) in reservation.demand() {
        let stock: Option<i64> = sqlx::query_scalar(
            "SELECT stock FROM price_tiers WHERE id = $1 AND event_id = $2 FOR UPDATE",
        )
        .bind(tier_id)
        .bind(booking.event_id)
        .fetch_optional(&mut *tx)
        .await?;
        let stock = stock.ok_or_else(|| BookingError::NotFound(format!("tier {tier_id}")))?;

        let issued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE tier_id = $1")
            .bind(tier_id)
            .fetch_one(&mut *tx)
            .await?;

        let available = availability(stock, issued);
        if requested > available {
            return Err(BookingError::InventoryExhausted {
                tier_id,
                requested,
                available,
            });
        }
    }

    if let Some(discount_id) = reservation.discount_id {
        let taken = sqlx::query(
            r#"
            UPDATE discounts
            SET used_count = used_count + 1
            WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(discount_id)
        .execute(&mut *tx)
        .await?;
        if taken.rows_affected() == 0 {
            return Err(DiscountError::LimitReached.into());
        }
    }

    sqlx::query(
        r#"
        INSERT INTO bookings
            (id, reference, customer_id, event_id, status, subtotal, discount_amount,
             total, discount_id, reserved_until, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(booking.id)
    .bind(booking.reference.as_str())
    .bind(booking.customer_id)
    .bind(booking.event_id)
    .bind(booking.status.as_str())
    .bind(booking.subtotal.cents())
    .bind(booking.discount_amount.cents())
    .bind(booking.total.cents())
    .bind(booking.discount_id)
    .bind(booking.reserved_until)
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(&mut *tx)
    .await?;

    for t in &reservation.tickets {
        sqlx::query(
            r#"
            INSERT INTO tickets (id, booking_id, tier_id, ticket_number, price, is_paid, used)
            VALUES ($1, $2, $3, $4, $5, false, false)
            "#,
        )
        .bind(t.id)
        .bind(t.booking_id)
        .bind(t.tier_id)
        .bind(&t.ticket_number)
        .bind(t.price.cents())
        .execute(&mut *tx)
        .await?;
    }

    let audit = NewAuditEntry::booking_created(
        booking.id,
        "checkout",
        serde_json::json!({
            "reference": booking.reference.as_str(),
            "tickets": reservation.tickets.len(),
            "total": booking.total.cents(),
        }),
    );
    insert_audit_entry(&mut tx, &audit).await?;
    tx.commit().await?;
    Ok(())
}

async fn release(
    tx: &mut Tx<'_>,
    booking_id: Uuid,
    actor: &str,
) -> Result<Option<ReleasedReservation>, BookingError> {
    let row: Option<(Option<Uuid>,)> = sqlx::query_as(
        r#"
        UPDATE bookings
        SET status = 'expired', updated_at = now()
        WHERE id = $1 AND status = 'pending'
        RETURNING discount_id
        "#,
    )
    .bind(booking_id)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((discount_id,)) = row else {
        return Ok(None);
    };

    let deleted = sqlx::query("DELETE FROM tickets WHERE booking_id = $1")
        .bind(booking_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        "UPDATE payments SET status = 'failed', updated_at = now() WHERE booking_id = $1 AND status = 'pending'",
    )
    .bind(booking_id)
    .execute(&mut **tx)
    .await?;

    if let Some(discount_id) = discount_id {
        sqlx::query("UPDATE discounts SET used_count = GREATEST(used_count - 1, 0) WHERE id = $1")
            .bind(discount_id)
            .execute(&mut **tx)
            .await?;
    }

    let tickets_released = deleted.rows_affected();
    let audit = NewAuditEntry::booking_transition(
        booking_id,
        BookingStatus::Pending,
        BookingStatus::Expired,
        actor,
        serde_json::json!({ "tickets_released": tickets_released }),
    );
    insert_audit_entry(tx, &audit).await?;

    Ok(Some(ReleasedReservation {
        booking_id,
        tickets_released,
    }))
}

pub async fn release_reservation(
    pool: &PgPool,
    booking_id: Uuid,
    actor: &str,
) -> Result<Option<ReleasedReservation>, BookingError> {
    let mut tx = pool.begin().await?;
    let released = release(&mut tx, booking_id, actor).await?;
    tx.commit().await?;
    Ok(released)
}

/// Claim lapsed holds with SKIP LOCKED so parallel sweepers never contend.
pub async fn expire_stale(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<ReleasedReservation>, BookingError> {
    let mut tx = pool.begin().await?;

    let ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM bookings
        WHERE status = 'pending' AND reserved_until < $1
        ORDER BY reserved_until
        LIMIT $2
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(&mut *tx)
    .await?;

    let mut released = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(r) = release(&mut tx, id, "sweeper").await? {
            released.push(r);
        }
    }
    tx.commit().await?;
    Ok(released)
}

pub async fn load_booking(
    pool: &PgPool,
    booking_id: Uuid,
) -> Result<Option<BookingDetails>, BookingError> {
    let row = sqlx::query_as::<_, BookingRow>(
        r#"
        SELECT id, reference, customer_id, event_id, status, subtotal, discount_amount,
               total, discount_id, reserved_until, created_at, updated_at
        FROM bookings
        WHERE id = $1
        "#,
    )
    .bind(booking_id)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let booking = Booking::try_from(row)?;

    let tickets = sqlx::query_as::<_, TicketRow>(
        r#"
        SELECT id, booking_id, tier_id, ticket_number, price, qr_ref, is_paid, used, used_at
        FROM tickets
        WHERE booking_id = $1
        ORDER BY ticket_number
        "#,
    )
    .bind(booking_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Ticket::try_from)
    .collect::<Result<Vec<_>, _>>()?;

    let event = catalog_repo::get_event(pool, booking.event_id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("event {}", booking.event_id)))?;
    let customer = customer_repo::get_customer(pool, booking.customer_id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("customer {}", booking.customer_id)))?;
    let payment = payment_repo::find_by_booking(pool, booking_id).await?;
    let tier_names = catalog_repo::tier_names(pool, booking.event_id).await?;

    Ok(Some(BookingDetails {
        booking,
        tickets,
        event,
        customer,
        payment,
        tier_names,
    }))
}

/// Guarded `Pending → Confirmed`. Payment, tickets and loyalty move in the
/// same transaction, so only the winning caller ever applies them.
pub async fn confirm(
    pool: &PgPool,
    booking_id: Uuid,
    award: &LoyaltyAward,
    now: DateTime<Utc>,
) -> Result<ConfirmTransition, BookingError> {
    let mut tx = pool.begin().await?;

    let won: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE bookings
        SET status = 'confirmed', updated_at = $2
        WHERE id = $1 AND status = 'pending'
        RETURNING customer_id
        "#,
    )
    .bind(booking_id)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(customer_id) = won else {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        let status = status.ok_or_else(|| BookingError::NotFound(format!("booking {booking_id}")))?;
        return Ok(match BookingStatus::try_from(status.as_str())? {
            BookingStatus::Confirmed => ConfirmTransition::AlreadyConfirmed,
            other => ConfirmTransition::NotPending(other),
        });
    };

    sqlx::query(
        r#"
        UPDATE payments
        SET status = 'completed', paid_at = $2, updated_at = now()
        WHERE booking_id = $1 AND status = 'pending'
        "#,
    )
    .bind(booking_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE tickets SET is_paid = true WHERE booking_id = $1")
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

    customer_repo::accrue(&mut tx, customer_id, award, now).await?;

    let audit = NewAuditEntry::booking_transition(
        booking_id,
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        "confirmation",
        serde_json::json!({ "loyalty_points": award.total() }),
    );
    insert_audit_entry(&mut tx, &audit).await?;
    tx.commit().await?;
    Ok(ConfirmTransition::Confirmed)
}

pub async fn record_ticket_code(
    pool: &PgPool,
    ticket_id: Uuid,
    storage_ref: &str,
) -> Result<bool, BookingError> {
    let result = sqlx::query("UPDATE tickets SET qr_ref = $2 WHERE id = $1 AND qr_ref IS NULL")
        .bind(ticket_id)
        .bind(storage_ref)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn cancel(pool: &PgPool, booking_id: Uuid, now: DateTime<Utc>) -> Result<bool, BookingError> {
    let mut tx = pool.begin().await?;

    let cancelled = sqlx::query(
        r#"
        UPDATE bookings
        SET status = 'cancelled', updated_at = $2
        WHERE id = $1 AND status = 'confirmed'
        "#,
    )
    .bind(booking_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    if cancelled.rows_affected() == 0 {
        tx.commit().await?;
        return Ok(false);
    }

    sqlx::query("UPDATE tickets SET used = true, used_at = $2 WHERE booking_id = $1")
        .bind(booking_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    let audit = NewAuditEntry::booking_transition(
        booking_id,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        "customer",
        serde_json::Value::Null,
    );
    insert_audit_entry(&mut tx, &audit).await?;
    tx.commit().await?;
    Ok(true)
}
