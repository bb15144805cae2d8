use {
    super::audit_repo::insert_audit_entry,
    crate::domain::{
        audit::NewAuditEntry,
        error::BookingError,
        id::TransactionId,
        money::{Currency, Money, MoneyAmount},
        payment::{Payment, PaymentStatus},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    transaction_id: String,
    amount: i64,
    currency: String,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = BookingError;

    fn try_from(r: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            booking_id: r.booking_id,
            transaction_id: TransactionId::new(r.transaction_id)?,
            money: Money::new(
                MoneyAmount::new(r.amount)?,
                Currency::try_from(r.currency.as_str())?,
            ),
            status: PaymentStatus::try_from(r.status.as_str())?,
            paid_at: r.paid_at,
            created_at: r.created_at,
        })
    }
}

pub async fn insert(pool: &PgPool, payment: &Payment) -> Result<(), BookingError> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (id, booking_id, transaction_id, amount, currency, status, paid_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(payment.id)
    .bind(payment.booking_id)
    .bind(payment.transaction_id.as_str())
    .bind(payment.money.amount().cents())
    .bind(payment.money.currency().as_str())
    .bind(payment.status.as_str())
    .bind(payment.paid_at)
    .bind(payment.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_booking(
    pool: &PgPool,
    booking_id: Uuid,
) -> Result<Option<Payment>, BookingError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT id, booking_id, transaction_id, amount, currency, status, paid_at, created_at
        FROM payments
        WHERE booking_id = $1
        "#,
    )
    .bind(booking_id)
    .fetch_optional(pool)
    .await?;

    row.map(Payment::try_from).transpose()
}

/// `Completed | Failed → Refunded`. `false` when the payment is in any other state.
pub async fn mark_refunded(pool: &PgPool, booking_id: Uuid) -> Result<bool, BookingError> {
    let mut tx = pool.begin().await?;

    let row: Option<(Uuid, String)> = sqlx::query_as(
        r#"
        UPDATE payments
        SET status = 'refunded', updated_at = now()
        WHERE booking_id = $1 AND status IN ('completed', 'failed')
        RETURNING id, transaction_id
        "#,
    )
    .bind(booking_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((payment_id, transaction_id)) = row else {
        tx.commit().await?;
        return Ok(false);
    };

    let audit = NewAuditEntry::payment_refunded(
        payment_id,
        "refund",
        serde_json::json!({ "transaction_id": transaction_id, "booking_id": booking_id }),
    );
    insert_audit_entry(&mut tx, &audit).await?;
    tx.commit().await?;
    Ok(true)
}
