use {
    crate::domain::{
        customer::{Customer, LoyaltyAccount},
        error::BookingError,
        loyalty::LoyaltyAward,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    email: String,
    name: String,
    payment_customer_ref: Option<String>,
}

#[derive(sqlx::FromRow)]
struct LoyaltyRow {
    customer_id: Uuid,
    points: i64,
    last_updated: DateTime<Utc>,
    description: String,
}

pub async fn get_customer(pool: &PgPool, id: Uuid) -> Result<Option<Customer>, BookingError> {
    let row = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, email, name, payment_customer_ref FROM customers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| Customer {
        id: r.id,
        email: r.email,
        name: r.name,
        payment_customer_ref: r.payment_customer_ref,
    }))
}

pub async fn set_payment_customer_ref(
    pool: &PgPool,
    id: Uuid,
    customer_ref: &str,
) -> Result<(), BookingError> {
    let result = sqlx::query("UPDATE customers SET payment_customer_ref = $2 WHERE id = $1")
        .bind(id)
        .bind(customer_ref)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(BookingError::NotFound(format!("customer {id}")));
    }
    Ok(())
}

/// Add the award to the customer's balance, creating the account on first use.
pub async fn accrue(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    customer_id: Uuid,
    award: &LoyaltyAward,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    sqlx::query(
        r#"
        INSERT INTO loyalty_accounts (customer_id, points, last_updated, description)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (customer_id) DO UPDATE
        SET points = loyalty_accounts.points + EXCLUDED.points,
            last_updated = EXCLUDED.last_updated,
            description = EXCLUDED.description
        "#,
    )
    .bind(customer_id)
    .bind(award.total())
    .bind(now)
    .bind(&award.description)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn loyalty_account(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Option<LoyaltyAccount>, BookingError> {
    let row = sqlx::query_as::<_, LoyaltyRow>(
        r#"
        SELECT customer_id, points, last_updated, description
        FROM loyalty_accounts
        WHERE customer_id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| LoyaltyAccount {
        customer_id: r.customer_id,
        points: r.points,
        last_updated: r.last_updated,
        description: r.description,
    }))
}
