use {
    crate::domain::{
        catalog::{Event, PriceTier, TierStock, availability},
        discount::{Discount, DiscountKind},
        error::BookingError,
        id::DiscountCode,
        money::MoneyAmount,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    venue: String,
    starts_at: DateTime<Utc>,
    sales_end_at: Option<DateTime<Utc>>,
    published: bool,
}

impl From<EventRow> for Event {
    fn from(r: EventRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            venue: r.venue,
            starts_at: r.starts_at,
            sales_end_at: r.sales_end_at,
            published: r.published,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TierRow {
    id: Uuid,
    event_id: Uuid,
    category: String,
    price: i64,
    stock: i64,
    active: bool,
    min_per_order: Option<i64>,
    max_per_order: Option<i64>,
    valid_from: Option<DateTime<Utc>>,
    valid_to: Option<DateTime<Utc>>,
    issued: i64,
}

impl TryFrom<TierRow> for TierStock {
    type Error = BookingError;

    fn try_from(r: TierRow) -> Result<Self, Self::Error> {
        Ok(Self {
            tier: PriceTier {
                id: r.id,
                event_id: r.event_id,
                category: r.category,
                price: MoneyAmount::new(r.price)?,
                stock: r.stock,
                active: r.active,
                min_per_order: r.min_per_order,
                max_per_order: r.max_per_order,
                valid_from: r.valid_from,
                valid_to: r.valid_to,
            },
            issued: r.issued,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: Uuid,
    code: String,
    kind: String,
    value: i64,
    active: bool,
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
    usage_limit: Option<i64>,
    used_count: i64,
    event_id: Option<Uuid>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = BookingError;

    fn try_from(r: DiscountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            code: DiscountCode::new(&r.code)?,
            kind: DiscountKind::from_parts(&r.kind, r.value)?,
            active: r.active,
            valid_from: r.valid_from,
            valid_to: r.valid_to,
            usage_limit: r.usage_limit,
            used_count: r.used_count,
            event_id: r.event_id,
        })
    }
}

pub async fn get_event(pool: &PgPool, event_id: Uuid) -> Result<Option<Event>, BookingError> {
    let row = sqlx::query_as::<_, EventRow>(
        "SELECT id, title, venue, starts_at, sales_end_at, published FROM events WHERE id = $1",
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Event::from))
}

/// Tiers of an event with live issued counts, ordered by id.
pub async fn tier_stock(pool: &PgPool, event_id: Uuid) -> Result<Vec<TierStock>, BookingError> {
    let rows = sqlx::query_as::<_, TierRow>(
        r#"
        SELECT t.id, t.event_id, t.category, t.price, t.stock, t.active,
               t.min_per_order, t.max_per_order, t.valid_from, t.valid_to,
               (SELECT COUNT(*) FROM tickets k WHERE k.tier_id = t.id) AS issued
        FROM price_tiers t
        WHERE t.event_id = $1
        ORDER BY t.id
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TierStock::try_from).collect()
}

pub async fn tier_availability(pool: &PgPool, tier_id: Uuid) -> Result<Option<i64>, BookingError> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT t.stock, (SELECT COUNT(*) FROM tickets k WHERE k.tier_id = t.id)
        FROM price_tiers t
        WHERE t.id = $1
        "#,
    )
    .bind(tier_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(stock, issued)| availability(stock, issued)))
}

pub async fn tier_names(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Vec<(Uuid, String)>, BookingError> {
    let rows = sqlx::query_as("SELECT id, category FROM price_tiers WHERE event_id = $1")
        .bind(event_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_discount(
    pool: &PgPool,
    code: &DiscountCode,
) -> Result<Option<Discount>, BookingError> {
    let row = sqlx::query_as::<_, DiscountRow>(
        r#"
        SELECT id, code, kind, value, active, valid_from, valid_to,
               usage_limit, used_count, event_id
        FROM discounts
        WHERE code = $1
        "#,
    )
    .bind(code.as_str())
    .fetch_optional(pool)
    .await?;

    row.map(Discount::try_from).transpose()
}
