use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use uuid::Uuid;

use super::{OrderRepository, RepositoryError, UpdateOutcome};
use crate::config::DatabaseConfig;
use crate::domain::order::{NewOrder, Order, OrderId};
use crate::query::{OrderFilter, Page, PageRequest};

// ============================================================================
// Postgres Order Repository
// ============================================================================
//
// Table layout lives in migrations/. Status is stored as its wire name.
// Updates are conditional on the version the caller read, so two writers
// racing on the same order cannot both succeed.
//
// ============================================================================

const ORDER_COLUMNS: &str =
    "id, owner_id, status, service_id, comment, created_at, last_modified_at, version";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    owner_id: Uuid,
    status: String,
    service_id: i64,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    last_modified_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|_| RepositoryError::CorruptedRow {
            id: row.id,
            reason: format!("unknown status {:?}", row.status),
        })?;

        Ok(Order {
            id: row.id,
            version: row.version,
            owner_id: row.owner_id,
            status,
            service_id: row.service_id,
            comment: row.comment,
            created_at: row.created_at,
            last_modified_at: row.last_modified_at,
        })
    }
}

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and bring the schema up to date
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        tracing::info!(max_connections = config.max_connections, "Connecting to Postgres...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("✅ Order schema migrated");

        Ok(Self::new(pool))
    }

    fn count_query(filter: &OrderFilter) -> QueryBuilder<'static, Postgres> {
        let mut query = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        filter.push_where(&mut query);
        query
    }

    fn select_query(filter: &OrderFilter, page: &PageRequest) -> QueryBuilder<'static, Postgres> {
        let mut query = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        filter.push_where(&mut query);
        page.sort.push_order_by(&mut query);
        page.push_limit_offset(&mut query);
        query
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (owner_id, status, service_id, comment, created_at, last_modified_at, version) \
             VALUES ($1, $2, $3, $4, $5, $5, 1) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.owner_id)
        .bind(order.status.as_str())
        .bind(order.service_id)
        .bind(order.comment)
        .bind(order.created_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(order_id = row.id, "Inserted order row");
        row.try_into()
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Order::try_from).transpose()
    }

    async fn update(&self, order: &Order, expected_version: i64) -> Result<UpdateOutcome, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders \
             SET status = $1, comment = $2, last_modified_at = $3, version = version + 1 \
             WHERE id = $4 AND version = $5 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.status.as_str())
        .bind(order.comment.as_deref())
        .bind(order.last_modified_at)
        .bind(order.id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(UpdateOutcome::Updated(row.try_into()?));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1)")
            .bind(order.id)
            .fetch_one(&self.pool)
            .await?;

        Ok(if exists {
            UpdateOutcome::VersionMismatch
        } else {
            UpdateOutcome::Missing
        })
    }

    async fn find_page(&self, filter: &OrderFilter, page: &PageRequest) -> Result<Page<Order>, RepositoryError> {
        let total: i64 = Self::count_query(filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<OrderRow> = Self::select_query(filter, page)
            .build_query_as::<OrderRow>()
            .fetch_all(&self.pool)
            .await?;

        let content = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(content, page, total.max(0) as u64))
    }
}
