//! Postgres-backed store.
//!
//! ## Transactions
//!
//! Every operation that touches more than one row runs in a single sqlx
//! `Transaction`. Rows that are read and then changed are locked with
//! `SELECT ... FOR UPDATE`: the cash register first, then products in
//! product-id order, so concurrent sales cannot deadlock on each other.
//! Returning early with `?` drops the transaction, which rolls it back.
//!
//! ## Tenant isolation
//!
//! Every query filters on `company_id`. A row of another company is reported
//! exactly like a missing row.

mod cash;
mod catalog;
mod documents;
mod inventory;
mod lines;
mod parties;
mod rows;
mod sales;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use tillstack_core::{DomainError, Page, PageRequest, TenantId};

use crate::error::map_sqlx_error;
use crate::{ListQuery, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Postgres implementation of every store trait.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresPosStore {
    pool: Arc<PgPool>,
}

impl PostgresPosStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn apply_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        info!("database schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `LIMIT`/`OFFSET` binds for a page request.
fn limit_offset(page: PageRequest) -> (i64, i64) {
    (page.limit() as i64, page.offset() as i64)
}

fn count(total: i64) -> u64 {
    u64::try_from(total).unwrap_or_default()
}

/// Map "no row" to `NotFound(entity)`.
fn found<T>(row: Option<T>, entity: &'static str) -> StoreResult<T> {
    row.ok_or_else(|| DomainError::not_found(entity).into())
}

/// Check that `id` names a live row of `tenant` in `table`; reported on `field`.
///
/// `table` is always one of this module's literal table names.
async fn ensure_reference(
    conn: &mut PgConnection,
    table: &'static str,
    tenant: TenantId,
    id: &Uuid,
    field: &'static str,
) -> StoreResult<()> {
    let sql = format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL)"
    );
    let exists: bool = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(tenant.as_uuid())
        .fetch_one(conn)
        .await
        .map_err(|e| map_sqlx_error("ensure_reference", e))?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::Domain(DomainError::field(field, "does not exist")))
    }
}

/// One searchable list: `from` is a `FROM ... WHERE ...` clause using `$1`
/// for the tenant and `$2` for the optional `ILIKE` pattern.
struct Listing {
    columns: &'static str,
    from: &'static str,
    order: &'static str,
}

impl Listing {
    async fn fetch<T>(
        &self,
        pool: &PgPool,
        tenant: TenantId,
        query: &ListQuery,
        decode: fn(&PgRow) -> Result<T, sqlx::Error>,
        operation: &str,
    ) -> StoreResult<Page<T>> {
        let pattern = query.like_pattern();
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {}", self.from))
            .bind(tenant.as_uuid())
            .bind(&pattern)
            .fetch_one(pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let (limit, offset) = limit_offset(query.page);
        let records = sqlx::query(&format!(
            "SELECT {} {} ORDER BY {} LIMIT $3 OFFSET $4",
            self.columns, self.from, self.order
        ))
        .bind(tenant.as_uuid())
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        let items = rows::all(&records, decode).map_err(|e| map_sqlx_error(operation, e))?;
        Ok(Page::new(items, count(total), query.page))
    }
}

/// Soft-delete a live row of `tenant`; `NotFound(entity)` if there is none.
async fn soft_delete(
    pool: &PgPool,
    table: &'static str,
    tenant: TenantId,
    id: &Uuid,
    now: DateTime<Utc>,
    entity: &'static str,
) -> StoreResult<()> {
    let done = sqlx::query(&format!(
        "UPDATE {table} SET deleted_at = $3 WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
    ))
    .bind(id)
    .bind(tenant.as_uuid())
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| map_sqlx_error("soft_delete", e))?;
    if done.rows_affected() == 0 {
        return Err(DomainError::not_found(entity).into());
    }
    Ok(())
}

/// Commit, mapping failures like any other statement.
async fn commit(tx: sqlx::Transaction<'_, sqlx::Postgres>, operation: &str) -> StoreResult<()> {
    tx.commit().await.map_err(|e| map_sqlx_error(operation, e))
}
