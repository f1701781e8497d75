//! Product row locking and item tables shared by sales, entries and exits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use tillstack_core::{Money, TenantId};
use tillstack_products::{Product, ProductId};

use super::catalog::PRODUCT_COLUMNS;
use super::rows;
use crate::StoreResult;
use crate::error::{map_sqlx_error, unknown_product};

/// Lock the live products `ids` of `tenant` in id order.
///
/// `ids` must be sorted and distinct. Any id the company does not have fails
/// the whole operation.
pub(super) async fn lock_products(
    conn: &mut PgConnection,
    tenant: TenantId,
    ids: &[ProductId],
) -> StoreResult<BTreeMap<ProductId, Product>> {
    let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
    let records = sqlx::query(&format!(
        r#"
        SELECT {PRODUCT_COLUMNS} FROM products
        WHERE company_id = $1 AND id = ANY($2) AND deleted_at IS NULL
        ORDER BY id
        FOR UPDATE
        "#
    ))
    .bind(tenant.as_uuid())
    .bind(&uuids)
    .fetch_all(conn)
    .await
    .map_err(|e| map_sqlx_error("lock_products", e))?;

    let products = rows::all(&records, rows::product).map_err(|e| map_sqlx_error("lock_products", e))?;
    if products.len() != ids.len() {
        return Err(unknown_product());
    }
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Lock products for restocking, deleted ones included (annulment).
pub(super) async fn lock_products_any(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> StoreResult<BTreeMap<ProductId, Product>> {
    let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
    let records = sqlx::query(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(&uuids)
    .fetch_all(conn)
    .await
    .map_err(|e| map_sqlx_error("lock_products", e))?;

    let products = rows::all(&records, rows::product).map_err(|e| map_sqlx_error("lock_products", e))?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Write back stock and price of a locked product.
pub(super) async fn save_product(
    conn: &mut PgConnection,
    product: &Product,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    sqlx::query("UPDATE products SET stock = $2, price = $3, updated_at = $4 WHERE id = $1")
        .bind(product.id.as_uuid())
        .bind(product.stock)
        .bind(product.price.cents())
        .bind(now)
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;
    Ok(())
}

/// One stored line of a sale, entry or exit.
pub(super) struct ItemRow<'a> {
    pub product_id: &'a ProductId,
    pub product_name: &'a str,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Insert `items` into `table` under `parent_id`, numbered from 0.
pub(super) async fn insert_items(
    conn: &mut PgConnection,
    table: &'static str,
    parent_column: &'static str,
    parent_id: &Uuid,
    items: Vec<ItemRow<'_>>,
) -> StoreResult<()> {
    let sql = format!(
        "INSERT INTO {table} ({parent_column}, position, product_id, product_name, quantity, unit_price, subtotal) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)"
    );
    for (position, item) in items.into_iter().enumerate() {
        sqlx::query(&sql)
            .bind(parent_id)
            .bind(position as i32)
            .bind(item.product_id.as_uuid())
            .bind(item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .bind(item.subtotal.cents())
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("insert_items", e))?;
    }
    Ok(())
}

/// Items of every parent in `parent_ids`, in stored order, keyed by parent.
pub(super) async fn load_items<T>(
    pool: &PgPool,
    table: &'static str,
    parent_column: &'static str,
    parent_ids: &[Uuid],
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> StoreResult<BTreeMap<Uuid, Vec<T>>> {
    let records = sqlx::query(&format!(
        "SELECT {parent_column} AS parent_id, product_id, product_name, quantity, unit_price, subtotal \
         FROM {table} WHERE {parent_column} = ANY($1) ORDER BY {parent_column}, position"
    ))
    .bind(parent_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_error("load_items", e))?;

    let mut grouped: BTreeMap<Uuid, Vec<T>> = BTreeMap::new();
    for record in &records {
        let parent: Uuid = record
            .try_get("parent_id")
            .map_err(|e| map_sqlx_error("load_items", e))?;
        let item = decode(record).map_err(|e| map_sqlx_error("load_items", e))?;
        grouped.entry(parent).or_default().push(item);
    }
    Ok(grouped)
}
