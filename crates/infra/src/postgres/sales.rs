use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tillstack_core::{Page, PageRequest, TenantId, UserId};
use tillstack_sales::{Sale, SaleDraft, SaleFilter, SaleId, SaleItem, require_open_register};

use super::cash::{lock_registers, open_register_of, save_totals};
use super::lines::{ItemRow, insert_items, load_items, lock_products, lock_products_any, save_product};
use super::{PostgresPosStore, commit, count, ensure_reference, found, limit_offset, rows};
use crate::error::{map_sqlx_error, unknown_product};
use crate::{SalesStore, StoreError, StoreResult};

const SALE_COLUMNS: &str = "s.id, s.company_id, s.cash_register_id, s.user_id, s.client_id, \
     c.name AS client_name, s.payment_method_id, pm.name AS payment_method_name, \
     s.total, s.date, s.annulled_at";

const SALE_FROM: &str = "FROM sales s \
     LEFT JOIN clients c ON c.id = s.client_id \
     LEFT JOIN payment_methods pm ON pm.id = s.payment_method_id";

impl PostgresPosStore {
    async fn attach_sale_items(&self, sales: &mut [Sale]) -> StoreResult<()> {
        let ids: Vec<Uuid> = sales.iter().map(|s| *s.id.as_uuid()).collect();
        let mut items = load_items(&self.pool, "sale_items", "sale_id", &ids, rows::sale_item).await?;
        for sale in sales {
            sale.items = items.remove(sale.id.as_uuid()).unwrap_or_default();
        }
        Ok(())
    }
}

async fn fetch_sale(conn: &mut PgConnection, tenant: TenantId, id: SaleId, for_update: bool) -> StoreResult<Sale> {
    // FOR UPDATE cannot apply to the nullable side of the joins.
    let lock = if for_update { "FOR UPDATE OF s" } else { "" };
    let row = sqlx::query(&format!(
        "SELECT {SALE_COLUMNS} {SALE_FROM} WHERE s.id = $1 AND s.company_id = $2 {lock}"
    ))
    .bind(id.as_uuid())
    .bind(tenant.as_uuid())
    .fetch_optional(conn)
    .await
    .map_err(|e| map_sqlx_error("fetch_sale", e))?;
    let row = found(row, "sale")?;
    rows::sale(&row).map_err(|e| map_sqlx_error("fetch_sale", e))
}

#[async_trait]
impl SalesStore for PostgresPosStore {
    #[instrument(skip(self, draft), fields(tenant_id = %tenant, lines = draft.lines.len()), err)]
    async fn create_sale(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: SaleDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<Sale> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut register = require_open_register(open_register_of(&mut tx, tenant, true).await?)
            .inspect_err(|e| warn!(error = %e, "sale rejected"))?;

        if let Some(id) = draft.client_id {
            ensure_reference(&mut tx, "clients", tenant, id.as_uuid(), "client_id").await?;
        }
        if let Some(id) = draft.payment_method_id {
            ensure_reference(&mut tx, "payment_methods", tenant, id.as_uuid(), "payment_method_id").await?;
        }

        // Lines are merged, so they are already in lock order.
        let order: Vec<_> = draft.lines.iter().map(|l| l.product_id).collect();
        let mut products = lock_products(&mut tx, tenant, &order).await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = products.get_mut(&line.product_id).ok_or_else(unknown_product)?;
            let item = SaleItem::sell_from(product, line.quantity, now)
                .inspect_err(|e| warn!(error = %e, product_id = %line.product_id, "sale rejected"))?;
            items.push(item);
            save_product(&mut tx, product, now).await?;
        }

        let sale = Sale::record(&mut register, actor, draft, items, now)?;
        save_totals(&mut tx, &register).await?;
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, company_id, cash_register_id, user_id, client_id, payment_method_id, total, date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(sale.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(sale.cash_register_id.as_uuid())
        .bind(actor.as_uuid())
        .bind(sale.client_id.map(|c| *c.as_uuid()))
        .bind(sale.payment_method_id.map(|p| *p.as_uuid()))
        .bind(sale.total.cents())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_sale", e))?;

        let lines = sale
            .items
            .iter()
            .map(|i| ItemRow {
                product_id: &i.product_id,
                product_name: &i.product_name,
                quantity: i.quantity,
                unit_price: i.unit_price,
                subtotal: i.subtotal,
            })
            .collect();
        insert_items(&mut tx, "sale_items", "sale_id", sale.id.as_uuid(), lines).await?;

        // Re-read inside the transaction for the joined names.
        let header = fetch_sale(&mut tx, tenant, sale.id, false).await?;
        commit(tx, "create_sale").await?;

        info!(
            sale_id = %sale.id,
            register_id = %sale.cash_register_id,
            total = %sale.total,
            "sale recorded"
        );
        Ok(Sale {
            client_name: header.client_name,
            payment_method_name: header.payment_method_name,
            ..sale
        })
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn annul_sale(&self, tenant: TenantId, id: SaleId, now: DateTime<Utc>) -> StoreResult<Sale> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut sale = fetch_sale(&mut tx, tenant, id, true).await?;
        let mut registers = lock_registers(&mut tx, tenant, &[*sale.cash_register_id.as_uuid()]).await?;
        let mut register = registers
            .remove(&sale.cash_register_id)
            .ok_or_else(|| StoreError::Database("sale without register".to_string()))?;
        self.attach_sale_items(std::slice::from_mut(&mut sale)).await?;

        sale.annul(&mut register, now)?;
        save_totals(&mut tx, &register).await?;

        // Deleted products still take their stock back.
        let mut products = lock_products_any(&mut tx, &sale.lock_order()).await?;
        for item in &sale.items {
            let product = products
                .get_mut(&item.product_id)
                .ok_or_else(|| StoreError::Database("sale item without product".to_string()))?;
            item.return_to(product, now)?;
        }
        for product in products.values() {
            save_product(&mut tx, product, now).await?;
        }

        sqlx::query("UPDATE sales SET annulled_at = $2 WHERE id = $1")
            .bind(sale.id.as_uuid())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("annul_sale", e))?;

        commit(tx, "annul_sale").await?;
        info!(sale_id = %sale.id, total = %sale.total, "sale annulled");
        Ok(sale)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_sales(
        &self,
        tenant: TenantId,
        filter: SaleFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Sale>> {
        let bounds = filter.bounds()?;
        let (from, until) = bounds.unzip();
        let filter_sql = "WHERE s.company_id = $1 \
             AND ($2::timestamptz IS NULL OR s.date >= $2) \
             AND ($3::timestamptz IS NULL OR s.date < $3)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM sales s {filter_sql}"))
            .bind(tenant.as_uuid())
            .bind(from)
            .bind(until)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_sales", e))?;

        let (limit, offset) = limit_offset(page);
        let records = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} {SALE_FROM} {filter_sql} \
             ORDER BY s.date DESC, s.id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(tenant.as_uuid())
        .bind(from)
        .bind(until)
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sales", e))?;

        let mut sales = rows::all(&records, rows::sale).map_err(|e| map_sqlx_error("list_sales", e))?;
        self.attach_sale_items(&mut sales).await?;
        Ok(Page::new(sales, count(total), page))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_sale(&self, tenant: TenantId, id: SaleId) -> StoreResult<Sale> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        let mut sale = fetch_sale(&mut conn, tenant, id, false).await?;
        self.attach_sale_items(std::slice::from_mut(&mut sale)).await?;
        Ok(sale)
    }
}
