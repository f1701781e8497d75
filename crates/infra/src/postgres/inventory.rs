use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use tillstack_core::{DomainError, Page, TenantId, UserId};
use tillstack_inventory::{Entry, EntryDraft, EntryId, ExitDraft, ExitItem, ProductExit, ProductExitId};

use super::lines::{ItemRow, insert_items, load_items, lock_products, save_product};
use super::{Listing, PostgresPosStore, commit, found, rows};
use crate::error::{map_sqlx_error, unknown_product};
use crate::{InventoryStore, ListQuery, StoreResult};

const ENTRY_COLUMNS: &str = "e.id, e.company_id, e.supplier_id, s.name AS supplier_name, \
     e.created_by, e.date, e.notes, e.total_cost, e.created_at";

const EXIT_COLUMNS: &str = "id, company_id, user_id, date, reason, notes, total, created_at";

const ENTRIES: Listing = Listing {
    columns: ENTRY_COLUMNS,
    from: "FROM entries e LEFT JOIN suppliers s ON s.id = e.supplier_id \
           WHERE e.company_id = $1 AND ($2::text IS NULL OR s.name ILIKE $2 OR e.notes ILIKE $2)",
    order: "e.created_at DESC, e.id DESC",
};

const EXITS: Listing = Listing {
    columns: EXIT_COLUMNS,
    from: "FROM product_exits WHERE company_id = $1 \
           AND ($2::text IS NULL OR reason ILIKE $2 OR notes ILIKE $2)",
    order: "created_at DESC, id DESC",
};

impl PostgresPosStore {
    async fn attach_entry_items(&self, entries: &mut [Entry]) -> StoreResult<()> {
        let ids: Vec<Uuid> = entries.iter().map(|e| *e.id.as_uuid()).collect();
        let mut items = load_items(&self.pool, "entry_items", "entry_id", &ids, rows::entry_item).await?;
        for entry in entries {
            entry.items = items.remove(entry.id.as_uuid()).unwrap_or_default();
        }
        Ok(())
    }

    async fn attach_exit_items(&self, exits: &mut [ProductExit]) -> StoreResult<()> {
        let ids: Vec<Uuid> = exits.iter().map(|e| *e.id.as_uuid()).collect();
        let mut items = load_items(&self.pool, "product_exit_items", "exit_id", &ids, rows::exit_item).await?;
        for exit in exits {
            exit.items = items.remove(exit.id.as_uuid()).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for PostgresPosStore {
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_entries(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Entry>> {
        let mut page = ENTRIES
            .fetch(&self.pool, tenant, query, rows::entry, "list_entries")
            .await?;
        self.attach_entry_items(&mut page.items).await?;
        Ok(page)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_entry(&self, tenant: TenantId, id: EntryId) -> StoreResult<Entry> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e LEFT JOIN suppliers s ON s.id = e.supplier_id \
             WHERE e.id = $1 AND e.company_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_entry", e))?;
        let row = found(row, "entry")?;
        let mut entry = [rows::entry(&row).map_err(|e| map_sqlx_error("get_entry", e))?];
        self.attach_entry_items(&mut entry).await?;
        let [entry] = entry;
        Ok(entry)
    }

    #[instrument(skip(self, draft), fields(tenant_id = %tenant, lines = draft.lines.len()), err)]
    async fn create_entry(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<Entry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let supplier_name = match draft.supplier_id {
            Some(id) => {
                let name: Option<String> = sqlx::query_scalar(
                    "SELECT name FROM suppliers WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL",
                )
                .bind(id.as_uuid())
                .bind(tenant.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_entry", e))?;
                Some(name.ok_or_else(|| DomainError::field("supplier_id", "does not exist"))?)
            }
            None => None,
        };

        let order = draft.lock_order();
        let mut products = lock_products(&mut tx, tenant, &order).await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = products.get_mut(&line.product_id).ok_or_else(unknown_product)?;
            items.push(line.receive(product, now)?);
        }
        for product in products.values() {
            save_product(&mut tx, product, now).await?;
        }

        let entry = Entry::record(tenant, actor, draft, supplier_name, items, now)?;
        sqlx::query(
            r#"
            INSERT INTO entries (id, company_id, supplier_id, created_by, date, notes, total_cost, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(entry.supplier_id.map(|s| *s.as_uuid()))
        .bind(entry.created_by.as_uuid())
        .bind(entry.date)
        .bind(&entry.notes)
        .bind(entry.total_cost.cents())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_entry", e))?;

        let lines = entry
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
        insert_items(&mut tx, "entry_items", "entry_id", entry.id.as_uuid(), lines).await?;

        commit(tx, "create_entry").await?;
        info!(entry_id = %entry.id, total_cost = %entry.total_cost, "stock entry recorded");
        Ok(entry)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_exits(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<ProductExit>> {
        let mut page = EXITS
            .fetch(&self.pool, tenant, query, rows::exit, "list_exits")
            .await?;
        self.attach_exit_items(&mut page.items).await?;
        Ok(page)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_exit(&self, tenant: TenantId, id: ProductExitId) -> StoreResult<ProductExit> {
        let row = sqlx::query(&format!(
            "SELECT {EXIT_COLUMNS} FROM product_exits WHERE id = $1 AND company_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_exit", e))?;
        let row = found(row, "product exit")?;
        let mut exit = [rows::exit(&row).map_err(|e| map_sqlx_error("get_exit", e))?];
        self.attach_exit_items(&mut exit).await?;
        let [exit] = exit;
        Ok(exit)
    }

    #[instrument(skip(self, draft), fields(tenant_id = %tenant, lines = draft.lines.len()), err)]
    async fn create_exit(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: ExitDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<ProductExit> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lines are merged, so they are already in lock order.
        let order: Vec<_> = draft.lines.iter().map(|l| l.product_id).collect();
        let mut products = lock_products(&mut tx, tenant, &order).await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let product = products.get_mut(&line.product_id).ok_or_else(unknown_product)?;
            items.push(ExitItem::withdraw_from(product, line.quantity, now)?);
            save_product(&mut tx, product, now).await?;
        }

        let exit = ProductExit::record(tenant, actor, draft, items, now)?;
        sqlx::query(
            r#"
            INSERT INTO product_exits (id, company_id, user_id, date, reason, notes, total, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(exit.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(exit.user_id.as_uuid())
        .bind(exit.date)
        .bind(&exit.reason)
        .bind(&exit.notes)
        .bind(exit.total.cents())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_exit", e))?;

        let lines = exit
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
        insert_items(&mut tx, "product_exit_items", "exit_id", exit.id.as_uuid(), lines).await?;

        commit(tx, "create_exit").await?;
        info!(exit_id = %exit.id, total = %exit.total, "product exit recorded");
        Ok(exit)
    }
}
