use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillstack_core::{Page, TenantId, UserId};
use tillstack_inventory::{Entry, EntryDraft, EntryId, ExitDraft, ExitItem, ProductExit, ProductExitId};

use super::{InMemoryPosStore, Tables, line_product, owned, reference, rows};
use crate::{InventoryStore, ListQuery, StoreResult};

/// Entries show the supplier's current name, deleted suppliers included.
fn with_supplier_name(t: &Tables, mut entry: Entry) -> Entry {
    entry.supplier_name = entry
        .supplier_id
        .and_then(|id| t.suppliers.get(&id))
        .map(|s| s.record.name.clone());
    entry
}

#[async_trait]
impl InventoryStore for InMemoryPosStore {
    async fn list_entries(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Entry>> {
        self.read(|t| {
            let rows = rows(&t.entries, tenant)
                .into_iter()
                .map(|e| with_supplier_name(t, e))
                .filter(|e| query.accepts(|s| e.matches(s)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_entry(&self, tenant: TenantId, id: EntryId) -> StoreResult<Entry> {
        self.read(|t| {
            let entry = owned(&t.entries, tenant, &id, "entry")?.clone();
            Ok(with_supplier_name(t, entry))
        })
    }

    async fn create_entry(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<Entry> {
        self.write(|t| {
            let supplier_name = match draft.supplier_id {
                Some(id) => Some(reference(&t.suppliers, tenant, &id, "supplier_id")?.name.clone()),
                None => None,
            };
            for id in draft.lock_order() {
                line_product(&mut t.products, tenant, &id)?;
            }

            let mut items = Vec::with_capacity(draft.lines.len());
            for line in &draft.lines {
                let product = line_product(&mut t.products, tenant, &line.product_id)?;
                items.push(line.receive(product, now)?);
            }

            let entry = Entry::record(tenant, actor, draft, supplier_name, items, now)?;
            t.entries.insert(entry.id, entry.clone());
            Ok(entry)
        })
    }

    async fn list_exits(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<ProductExit>> {
        self.read(|t| {
            let rows = rows(&t.exits, tenant)
                .into_iter()
                .filter(|e| query.accepts(|s| e.matches(s)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_exit(&self, tenant: TenantId, id: ProductExitId) -> StoreResult<ProductExit> {
        self.read(|t| owned(&t.exits, tenant, &id, "product exit").cloned())
    }

    async fn create_exit(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: ExitDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<ProductExit> {
        self.write(|t| {
            let mut items = Vec::with_capacity(draft.lines.len());
            for line in &draft.lines {
                let product = line_product(&mut t.products, tenant, &line.product_id)?;
                items.push(ExitItem::withdraw_from(product, line.quantity, now)?);
            }

            let exit = ProductExit::record(tenant, actor, draft, items, now)?;
            t.exits.insert(exit.id, exit.clone());
            Ok(exit)
        })
    }
}
