use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillstack_core::{Page, PageRequest, TenantId, UserId};
use tillstack_sales::{Sale, SaleDraft, SaleFilter, SaleId, SaleItem, require_open_register};

use super::{InMemoryPosStore, Tables, line_product, owned, owned_mut, reference, rows};
use crate::{SalesStore, StoreError, StoreResult};

/// Client and payment method names as they are now, deleted rows included.
fn with_names(t: &Tables, mut sale: Sale) -> Sale {
    sale.client_name = sale
        .client_id
        .and_then(|id| t.clients.get(&id))
        .map(|c| c.record.name.clone());
    sale.payment_method_name = sale
        .payment_method_id
        .and_then(|id| t.payment_methods.get(&id))
        .map(|pm| pm.record.name.clone());
    sale
}

#[async_trait]
impl SalesStore for InMemoryPosStore {
    async fn create_sale(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: SaleDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<Sale> {
        self.write(|t| {
            let open = t
                .registers
                .values()
                .find(|r| r.company_id == tenant && r.is_open())
                .cloned();
            let mut register = require_open_register(open)?;

            if let Some(id) = draft.client_id {
                reference(&t.clients, tenant, &id, "client_id")?;
            }
            if let Some(id) = draft.payment_method_id {
                reference(&t.payment_methods, tenant, &id, "payment_method_id")?;
            }

            let mut items = Vec::with_capacity(draft.lines.len());
            for line in &draft.lines {
                let product = line_product(&mut t.products, tenant, &line.product_id)?;
                items.push(SaleItem::sell_from(product, line.quantity, now)?);
            }

            let sale = Sale::record(&mut register, actor, draft, items, now)?;
            t.registers.insert(register.id, register);
            t.sales.insert(sale.id, sale.clone());
            Ok(with_names(t, sale))
        })
    }

    async fn annul_sale(&self, tenant: TenantId, id: SaleId, now: DateTime<Utc>) -> StoreResult<Sale> {
        self.write(|t| {
            let mut sale = owned(&t.sales, tenant, &id, "sale")?.clone();
            let register = t
                .registers
                .get_mut(&sale.cash_register_id)
                .ok_or_else(|| StoreError::Database("sale without register".to_string()))?;
            sale.annul(register, now)?;

            // Deleted products still take their stock back.
            for item in &sale.items {
                let product = t
                    .products
                    .get_mut(&item.product_id)
                    .ok_or_else(|| StoreError::Database("sale item without product".to_string()))?;
                item.return_to(&mut product.record, now)?;
            }

            *owned_mut(&mut t.sales, tenant, &id, "sale")? = sale.clone();
            Ok(with_names(t, sale))
        })
    }

    async fn list_sales(
        &self,
        tenant: TenantId,
        filter: SaleFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Sale>> {
        let bounds = filter.bounds()?;
        self.read(|t| {
            let rows = rows(&t.sales, tenant)
                .into_iter()
                .filter(|s| bounds.is_none_or(|(from, until)| s.date >= from && s.date < until))
                .map(|s| with_names(t, s))
                .collect();
            Ok(page.slice(rows))
        })
    }

    async fn get_sale(&self, tenant: TenantId, id: SaleId) -> StoreResult<Sale> {
        self.read(|t| {
            let sale = owned(&t.sales, tenant, &id, "sale")?.clone();
            Ok(with_names(t, sale))
        })
    }
}
