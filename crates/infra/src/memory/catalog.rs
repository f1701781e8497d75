use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillstack_core::{Page, Search, TenantId};
use tillstack_products::{
    Category, CategoryId, CategoryInput, NewProduct, Product, ProductId, ProductUpdate,
    QUICK_SEARCH_LIMIT,
};
use tillstack_parties::SupplierId;

use super::{InMemoryPosStore, Stored, Tables, live, live_mut, live_rows, reference};
use crate::error::taken;
use crate::{ListQuery, ProductStore, StoreResult};

/// Category and supplier of a product must belong to the same company.
fn check_product_refs(
    t: &Tables,
    tenant: TenantId,
    category: CategoryId,
    supplier: Option<SupplierId>,
) -> StoreResult<()> {
    reference(&t.categories, tenant, &category, "category_id")?;
    if let Some(supplier) = supplier {
        reference(&t.suppliers, tenant, &supplier, "supplier_id")?;
    }
    Ok(())
}

fn check_sku_unique(t: &Tables, tenant: TenantId, id: Option<ProductId>, sku: &str) -> StoreResult<()> {
    let clash = t.products.values().any(|s| {
        s.is_live() && s.record.company_id == tenant && Some(s.record.id) != id && s.record.same_sku(sku)
    });
    if clash { Err(taken("sku")) } else { Ok(()) }
}

/// In-stock live products of `tenant` accepted by `keep`.
fn in_stock(t: &Tables, tenant: TenantId, keep: impl Fn(&Product) -> bool) -> Vec<Product> {
    live_rows(&t.products, tenant)
        .into_iter()
        .filter(|p| p.in_stock() && keep(p))
        .collect()
}

#[async_trait]
impl ProductStore for InMemoryPosStore {
    async fn list_categories(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Category>> {
        self.read(|t| {
            let mut rows: Vec<Category> = live_rows(&t.categories, tenant)
                .into_iter()
                .filter(|c| query.accepts(|s| c.matches(s)))
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(query.page.slice(rows))
        })
    }

    async fn get_category(&self, tenant: TenantId, id: CategoryId) -> StoreResult<Category> {
        self.read(|t| live(&t.categories, tenant, &id, "category").cloned())
    }

    async fn create_category(
        &self,
        tenant: TenantId,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        let input = input.validated()?;
        self.write(|t| {
            let category = Category::create(tenant, input, now);
            t.categories.insert(category.id, Stored::new(category.clone()));
            Ok(category)
        })
    }

    async fn update_category(
        &self,
        tenant: TenantId,
        id: CategoryId,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        let input = input.validated()?;
        self.write(|t| {
            let row = live_mut(&mut t.categories, tenant, &id, "category")?;
            row.record.apply(input, now);
            Ok(row.record.clone())
        })
    }

    async fn delete_category(&self, tenant: TenantId, id: CategoryId, now: DateTime<Utc>) -> StoreResult<()> {
        self.write(|t| {
            live_mut(&mut t.categories, tenant, &id, "category")?.deleted_at = Some(now);
            Ok(())
        })
    }

    async fn list_products(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Product>> {
        self.read(|t| {
            let rows = live_rows(&t.products, tenant)
                .into_iter()
                .filter(|p| query.accepts(|s| p.matches(s)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_product(&self, tenant: TenantId, id: ProductId) -> StoreResult<Product> {
        self.read(|t| live(&t.products, tenant, &id, "product").cloned())
    }

    async fn create_product(
        &self,
        tenant: TenantId,
        input: NewProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let input = input.validated()?;
        self.write(|t| {
            check_product_refs(t, tenant, input.category_id, input.supplier_id)?;
            check_sku_unique(t, tenant, None, &input.sku)?;
            let product = Product::create(tenant, input, now);
            t.products.insert(product.id, Stored::new(product.clone()));
            Ok(product)
        })
    }

    async fn update_product(
        &self,
        tenant: TenantId,
        id: ProductId,
        input: ProductUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let input = input.validated()?;
        self.write(|t| {
            live(&t.products, tenant, &id, "product")?;
            check_product_refs(t, tenant, input.category_id, input.supplier_id)?;
            check_sku_unique(t, tenant, Some(id), &input.sku)?;
            let row = live_mut(&mut t.products, tenant, &id, "product")?;
            row.record.apply(input, now);
            Ok(row.record.clone())
        })
    }

    async fn delete_product(&self, tenant: TenantId, id: ProductId, now: DateTime<Utc>) -> StoreResult<()> {
        self.write(|t| {
            live_mut(&mut t.products, tenant, &id, "product")?.deleted_at = Some(now);
            Ok(())
        })
    }

    async fn quick_search_products(&self, tenant: TenantId, term: &Search) -> StoreResult<Vec<Product>> {
        self.read(|t| {
            let mut hits = in_stock(t, tenant, |p| p.matches(term));
            hits.truncate(QUICK_SEARCH_LIMIT);
            Ok(hits)
        })
    }

    async fn category_products(&self, tenant: TenantId, id: CategoryId) -> StoreResult<Vec<Product>> {
        self.read(|t| {
            live(&t.categories, tenant, &id, "category")?;
            let mut products = in_stock(t, tenant, |p| p.category_id == id);
            products.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(products)
        })
    }
}
