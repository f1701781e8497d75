use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use tillstack_core::{Page, Search, TenantId};
use tillstack_parties::SupplierId;
use tillstack_products::{
    Category, CategoryId, CategoryInput, NewProduct, Product, ProductId, ProductUpdate,
    QUICK_SEARCH_LIMIT,
};

use super::{Listing, PostgresPosStore, ensure_reference, found, rows, soft_delete};
use crate::error::map_sqlx_error;
use crate::{ListQuery, ProductStore, StoreResult};

const CATEGORY_COLUMNS: &str = "id, company_id, name, description, color, created_at, updated_at";

pub(super) const PRODUCT_COLUMNS: &str = "id, company_id, sku, name, category_id, supplier_id, \
     stock, price, cost_price, created_at, updated_at";

const CATEGORIES: Listing = Listing {
    columns: CATEGORY_COLUMNS,
    from: "FROM categories WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)",
    order: "name ASC, id ASC",
};

const PRODUCTS: Listing = Listing {
    columns: PRODUCT_COLUMNS,
    from: "FROM products WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)",
    order: "created_at DESC, id DESC",
};

impl PostgresPosStore {
    async fn check_product_refs(
        &self,
        tenant: TenantId,
        category: CategoryId,
        supplier: Option<SupplierId>,
    ) -> StoreResult<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        ensure_reference(&mut conn, "categories", tenant, category.as_uuid(), "category_id").await?;
        if let Some(supplier) = supplier {
            ensure_reference(&mut conn, "suppliers", tenant, supplier.as_uuid(), "supplier_id").await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresPosStore {
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_categories(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Category>> {
        CATEGORIES
            .fetch(&self.pool, tenant, query, rows::category, "list_categories")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_category(&self, tenant: TenantId, id: CategoryId) -> StoreResult<Category> {
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?;
        let row = found(row, "category")?;
        rows::category(&row).map_err(|e| map_sqlx_error("get_category", e))
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn create_category(
        &self,
        tenant: TenantId,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        let category = Category::create(tenant, input.validated()?, now);
        sqlx::query(
            "INSERT INTO categories (id, company_id, name, description, color, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(category.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.color)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_category", e))?;
        Ok(category)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn update_category(
        &self,
        tenant: TenantId,
        id: CategoryId,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category> {
        let input = input.validated()?;
        let row = sqlx::query(&format!(
            "UPDATE categories SET name = $3, description = $4, color = $5, updated_at = $6 \
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.color)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;
        let row = found(row, "category")?;
        rows::category(&row).map_err(|e| map_sqlx_error("update_category", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_category(&self, tenant: TenantId, id: CategoryId, now: DateTime<Utc>) -> StoreResult<()> {
        soft_delete(&self.pool, "categories", tenant, id.as_uuid(), now, "category").await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_products(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Product>> {
        PRODUCTS
            .fetch(&self.pool, tenant, query, rows::product, "list_products")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_product(&self, tenant: TenantId, id: ProductId) -> StoreResult<Product> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;
        let row = found(row, "product")?;
        rows::product(&row).map_err(|e| map_sqlx_error("get_product", e))
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn create_product(
        &self,
        tenant: TenantId,
        input: NewProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let input = input.validated()?;
        self.check_product_refs(tenant, input.category_id, input.supplier_id)
            .await?;
        let product = Product::create(tenant, input, now);
        sqlx::query(
            r#"
            INSERT INTO products (
                id, company_id, sku, name, category_id, supplier_id, stock, price, cost_price,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.category_id.as_uuid())
        .bind(product.supplier_id.map(|s| *s.as_uuid()))
        .bind(product.stock)
        .bind(product.price.cents())
        .bind(product.cost_price.cents())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;
        Ok(product)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn update_product(
        &self,
        tenant: TenantId,
        id: ProductId,
        input: ProductUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Product> {
        let input = input.validated()?;
        self.check_product_refs(tenant, input.category_id, input.supplier_id)
            .await?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET sku = $3, name = $4, category_id = $5, supplier_id = $6, price = $7,
                cost_price = $8, updated_at = $9
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&input.sku)
        .bind(&input.name)
        .bind(input.category_id.as_uuid())
        .bind(input.supplier_id.map(|s| *s.as_uuid()))
        .bind(input.price.cents())
        .bind(input.cost_price.cents())
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        let row = found(row, "product")?;
        rows::product(&row).map_err(|e| map_sqlx_error("update_product", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_product(&self, tenant: TenantId, id: ProductId, now: DateTime<Utc>) -> StoreResult<()> {
        soft_delete(&self.pool, "products", tenant, id.as_uuid(), now, "product").await
    }

    #[instrument(skip(self, term), fields(tenant_id = %tenant, term = term.as_str()), err)]
    async fn quick_search_products(&self, tenant: TenantId, term: &Search) -> StoreResult<Vec<Product>> {
        let records = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE company_id = $1 AND deleted_at IS NULL AND stock > 0
              AND (name ILIKE $2 OR sku ILIKE $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#
        ))
        .bind(tenant.as_uuid())
        .bind(term.like_pattern())
        .bind(QUICK_SEARCH_LIMIT as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("quick_search_products", e))?;
        rows::all(&records, rows::product).map_err(|e| map_sqlx_error("quick_search_products", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn category_products(&self, tenant: TenantId, id: CategoryId) -> StoreResult<Vec<Product>> {
        self.get_category(tenant, id).await?;
        let records = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE company_id = $1 AND category_id = $2 AND deleted_at IS NULL AND stock > 0
            ORDER BY name ASC, id ASC
            "#
        ))
        .bind(tenant.as_uuid())
        .bind(id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("category_products", e))?;
        rows::all(&records, rows::product).map_err(|e| map_sqlx_error("category_products", e))
    }
}
