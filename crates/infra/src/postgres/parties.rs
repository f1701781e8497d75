use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use tillstack_core::{Page, TenantId};
use tillstack_parties::{
    Client, ClientId, ClientInput, Company, CompanyProfile, PaymentMethod, PaymentMethodId,
    PaymentMethodInput, Supplier, SupplierId, SupplierInput,
};

use super::{Listing, PostgresPosStore, found, rows, soft_delete};
use crate::error::map_sqlx_error;
use crate::{CompanyStore, ListQuery, PartyStore, StoreResult};

const COMPANY_COLUMNS: &str = "id, name, nit, address, phone, created_at, updated_at";

const CLIENT_COLUMNS: &str =
    "id, company_id, name, email, phone, address, identification, created_at, updated_at";

const SUPPLIER_COLUMNS: &str = "id, company_id, name, contact_name, email, phone, address, nit, \
     notes, created_at, updated_at";

const PAYMENT_METHOD_COLUMNS: &str = "id, company_id, name, created_at, updated_at";

const CLIENTS: Listing = Listing {
    columns: CLIENT_COLUMNS,
    from: "FROM clients WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2 OR identification ILIKE $2)",
    order: "created_at DESC, id DESC",
};

const SUPPLIERS: Listing = Listing {
    columns: SUPPLIER_COLUMNS,
    from: "FROM suppliers WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR name ILIKE $2 OR contact_name ILIKE $2 OR email ILIKE $2)",
    order: "created_at DESC, id DESC",
};

const PAYMENT_METHODS: Listing = Listing {
    columns: PAYMENT_METHOD_COLUMNS,
    from: "FROM payment_methods WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR name ILIKE $2)",
    order: "created_at DESC, id DESC",
};

#[async_trait]
impl CompanyStore for PostgresPosStore {
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_company(&self, tenant: TenantId) -> StoreResult<Company> {
        let row = sqlx::query(&format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"))
            .bind(tenant.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_company", e))?;
        let row = found(row, "company")?;
        rows::company(&row).map_err(|e| map_sqlx_error("get_company", e))
    }

    #[instrument(skip(self, profile), fields(tenant_id = %tenant), err)]
    async fn save_company(
        &self,
        tenant: TenantId,
        profile: CompanyProfile,
        now: DateTime<Utc>,
    ) -> StoreResult<Company> {
        let profile = profile.validated()?;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO companies (id, name, nit, address, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                nit = EXCLUDED.nit,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                updated_at = EXCLUDED.updated_at
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(tenant.as_uuid())
        .bind(&profile.name)
        .bind(&profile.nit)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(now)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_company", e))?;
        rows::company(&row).map_err(|e| map_sqlx_error("save_company", e))
    }
}

#[async_trait]
impl PartyStore for PostgresPosStore {
    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_clients(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Client>> {
        CLIENTS
            .fetch(&self.pool, tenant, query, rows::client, "list_clients")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_client(&self, tenant: TenantId, id: ClientId) -> StoreResult<Client> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_client", e))?;
        let row = found(row, "client")?;
        rows::client(&row).map_err(|e| map_sqlx_error("get_client", e))
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn create_client(
        &self,
        tenant: TenantId,
        input: ClientInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let client = Client::create(tenant, input.validated()?, now);
        sqlx::query(
            r#"
            INSERT INTO clients (id, company_id, name, email, phone, address, identification, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(client.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(&client.identification)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_client", e))?;
        Ok(client)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn update_client(
        &self,
        tenant: TenantId,
        id: ClientId,
        input: ClientInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let input = input.validated()?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE clients
            SET name = $3, email = $4, phone = $5, address = $6, identification = $7, updated_at = $8
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.identification)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_client", e))?;
        let row = found(row, "client")?;
        rows::client(&row).map_err(|e| map_sqlx_error("update_client", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_client(&self, tenant: TenantId, id: ClientId, now: DateTime<Utc>) -> StoreResult<()> {
        soft_delete(&self.pool, "clients", tenant, id.as_uuid(), now, "client").await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_suppliers(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Supplier>> {
        SUPPLIERS
            .fetch(&self.pool, tenant, query, rows::supplier, "list_suppliers")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_supplier(&self, tenant: TenantId, id: SupplierId) -> StoreResult<Supplier> {
        let row = sqlx::query(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_supplier", e))?;
        let row = found(row, "supplier")?;
        rows::supplier(&row).map_err(|e| map_sqlx_error("get_supplier", e))
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn create_supplier(
        &self,
        tenant: TenantId,
        input: SupplierInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Supplier> {
        let supplier = Supplier::create(tenant, input.validated()?, now);
        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, company_id, name, contact_name, email, phone, address, nit, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            "#,
        )
        .bind(supplier.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.nit)
        .bind(&supplier.notes)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_supplier", e))?;
        Ok(supplier)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn update_supplier(
        &self,
        tenant: TenantId,
        id: SupplierId,
        input: SupplierInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Supplier> {
        let input = input.validated()?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE suppliers
            SET name = $3, contact_name = $4, email = $5, phone = $6, address = $7, nit = $8,
                notes = $9, updated_at = $10
            WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&input.name)
        .bind(&input.contact_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.nit)
        .bind(&input.notes)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_supplier", e))?;
        let row = found(row, "supplier")?;
        rows::supplier(&row).map_err(|e| map_sqlx_error("update_supplier", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_supplier(&self, tenant: TenantId, id: SupplierId, now: DateTime<Utc>) -> StoreResult<()> {
        soft_delete(&self.pool, "suppliers", tenant, id.as_uuid(), now, "supplier").await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_payment_methods(
        &self,
        tenant: TenantId,
        query: &ListQuery,
    ) -> StoreResult<Page<PaymentMethod>> {
        PAYMENT_METHODS
            .fetch(&self.pool, tenant, query, rows::payment_method, "list_payment_methods")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_payment_method(&self, tenant: TenantId, id: PaymentMethodId) -> StoreResult<PaymentMethod> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_METHOD_COLUMNS} FROM payment_methods \
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_payment_method", e))?;
        let row = found(row, "payment method")?;
        rows::payment_method(&row).map_err(|e| map_sqlx_error("get_payment_method", e))
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn create_payment_method(
        &self,
        tenant: TenantId,
        input: PaymentMethodInput,
        now: DateTime<Utc>,
    ) -> StoreResult<PaymentMethod> {
        let method = PaymentMethod::create(tenant, input.validated()?, now);
        sqlx::query(
            "INSERT INTO payment_methods (id, company_id, name, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(method.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&method.name)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_payment_method", e))?;
        Ok(method)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn update_payment_method(
        &self,
        tenant: TenantId,
        id: PaymentMethodId,
        input: PaymentMethodInput,
        now: DateTime<Utc>,
    ) -> StoreResult<PaymentMethod> {
        let input = input.validated()?;
        let row = sqlx::query(&format!(
            "UPDATE payment_methods SET name = $3, updated_at = $4 \
             WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL \
             RETURNING {PAYMENT_METHOD_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(&input.name)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_payment_method", e))?;
        let row = found(row, "payment method")?;
        rows::payment_method(&row).map_err(|e| map_sqlx_error("update_payment_method", e))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_payment_method(
        &self,
        tenant: TenantId,
        id: PaymentMethodId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        soft_delete(&self.pool, "payment_methods", tenant, id.as_uuid(), now, "payment method").await
    }
}
