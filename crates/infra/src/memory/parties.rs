use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillstack_core::{DomainError, Page, TenantId};
use tillstack_parties::{
    Client, ClientId, ClientInput, Company, CompanyProfile, PaymentMethod, PaymentMethodId,
    PaymentMethodInput, Supplier, SupplierId, SupplierInput,
};

use super::{InMemoryPosStore, Stored, Tables, live, live_mut, live_rows};
use crate::error::taken;
use crate::{CompanyStore, ListQuery, PartyStore, StoreResult};

#[async_trait]
impl CompanyStore for InMemoryPosStore {
    async fn get_company(&self, tenant: TenantId) -> StoreResult<Company> {
        self.read(|t| {
            t.companies
                .get(&tenant)
                .cloned()
                .ok_or_else(|| DomainError::not_found("company").into())
        })
    }

    async fn save_company(
        &self,
        tenant: TenantId,
        profile: CompanyProfile,
        now: DateTime<Utc>,
    ) -> StoreResult<Company> {
        let profile = profile.validated()?;
        self.write(|t| {
            let clash = t
                .companies
                .values()
                .any(|c| c.id != tenant && c.name.to_lowercase() == profile.name.to_lowercase());
            if clash {
                return Err(taken("company name"));
            }
            let company = match t.companies.get_mut(&tenant) {
                Some(existing) => {
                    existing.apply(profile, now);
                    existing.clone()
                }
                None => {
                    let created = Company::create(tenant, profile, now);
                    t.companies.insert(tenant, created.clone());
                    created
                }
            };
            Ok(company)
        })
    }
}

fn check_client_unique(t: &Tables, tenant: TenantId, id: Option<ClientId>, input: &ClientInput) -> StoreResult<()> {
    for s in t.clients.values() {
        let c = &s.record;
        if !s.is_live() || c.company_id != tenant || Some(c.id) == id {
            continue;
        }
        if c.email == input.email {
            return Err(taken("email"));
        }
        if input.identification.is_some() && c.identification == input.identification {
            return Err(taken("identification"));
        }
    }
    Ok(())
}

fn check_payment_method_unique(
    t: &Tables,
    tenant: TenantId,
    id: Option<PaymentMethodId>,
    name: &str,
) -> StoreResult<()> {
    let clash = t.payment_methods.values().any(|s| {
        s.is_live() && s.record.company_id == tenant && Some(s.record.id) != id && s.record.same_name(name)
    });
    if clash { Err(taken("name")) } else { Ok(()) }
}

#[async_trait]
impl PartyStore for InMemoryPosStore {
    async fn list_clients(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Client>> {
        self.read(|t| {
            let rows = live_rows(&t.clients, tenant)
                .into_iter()
                .filter(|c| query.accepts(|s| c.matches(s)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_client(&self, tenant: TenantId, id: ClientId) -> StoreResult<Client> {
        self.read(|t| live(&t.clients, tenant, &id, "client").cloned())
    }

    async fn create_client(
        &self,
        tenant: TenantId,
        input: ClientInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let input = input.validated()?;
        self.write(|t| {
            check_client_unique(t, tenant, None, &input)?;
            let client = Client::create(tenant, input, now);
            t.clients.insert(client.id, Stored::new(client.clone()));
            Ok(client)
        })
    }

    async fn update_client(
        &self,
        tenant: TenantId,
        id: ClientId,
        input: ClientInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Client> {
        let input = input.validated()?;
        self.write(|t| {
            live(&t.clients, tenant, &id, "client")?;
            check_client_unique(t, tenant, Some(id), &input)?;
            let row = live_mut(&mut t.clients, tenant, &id, "client")?;
            row.record.apply(input, now);
            Ok(row.record.clone())
        })
    }

    async fn delete_client(&self, tenant: TenantId, id: ClientId, now: DateTime<Utc>) -> StoreResult<()> {
        self.write(|t| {
            live_mut(&mut t.clients, tenant, &id, "client")?.deleted_at = Some(now);
            Ok(())
        })
    }

    async fn list_suppliers(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Supplier>> {
        self.read(|t| {
            let rows = live_rows(&t.suppliers, tenant)
                .into_iter()
                .filter(|s| query.accepts(|q| s.matches(q)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_supplier(&self, tenant: TenantId, id: SupplierId) -> StoreResult<Supplier> {
        self.read(|t| live(&t.suppliers, tenant, &id, "supplier").cloned())
    }

    async fn create_supplier(
        &self,
        tenant: TenantId,
        input: SupplierInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Supplier> {
        let input = input.validated()?;
        self.write(|t| {
            let supplier = Supplier::create(tenant, input, now);
            t.suppliers.insert(supplier.id, Stored::new(supplier.clone()));
            Ok(supplier)
        })
    }

    async fn update_supplier(
        &self,
        tenant: TenantId,
        id: SupplierId,
        input: SupplierInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Supplier> {
        let input = input.validated()?;
        self.write(|t| {
            let row = live_mut(&mut t.suppliers, tenant, &id, "supplier")?;
            row.record.apply(input, now);
            Ok(row.record.clone())
        })
    }

    async fn delete_supplier(&self, tenant: TenantId, id: SupplierId, now: DateTime<Utc>) -> StoreResult<()> {
        self.write(|t| {
            live_mut(&mut t.suppliers, tenant, &id, "supplier")?.deleted_at = Some(now);
            Ok(())
        })
    }

    async fn list_payment_methods(
        &self,
        tenant: TenantId,
        query: &ListQuery,
    ) -> StoreResult<Page<PaymentMethod>> {
        self.read(|t| {
            let rows = live_rows(&t.payment_methods, tenant)
                .into_iter()
                .filter(|p| query.accepts(|s| p.matches(s)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_payment_method(&self, tenant: TenantId, id: PaymentMethodId) -> StoreResult<PaymentMethod> {
        self.read(|t| live(&t.payment_methods, tenant, &id, "payment method").cloned())
    }

    async fn create_payment_method(
        &self,
        tenant: TenantId,
        input: PaymentMethodInput,
        now: DateTime<Utc>,
    ) -> StoreResult<PaymentMethod> {
        let input = input.validated()?;
        self.write(|t| {
            check_payment_method_unique(t, tenant, None, &input.name)?;
            let pm = PaymentMethod::create(tenant, input, now);
            t.payment_methods.insert(pm.id, Stored::new(pm.clone()));
            Ok(pm)
        })
    }

    async fn update_payment_method(
        &self,
        tenant: TenantId,
        id: PaymentMethodId,
        input: PaymentMethodInput,
        now: DateTime<Utc>,
    ) -> StoreResult<PaymentMethod> {
        let input = input.validated()?;
        self.write(|t| {
            live(&t.payment_methods, tenant, &id, "payment method")?;
            check_payment_method_unique(t, tenant, Some(id), &input.name)?;
            let row = live_mut(&mut t.payment_methods, tenant, &id, "payment method")?;
            row.record.apply(input, now);
            Ok(row.record.clone())
        })
    }

    async fn delete_payment_method(
        &self,
        tenant: TenantId,
        id: PaymentMethodId,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.write(|t| {
            live_mut(&mut t.payment_methods, tenant, &id, "payment method")?.deleted_at = Some(now);
            Ok(())
        })
    }
}
