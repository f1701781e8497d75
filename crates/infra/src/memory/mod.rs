//! In-memory store for tests and local development.
//!
//! All tables live behind one mutex. A write clones the tables, runs the
//! operation against the copy and swaps it in only if the operation succeeds,
//! which gives the same all-or-nothing outcome as a database transaction.

mod cash;
mod catalog;
mod documents;
mod inventory;
mod parties;
mod sales;


use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use tillstack_cash::{CashRegister, CashRegisterId, Expense, ExpenseId};
use tillstack_core::{DomainError, TenantId};
use tillstack_documents::{DocumentTemplate, DocumentTemplateId, SubmittedDocument, SubmittedDocumentId};
use tillstack_inventory::{Entry, EntryId, ProductExit, ProductExitId};
use tillstack_parties::{
    Client, ClientId, Company, PaymentMethod, PaymentMethodId, Supplier, SupplierId,
};
use tillstack_products::{Category, CategoryId, Product, ProductId};
use tillstack_sales::{Sale, SaleId};

use crate::{StoreError, StoreResult};

/// In-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct InMemoryPosStore {
    tables: Mutex<Tables>,
}

impl InMemoryPosStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.lock()?;
        f(&guard)
    }

    /// Run `f` against a copy of the tables; commit the copy only on `Ok`.
    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let out = f(&mut staged)?;
        *guard = staged;
        Ok(out)
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    companies: BTreeMap<TenantId, Company>,
    categories: BTreeMap<CategoryId, Stored<Category>>,
    suppliers: BTreeMap<SupplierId, Stored<Supplier>>,
    clients: BTreeMap<ClientId, Stored<Client>>,
    payment_methods: BTreeMap<PaymentMethodId, Stored<PaymentMethod>>,
    products: BTreeMap<ProductId, Stored<Product>>,
    entries: BTreeMap<EntryId, Entry>,
    exits: BTreeMap<ProductExitId, ProductExit>,
    registers: BTreeMap<CashRegisterId, CashRegister>,
    expenses: BTreeMap<ExpenseId, Stored<Expense>>,
    sales: BTreeMap<SaleId, Sale>,
    templates: BTreeMap<DocumentTemplateId, Stored<DocumentTemplate>>,
    documents: BTreeMap<SubmittedDocumentId, Stored<SubmittedDocument>>,
}

/// A soft-deletable row.
#[derive(Debug, Clone)]
struct Stored<T> {
    record: T,
    deleted_at: Option<DateTime<Utc>>,
}

impl<T> Stored<T> {
    fn new(record: T) -> Self {
        Self {
            record,
            deleted_at: None,
        }
    }

    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Tenant ownership and list ordering of a stored record.
trait Owned {
    fn company_id(&self) -> TenantId;
    fn created(&self) -> DateTime<Utc>;
}

macro_rules! owned {
    ($t:ty, $created:ident) => {
        impl Owned for $t {
            fn company_id(&self) -> TenantId {
                self.company_id
            }

            fn created(&self) -> DateTime<Utc> {
                self.$created
            }
        }
    };
}

owned!(Category, created_at);
owned!(Supplier, created_at);
owned!(Client, created_at);
owned!(PaymentMethod, created_at);
owned!(Product, created_at);
owned!(Entry, created_at);
owned!(ProductExit, created_at);
owned!(CashRegister, opened_at);
owned!(Expense, created_at);
owned!(Sale, date);
owned!(DocumentTemplate, created_at);
owned!(SubmittedDocument, created_at);

/// Live row of `tenant`, or `NotFound(entity)`.
fn live<'a, K: Ord, T: Owned>(
    map: &'a BTreeMap<K, Stored<T>>,
    tenant: TenantId,
    id: &K,
    entity: &'static str,
) -> StoreResult<&'a T> {
    map.get(id)
        .filter(|s| s.is_live() && s.record.company_id() == tenant)
        .map(|s| &s.record)
        .ok_or_else(|| DomainError::not_found(entity).into())
}

fn live_mut<'a, K: Ord, T: Owned>(
    map: &'a mut BTreeMap<K, Stored<T>>,
    tenant: TenantId,
    id: &K,
    entity: &'static str,
) -> StoreResult<&'a mut Stored<T>> {
    map.get_mut(id)
        .filter(|s| s.is_live() && s.record.company_id() == tenant)
        .ok_or_else(|| DomainError::not_found(entity).into())
}

/// Row of `tenant` in a table without soft deletion.
fn owned<'a, K: Ord, T: Owned>(
    map: &'a BTreeMap<K, T>,
    tenant: TenantId,
    id: &K,
    entity: &'static str,
) -> StoreResult<&'a T> {
    map.get(id)
        .filter(|r| r.company_id() == tenant)
        .ok_or_else(|| DomainError::not_found(entity).into())
}

fn owned_mut<'a, K: Ord, T: Owned>(
    map: &'a mut BTreeMap<K, T>,
    tenant: TenantId,
    id: &K,
    entity: &'static str,
) -> StoreResult<&'a mut T> {
    map.get_mut(id)
        .filter(|r| r.company_id() == tenant)
        .ok_or_else(|| DomainError::not_found(entity).into())
}

/// A referenced row that must exist for the tenant; reported against `field`.
fn reference<'a, K: Ord, T: Owned>(
    map: &'a BTreeMap<K, Stored<T>>,
    tenant: TenantId,
    id: &K,
    field: &'static str,
) -> StoreResult<&'a T> {
    live(map, tenant, id, field)
        .map_err(|_| DomainError::field(field, "does not exist").into())
}

/// Live product named by a document line, for update.
fn line_product<'a>(
    products: &'a mut BTreeMap<ProductId, Stored<Product>>,
    tenant: TenantId,
    id: &ProductId,
) -> StoreResult<&'a mut Product> {
    live_mut(products, tenant, id, "product")
        .map(|s| &mut s.record)
        .map_err(|_| crate::error::unknown_product())
}

/// Live rows of `tenant`, newest first (ties broken by id, descending).
fn live_rows<K: Ord, T: Owned + Clone>(map: &BTreeMap<K, Stored<T>>, tenant: TenantId) -> Vec<T> {
    let rows = map
        .values()
        .rev()
        .filter(|s| s.is_live() && s.record.company_id() == tenant)
        .map(|s| s.record.clone())
        .collect();
    newest_first(rows)
}

fn rows<K: Ord, T: Owned + Clone>(map: &BTreeMap<K, T>, tenant: TenantId) -> Vec<T> {
    let rows = map
        .values()
        .rev()
        .filter(|r| r.company_id() == tenant)
        .cloned()
        .collect();
    newest_first(rows)
}

fn newest_first<T: Owned>(mut rows: Vec<T>) -> Vec<T> {
    rows.sort_by(|a, b| b.created().cmp(&a.created()));
    rows
}
