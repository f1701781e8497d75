//! Store contracts used by the API layer.
//!
//! Every method is scoped to one tenant: records of other companies behave as
//! if they did not exist (`NotFound`). Writes take `now` from the caller so the
//! domain stays clock-free.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillstack_cash::{
    CashRegister, CashRegisterId, CloseRegister, Expense, ExpenseId, ExpenseInput, OpenRegister,
    RegisterSummary,
};
use tillstack_core::{Page, PageRequest, Search, TenantId, UserId};
use tillstack_documents::{
    DocumentTemplate, DocumentTemplateId, RenderedDocument, SubmitDocument, SubmittedDocument,
    SubmittedDocumentId, TemplateInput,
};
use tillstack_inventory::{Entry, EntryDraft, EntryId, ExitDraft, ProductExit, ProductExitId};
use tillstack_parties::{
    Client, ClientId, ClientInput, Company, CompanyProfile, PaymentMethod, PaymentMethodId,
    PaymentMethodInput, Supplier, SupplierId, SupplierInput,
};
use tillstack_products::{
    Category, CategoryId, CategoryInput, NewProduct, Product, ProductId, ProductUpdate,
};
use tillstack_sales::{Sale, SaleDraft, SaleFilter, SaleId};

use crate::StoreResult;

/// Paging plus optional free-text search, shared by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: PageRequest,
    pub search: Option<Search>,
}

impl ListQuery {
    pub fn new(page: PageRequest, search: Option<Search>) -> Self {
        Self { page, search }
    }

    /// Whether `matches` accepts the record (always true without a search).
    pub fn accepts(&self, matches: impl FnOnce(&Search) -> bool) -> bool {
        self.search.as_ref().is_none_or(matches)
    }

    pub(crate) fn like_pattern(&self) -> Option<String> {
        self.search.as_ref().map(Search::like_pattern)
    }
}

#[async_trait]
pub trait CompanyStore: Send + Sync {
    async fn get_company(&self, tenant: TenantId) -> StoreResult<Company>;

    /// Create or update the tenant's profile.
    async fn save_company(
        &self,
        tenant: TenantId,
        profile: CompanyProfile,
        now: DateTime<Utc>,
    ) -> StoreResult<Company>;
}

#[async_trait]
pub trait PartyStore: Send + Sync {
    async fn list_clients(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Client>>;
    async fn get_client(&self, tenant: TenantId, id: ClientId) -> StoreResult<Client>;
    async fn create_client(
        &self,
        tenant: TenantId,
        input: ClientInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Client>;
    async fn update_client(
        &self,
        tenant: TenantId,
        id: ClientId,
        input: ClientInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Client>;
    async fn delete_client(&self, tenant: TenantId, id: ClientId, now: DateTime<Utc>) -> StoreResult<()>;

    async fn list_suppliers(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Supplier>>;
    async fn get_supplier(&self, tenant: TenantId, id: SupplierId) -> StoreResult<Supplier>;
    async fn create_supplier(
        &self,
        tenant: TenantId,
        input: SupplierInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Supplier>;
    async fn update_supplier(
        &self,
        tenant: TenantId,
        id: SupplierId,
        input: SupplierInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Supplier>;
    async fn delete_supplier(&self, tenant: TenantId, id: SupplierId, now: DateTime<Utc>) -> StoreResult<()>;

    async fn list_payment_methods(
        &self,
        tenant: TenantId,
        query: &ListQuery,
    ) -> StoreResult<Page<PaymentMethod>>;
    async fn get_payment_method(&self, tenant: TenantId, id: PaymentMethodId) -> StoreResult<PaymentMethod>;
    async fn create_payment_method(
        &self,
        tenant: TenantId,
        input: PaymentMethodInput,
        now: DateTime<Utc>,
    ) -> StoreResult<PaymentMethod>;
    async fn update_payment_method(
        &self,
        tenant: TenantId,
        id: PaymentMethodId,
        input: PaymentMethodInput,
        now: DateTime<Utc>,
    ) -> StoreResult<PaymentMethod>;
    async fn delete_payment_method(
        &self,
        tenant: TenantId,
        id: PaymentMethodId,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Ordered by name.
    async fn list_categories(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Category>>;
    async fn get_category(&self, tenant: TenantId, id: CategoryId) -> StoreResult<Category>;
    async fn create_category(
        &self,
        tenant: TenantId,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category>;
    async fn update_category(
        &self,
        tenant: TenantId,
        id: CategoryId,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Category>;
    async fn delete_category(&self, tenant: TenantId, id: CategoryId, now: DateTime<Utc>) -> StoreResult<()>;

    async fn list_products(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Product>>;
    async fn get_product(&self, tenant: TenantId, id: ProductId) -> StoreResult<Product>;
    async fn create_product(
        &self,
        tenant: TenantId,
        input: NewProduct,
        now: DateTime<Utc>,
    ) -> StoreResult<Product>;
    async fn update_product(
        &self,
        tenant: TenantId,
        id: ProductId,
        input: ProductUpdate,
        now: DateTime<Utc>,
    ) -> StoreResult<Product>;
    async fn delete_product(&self, tenant: TenantId, id: ProductId, now: DateTime<Utc>) -> StoreResult<()>;

    /// In-stock products whose name or SKU matches, at most
    /// [`tillstack_products::QUICK_SEARCH_LIMIT`].
    async fn quick_search_products(&self, tenant: TenantId, term: &Search) -> StoreResult<Vec<Product>>;

    /// In-stock products of a category, by name.
    async fn category_products(&self, tenant: TenantId, id: CategoryId) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list_entries(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Entry>>;
    async fn get_entry(&self, tenant: TenantId, id: EntryId) -> StoreResult<Entry>;
    async fn create_entry(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: EntryDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<Entry>;

    async fn list_exits(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<ProductExit>>;
    async fn get_exit(&self, tenant: TenantId, id: ProductExitId) -> StoreResult<ProductExit>;
    async fn create_exit(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: ExitDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<ProductExit>;
}

#[async_trait]
pub trait CashStore: Send + Sync {
    async fn open_register(
        &self,
        tenant: TenantId,
        actor: UserId,
        input: OpenRegister,
        now: DateTime<Utc>,
    ) -> StoreResult<CashRegister>;
    async fn current_register(&self, tenant: TenantId) -> StoreResult<Option<RegisterSummary>>;
    async fn register_summary(&self, tenant: TenantId, id: CashRegisterId) -> StoreResult<RegisterSummary>;
    async fn close_register(
        &self,
        tenant: TenantId,
        id: CashRegisterId,
        input: CloseRegister,
        now: DateTime<Utc>,
    ) -> StoreResult<CashRegister>;
    /// Closed registers, newest first.
    async fn register_history(&self, tenant: TenantId, page: PageRequest) -> StoreResult<Page<RegisterSummary>>;

    async fn list_expenses(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Expense>>;
    async fn get_expense(&self, tenant: TenantId, id: ExpenseId) -> StoreResult<Expense>;
    async fn create_expense(
        &self,
        tenant: TenantId,
        actor: UserId,
        input: ExpenseInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense>;
    async fn update_expense(
        &self,
        tenant: TenantId,
        id: ExpenseId,
        input: ExpenseInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense>;
    async fn delete_expense(&self, tenant: TenantId, id: ExpenseId, now: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait SalesStore: Send + Sync {
    async fn create_sale(
        &self,
        tenant: TenantId,
        actor: UserId,
        draft: SaleDraft,
        now: DateTime<Utc>,
    ) -> StoreResult<Sale>;
    async fn annul_sale(&self, tenant: TenantId, id: SaleId, now: DateTime<Utc>) -> StoreResult<Sale>;
    /// Newest first, annulled sales included.
    async fn list_sales(
        &self,
        tenant: TenantId,
        filter: SaleFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Sale>>;
    async fn get_sale(&self, tenant: TenantId, id: SaleId) -> StoreResult<Sale>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_templates(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<DocumentTemplate>>;
    async fn get_template(&self, tenant: TenantId, id: DocumentTemplateId) -> StoreResult<DocumentTemplate>;
    async fn create_template(
        &self,
        tenant: TenantId,
        input: TemplateInput,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate>;
    async fn update_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        input: TemplateInput,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate>;
    async fn delete_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;
    async fn duplicate_template(
        &self,
        tenant: TenantId,
        id: DocumentTemplateId,
        now: DateTime<Utc>,
    ) -> StoreResult<DocumentTemplate>;

    async fn submit_document(
        &self,
        tenant: TenantId,
        actor: UserId,
        template: DocumentTemplateId,
        input: SubmitDocument,
        now: DateTime<Utc>,
    ) -> StoreResult<SubmittedDocument>;
    /// Newest first; search matches the template name.
    async fn list_documents(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<SubmittedDocument>>;
    async fn get_document(&self, tenant: TenantId, id: SubmittedDocumentId) -> StoreResult<RenderedDocument>;
    async fn delete_document(
        &self,
        tenant: TenantId,
        id: SubmittedDocumentId,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;
}

/// Everything the API needs from persistence.
pub trait PosStore:
    CompanyStore + PartyStore + ProductStore + InventoryStore + CashStore + SalesStore + DocumentStore
{
}

impl<T> PosStore for T where
    T: CompanyStore + PartyStore + ProductStore + InventoryStore + CashStore + SalesStore + DocumentStore
{
}
