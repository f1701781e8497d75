//! Row decoding. Column lists live next to each query; these functions only
//! read columns by name.

use std::collections::BTreeMap;

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

use tillstack_cash::{CashRegister, CashRegisterId, Expense, ExpenseId, PaymentMethodTotal};
use tillstack_core::{Money, TenantId, UserId};
use tillstack_documents::{
    DocumentTemplate, DocumentTemplateId, SubmittedDocument, SubmittedDocumentId, TemplateField,
};
use tillstack_inventory::{Entry, EntryId, EntryItem, ExitItem, ProductExit, ProductExitId};
use tillstack_parties::{
    Client, ClientId, Company, PaymentMethod, PaymentMethodId, Supplier, SupplierId,
};
use tillstack_products::{Category, CategoryId, Product, ProductId};
use tillstack_sales::{Sale, SaleId, SaleItem};

type Decoded<T> = Result<T, sqlx::Error>;

fn money(row: &PgRow, column: &str) -> Decoded<Money> {
    Ok(Money::from_cents(row.try_get(column)?))
}

fn opt_money(row: &PgRow, column: &str) -> Decoded<Option<Money>> {
    Ok(row.try_get::<Option<i64>, _>(column)?.map(Money::from_cents))
}

fn tenant(row: &PgRow) -> Decoded<TenantId> {
    Ok(TenantId::from_uuid(row.try_get("company_id")?))
}

fn user(row: &PgRow, column: &str) -> Decoded<UserId> {
    Ok(UserId::from_uuid(row.try_get(column)?))
}

fn opt_id<T>(row: &PgRow, column: &str, make: fn(Uuid) -> T) -> Decoded<Option<T>> {
    Ok(row.try_get::<Option<Uuid>, _>(column)?.map(make))
}

pub(super) fn company(row: &PgRow) -> Decoded<Company> {
    Ok(Company {
        id: TenantId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        nit: row.try_get("nit")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn client(row: &PgRow) -> Decoded<Client> {
    Ok(Client {
        id: ClientId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        identification: row.try_get("identification")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn supplier(row: &PgRow) -> Decoded<Supplier> {
    Ok(Supplier {
        id: SupplierId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        name: row.try_get("name")?,
        contact_name: row.try_get("contact_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        nit: row.try_get("nit")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn payment_method(row: &PgRow) -> Decoded<PaymentMethod> {
    Ok(PaymentMethod {
        id: PaymentMethodId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn category(row: &PgRow) -> Decoded<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn product(row: &PgRow) -> Decoded<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        category_id: CategoryId::from_uuid(row.try_get("category_id")?),
        supplier_id: opt_id(row, "supplier_id", SupplierId::from_uuid)?,
        stock: row.try_get("stock")?,
        price: money(row, "price")?,
        cost_price: money(row, "cost_price")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Entry header; `items` are loaded separately.
pub(super) fn entry(row: &PgRow) -> Decoded<Entry> {
    Ok(Entry {
        id: EntryId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        supplier_id: opt_id(row, "supplier_id", SupplierId::from_uuid)?,
        supplier_name: row.try_get("supplier_name")?,
        created_by: user(row, "created_by")?,
        date: row.try_get("date")?,
        notes: row.try_get("notes")?,
        total_cost: money(row, "total_cost")?,
        items: Vec::new(),
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn entry_item(row: &PgRow) -> Decoded<EntryItem> {
    Ok(EntryItem {
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        unit_price: money(row, "unit_price")?,
        subtotal: money(row, "subtotal")?,
    })
}

pub(super) fn exit(row: &PgRow) -> Decoded<ProductExit> {
    Ok(ProductExit {
        id: ProductExitId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        user_id: user(row, "user_id")?,
        date: row.try_get("date")?,
        reason: row.try_get("reason")?,
        notes: row.try_get("notes")?,
        total: money(row, "total")?,
        items: Vec::new(),
        created_at: row.try_get("created_at")?,
    })
}

pub(super) fn exit_item(row: &PgRow) -> Decoded<ExitItem> {
    Ok(ExitItem {
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        unit_price: money(row, "unit_price")?,
        subtotal: money(row, "subtotal")?,
    })
}

pub(super) fn register(row: &PgRow) -> Decoded<CashRegister> {
    Ok(CashRegister {
        id: CashRegisterId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        user_id: user(row, "user_id")?,
        opened_at: row.try_get("opened_at")?,
        closed_at: row.try_get("closed_at")?,
        opening_amount: money(row, "opening_amount")?,
        closing_amount: opt_money(row, "closing_amount")?,
        total_sales: money(row, "total_sales")?,
        total_expenses: money(row, "total_expenses")?,
        notes: row.try_get("notes")?,
    })
}

pub(super) fn expense(row: &PgRow) -> Decoded<Expense> {
    Ok(Expense {
        id: ExpenseId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        cash_register_id: CashRegisterId::from_uuid(row.try_get("cash_register_id")?),
        user_id: user(row, "user_id")?,
        amount: money(row, "amount")?,
        description: row.try_get("description")?,
        notes: row.try_get("notes")?,
        date: row.try_get("date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Per-method sales count and total of one register.
pub(super) fn method_total(row: &PgRow) -> Decoded<(i64, PaymentMethodTotal)> {
    Ok((
        row.try_get("sales_count")?,
        PaymentMethodTotal {
            payment_method_id: opt_id(row, "payment_method_id", PaymentMethodId::from_uuid)?,
            payment_method_name: row.try_get("payment_method_name")?,
            total: money(row, "total")?,
        },
    ))
}

/// Sale header with joined `client_name` / `payment_method_name`.
pub(super) fn sale(row: &PgRow) -> Decoded<Sale> {
    Ok(Sale {
        id: SaleId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        cash_register_id: CashRegisterId::from_uuid(row.try_get("cash_register_id")?),
        user_id: user(row, "user_id")?,
        client_id: opt_id(row, "client_id", ClientId::from_uuid)?,
        client_name: row.try_get("client_name")?,
        payment_method_id: opt_id(row, "payment_method_id", PaymentMethodId::from_uuid)?,
        payment_method_name: row.try_get("payment_method_name")?,
        total: money(row, "total")?,
        date: row.try_get("date")?,
        annulled_at: row.try_get("annulled_at")?,
        items: Vec::new(),
    })
}

pub(super) fn sale_item(row: &PgRow) -> Decoded<SaleItem> {
    Ok(SaleItem {
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        unit_price: money(row, "unit_price")?,
        subtotal: money(row, "subtotal")?,
    })
}

pub(super) fn template(row: &PgRow) -> Decoded<DocumentTemplate> {
    let Json(fields): Json<Vec<TemplateField>> = row.try_get("fields")?;
    Ok(DocumentTemplate {
        id: DocumentTemplateId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        fields,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn document(row: &PgRow) -> Decoded<SubmittedDocument> {
    let Json(data): Json<BTreeMap<String, String>> = row.try_get("data")?;
    Ok(SubmittedDocument {
        id: SubmittedDocumentId::from_uuid(row.try_get("id")?),
        company_id: tenant(row)?,
        template_id: DocumentTemplateId::from_uuid(row.try_get("template_id")?),
        template_name: row.try_get("template_name")?,
        submitted_by: user(row, "submitted_by")?,
        data,
        created_at: row.try_get("created_at")?,
    })
}

/// Decode every row with `f`.
pub(super) fn all<T>(rows: &[PgRow], f: fn(&PgRow) -> Decoded<T>) -> Decoded<Vec<T>> {
    rows.iter().map(f).collect()
}
