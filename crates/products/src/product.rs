use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::{DomainResult, Money, Search, TenantId, Validator, record_id};
use tillstack_parties::SupplierId;

use crate::CategoryId;

record_id!(
    /// Product identifier.
    ProductId
);

/// Maximum number of rows returned by the quick search.
pub const QUICK_SEARCH_LIMIT: usize = 10;

/// Minimum quick-search term length, in characters.
pub const QUICK_SEARCH_MIN_CHARS: usize = 2;

/// A sellable item.
///
/// `stock` is whole units and never negative; `price` is the authoritative
/// sale price used to price every sale and exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub company_id: TenantId,
    pub sku: String,
    pub name: String,
    pub category_id: CategoryId,
    pub supplier_id: Option<SupplierId>,
    pub stock: i64,
    pub price: Money,
    pub cost_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub stock: i64,
    pub price: Money,
    pub cost_price: Money,
}

/// Input for editing a product. Stock only moves through entries, exits and sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub sku: String,
    pub name: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    pub price: Money,
    pub cost_price: Money,
}

impl NewProduct {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            ..self
        };
        Validator::new()
            .required("sku", &input.sku, 255)
            .required("name", &input.name, 255)
            .check(input.stock >= 0, "stock", "must be zero or greater")
            .non_negative("price", input.price)
            .non_negative("cost_price", input.cost_price)
            .finish()?;
        Ok(input)
    }
}

impl ProductUpdate {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            sku: self.sku.trim().to_string(),
            name: self.name.trim().to_string(),
            ..self
        };
        Validator::new()
            .required("sku", &input.sku, 255)
            .required("name", &input.name, 255)
            .non_negative("price", input.price)
            .non_negative("cost_price", input.cost_price)
            .finish()?;
        Ok(input)
    }
}

impl Product {
    pub fn create(company_id: TenantId, input: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id: ProductId::new(),
            company_id,
            sku: input.sku,
            name: input.name,
            category_id: input.category_id,
            supplier_id: input.supplier_id,
            stock: input.stock,
            price: input.price,
            cost_price: input.cost_price,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, input: ProductUpdate, now: DateTime<Utc>) {
        self.sku = input.sku;
        self.name = input.name;
        self.category_id = input.category_id;
        self.supplier_id = input.supplier_id;
        self.price = input.price;
        self.cost_price = input.cost_price;
        self.updated_at = now;
    }

    /// List search: name or SKU.
    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.name) || search.matches(&self.sku)
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// SKU uniqueness key within a company.
    pub fn same_sku(&self, sku: &str) -> bool {
        self.sku.eq_ignore_ascii_case(sku)
    }
}

/// Parse the quick-search `term`; it must carry at least two characters.
pub fn quick_search_term(raw: Option<&str>) -> DomainResult<Search> {
    match Search::parse(raw) {
        Some(s) if s.char_len() >= QUICK_SEARCH_MIN_CHARS => Ok(s),
        _ => Err(tillstack_core::DomainError::field(
            "term",
            format!("must be at least {QUICK_SEARCH_MIN_CHARS} characters"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use tillstack_core::DomainError;

    use super::*;

    fn new_product() -> NewProduct {
        NewProduct {
            sku: " SKU-001 ".into(),
            name: "Ground coffee 500g".into(),
            category_id: CategoryId::new(),
            supplier_id: None,
            stock: 10,
            price: Money::from_cents(1_250),
            cost_price: Money::from_cents(800),
        }
    }

    #[test]
    fn create_trims_sku_and_keeps_stock() {
        let p = Product::create(TenantId::new(), new_product().validated().unwrap(), Utc::now());
        assert_eq!(p.sku, "SKU-001");
        assert_eq!(p.stock, 10);
        assert!(p.in_stock());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let err = NewProduct {
            stock: -1,
            price: Money::from_cents(-1),
            cost_price: Money::from_cents(-5),
            ..new_product()
        }
        .validated()
        .unwrap_err();
        let DomainError::Validation(e) = err else {
            panic!("expected validation error");
        };
        assert!(e.has("stock"));
        assert!(e.has("price"));
        assert!(e.has("cost_price"));
    }

    #[test]
    fn update_never_touches_stock() {
        let mut p = Product::create(TenantId::new(), new_product().validated().unwrap(), Utc::now());
        let update = ProductUpdate {
            sku: "SKU-002".into(),
            name: "Beans".into(),
            category_id: p.category_id,
            supplier_id: None,
            price: Money::from_cents(1_500),
            cost_price: Money::from_cents(900),
        }
        .validated()
        .unwrap();
        p.apply(update, Utc::now());
        assert_eq!(p.stock, 10);
        assert_eq!(p.price, Money::from_cents(1_500));
    }

    #[test]
    fn quick_search_needs_two_characters() {
        assert!(quick_search_term(Some("c")).is_err());
        assert!(quick_search_term(Some("  ")).is_err());
        assert!(quick_search_term(None).is_err());
        assert_eq!(quick_search_term(Some("Co")).unwrap().as_str(), "co");
    }

    #[test]
    fn list_search_matches_sku() {
        let p = Product::create(TenantId::new(), new_product().validated().unwrap(), Utc::now());
        assert!(p.matches(&Search::parse(Some("sku-0")).unwrap()));
        assert!(p.same_sku("sku-001"));
    }
}
