use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, Money, Search, TenantId, UserId, Validator, record_id};
use tillstack_products::{Product, ProductId, StockRequest, merge_requests, withdraw};

record_id!(
    /// Product exit identifier.
    ProductExitId
);

/// Stock removed for a reason other than a sale (damage, internal use, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductExit {
    pub id: ProductExitId,
    pub company_id: TenantId,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub reason: String,
    pub notes: Option<String>,
    pub total: Money,
    pub items: Vec<ExitItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    /// Stored product price at the time of the exit.
    pub unit_price: Money,
    pub subtotal: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProductExit {
    pub date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<StockRequest>,
}

/// A validated exit with merged lines in lock order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitDraft {
    pub date: NaiveDate,
    pub reason: String,
    pub notes: Option<String>,
    pub lines: Vec<StockRequest>,
}

impl NewProductExit {
    pub fn validated(self) -> DomainResult<ExitDraft> {
        let reason = self.reason.trim().to_string();
        let notes = normalize_optional(self.notes);

        let mut v = Validator::new();
        v.required("reason", &reason, 255)
            .check(!self.items.is_empty(), "items", "must contain at least one item");
        for (i, item) in self.items.iter().enumerate() {
            v.quantity(&format!("items.{i}.quantity"), item.quantity);
        }
        v.finish()?;

        Ok(ExitDraft {
            date: self.date,
            reason,
            notes,
            lines: merge_requests(self.items)?,
        })
    }
}

impl ExitItem {
    /// Withdraw `quantity` from a locked product row, priced at its stored price.
    pub fn withdraw_from(product: &mut Product, quantity: i64, now: DateTime<Utc>) -> DomainResult<ExitItem> {
        product.stock = withdraw(&product.name, product.stock, quantity)?;
        product.updated_at = now;
        Ok(ExitItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            subtotal: product.price.times(quantity)?,
        })
    }
}

impl ProductExit {
    pub fn record(
        company_id: TenantId,
        user_id: UserId,
        draft: ExitDraft,
        items: Vec<ExitItem>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let total = Money::total(items.iter().map(|i| i.subtotal))?;
        Ok(Self {
            id: ProductExitId::new(),
            company_id,
            user_id,
            date: draft.date,
            reason: draft.reason,
            notes: draft.notes,
            total,
            items,
            created_at: now,
        })
    }

    /// List search: reason or notes.
    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.reason) || search.matches_opt(self.notes.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use tillstack_core::DomainError;
    use tillstack_products::{CategoryId, NewProduct};

    use super::*;

    fn product(stock: i64, price: i64) -> Product {
        Product::create(
            TenantId::new(),
            NewProduct {
                sku: "SKU".into(),
                name: "Bread".into(),
                category_id: CategoryId::new(),
                supplier_id: None,
                stock,
                price: Money::from_cents(price),
                cost_price: Money::from_cents(0),
            },
            Utc::now(),
        )
    }

    fn exit(items: Vec<StockRequest>) -> NewProductExit {
        NewProductExit {
            date: NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
            reason: "Expired".into(),
            notes: None,
            items,
        }
    }

    #[test]
    fn duplicate_lines_are_merged() {
        let id = ProductId::new();
        let draft = exit(vec![
            StockRequest { product_id: id, quantity: 2 },
            StockRequest { product_id: id, quantity: 1 },
        ])
        .validated()
        .unwrap();
        assert_eq!(draft.lines, vec![StockRequest { product_id: id, quantity: 3 }]);
    }

    #[test]
    fn reason_is_required() {
        let err = NewProductExit {
            reason: " ".into(),
            ..exit(vec![StockRequest { product_id: ProductId::new(), quantity: 1 }])
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("reason")));
    }

    #[test]
    fn total_uses_stored_prices() {
        let mut p = product(10, 250);
        let item = ExitItem::withdraw_from(&mut p, 4, Utc::now()).unwrap();
        assert_eq!(p.stock, 6);
        assert_eq!(item.unit_price, Money::from_cents(250));

        let draft = exit(vec![StockRequest { product_id: p.id, quantity: 4 }])
            .validated()
            .unwrap();
        let record = ProductExit::record(p.company_id, UserId::new(), draft, vec![item], Utc::now())
            .unwrap();
        assert_eq!(record.total, Money::from_cents(1_000));
    }

    #[test]
    fn insufficient_stock_leaves_product_untouched() {
        let mut p = product(1, 250);
        let err = ExitItem::withdraw_from(&mut p, 2, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::invariant("insufficient stock for product: Bread"));
        assert_eq!(p.stock, 1);
    }
}
