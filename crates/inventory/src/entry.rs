use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, Money, Search, TenantId, UserId, Validator, record_id};
use tillstack_parties::SupplierId;
use tillstack_products::{Margin, Product, ProductId, restock};

record_id!(
    /// Stock entry identifier.
    EntryId
);

/// Goods received into stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub company_id: TenantId,
    pub supplier_id: Option<SupplierId>,
    pub supplier_name: Option<String>,
    pub created_by: UserId,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub total_cost: Money,
    pub items: Vec<EntryItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    /// Purchase price per unit.
    pub unit_price: Money,
    pub subtotal: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    pub items: Vec<NewEntryLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntryLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub purchase_price: Money,
    /// Reprice the product from `purchase_price` and `margin`.
    #[serde(default)]
    pub update_price: bool,
    /// Percent, 0..=100.
    #[serde(default)]
    pub margin: Option<f64>,
}

/// A validated entry, ready to be applied by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub supplier_id: Option<SupplierId>,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub lines: Vec<EntryLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub purchase_price: Money,
    /// Set only when repricing was requested and a margin was given.
    pub reprice: Option<Margin>,
}

impl NewEntry {
    pub fn validated(self) -> DomainResult<EntryDraft> {
        let mut v = Validator::new();
        let notes = normalize_optional(self.notes);
        v.check(!self.items.is_empty(), "items", "must contain at least one item");

        let mut lines = Vec::with_capacity(self.items.len());
        for (i, item) in self.items.into_iter().enumerate() {
            v.quantity(&format!("items.{i}.quantity"), item.quantity)
                .non_negative(&format!("items.{i}.purchase_price"), item.purchase_price);

            let margin = match item.margin {
                Some(pct) => match Margin::from_percent(pct) {
                    Ok(m) => Some(m),
                    Err(_) => {
                        v.check(false, &format!("items.{i}.margin"), "must be between 0 and 100");
                        None
                    }
                },
                None => None,
            };

            lines.push(EntryLine {
                product_id: item.product_id,
                quantity: item.quantity,
                purchase_price: item.purchase_price,
                reprice: margin.filter(|_| item.update_price),
            });
        }
        v.finish()?;

        Ok(EntryDraft {
            supplier_id: self.supplier_id,
            date: self.date,
            notes,
            lines,
        })
    }
}

impl EntryDraft {
    /// Distinct products in row lock order.
    pub fn lock_order(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.lines.iter().map(|l| l.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl EntryLine {
    /// Apply this line to a locked product row and return the stored item.
    pub fn receive(&self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<EntryItem> {
        product.stock = restock(product.stock, self.quantity)?;
        if let Some(margin) = self.reprice {
            product.price = margin.price_from_cost(self.purchase_price)?;
        }
        product.updated_at = now;

        Ok(EntryItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: self.quantity,
            unit_price: self.purchase_price,
            subtotal: self.purchase_price.times(self.quantity)?,
        })
    }
}

impl Entry {
    pub fn record(
        company_id: TenantId,
        created_by: UserId,
        draft: EntryDraft,
        supplier_name: Option<String>,
        items: Vec<EntryItem>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let total_cost = Money::total(items.iter().map(|i| i.subtotal))?;
        Ok(Self {
            id: EntryId::new(),
            company_id,
            supplier_id: draft.supplier_id,
            supplier_name,
            created_by,
            date: draft.date,
            notes: draft.notes,
            total_cost,
            items,
            created_at: now,
        })
    }

    /// List search: supplier name or notes.
    pub fn matches(&self, search: &Search) -> bool {
        search.matches_opt(self.supplier_name.as_deref()) || search.matches_opt(self.notes.as_deref())
    }
}
