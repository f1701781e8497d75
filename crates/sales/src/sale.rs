use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tillstack_cash::{CashRegister, CashRegisterId};
use tillstack_core::{DomainError, DomainResult, Money, TenantId, UserId, Validator, record_id};
use tillstack_parties::{ClientId, PaymentMethodId};
use tillstack_products::{Product, ProductId, StockRequest, merge_requests, restock, withdraw};

record_id!(
    /// Sale identifier.
    SaleId
);

/// A completed sale. Never deleted; annulment sets `annulled_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub company_id: TenantId,
    pub cash_register_id: CashRegisterId,
    pub user_id: UserId,
    pub client_id: Option<ClientId>,
    pub client_name: Option<String>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub payment_method_name: Option<String>,
    pub total: Money,
    pub date: DateTime<Utc>,
    pub annulled_at: Option<DateTime<Utc>>,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    /// Stored product price at the time of sale.
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Sale request. Client-side prices are not part of it: every line is priced
/// from the product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    #[serde(default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub payment_method_id: Option<PaymentMethodId>,
    pub items: Vec<StockRequest>,
}

/// Validated sale with merged lines in product lock order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleDraft {
    pub client_id: Option<ClientId>,
    pub payment_method_id: Option<PaymentMethodId>,
    pub lines: Vec<StockRequest>,
}

impl NewSale {
    pub fn validated(self) -> DomainResult<SaleDraft> {
        let mut v = Validator::new();
        v.check(!self.items.is_empty(), "items", "must contain at least one item");
        for (i, item) in self.items.iter().enumerate() {
            v.quantity(&format!("items.{i}.quantity"), item.quantity);
        }
        v.finish()?;

        Ok(SaleDraft {
            client_id: self.client_id,
            payment_method_id: self.payment_method_id,
            lines: merge_requests(self.items)?,
        })
    }
}

/// The company's open register, or the error a sale gets without one.
pub fn require_open_register(current: Option<CashRegister>) -> DomainResult<CashRegister> {
    match current {
        Some(r) if r.is_open() => Ok(r),
        _ => Err(DomainError::invariant("no open cash register")),
    }
}

impl SaleItem {
    /// Take `quantity` out of a locked product row, priced at its stored price.
    pub fn sell_from(product: &mut Product, quantity: i64, now: DateTime<Utc>) -> DomainResult<SaleItem> {
        product.stock = withdraw(&product.name, product.stock, quantity)?;
        product.updated_at = now;
        Ok(SaleItem {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            subtotal: product.price.times(quantity)?,
        })
    }

    /// Put this line's quantity back into a locked product row.
    pub fn return_to(&self, product: &mut Product, now: DateTime<Utc>) -> DomainResult<()> {
        product.stock = restock(product.stock, self.quantity)?;
        product.updated_at = now;
        Ok(())
    }
}

impl Sale {
    /// Build the sale from priced lines and book its total on `register`.
    pub fn record(
        register: &mut CashRegister,
        user_id: UserId,
        draft: SaleDraft,
        items: Vec<SaleItem>,
        now: DateTime<Utc>,
    ) -> DomainResult<Sale> {
        let total = items
            .iter()
            .try_fold(Money::ZERO, |acc, i| acc.checked_add(i.subtotal))?;
        register.record_sale(total)?;

        Ok(Sale {
            id: SaleId::new(),
            company_id: register.company_id,
            cash_register_id: register.id,
            user_id,
            client_id: draft.client_id,
            client_name: None,
            payment_method_id: draft.payment_method_id,
            payment_method_name: None,
            total,
            date: now,
            annulled_at: None,
            items,
        })
    }

    pub fn is_annulled(&self) -> bool {
        self.annulled_at.is_some()
    }

    /// A sale can be annulled once, and only while its register is open.
    pub fn ensure_annullable(&self, register: &CashRegister) -> DomainResult<()> {
        if self.is_annulled() {
            return Err(DomainError::conflict("sale is already annulled"));
        }
        if !register.is_open() {
            return Err(DomainError::invariant(
                "cannot annul a sale whose cash register is closed",
            ));
        }
        Ok(())
    }

    /// Take the total back off the register and mark the sale annulled.
    /// Restocking is done per item with [`SaleItem::return_to`].
    pub fn annul(&mut self, register: &mut CashRegister, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_annullable(register)?;
        register.reverse_sale(self.total)?;
        self.annulled_at = Some(now);
        Ok(())
    }

    /// Distinct products in row lock order.
    pub fn lock_order(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Optional inclusive date range for the sales list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl SaleFilter {
    /// Half-open `[start 00:00, day after end 00:00)` bounds, if a range was given.
    pub fn bounds(&self) -> DomainResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        match (self.start_date, self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => {
                Validator::new()
                    .check(end >= start, "end_date", "must be on or after start_date")
                    .finish()?;
                let from = start.and_time(chrono::NaiveTime::MIN).and_utc();
                let until = end
                    .checked_add_days(Days::new(1))
                    .ok_or_else(|| DomainError::field("end_date", "is out of range"))?
                    .and_time(chrono::NaiveTime::MIN)
                    .and_utc();
                Ok(Some((from, until)))
            }
            (Some(_), None) => Err(DomainError::field("end_date", "is required with start_date")),
            (None, Some(_)) => Err(DomainError::field("start_date", "is required with end_date")),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use tillstack_cash::{CloseRegister, OpenRegister};
    use tillstack_products::{CategoryId, NewProduct};

    use super::*;

    fn product(name: &str, stock: i64, price: i64) -> Product {
        Product::create(
            TenantId::new(),
            NewProduct {
                sku: name.to_uppercase(),
                name: name.into(),
                category_id: CategoryId::new(),
                supplier_id: None,
                stock,
                price: Money::from_cents(price),
                cost_price: Money::ZERO,
            },
            Utc::now(),
        )
    }

    fn register() -> CashRegister {
        CashRegister::open(TenantId::new(), UserId::new(), OpenRegister::default(), Utc::now())
    }

    fn line(product_id: ProductId, quantity: i64) -> StockRequest {
        StockRequest { product_id, quantity }
    }

    fn sell(products: &mut [Product], draft: SaleDraft, register: &mut CashRegister) -> DomainResult<Sale> {
        let now = Utc::now();
        let mut items = Vec::new();
        for l in &draft.lines {
            let p = products
                .iter_mut()
                .find(|p| p.id == l.product_id)
                .ok_or(DomainError::not_found("product"))?;
            items.push(SaleItem::sell_from(p, l.quantity, now)?);
        }
        Sale::record(register, UserId::new(), draft, items, now)
    }

    #[test]
    fn empty_sale_is_rejected() {
        let err = NewSale {
            client_id: None,
            payment_method_id: None,
            items: vec![],
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("items")));
    }

    #[test]
    fn sale_prices_at_stored_price_and_books_register() {
        let mut products = vec![product("coffee", 10, 1_250), product("milk", 3, 300)];
        let (coffee, milk) = (products[0].id, products[1].id);
        let mut r = register();

        let draft = NewSale {
            client_id: None,
            payment_method_id: None,
            items: vec![line(coffee, 2), line(milk, 1), line(coffee, 1)],
        }
        .validated()
        .unwrap();
        let sale = sell(&mut products, draft, &mut r).unwrap();

        assert_eq!(sale.total, Money::from_cents(3 * 1_250 + 300));
        assert_eq!(sale.items.len(), 2);
        assert_eq!(r.total_sales, sale.total);
        assert_eq!(products[0].stock, 7);
        assert_eq!(products[1].stock, 2);
    }

    #[test]
    fn no_open_register_is_an_invariant_violation() {
        assert_eq!(
            require_open_register(None).unwrap_err(),
            DomainError::invariant("no open cash register")
        );
        let mut closed = register();
        closed.close(CloseRegister::default(), Utc::now()).unwrap();
        assert!(require_open_register(Some(closed)).is_err());
    }

    #[test]
    fn annul_once_while_register_open() {
        let mut products = vec![product("tea", 5, 100)];
        let id = products[0].id;
        let mut r = register();
        let draft = NewSale {
            client_id: None,
            payment_method_id: None,
            items: vec![line(id, 2)],
        }
        .validated()
        .unwrap();
        let mut sale = sell(&mut products, draft, &mut r).unwrap();

        for item in &sale.items {
            item.return_to(&mut products[0], Utc::now()).unwrap();
        }
        sale.annul(&mut r, Utc::now()).unwrap();
        assert_eq!(products[0].stock, 5);
        assert_eq!(r.total_sales, Money::ZERO);
        assert!(matches!(sale.annul(&mut r, Utc::now()), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn closed_register_blocks_annulment() {
        let mut products = vec![product("tea", 5, 100)];
        let id = products[0].id;
        let mut r = register();
        let draft = NewSale {
            client_id: None,
            payment_method_id: None,
            items: vec![line(id, 1)],
        }
        .validated()
        .unwrap();
        let mut sale = sell(&mut products, draft, &mut r).unwrap();
        r.close(CloseRegister::default(), Utc::now()).unwrap();

        let err = sale.annul(&mut r, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(!sale.is_annulled());
    }

    #[test]
    fn date_filter_needs_both_ends_in_order() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 8, day).unwrap();
        assert_eq!(SaleFilter::default().bounds(), Ok(None));

        let (from, until) = SaleFilter { start_date: Some(d(1)), end_date: Some(d(1)) }
            .bounds()
            .unwrap()
            .unwrap();
        assert_eq!(until - from, chrono::Duration::days(1));

        assert!(SaleFilter { start_date: Some(d(2)), end_date: Some(d(1)) }.bounds().is_err());
        assert!(SaleFilter { start_date: Some(d(2)), end_date: None }.bounds().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn total_is_sum_of_subtotals(
            prices in prop::collection::vec(0i64..100_000, 1..6),
            picks in prop::collection::vec((0usize..6, 1i64..20), 1..12),
        ) {
            let mut products: Vec<Product> = prices
                .iter()
                .enumerate()
                .map(|(i, p)| product(&format!("p{i}"), 1_000, *p))
                .collect();
            let lines: Vec<StockRequest> = picks
                .iter()
                .map(|(i, q)| line(products[i % products.len()].id, *q))
                .collect();
            let expected: i64 = picks
                .iter()
                .map(|(i, q)| prices[i % prices.len()] * q)
                .sum();

            let mut r = register();
            let draft = NewSale { client_id: None, payment_method_id: None, items: lines }
                .validated()
                .unwrap();
            let sale = sell(&mut products, draft, &mut r).unwrap();

            prop_assert_eq!(sale.total, Money::from_cents(expected));
            prop_assert_eq!(
                sale.total,
                Money::total(sale.items.iter().map(|i| i.unit_price.times(i.quantity).unwrap())).unwrap()
            );
            prop_assert_eq!(r.total_sales, sale.total);
        }

        #[test]
        fn insufficient_line_fails_whole_sale(stock in 0i64..10, extra in 1i64..10) {
            let mut products = vec![product("a", 100, 10), product("b", stock, 10)];
            let (a, b) = (products[0].id, products[1].id);
            let mut r = register();
            let draft = NewSale {
                client_id: None,
                payment_method_id: None,
                items: vec![line(a, 1), line(b, stock + extra)],
            }
            .validated()
            .unwrap();
            let err = sell(&mut products, draft, &mut r).unwrap_err();
            prop_assert!(matches!(err, DomainError::InvariantViolation(_)));
            prop_assert_eq!(r.total_sales, Money::ZERO);
        }
    }
}
