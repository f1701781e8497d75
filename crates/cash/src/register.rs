use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainError, DomainResult, Money, TenantId, UserId, Validator, record_id};
use tillstack_parties::PaymentMethodId;

record_id!(
    /// Cash register identifier.
    CashRegisterId
);

/// One register session, from `opened_at` until `closed_at`.
///
/// `total_sales` tracks non-annulled sales and `total_expenses` live expenses;
/// both are maintained in the same transaction as the movement that changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashRegister {
    pub id: CashRegisterId,
    pub company_id: TenantId,
    pub user_id: UserId,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub opening_amount: Money,
    pub closing_amount: Option<Money>,
    pub total_sales: Money,
    pub total_expenses: Money,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRegister {
    pub opening_amount: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseRegister {
    /// Counted cash; when absent the expected amount is recorded.
    #[serde(default)]
    pub closing_amount: Option<Money>,
}

impl OpenRegister {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            opening_amount: self.opening_amount,
            notes: normalize_optional(self.notes),
        };
        Validator::new()
            .non_negative("opening_amount", input.opening_amount)
            .optional("notes", input.notes.as_deref(), 500)
            .finish()?;
        Ok(input)
    }
}

impl CloseRegister {
    pub fn validated(self) -> DomainResult<Self> {
        if let Some(amount) = self.closing_amount {
            Validator::new().non_negative("closing_amount", amount).finish()?;
        }
        Ok(self)
    }
}

/// Refuse to open a second register while `current` is still open.
pub fn ensure_none_open(current: Option<&CashRegister>) -> DomainResult<()> {
    match current {
        Some(r) if r.is_open() => Err(DomainError::conflict("a cash register is already open")),
        _ => Ok(()),
    }
}

impl CashRegister {
    pub fn open(company_id: TenantId, user_id: UserId, input: OpenRegister, now: DateTime<Utc>) -> Self {
        Self {
            id: CashRegisterId::new(),
            company_id,
            user_id,
            opened_at: now,
            closed_at: None,
            opening_amount: input.opening_amount,
            closing_amount: None,
            total_sales: Money::ZERO,
            total_expenses: Money::ZERO,
            notes: input.notes,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn ensure_open(&self) -> DomainResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DomainError::invariant("cash register is closed"))
        }
    }

    /// `opening + sales − expenses`.
    pub fn expected_closing(&self) -> DomainResult<Money> {
        self.opening_amount
            .checked_add(self.total_sales)?
            .checked_sub(self.total_expenses)
    }

    pub fn close(&mut self, input: CloseRegister, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::conflict("cash register is already closed"));
        }
        let closing_amount = match input.closing_amount {
            Some(amount) => amount,
            None => self.expected_closing()?,
        };
        self.closing_amount = Some(closing_amount);
        self.closed_at = Some(now);
        Ok(())
    }

    pub fn record_sale(&mut self, total: Money) -> DomainResult<()> {
        self.ensure_open()?;
        self.total_sales = self.total_sales.checked_add(total)?;
        Ok(())
    }

    pub fn reverse_sale(&mut self, total: Money) -> DomainResult<()> {
        self.ensure_open()?;
        self.total_sales = self.total_sales.checked_sub(total)?;
        Ok(())
    }

    pub fn record_expense(&mut self, amount: Money) -> DomainResult<()> {
        self.ensure_open()?;
        self.total_expenses = self.total_expenses.checked_add(amount)?;
        Ok(())
    }

    pub fn reverse_expense(&mut self, amount: Money) -> DomainResult<()> {
        self.ensure_open()?;
        self.total_expenses = self.total_expenses.checked_sub(amount)?;
        Ok(())
    }
}

/// Sales total for one payment method within a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodTotal {
    pub payment_method_id: Option<PaymentMethodId>,
    pub payment_method_name: Option<String>,
    pub total: Money,
}

/// A register with the breakdown shown on the register screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSummary {
    #[serde(flatten)]
    pub register: CashRegister,
    pub sales_count: u64,
    pub sales_by_payment_method: Vec<PaymentMethodTotal>,
    pub expenses_total: Money,
    pub expected_closing: Money,
}

impl RegisterSummary {
    pub fn new(
        register: CashRegister,
        sales_count: u64,
        sales_by_payment_method: Vec<PaymentMethodTotal>,
        expenses_total: Money,
    ) -> DomainResult<Self> {
        let expected_closing = register.expected_closing()?;
        Ok(Self {
            register,
            sales_count,
            sales_by_payment_method,
            expenses_total,
            expected_closing,
        })
    }
}

/// Group per-sale totals by payment method (sales without one group together).
pub fn group_by_method(
    sales: impl IntoIterator<Item = PaymentMethodTotal>,
) -> DomainResult<Vec<PaymentMethodTotal>> {
    let mut grouped: BTreeMap<Option<PaymentMethodId>, PaymentMethodTotal> = BTreeMap::new();
    for sale in sales {
        match grouped.get_mut(&sale.payment_method_id) {
            Some(group) => group.total = group.total.checked_add(sale.total)?,
            None => {
                grouped.insert(sale.payment_method_id, sale);
            }
        }
    }
    Ok(grouped.into_values().collect())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn open(amount: i64) -> CashRegister {
        CashRegister::open(
            TenantId::new(),
            UserId::new(),
            OpenRegister {
                opening_amount: Money::from_cents(amount),
                notes: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn closing_without_amount_uses_expected_total() {
        let mut r = open(10_000);
        r.record_sale(Money::from_cents(2_500)).unwrap();
        r.record_expense(Money::from_cents(700)).unwrap();
        r.close(CloseRegister::default(), Utc::now()).unwrap();
        assert_eq!(r.closing_amount, Some(Money::from_cents(11_800)));
        assert!(!r.is_open());
    }

    #[test]
    fn declared_amount_wins() {
        let mut r = open(10_000);
        r.close(CloseRegister { closing_amount: Some(Money::from_cents(9_990)) }, Utc::now())
            .unwrap();
        assert_eq!(r.closing_amount, Some(Money::from_cents(9_990)));
    }

    #[test]
    fn closing_twice_conflicts() {
        let mut r = open(0);
        r.close(CloseRegister::default(), Utc::now()).unwrap();
        let err = r.close(CloseRegister::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn closed_register_rejects_movements() {
        let mut r = open(0);
        r.close(CloseRegister::default(), Utc::now()).unwrap();
        assert_eq!(
            r.record_sale(Money::from_cents(1)),
            Err(DomainError::invariant("cash register is closed"))
        );
        assert!(r.reverse_expense(Money::from_cents(1)).is_err());
    }

    #[test]
    fn huge_opening_amount_fails_instead_of_overflowing() {
        let mut r = open(i64::MAX);
        r.record_sale(Money::from_cents(1)).unwrap();
        assert_eq!(r.expected_closing(), Err(DomainError::invariant("amount overflow")));
        assert!(RegisterSummary::new(r.clone(), 1, Vec::new(), Money::ZERO).is_err());

        let err = r.close(CloseRegister::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(r.is_open());

        // A declared amount does not need the computed one.
        r.close(CloseRegister { closing_amount: Some(Money::ZERO) }, Utc::now())
            .unwrap();
        assert!(!r.is_open());
    }

    #[test]
    fn grouping_overflow_is_an_error() {
        let t = |cents| PaymentMethodTotal {
            payment_method_id: None,
            payment_method_name: None,
            total: Money::from_cents(cents),
        };
        assert!(group_by_method([t(i64::MAX), t(1)]).is_err());
    }

    #[test]
    fn only_one_open_register() {
        let r = open(0);
        assert!(matches!(ensure_none_open(Some(&r)), Err(DomainError::Conflict(_))));
        assert!(ensure_none_open(None).is_ok());
    }

    #[test]
    fn negative_opening_amount_is_rejected() {
        let err = OpenRegister {
            opening_amount: Money::from_cents(-1),
            notes: None,
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("opening_amount")));
    }

    #[test]
    fn groups_sales_by_method() {
        let card = PaymentMethodId::new();
        let t = |id: Option<PaymentMethodId>, cents| PaymentMethodTotal {
            payment_method_id: id,
            payment_method_name: id.map(|_| "Card".to_string()),
            total: Money::from_cents(cents),
        };
        let grouped =
            group_by_method([t(Some(card), 100), t(None, 50), t(Some(card), 25)]).unwrap();
        assert_eq!(grouped.len(), 2);
        let card_total = grouped
            .iter()
            .find(|g| g.payment_method_id == Some(card))
            .unwrap()
            .total;
        assert_eq!(card_total, Money::from_cents(125));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn expected_closing_tracks_movements(
            opening in 0i64..1_000_000,
            sales in prop::collection::vec(1i64..100_000, 0..20),
            expenses in prop::collection::vec(1i64..50_000, 0..20),
            annulled in 0usize..20,
        ) {
            let mut r = open(opening);
            for s in &sales {
                r.record_sale(Money::from_cents(*s)).unwrap();
            }
            for e in &expenses {
                r.record_expense(Money::from_cents(*e)).unwrap();
            }
            let annulled = annulled.min(sales.len());
            for s in &sales[..annulled] {
                r.reverse_sale(Money::from_cents(*s)).unwrap();
            }

            let live_sales: i64 = sales[annulled..].iter().sum();
            let spent: i64 = expenses.iter().sum();
            prop_assert_eq!(r.total_sales, Money::from_cents(live_sales));
            prop_assert_eq!(r.expected_closing().unwrap(), Money::from_cents(opening + live_sales - spent));
        }
    }
}
