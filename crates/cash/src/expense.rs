use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillstack_core::validate::normalize_optional;
use tillstack_core::{DomainResult, Money, Search, TenantId, UserId, Validator, record_id};

use crate::{CashRegister, CashRegisterId};

record_id!(
    /// Expense identifier.
    ExpenseId
);

/// Money paid out of an open register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub company_id: TenantId,
    pub cash_register_id: CashRegisterId,
    pub user_id: UserId,
    pub amount: Money,
    pub description: String,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseInput {
    pub cash_register_id: CashRegisterId,
    pub amount: Money,
    pub description: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ExpenseInput {
    pub fn validated(self) -> DomainResult<Self> {
        let input = Self {
            cash_register_id: self.cash_register_id,
            amount: self.amount,
            description: self.description.trim().to_string(),
            notes: normalize_optional(self.notes),
        };
        Validator::new()
            .positive("amount", input.amount)
            .required("description", &input.description, 255)
            .optional("notes", input.notes.as_deref(), 500)
            .finish()?;
        Ok(input)
    }
}

impl Expense {
    /// Record a new expense against `register`, which must be open and match
    /// `input.cash_register_id`.
    pub fn post(
        register: &mut CashRegister,
        user_id: UserId,
        input: ExpenseInput,
        now: DateTime<Utc>,
    ) -> DomainResult<Expense> {
        register.record_expense(input.amount)?;
        Ok(Self {
            id: ExpenseId::new(),
            company_id: register.company_id,
            cash_register_id: register.id,
            user_id,
            amount: input.amount,
            description: input.description,
            notes: input.notes,
            date: now,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move the amount off `current` and onto `target` (`None` when the
    /// register is unchanged). Both registers must be open.
    pub fn rebook(
        &mut self,
        input: ExpenseInput,
        current: &mut CashRegister,
        target: Option<&mut CashRegister>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        current.ensure_open()?;
        match target {
            Some(target) => {
                target.ensure_open()?;
                current.reverse_expense(self.amount)?;
                target.record_expense(input.amount)?;
                self.cash_register_id = target.id;
            }
            None => {
                current.reverse_expense(self.amount)?;
                current.record_expense(input.amount)?;
            }
        }
        self.amount = input.amount;
        self.description = input.description;
        self.notes = input.notes;
        self.updated_at = now;
        Ok(())
    }

    /// Take the amount back off its register before soft deletion.
    pub fn revert(&self, register: &mut CashRegister) -> DomainResult<()> {
        register.reverse_expense(self.amount)
    }

    pub fn matches(&self, search: &Search) -> bool {
        search.matches(&self.description) || search.matches_opt(self.notes.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use tillstack_core::DomainError;

    use super::*;
    use crate::{CloseRegister, OpenRegister};

    fn register() -> CashRegister {
        CashRegister::open(
            TenantId::new(),
            UserId::new(),
            OpenRegister::default(),
            Utc::now(),
        )
    }

    fn input(register: &CashRegister, cents: i64) -> ExpenseInput {
        ExpenseInput {
            cash_register_id: register.id,
            amount: Money::from_cents(cents),
            description: "Cleaning supplies".into(),
            notes: None,
        }
    }

    #[test]
    fn amount_must_be_positive() {
        let r = register();
        let err = input(&r, 0).validated().unwrap_err();
        assert!(matches!(err, DomainError::Validation(e) if e.has("amount")));
    }

    #[test]
    fn post_and_revert_keep_total_in_sync() {
        let mut r = register();
        let inp = input(&r, 1_500);
        let e = Expense::post(&mut r, UserId::new(), inp, Utc::now()).unwrap();
        assert_eq!(r.total_expenses, Money::from_cents(1_500));
        e.revert(&mut r).unwrap();
        assert_eq!(r.total_expenses, Money::ZERO);
    }

    #[test]
    fn rebook_on_same_register_swaps_amount() {
        let mut r = register();
        let inp = input(&r, 1_000);
        let mut e = Expense::post(&mut r, UserId::new(), inp, Utc::now()).unwrap();
        e.rebook(input(&r, 400), &mut r, None, Utc::now()).unwrap();
        assert_eq!(r.total_expenses, Money::from_cents(400));
        assert_eq!(e.amount, Money::from_cents(400));
    }

    #[test]
    fn rebook_moves_between_registers() {
        let mut a = register();
        let mut b = register();
        let inp = input(&a, 1_000);
        let mut e = Expense::post(&mut a, UserId::new(), inp, Utc::now()).unwrap();
        e.rebook(input(&b, 300), &mut a, Some(&mut b), Utc::now()).unwrap();
        assert_eq!(a.total_expenses, Money::ZERO);
        assert_eq!(b.total_expenses, Money::from_cents(300));
        assert_eq!(e.cash_register_id, b.id);
    }

    #[test]
    fn closed_register_blocks_changes() {
        let mut r = register();
        let inp = input(&r, 1_000);
        let mut e = Expense::post(&mut r, UserId::new(), inp, Utc::now()).unwrap();
        r.close(CloseRegister::default(), Utc::now()).unwrap();

        assert!(e.revert(&mut r).is_err());
        assert!(e.rebook(input(&r, 5), &mut r, None, Utc::now()).is_err());
        assert_eq!(r.total_expenses, Money::from_cents(1_000));
        assert_eq!(e.amount, Money::from_cents(1_000));
    }
}
