//! Cash domain module: register sessions and the expenses paid out of them.
//!
//! A register accumulates sale and expense totals between its open and close
//! events. At most one register per company is open at a time.

pub mod expense;
pub mod register;

pub use expense::{Expense, ExpenseId, ExpenseInput};
pub use register::{
    CashRegister, CashRegisterId, CloseRegister, OpenRegister, PaymentMethodTotal, RegisterSummary,
    ensure_none_open, group_by_method,
};
