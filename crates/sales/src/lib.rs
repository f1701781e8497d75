//! Sales domain module.
//!
//! Business rules for selling and annulling, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). The store layer
//! locks rows and calls in here inside one transaction.

pub mod sale;

pub use sale::{
    NewSale, Sale, SaleDraft, SaleFilter, SaleId, SaleItem, require_open_register,
};
