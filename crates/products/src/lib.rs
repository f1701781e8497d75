//! Products domain module: catalogue, stock arithmetic and margin pricing.
//!
//! Pure domain logic (no IO, no HTTP, no storage). The store layer calls into
//! [`stock`] for every movement so both backends share the same rules.

pub mod category;
pub mod pricing;
pub mod product;
pub mod stock;

pub use category::{Category, CategoryId, CategoryInput};
pub use pricing::Margin;
pub use product::{NewProduct, Product, ProductId, ProductUpdate, QUICK_SEARCH_LIMIT, quick_search_term};
pub use stock::{StockRequest, merge_requests, restock, withdraw};
