//! Infrastructure layer: persistence for the point-of-sale domain.
//!
//! Every write that touches more than one row runs inside a single
//! transaction and calls the domain crates for its rules, so the in-memory
//! and Postgres backends behave the same way.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryPosStore;
pub use postgres::PostgresPosStore;
pub use store::{
    CashStore, CompanyStore, DocumentStore, InventoryStore, ListQuery, PartyStore, PosStore,
    ProductStore, SalesStore,
};
