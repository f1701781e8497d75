//! Parties domain module: the company itself and the people it trades with.
//!
//! Pure validation and record construction (no IO, no HTTP, no storage).

pub mod client;
pub mod company;
pub mod payment_method;
pub mod supplier;

pub use client::{Client, ClientId, ClientInput};
pub use company::{Company, CompanyProfile};
pub use payment_method::{PaymentMethod, PaymentMethodId, PaymentMethodInput};
pub use supplier::{Supplier, SupplierId, SupplierInput};
