//! `tillstack-core` — shared domain building blocks.
//!
//! Pure types only: identifiers, the domain error model, field validation,
//! money and pagination. No IO lives here.

pub mod error;
pub mod id;
pub mod money;
pub mod page;
pub mod validate;

pub use error::{DomainError, DomainResult};
pub use id::{RecordId, TenantId, UserId};
pub use money::Money;
pub use page::{Page, PageRequest, Search};
pub use validate::{FieldError, ValidationErrors, Validator};

#[doc(hidden)]
pub use uuid;
