//! `tillstack-auth` — pure authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: the API layer feeds it bearer tokens and
//! asks it for decisions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, Principal, TenantMembership, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
pub use permissions::Permission;
pub use roles::Role;
