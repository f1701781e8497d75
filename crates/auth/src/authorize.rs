use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tillstack_core::{TenantId, UserId};

use crate::{Permission, Role};

/// A principal's membership in a tenant: which company it acts within and
/// which roles/permissions it holds there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

/// A fully resolved principal for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: UserId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal within its active tenant context.
///
/// Pure policy check: no IO, no business rules. The `"*"` permission grants
/// everything.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(tenant: TenantId, perms: &[&'static str]) -> Principal {
        Principal {
            principal_id: UserId::new(),
            active_tenant_id: tenant,
            membership: TenantMembership {
                tenant_id: tenant,
                roles: vec![Role::new("cashier")],
                permissions: perms.iter().map(|p| Permission::new(*p)).collect(),
            },
        }
    }

    #[test]
    fn explicit_permission_is_granted() {
        let p = principal(TenantId::new(), &["sales.create"]);
        assert!(authorize(&p, &Permission::new("sales.create")).is_ok());
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let p = principal(TenantId::new(), &["sales.create"]);
        let err = authorize(&p, &Permission::new("sales.annul")).unwrap_err();
        assert_eq!(err, AuthzError::Forbidden("sales.annul".into()));
    }

    #[test]
    fn wildcard_grants_everything() {
        let p = principal(TenantId::new(), &["*"]);
        assert!(authorize(&p, &Permission::new("company.edit")).is_ok());
    }

    #[test]
    fn membership_in_another_tenant_is_rejected() {
        let mut p = principal(TenantId::new(), &["*"]);
        p.active_tenant_id = TenantId::new();
        assert_eq!(
            authorize(&p, &Permission::new("products.create")),
            Err(AuthzError::TenantMismatch)
        );
    }
}
