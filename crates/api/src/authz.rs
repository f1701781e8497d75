//! API-side authorization guard.
//!
//! Handlers call [`authorize_action`] before touching a store, which keeps the
//! domain and infra crates auth-agnostic.

use tillstack_auth::{AuthzError, Permission, Principal, Role, TenantMembership, authorize};

use crate::context::{PrincipalContext, TenantContext};

/// Permissions of the `cashier` role: ring up sales and run the till.
const CASHIER: &[&str] = &[
    "sales.create",
    "cash_registers.open",
    "cash_registers.close",
    "expenses.create",
];

/// Check that the request's principal holds `required` in its tenant.
pub fn authorize_action(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    required: &Permission,
) -> Result<(), AuthzError> {
    let membership = TenantMembership {
        tenant_id: tenant.tenant_id(),
        roles: principal.roles().to_vec(),
        permissions: permissions_from_roles(principal.roles()),
    };

    let principal = Principal {
        principal_id: principal.user_id(),
        active_tenant_id: tenant.tenant_id(),
        membership,
    };

    authorize(&principal, required)
}

/// Static role policy: `admin` holds everything, `cashier` the till permissions.
fn permissions_from_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(|r| r.as_str() == "admin") {
        return vec![Permission::new("*")];
    }

    let mut permissions = Vec::new();
    if roles.iter().any(|r| r.as_str() == "cashier") {
        permissions.extend(CASHIER.iter().map(|p| Permission::new(*p)));
    }
    permissions
}

#[cfg(test)]
mod tests {
    use tillstack_core::{TenantId, UserId};

    use super::*;

    fn ctx(roles: &[&'static str]) -> (TenantContext, PrincipalContext) {
        (
            TenantContext::new(TenantId::new()),
            PrincipalContext::new(UserId::new(), roles.iter().map(|r| Role::new(*r)).collect()),
        )
    }

    #[test]
    fn admin_may_do_anything() {
        let (tenant, principal) = ctx(&["admin"]);
        assert!(authorize_action(&tenant, &principal, &Permission::new("products.delete")).is_ok());
    }

    #[test]
    fn cashier_may_sell_but_not_edit_catalog() {
        let (tenant, principal) = ctx(&["cashier"]);
        assert!(authorize_action(&tenant, &principal, &Permission::new("sales.create")).is_ok());
        assert!(authorize_action(&tenant, &principal, &Permission::new("cash_registers.close")).is_ok());
        assert_eq!(
            authorize_action(&tenant, &principal, &Permission::new("products.edit")),
            Err(AuthzError::Forbidden("products.edit".to_string()))
        );
        assert!(authorize_action(&tenant, &principal, &Permission::new("sales.annul")).is_err());
    }

    #[test]
    fn unknown_roles_grant_nothing() {
        let (tenant, principal) = ctx(&["auditor"]);
        assert!(authorize_action(&tenant, &principal, &Permission::new("expenses.create")).is_err());
    }
}
