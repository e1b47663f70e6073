//! Exact-match role guard.

use super::AccessError;
use crate::models::auth::Principal;
use crate::models::role::Role;

/// Admit the principal only if its role is exactly `expected`.
///
/// There is no hierarchy: an admin fails `require_role(.., &Role::Doctor)`.
/// Endpoints that also admit admins check that as a separate branch.
pub fn require_role<'a>(
    principal: Option<&'a Principal>,
    expected: &Role,
) -> Result<&'a Principal, AccessError> {
    let principal = principal.ok_or(AccessError::NotAuthenticated)?;
    if &principal.role != expected {
        return Err(AccessError::NotAuthorized(format!(
            "role {} required, caller is {}",
            expected, principal.role
        )));
    }
    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::ProofTransport;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: "u".into(),
            role,
            email: None,
            mobile: None,
            has_password: true,
            session_id: None,
            transport: ProofTransport::Cookie,
        }
    }

    fn all_roles() -> Vec<Role> {
        let mut roles = Role::BUILT_IN.to_vec();
        roles.push(Role::Other("nurse".into()));
        roles
    }

    #[test]
    fn succeeds_iff_roles_match() {
        for actual in all_roles() {
            for expected in all_roles() {
                let p = principal(actual.clone());
                let result = require_role(Some(&p), &expected);
                if actual == expected {
                    assert!(result.is_ok(), "{actual} vs {expected}");
                } else {
                    assert!(
                        matches!(result, Err(AccessError::NotAuthorized(_))),
                        "{actual} vs {expected}"
                    );
                }
            }
        }
    }

    #[test]
    fn admin_does_not_pass_doctor_guard() {
        let admin = principal(Role::Admin);
        assert!(require_role(Some(&admin), &Role::Admin).is_ok());
        assert!(matches!(
            require_role(Some(&admin), &Role::Doctor),
            Err(AccessError::NotAuthorized(_))
        ));
    }

    #[test]
    fn missing_principal_is_not_authenticated() {
        assert!(matches!(
            require_role(None, &Role::Patient),
            Err(AccessError::NotAuthenticated)
        ));
    }
}
