//! Account creation: local signup, federated provisioning and the
//! set-password step for password-less accounts.

use tracing::{debug, info};

use super::password::PasswordHasher;
use super::{AuthError, validate_password};
use crate::models::role::Role;
use crate::models::user::{NewUser, UserPatch, UserRecord};
use crate::store::{RoleStore, Store, UserStore};

/// Public signup form. Any role requested by the caller is ignored.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: Option<String>,
    pub mobile: String,
    pub password: String,
    pub name: Option<String>,
}

/// Trimmed, with empty strings treated as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn patient_role_id(store: &dyn Store) -> Result<String, AuthError> {
    store
        .find_role_by_name(Role::Patient.name())
        .await?
        .map(|r| r.id)
        .ok_or_else(|| AuthError::Internal("patient role is not seeded".into()))
}

/// Register a local account. Always assigns the patient role.
pub async fn signup(
    store: &dyn Store,
    hasher: &PasswordHasher,
    input: SignupInput,
) -> Result<UserRecord, AuthError> {
    let mobile = non_empty(Some(&input.mobile))
        .ok_or_else(|| AuthError::Validation("Mobile number is required".into()))?;
    validate_password(&input.password)?;

    let role_id = patient_role_id(store).await?;
    let password_hash = hasher.hash(&input.password).await?;
    let user = store
        .create_user(NewUser {
            email: non_empty(input.email.as_deref()),
            mobile: Some(mobile),
            name: non_empty(input.name.as_deref()),
            password_hash: Some(password_hash),
            role_id,
        })
        .await?;

    info!(user_id = %user.id, "patient signed up");
    Ok(user)
}

/// Find or create the account behind an externally verified email.
///
/// New accounts are patients without a local password; they must complete
/// [`set_password`] before reaching any role-scoped route.
pub async fn provision_federated_user(
    store: &dyn Store,
    email: &str,
    name: Option<&str>,
) -> Result<UserRecord, AuthError> {
    let email = non_empty(Some(email))
        .ok_or_else(|| AuthError::Validation("Email is required".into()))?;
    if let Some(existing) = store.find_user_by_email(&email).await? {
        return Ok(existing);
    }

    let role_id = patient_role_id(store).await?;
    let user = store
        .create_user(NewUser {
            email: Some(email),
            mobile: None,
            name: non_empty(name),
            password_hash: None,
            role_id,
        })
        .await?;

    info!(user_id = %user.id, "federated account provisioned");
    Ok(user)
}

/// Set the local password of a user.
///
/// Password-less accounts set their first password freely. Replacing an
/// existing password requires the current one, and a missing or wrong
/// `current_password` fails with [`AuthError::InvalidCredentials`].
pub async fn set_password(
    store: &dyn Store,
    hasher: &PasswordHasher,
    user_id: &str,
    current_password: Option<&str>,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AuthError::NotAuthenticated("user no longer exists".into()))?;
    if let Some(hash) = user.password_hash.as_deref() {
        let current = current_password.unwrap_or_default();
        if current.is_empty() || !hasher.verify(current, hash).await? {
            debug!(user_id = %user.id, "password change without the current password");
            return Err(AuthError::InvalidCredentials);
        }
    }

    validate_password(password)?;
    let password_hash = hasher.hash(password).await?;
    let patch = UserPatch {
        password_hash: Some(password_hash),
        ..UserPatch::default()
    };
    let user = store
        .update_user(user_id, patch)
        .await?
        .ok_or_else(|| AuthError::NotAuthenticated("user no longer exists".into()))?;

    info!(user_id = %user.id, "password set");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::ProfileKind;
    use crate::store::ProfileStore;
    use crate::store::StoreError;
    use crate::store::memory::MemoryStore;

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        for role in Role::BUILT_IN {
            store.create_role(role.name(), None).await.unwrap();
        }
        store
    }

    fn input(mobile: &str) -> SignupInput {
        SignupInput {
            email: Some("  ".into()),
            mobile: mobile.into(),
            password: "password1".into(),
            name: None,
        }
    }

    #[tokio::test]
    async fn signup_creates_a_patient_with_profile() {
        let store = store().await;
        let hasher = PasswordHasher::new(4);
        let user = signup(&store, &hasher, input("123")).await.unwrap();

        assert_eq!(user.role(), Role::Patient);
        assert!(user.email.is_none());
        assert!(user.has_password());
        assert!(store
            .find_profile_id(&user.id, ProfileKind::Patient)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn duplicate_mobile_is_a_conflict() {
        let store = store().await;
        let hasher = PasswordHasher::new(4);
        signup(&store, &hasher, input("123")).await.unwrap();
        let err = signup(&store, &hasher, input("123")).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let store = store().await;
        let hasher = PasswordHasher::new(4);
        let err = signup(&store, &hasher, input(" ")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let mut short = input("123");
        short.password = "short".into();
        let err = signup(&store, &hasher, short).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn federated_accounts_start_without_password() {
        let store = store().await;
        let hasher = PasswordHasher::new(4);
        let user = provision_federated_user(&store, "p@example.com", Some("Pat"))
            .await
            .unwrap();
        assert!(!user.has_password());
        assert_eq!(user.role(), Role::Patient);

        let again = provision_federated_user(&store, "p@example.com", None)
            .await
            .unwrap();
        assert_eq!(again.id, user.id);

        let updated = set_password(&store, &hasher, &user.id, None, "password1")
            .await
            .unwrap();
        assert!(updated.has_password());
    }

    #[tokio::test]
    async fn changing_a_password_needs_the_current_one() {
        let store = store().await;
        let hasher = PasswordHasher::new(4);
        let user = signup(&store, &hasher, input("123")).await.unwrap();

        for current in [None, Some(""), Some("wrong-password")] {
            let err = set_password(&store, &hasher, &user.id, current, "new-password")
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
        let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        let old_hash = stored.password_hash.unwrap();
        assert!(hasher.verify("password1", &old_hash).await.unwrap());

        let updated = set_password(&store, &hasher, &user.id, Some("password1"), "new-password")
            .await
            .unwrap();
        let new_hash = updated.password_hash.unwrap();
        assert!(hasher.verify("new-password", &new_hash).await.unwrap());
    }
}
