//! Authentication service: login, sessions and self-service flows delegating
//! to `medora_core::auth`.

use medora_core::auth::credentials::verify_credentials;
use medora_core::auth::federated;
use medora_core::auth::session::CookieSession;
use medora_core::auth::signup::{self, SignupInput};
use medora_core::models::auth::{Principal, ProofTransport};
use medora_core::store::UserStore;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult, MSG_LOGIN_REQUIRED};
use crate::models::{
    AuthUser, RefreshResponse, SetPasswordRequest, SignupRequest, TokenResponse, UserView,
};

/// Where a password-less account is sent until it sets a password.
pub const SET_PASSWORD_PATH: &str = "/set-password";

fn auth_user(principal: &Principal) -> AuthUser {
    AuthUser {
        id: principal.user_id.clone(),
        email: principal.email.clone(),
        mobile: principal.mobile.clone(),
        role: principal.role.clone(),
    }
}

// ---------------------------------------------------------------------------
// Public operations
// ---------------------------------------------------------------------------

/// Authenticate with identifier + password and issue a bearer pair.
pub async fn login(state: &AppState, identifier: &str, password: &str) -> AppResult<TokenResponse> {
    let principal =
        verify_credentials(state.store.as_ref(), &state.hasher, identifier, password).await?;
    let pair = state.issuer.issue_bearer(&principal)?;
    info!(user_id = %principal.user_id, role = %principal.role, "bearer login");
    Ok(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: pair.expires_in,
        token_type: "Bearer",
        user: auth_user(&principal),
    })
}

/// Authenticate with identifier + password and issue a cookie session.
pub async fn sign_in(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> AppResult<(CookieSession, AuthUser, bool)> {
    let principal =
        verify_credentials(state.store.as_ref(), &state.hasher, identifier, password).await?;
    let session = state.issuer.issue_cookie(&principal).await?;
    Ok((session, auth_user(&principal), principal.has_password))
}

/// Sign in with a federated identity assertion and issue a cookie session.
/// First-time accounts come back with `hasPassword = false`.
pub async fn federated_sign_in(
    state: &AppState,
    assertion: &str,
) -> AppResult<(CookieSession, AuthUser, bool)> {
    let verifier = state
        .identity
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Federated sign-in is not configured".into()))?;
    let principal = federated::federated_sign_in(state.store.as_ref(), verifier, assertion).await?;
    let session = state.issuer.issue_cookie(&principal).await?;
    info!(user_id = %principal.user_id, has_password = principal.has_password, "federated sign-in");
    Ok((session, auth_user(&principal), principal.has_password))
}

/// Register a patient account.
pub async fn signup(state: &AppState, body: SignupRequest) -> AppResult<UserView> {
    let user = signup::signup(
        state.store.as_ref(),
        &state.hasher,
        SignupInput {
            email: body.email,
            mobile: body.mobile,
            password: body.password,
            name: body.name,
        },
    )
    .await?;
    Ok(user.into())
}

/// Exchange a refresh token for a new access token.
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<RefreshResponse> {
    let refreshed = state.issuer.refresh(refresh_token).await?;
    Ok(RefreshResponse {
        access_token: refreshed.access_token,
        expires_in: refreshed.expires_in,
    })
}

// ---------------------------------------------------------------------------
// Self-service operations
// ---------------------------------------------------------------------------

pub async fn logout(state: &AppState, principal: &Principal) -> AppResult<()> {
    state.issuer.revoke(principal).await?;
    info!(user_id = %principal.user_id, "logged out");
    Ok(())
}

/// Current user, re-read from storage.
pub async fn me(state: &AppState, principal: &Principal) -> AppResult<UserView> {
    let user = state
        .store
        .find_user_by_id(&principal.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(MSG_LOGIN_REQUIRED.into()))?;
    Ok(user.into())
}

/// Set the caller's password. Revokes every tracked session of the user and,
/// for cookie callers, returns a replacement session with `hasPassword` set.
pub async fn set_password(
    state: &AppState,
    principal: &Principal,
    body: SetPasswordRequest,
) -> AppResult<(UserView, Option<CookieSession>)> {
    let user = signup::set_password(
        state.store.as_ref(),
        &state.hasher,
        &principal.user_id,
        body.current_password.as_deref(),
        &body.password,
    )
    .await?;
    state.issuer.revoke_all(&user.id).await?;

    let session = match principal.transport {
        ProofTransport::Cookie => {
            let renewed = Principal::from_user(&user, ProofTransport::Cookie);
            Some(state.issuer.issue_cookie(&renewed).await?)
        }
        ProofTransport::Bearer | ProofTransport::Password => None,
    };
    Ok((user.into(), session))
}

/// Whether the caller's account still exists. Tracked-session revocation
/// has already been enforced by the request guard.
pub async fn validate_session(state: &AppState, principal: &Principal) -> AppResult<bool> {
    Ok(state
        .store
        .find_user_by_id(&principal.user_id)
        .await?
        .is_some())
}

/// Landing page for the caller.
pub fn dashboard_path(principal: &Principal) -> &'static str {
    if !principal.has_password {
        return SET_PASSWORD_PATH;
    }
    principal.role.dashboard_path()
}
