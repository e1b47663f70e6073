//! Request guard: session resolution, the password-set gate and role gates.
//!
//! `require_auth` runs first on every protected route. It accepts either an
//! `Authorization: Bearer` access token or the session cookie, and attaches
//! the resolved [`Principal`] to the request as [`AuthenticatedUser`].

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use medora_core::access::guard::require_role;
use medora_core::auth::resolver::SessionProof;
use medora_core::models::auth::Principal;
use medora_core::models::role::Role;

use crate::AppState;
use crate::error::{AppError, AppResult, MSG_LOGIN_REQUIRED};
use crate::services::cookies::SESSION_COOKIE;

/// Key used to store the resolved principal in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

/// Token of an `Authorization: Bearer` header. The scheme is matched
/// case-insensitively; `None` for any other scheme.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// Pull the session proof out of the request headers. A bearer header wins
/// over the cookie; other `Authorization` schemes are ignored.
fn session_proof(headers: &HeaderMap, jar: &CookieJar) -> AppResult<(String, bool)> {
    if let Some(token) = bearer_token(headers) {
        if token.is_empty() {
            return Err(AppError::Unauthorized(MSG_LOGIN_REQUIRED.into()));
        }
        return Ok((token.to_string(), true));
    }
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .map(|token| (token, false))
        .ok_or_else(|| AppError::Unauthorized(MSG_LOGIN_REQUIRED.into()))
}

/// Axum middleware: resolves the session proof and injects
/// [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(request.headers());
    let (token, bearer) = session_proof(request.headers(), &jar)?;
    let proof = if bearer {
        SessionProof::Bearer(&token)
    } else {
        SessionProof::Cookie(&token)
    };
    let principal = state.resolver.resolve(proof).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(principal));
    Ok(next.run(request).await)
}

/// Axum middleware: rejects password-less principals. Runs after
/// [`require_auth`].
pub async fn require_password_set(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized(MSG_LOGIN_REQUIRED.into()))?;
    if !user.0.has_password {
        return Err(AppError::PasswordRequired);
    }
    Ok(next.run(request).await)
}

async fn require(expected: Role, request: Request, next: Next) -> Result<Response, AppError> {
    let principal = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| &u.0);
    require_role(principal, &expected)?;
    Ok(next.run(request).await)
}

/// Axum middleware: admits administrators only.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    require(Role::Admin, request, next).await
}

/// Axum middleware: admits health advisors only.
pub async fn require_health_advisor(request: Request, next: Next) -> Result<Response, AppError> {
    require(Role::HealthAdvisor, request, next).await
}
