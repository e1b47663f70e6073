//! Authentication request handlers.

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use medora_core::auth::session::CookieSession;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ApiResponse, DashboardPathResponse, FederatedRequest, LoginRequest, RefreshRequest,
    RefreshResponse, SessionResponse, SetPasswordRequest, SignupRequest, TokenResponse, UserView,
    ValidateSessionResponse,
};
use crate::services::auth;
use crate::services::cookies::{clear_session_cookie, session_cookie};

fn with_session_cookie(state: &AppState, jar: CookieJar, session: &CookieSession) -> CookieJar {
    let max_age = (session.expires_at - Utc::now()).num_seconds();
    jar.add(session_cookie(
        &session.token,
        max_age,
        state.config.cookie_secure,
    ))
}

/// `POST /api/auth/signup`: register a patient account.
pub async fn signup_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserView>>)> {
    let user = auth::signup(&state, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user).with_message("Account created")),
    ))
}

/// `POST /api/auth/login`: identifier + password, answers with a bearer pair.
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let resp = auth::login(&state, &body.identifier, &body.password).await?;
    Ok(Json(ApiResponse::ok(resp)))
}

/// `POST /api/auth/refresh`: exchange a refresh token for an access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<RefreshResponse>>> {
    let resp = auth::refresh(&state, &body.refresh_token).await?;
    Ok(Json(ApiResponse::ok(resp)))
}

/// `POST /api/auth/session`: identifier + password, answers with the
/// session cookie.
pub async fn session_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<SessionResponse>>)> {
    let (session, user, has_password) =
        auth::sign_in(&state, &body.identifier, &body.password).await?;
    let jar = with_session_cookie(&state, jar, &session);
    let resp = SessionResponse {
        user,
        has_password,
        expires_at: session.expires_at,
    };
    Ok((jar, Json(ApiResponse::ok(resp))))
}

/// `POST /api/auth/federated`: identity assertion from the sign-in front end,
/// answers with the session cookie.
pub async fn federated_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(body): AppJson<FederatedRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<SessionResponse>>)> {
    let (session, user, has_password) = auth::federated_sign_in(&state, &body.assertion).await?;
    let jar = with_session_cookie(&state, jar, &session);
    let resp = SessionResponse {
        user,
        has_password,
        expires_at: session.expires_at,
    };
    Ok((jar, Json(ApiResponse::ok(resp))))
}

/// `POST /api/auth/logout`: revoke the tracked session and clear the cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<ApiResponse<()>>)> {
    auth::logout(&state, &principal).await?;
    let jar = jar.add(clear_session_cookie(state.config.cookie_secure));
    Ok((jar, Json(ApiResponse::ok(()).with_message("Logged out"))))
}

/// `GET /api/auth/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = auth::me(&state, &principal).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// `POST /api/auth/set-password`: first password for federated accounts,
/// or a password change (with `currentPassword`) for everyone else.
pub async fn set_password_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    jar: CookieJar,
    AppJson(body): AppJson<SetPasswordRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<UserView>>)> {
    let (user, session) = auth::set_password(&state, &principal, body).await?;
    let jar = match session {
        Some(session) => with_session_cookie(&state, jar, &session),
        None => jar,
    };
    Ok((jar, Json(ApiResponse::ok(user).with_message("Password set"))))
}

/// `GET /api/auth/validate-session`
pub async fn validate_session_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> AppResult<Json<ValidateSessionResponse>> {
    let valid = auth::validate_session(&state, &principal).await?;
    Ok(Json(ValidateSessionResponse { valid }))
}

/// `GET /api/auth/dashboard`
pub async fn dashboard_handler(
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> Json<DashboardPathResponse> {
    Json(DashboardPathResponse {
        path: auth::dashboard_path(&principal).to_string(),
    })
}
