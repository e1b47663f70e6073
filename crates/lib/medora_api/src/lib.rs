//! # medora_api
//!
//! HTTP API library for Medora: the route table, the request guard and the
//! handlers for authentication, clinical resources and administration.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use medora_core::auth::AuthError;
use medora_core::auth::federated::{AssertionVerifier, IdentityVerifier};
use medora_core::auth::jwt::TokenCodec;
use medora_core::auth::password::PasswordHasher;
use medora_core::auth::resolver::{SessionResolver, StoreRevocation};
use medora_core::auth::session::SessionIssuer;
use medora_core::store::Store;
use sqlx::PgPool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::handlers::{
    admin, appointments, auth, consultations, health, health_advisor, prescriptions,
};
use crate::middleware::auth::{
    require_admin, require_auth, require_health_advisor, require_password_set,
};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence collaborator.
    pub store: Arc<dyn Store>,
    /// API configuration.
    pub config: Arc<ApiConfig>,
    pub hasher: PasswordHasher,
    pub issuer: Arc<SessionIssuer>,
    pub resolver: Arc<SessionResolver>,
    /// Set when federated sign-in is configured.
    pub identity: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    /// Wire the auth collaborators around `store`. With session tracking on,
    /// the resolver checks every cookie session against the store.
    pub fn new(store: Arc<dyn Store>, config: ApiConfig) -> Result<Self, AuthError> {
        let codec = Arc::new(TokenCodec::new(&config.auth));
        let issuer = SessionIssuer::new(codec.clone(), store.clone(), &config.auth);
        let mut resolver = SessionResolver::new(codec);
        if config.auth.session_tracking {
            resolver = resolver.with_revocation(Arc::new(StoreRevocation::new(store.clone())));
        }
        let identity = match config.federated_secret.as_deref() {
            Some(secret) => {
                Some(Arc::new(AssertionVerifier::new(secret)?) as Arc<dyn IdentityVerifier>)
            }
            None => None,
        };
        Ok(Self {
            hasher: PasswordHasher::new(config.auth.bcrypt_cost),
            issuer: Arc::new(issuer),
            resolver: Arc::new(resolver),
            identity,
            config: Arc::new(config),
            store,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `medora_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    medora_core::migrate::migrate(pool).await
}

fn panic_response(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    AppError::Internal("handler panicked".into()).into_response()
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_SIGNUP, post(auth::signup_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_SESSION, post(auth::session_handler))
        .route(routes::POST_AUTH_FEDERATED, post(auth::federated_handler));

    // Self-service, reachable before a password is set
    let self_service = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .route(
            routes::POST_AUTH_SET_PASSWORD,
            post(auth::set_password_handler),
        )
        .route(
            routes::GET_AUTH_VALIDATE_SESSION,
            get(auth::validate_session_handler),
        )
        .route(routes::GET_AUTH_DASHBOARD, get(auth::dashboard_handler));

    let clinical_routes = Router::new()
        .route(
            routes::APPOINTMENTS,
            get(appointments::list_handler).post(appointments::create_handler),
        )
        .route(
            routes::APPOINTMENTS_ID,
            get(appointments::get_handler)
                .patch(appointments::update_handler)
                .delete(appointments::delete_handler),
        )
        .route(
            routes::PRESCRIPTIONS,
            get(prescriptions::list_handler).post(prescriptions::create_handler),
        )
        .route(
            routes::PRESCRIPTIONS_ID,
            get(prescriptions::get_handler)
                .patch(prescriptions::update_handler)
                .delete(prescriptions::delete_handler),
        )
        .route(
            routes::CONSULTATIONS,
            get(consultations::list_handler).post(consultations::create_handler),
        )
        .route(
            routes::CONSULTATIONS_ID,
            get(consultations::get_handler)
                .patch(consultations::update_handler)
                .delete(consultations::delete_handler),
        );

    let admin_routes = Router::new()
        .route(routes::ADMIN_DASHBOARD, get(admin::dashboard_handler))
        .route(
            routes::ADMIN_USERS,
            get(admin::list_users_handler).post(admin::create_user_handler),
        )
        .route(
            routes::ADMIN_USERS_ID,
            get(admin::get_user_handler)
                .patch(admin::update_user_handler)
                .delete(admin::delete_user_handler),
        )
        .route(
            routes::ADMIN_ROLES,
            get(admin::list_roles_handler).post(admin::create_role_handler),
        )
        .route(
            routes::ADMIN_ROLES_ID,
            get(admin::get_role_handler)
                .patch(admin::update_role_handler)
                .delete(admin::delete_role_handler),
        )
        .route(routes::ADMIN_DOCTORS, get(admin::list_doctors_handler))
        .route(routes::ADMIN_DOCTORS_ID, get(admin::get_doctor_handler))
        .route(
            routes::ADMIN_HEALTH_ADVISORS,
            get(admin::list_health_advisors_handler),
        )
        .route(
            routes::ADMIN_HEALTH_ADVISORS_ID,
            get(admin::get_health_advisor_handler),
        )
        .route(routes::ADMIN_PATIENTS, get(admin::list_patients_handler))
        .route(routes::ADMIN_PATIENTS_ID, get(admin::get_patient_handler))
        .route_layer(from_fn(require_admin));

    let advisor_routes = Router::new()
        .route(
            routes::HEALTH_ADVISOR_DASHBOARD,
            get(health_advisor::dashboard_handler),
        )
        .route(
            routes::HEALTH_ADVISOR_PATIENTS,
            get(health_advisor::patients_handler),
        )
        .route_layer(from_fn(require_health_advisor));

    let password_set = Router::new()
        .merge(clinical_routes)
        .merge(admin_routes)
        .merge(advisor_routes)
        .route_layer(from_fn(require_password_set));

    // Protected routes (require auth)
    let protected = Router::new()
        .merge(self_service)
        .merge(password_set)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
