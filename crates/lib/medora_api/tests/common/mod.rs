//! Shared harness: a router over a seeded in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use medora_api::config::ApiConfig;
use medora_api::services::cookies::SESSION_COOKIE;
use medora_api::{AppState, router};
use medora_core::auth::config::AuthConfig;
use medora_core::auth::federated::AssertionClaims;
use medora_core::models::role::{ProfileKind, Role};
use medora_core::models::user::NewUser;
use medora_core::store::memory::MemoryStore;
use medora_core::store::seed::seed_defaults;
use medora_core::store::{ProfileStore, RoleStore, Store, UserStore};
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_MOBILE: &str = "9999999999";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const USER_PASSWORD: &str = "password123";
pub const FEDERATED_SECRET: &str = "integration-federated-secret";

/// How a request proves its session.
#[derive(Clone, Copy)]
pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    Cookie(&'a str),
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    /// Value of the session cookie set by this response, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .filter_map(|pair| pair.strip_prefix(&format!("{SESSION_COOKIE}=")))
            .map(str::to_string)
            .find(|v| !v.is_empty())
    }
}

/// A seeded user with a bearer token.
pub struct TestUser {
    pub user_id: String,
    pub profile_id: Option<String>,
    pub mobile: String,
    pub token: String,
}

pub struct TestApp {
    pub state: AppState,
    app: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_tracking(false).await
    }

    pub async fn with_tracking(session_tracking: bool) -> Self {
        let auth = AuthConfig::new("integration-test-secret")
            .expect("auth config")
            .with_bcrypt_cost(4)
            .with_session_tracking(session_tracking);
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut config = ApiConfig::new(auth);
        config.federated_secret = Some(FEDERATED_SECRET.to_string());
        let state = AppState::new(store, config).expect("app state");
        seed_defaults(state.store.as_ref(), &state.hasher)
            .await
            .expect("seed");
        let app = router(state.clone());
        Self { state, app }
    }

    pub async fn send(&self, method: &str, uri: &str, auth: Auth<'_>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        match auth {
            Auth::None => {}
            Auth::Bearer(token) => {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            Auth::Cookie(token) => {
                builder = builder.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
            }
        }
        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> Reply {
        let resp = self.app.clone().oneshot(request).await.expect("response");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    /// `GET uri` with a raw header, plus the session cookie when given.
    pub async fn send_with_header(
        &self,
        uri: &str,
        (name, value): (&str, String),
        cookie: Option<&str>,
    ) -> Reply {
        let mut builder = Request::builder().method("GET").uri(uri).header(name, value);
        if let Some(token) = cookie {
            builder = builder.header(COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        self.dispatch(builder.body(Body::empty()).expect("request"))
            .await
    }

    /// Bearer access token for identifier + password.
    pub async fn login(&self, identifier: &str, password: &str) -> String {
        let reply = self
            .send(
                "POST",
                "/api/auth/login",
                Auth::None,
                Some(serde_json::json!({ "identifier": identifier, "password": password })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "login failed: {}", reply.body);
        reply.body["data"]["accessToken"]
            .as_str()
            .expect("accessToken")
            .to_string()
    }

    /// Sign in through `/api/auth/federated`; returns the session cookie and
    /// the response's `hasPassword`.
    pub async fn federated_login(&self, email: &str) -> (String, bool) {
        let reply = self
            .send(
                "POST",
                "/api/auth/federated",
                Auth::None,
                Some(serde_json::json!({
                    "assertion": federated_assertion(FEDERATED_SECRET, email)
                })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "federated sign-in failed: {}", reply.body);
        let cookie = reply.session_cookie().expect("session cookie");
        let has_password = reply.body["data"]["hasPassword"]
            .as_bool()
            .expect("hasPassword");
        (cookie, has_password)
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_MOBILE, ADMIN_PASSWORD).await
    }

    pub async fn role_id(&self, role: &Role) -> String {
        self.state
            .store
            .find_role_by_name(role.name())
            .await
            .expect("role lookup")
            .expect("role exists")
            .id
    }

    /// Create a user directly in the store and log them in.
    pub async fn user(&self, role: Role, mobile: &str) -> TestUser {
        let role_id = self.role_id(&role).await;
        let hash = self.state.hasher.hash(USER_PASSWORD).await.expect("hash");
        let user = self
            .state
            .store
            .create_user(NewUser {
                email: None,
                mobile: Some(mobile.to_string()),
                name: Some(format!("{role} {mobile}")),
                password_hash: Some(hash),
                role_id,
            })
            .await
            .expect("create user");
        let profile_id = match role.profile_kind() {
            Some(kind) => self.profile_id(&user.id, kind).await,
            None => None,
        };
        let token = self.login(mobile, USER_PASSWORD).await;
        TestUser {
            user_id: user.id,
            profile_id,
            mobile: mobile.to_string(),
            token,
        }
    }

    pub async fn profile_id(&self, user_id: &str, kind: ProfileKind) -> Option<String> {
        self.state
            .store
            .find_profile_id(user_id, kind)
            .await
            .expect("profile lookup")
    }
}

/// A verified-email assertion as the sign-in front end would issue it.
pub fn federated_assertion(secret: &str, email: &str) -> String {
    let claims = AssertionClaims {
        email: email.to_string(),
        name: Some("Federated".into()),
        email_verified: true,
        exp: (Utc::now() + Duration::minutes(5)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign assertion")
}
