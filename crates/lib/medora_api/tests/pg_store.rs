//! Postgres round trip. Needs a disposable database:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/medora_test cargo test -p medora_api -- --ignored
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use medora_api::config::ApiConfig;
use medora_api::{AppState, router};
use medora_core::auth::config::AuthConfig;
use medora_core::store::Store;
use medora_core::store::pg::PgStore;
use medora_core::store::seed::seed_defaults;
use tower::ServiceExt;

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn seeded_admin_logs_in_against_postgres() {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
    let pool = sqlx::PgPool::connect(&url).await.expect("connect");
    medora_api::migrate(&pool).await.expect("migrate");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let auth = AuthConfig::new("pg-test-secret")
        .expect("auth config")
        .with_bcrypt_cost(4);
    let state = AppState::new(store, ApiConfig::new(auth)).expect("state");
    seed_defaults(state.store.as_ref(), &state.hasher)
        .await
        .expect("seed");
    // Seeding twice is a no-op.
    let again = seed_defaults(state.store.as_ref(), &state.hasher)
        .await
        .expect("reseed");
    assert_eq!(again.roles_created, 0);
    assert!(!again.admin_created);

    let app = router(state);
    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"identifier":"9999999999","password":"admin123"}"#,
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.expect("request");
    assert_eq!(resp.status(), StatusCode::OK);

    let health = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(health).await.expect("request");
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("parse JSON");
    assert_eq!(json["storeConnected"], true);
}
