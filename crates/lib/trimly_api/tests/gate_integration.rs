//! Integration tests for the session & entitlement gate, driven through
//! the full router. The pool is lazy and points nowhere, so every path
//! exercised here provably makes no database call.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use url::Url;

use trimly_api::config::ApiConfig;
use trimly_api::{AppState, router};
use trimly_core::billing::PlanMap;
use trimly_core::email::Mailer;
use trimly_core::gate::Environment;
use trimly_core::identity::client::IdentityClient;
use trimly_core::models::session::SessionClaims;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "ops@trimly.test";

fn test_state(environment: Environment, enforce_auth: bool) -> AppState {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "postgres://127.0.0.1:9/unreachable".into(),
        base_url: "http://localhost:8080".into(),
        environment,
        enforce_auth,
        admin_emails: vec![ADMIN_EMAIL.into()],
        identity_url: Url::parse("http://127.0.0.1:9/auth/v1").expect("identity url"),
        identity_anon_key: "anon".into(),
        identity_jwt_secret: JWT_SECRET.into(),
        identity_service_key: "service".into(),
        stripe_secret_key: "sk_test_dummy".into(),
        stripe_webhook_secret: "whsec_test".into(),
        resend_api_key: "re_test".into(),
        email_from: "Trimly <no-reply@trimly.test>".into(),
        plans: PlanMap::default(),
    };
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    let identity = IdentityClient::new(
        config.identity_url.clone(),
        config.identity_anon_key.clone(),
        config.identity_service_key.clone(),
    );
    let mailer = Mailer::new(config.resend_api_key.clone(), config.email_from.clone());
    AppState {
        pool,
        config,
        identity,
        mailer,
    }
}

fn session_token(email: &str, expires_in_secs: i64) -> String {
    let claims = SessionClaims {
        sub: "3f0e4a1c-0000-4000-8000-000000000042".into(),
        email: email.into(),
        exp: (Utc::now() + Duration::seconds(expires_in_secs)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode session token")
}

async fn error_code(resp: axum::response::Response) -> String {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: Value = serde_json::from_slice(&body).expect("parse JSON");
    json["error"].as_str().expect("error code").to_string()
}

#[tokio::test]
async fn production_locks_out_admin_namespace_regardless_of_session() {
    let token = session_token(ADMIN_EMAIL, 3600);

    for (method, uri, body) in [
        ("GET", "/admin/profiles", Body::empty()),
        (
            "POST",
            "/admin/impersonate",
            Body::from("email=tenant%40shop.test"),
        ),
    ] {
        let app = router(test_state(Environment::Production, false));
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            // Even an allow-listed admin session does not help.
            .header(header::COOKIE, format!("trimly_access={token}"));
        if method == "POST" {
            builder = builder.header(
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            );
        }
        let resp = app
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(error_code(resp).await, "unauthorized");
    }
}

#[tokio::test]
async fn public_routes_allow_anonymous_traffic() {
    for uri in ["/", "/login", "/register", "/pricing"] {
        let app = router(test_state(Environment::Production, true));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn unauthenticated_dashboard_redirects_when_auth_is_enforced() {
    let app = router(test_state(Environment::Development, true));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/login")
    );
}

#[tokio::test]
async fn unauthenticated_dashboard_passes_when_auth_is_not_enforced() {
    let app = router(test_state(Environment::Development, false));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_session_without_refresh_is_treated_as_no_session() {
    // Expired well past any verification leeway, and no refresh cookie:
    // the effective session must become none, never stale-but-accepted.
    let token = session_token(ADMIN_EMAIL, -600);
    let app = router(test_state(Environment::Development, true));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .header(header::COOKIE, format!("trimly_access={token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/login")
    );
}

#[tokio::test]
async fn valid_admin_session_reaches_protected_pages() {
    // Allow-listed emails classify as the admin tier without touching the
    // profile store, so this runs clean against the lazy pool.
    let token = session_token(ADMIN_EMAIL, 3600);
    let app = router(test_state(Environment::Development, true));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .header(header::COOKIE, format!("trimly_access={token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_routes_answer_unauthenticated_instead_of_redirecting() {
    let app = router(test_state(Environment::Development, true));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/subscription")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(resp).await, "unauthenticated");
}
