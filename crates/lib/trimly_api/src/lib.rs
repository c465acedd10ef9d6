//! # trimly_api
//!
//! HTTP API library for Trimly.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::Router;
use axum::routing::{get, post, put};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use trimly_core::email::Mailer;
use trimly_core::identity::client::IdentityClient;

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, billing, pages, profile, webhook};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Identity provider client.
    pub identity: IdentityClient,
    /// Email provider client.
    pub mailer: Mailer,
}

/// Run embedded database migrations.
///
/// Delegates to `trimly_core::migrate::migrate()` which owns the migration
/// files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    trimly_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
///
/// Every route sits behind the session & entitlement gate; the gate itself
/// distinguishes public, API and admin namespaces.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Page anchors (public pages plus the protected dashboard shell).
    let pages = Router::new()
        .route("/", get(pages::landing))
        .route("/login", get(pages::login))
        .route("/register", get(pages::register))
        .route("/pricing", get(pages::pricing))
        .route("/dashboard", get(pages::dashboard));

    // Auth flow: session acquisition and teardown.
    let auth_flow = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/callback", get(auth::callback_handler))
        .route("/auth/confirm", get(auth::confirm_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/reset", post(auth::reset_handler));

    // JSON API: handlers answer 401 themselves; the webhook authenticates
    // by signature.
    let api = Router::new()
        .route("/api/health", get(pages::health_handler))
        .route("/api/subscription", get(profile::subscription_handler))
        .route(
            "/api/profile/closing-dates",
            put(profile::closing_dates_handler),
        )
        .route("/api/billing/portal", post(billing::portal_handler))
        .route("/api/webhooks/stripe", post(webhook::stripe_webhook_handler));

    // Admin namespace: locked out entirely in production by the gate.
    let admin = Router::new()
        .route("/admin/impersonate", post(admin::impersonate_handler))
        .route("/admin/profiles", get(admin::profiles_handler));

    Router::new()
        .merge(pages)
        .merge(auth_flow)
        .merge(api)
        .merge(admin)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::gate::entitlement_gate,
        ))
        .layer(cors)
        .with_state(state)
}
