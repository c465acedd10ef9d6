//! Trimly API server binary.

use std::net::SocketAddr;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use trimly_api::config::ApiConfig;
use trimly_core::email::Mailer;
use trimly_core::identity::client::IdentityClient;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "trimly_server", about = "Trimly API server")]
struct Args {
    /// Address to bind the HTTP listener.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/trimly"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,trimly_api=debug,trimly_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    // Provider secrets are required; a missing one aborts startup here
    // instead of failing on the first request that needs it.
    let config = ApiConfig::from_env(args.bind_addr, args.database_url)?;

    info!(
        bind_addr = %config.bind_addr,
        environment = ?config.environment,
        enforce_auth = config.enforce_auth,
        "starting trimly_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    trimly_api::migrate(&pool).await?;

    let identity = IdentityClient::new(
        config.identity_url.clone(),
        config.identity_anon_key.clone(),
        config.identity_service_key.clone(),
    );
    let mailer = Mailer::new(config.resend_api_key.clone(), config.email_from.clone());

    let state = trimly_api::AppState {
        pool,
        config: config.clone(),
        identity,
        mailer,
    };

    let app = trimly_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "API listening");

    // Peer addresses feed the impersonation rate limiter when no proxy
    // header is present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
