use dojo_portal::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    instrument::InstrumentedRepository,
    proxy,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database, renderer client, then the
/// HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging. RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dojo_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);

    // 3. Identity / enrollment store
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let postgres = PostgresRepository::new(pool);
    let repo = if config.query_instrumentation {
        tracing::info!(
            slow_query_ms = config.slow_query_ms,
            "Repository query instrumentation enabled"
        );
        Arc::new(InstrumentedRepository::new(
            postgres,
            Duration::from_millis(config.slow_query_ms),
        )) as RepositoryState
    } else {
        Arc::new(postgres) as RepositoryState
    };

    // 4. Renderer client
    let http = proxy::renderer_client().expect("FATAL: Failed to build the renderer HTTP client.");

    let bind_addr = config.bind_addr.clone();
    tracing::info!(renderer = %config.renderer_url, "Proxying allowed requests to the renderer");

    let app = create_router(AppState { repo, config, http });

    // 5. Server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the listen address. Check BIND_ADDR.");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
