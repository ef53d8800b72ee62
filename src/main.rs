use blog_portal::{
    AppState, HtmlRenderer, RendererState, SqliteRepository,
    config::{AppConfig, Env},
    create_router,
    repository::RepositoryState,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point, responsible for initializing all core
/// components: configuration, logging, database, renderer, and the HTTP
/// server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (fail-fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() panics on missing or placeholder production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes the RUST_LOG environment variable, falling back to
    // sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for human readability.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for ingestion by log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (SQLite)
    // Opens the pool, enables foreign keys, and bootstraps the schema.
    let repo = SqliteRepository::connect(&config.db_url)
        .await
        .expect("FATAL: Failed to open the database. Check DATABASE_URL.");
    let repo = Arc::new(repo) as RepositoryState;

    // 5. Renderer Initialization
    let renderer = Arc::new(HtmlRenderer) as RendererState;

    // 6. Unified State Assembly
    let app_state = AppState {
        repo,
        renderer,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind("0.0.0.0:5000").await.unwrap();

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on 0.0.0.0:5000");

    axum::serve(listener, app).await.unwrap();
}
