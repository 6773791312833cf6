use actas_backend::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{LocalMediaStorage, MediaStorage, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::{error::Error, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// init_tracing
///
/// Pretty output on a developer machine, JSON lines in production. `RUST_LOG`
/// overrides the default filter.
fn init_tracing(env: Env) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "actas_backend=debug,tower_http=info".into());

    match env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }
}

/// main
///
/// Loads configuration, then wires logging, database, media storage and the
/// HTTP server. Any startup failure aborts with a non-zero exit.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    init_tracing(config.env);
    tracing::info!("Application starting in {:?} mode", config.env);

    // 1. Database
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.db_url)
        .await?;

    let postgres = PostgresRepository::new(pool);
    postgres.migrate().await?;
    tracing::info!("database migrations applied");
    let repo = Arc::new(postgres) as RepositoryState;

    // 2. Media storage
    let media = LocalMediaStorage::new(config.media_root.clone());
    media.ensure_ready().await?;
    tracing::info!(media_root = %config.media_root.display(), "media storage ready");
    let storage = Arc::new(media) as StorageState;

    // 3. Router and server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState {
        repo,
        storage,
        config,
    });

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
