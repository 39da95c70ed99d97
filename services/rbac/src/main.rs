use anyhow::Result;
use axum::Router;
use common::database::DatabaseConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rbac::{
    config::{ServiceConfig, StorageBackend},
    database,
    jwt::{JwtConfig, JwtService},
    memory::MemoryStore,
    routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting RBAC service");

    let jwt_service = JwtService::new(JwtConfig::from_env()?);

    let app: Router = match config.storage {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = database::connect(&db_config).await?;
            routes::create_router(AppState::from_pool(pool, jwt_service, config.role_expiry))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            let store = MemoryStore::new();
            routes::create_router(AppState::in_memory(&store, jwt_service, config.role_expiry))
        }
    };

    info!(role_expiry = ?config.role_expiry, "RBAC service initialized successfully");

    let listener = TcpListener::bind(config.listen_addr.as_str()).await?;
    info!("RBAC service listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
