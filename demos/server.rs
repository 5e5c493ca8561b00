//! Example server: loads resource definitions from `SCAFFOLD_CONFIG`, connects to PostgreSQL and
//! mounts common routes plus the CRUD routes of every resource under /api/v1.

use resource_scaffold::{
    common_routes_with_ready,
    ensure_database_exists,
    load_from_path,
    resolve,
    resource_routes,
    AppState,
    JsonPresenter,
    LocalUploadSink,
    PgDataStore,
    ResourceRegistry,
    ScaffoldDefaults,
};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("resource_scaffold=info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/scaffold".into());
    ensure_database_exists(&database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let config_path = std::env::var("SCAFFOLD_CONFIG").unwrap_or_else(|_| "resources.json".into());
    let upload_dir = std::env::var("SCAFFOLD_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let bind = std::env::var("SCAFFOLD_BIND").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let defaults = ScaffoldDefaults::from_env()?;
    let configs = load_from_path(&config_path).await?;
    let resources = resolve(&configs, &defaults)?;

    let store = Arc::new(PgDataStore::new(pool));
    let registry = ResourceRegistry::build(
        resources,
        store.clone(),
        Arc::new(LocalUploadSink::new(upload_dir)),
        Arc::new(JsonPresenter),
    );
    tracing::info!(resources = ?registry.names(), "resources loaded");

    let state = AppState {
        store,
        registry: Arc::new(registry),
    };
    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api/v1", resource_routes(state));

    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
