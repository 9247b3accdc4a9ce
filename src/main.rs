use figure_friday::{
    AppConfig, AppState, DashboardContext, dataset::{DatasetSchema, load_datasets}, load_store, router,
};
use std::net::SocketAddr;
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let schema = DatasetSchema::for_variant(config.variant);
    let datasets = load_datasets(config.dataset_paths.as_slice(), &schema).await?;
    let context = DashboardContext::build(config.variant, datasets)?;
    let store = load_store(&config.data_path).await;
    let state = AppState::new(config.data_path.clone(), context, store);

    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!(week = config.variant.week(), "listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
