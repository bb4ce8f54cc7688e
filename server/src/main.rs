//! Server binary: reads settings from the environment, introspects the store and serves the API.
//!
//! Run from repo root: `cargo run -p schema-rest-server`

use schema_rest::{app_router, connect_store, ApiModel, AppState, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schema_rest=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let store = connect_store(&config.store).await?;
    let model = ApiModel::introspect(store.as_ref()).await?;
    tracing::info!(collections = model.collections.len(), "model ready");

    let state = AppState::new(store, model, config.store.database_label(), config.docs.clone());
    let app = app_router(state, &config)?;

    let listener = TcpListener::bind(config.listen_address()).await?;
    let addr = listener.local_addr()?;
    tracing::info!("listening on http://{}", addr);
    tracing::info!("api docs at http://{}{}", addr, schema_rest::openapi::SWAGGER_UI_PATH);
    axum::serve(listener, app).await?;
    Ok(())
}
