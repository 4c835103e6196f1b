//! HTTP surface of the query service
//!
//! Routes are mounted twice: at the root and under `/api/v1`.

use crate::config::{Config, StoreConfig};
use crate::error::{ServerError, ServerResult};
use crate::features;
use crate::middleware;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use woofya_common::store::RecordStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
}

/// Open the configured store, loading its snapshot when a path is set
pub async fn open_store(config: &StoreConfig) -> ServerResult<RecordStore> {
    match config.path {
        Some(ref path) => {
            let store = RecordStore::open(path, config.dedup_policy).await?;
            tracing::info!(
                path = %path.display(),
                records = store.len().await,
                "Record store loaded"
            );
            Ok(store)
        },
        None => {
            tracing::warn!("WOOFYA_STORE_PATH not set, records are kept in memory only");
            Ok(RecordStore::in_memory(config.dedup_policy))
        },
    }
}

/// Bind to the configured address and serve until `shutdown` resolves
pub async fn serve<F>(config: &Config, state: AppState, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state, config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ServerError::Config(format!("invalid listen address: {}", e)))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    let routes = api_routes(state);

    Router::new()
        .merge(routes.clone())
        .nest("/api/v1", routes)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

fn api_routes(state: AppState) -> Router {
    let feature_state = features::FeatureState {
        store: state.store.clone(),
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
        .merge(features::router(feature_state))
}

/// Health check handler
async fn health_check(State(state): State<AppState>) -> Response {
    let storage = if state.store.snapshot_path().is_some() {
        "snapshot"
    } else {
        "memory"
    };

    Json(json!({
        "status": "healthy",
        "storage": storage,
        "records": state.store.len().await,
    }))
    .into_response()
}
