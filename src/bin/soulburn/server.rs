//! Read-only HTTP boundary over the published snapshot.
//!
//! - `GET /api/get`: the current snapshot, cacheable by shared caches for the refresh interval
//! - `GET /api/status`: refresh counters and the last error
//!
//! Requests never trigger a refresh; they only read what the refresh loop last published.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use soulburn::{refresh::RefreshService, SoulburnError};
use std::{future::Future, net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

pub const CACHE_CONTROL: &str = "public, s-maxage=300, stale-while-revalidate=60";

struct ApiError(SoulburnError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0.status_code(), Json(self.0)).into_response()
    }
}

async fn get_snapshot(State(service): State<Arc<RefreshService>>) -> Result<Response, ApiError> {
    let snapshot = service.snapshot();
    let body = serde_json::to_vec(snapshot.as_ref()).map_err(|e| ApiError(e.into()))?;
    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response())
}

async fn get_status(State(service): State<Arc<RefreshService>>) -> impl IntoResponse {
    Json(service.status())
}

pub fn router(service: Arc<RefreshService>) -> Router {
    let snapshot_routes = Router::new()
        .route("/api/get", get(get_snapshot))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL),
        ));

    Router::new()
        .merge(snapshot_routes)
        .route("/api/status", get(get_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serves until `shutdown_signal` resolves.
pub async fn serve(
    service: Arc<RefreshService>,
    port: u16,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Serving snapshot on http://{}", addr);

    axum::serve(listener, router(service).into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
