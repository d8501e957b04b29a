use std::time::Duration;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use super::AppState;
use crate::config::Config;
use crate::middleware::{
    request_id::{make_span_with_request_id, request_id_middleware},
    request_timeout,
};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/recommend", post(handlers::recommend))
        .route("/api/history", get(handlers::history))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// Wraps the API router with the browser-facing layers from `config`
pub fn build_app(state: AppState, config: &Config) -> anyhow::Result<Router> {
    let mut router = create_router(state);

    if let Some(static_dir) = &config.static_dir {
        tracing::info!(dir = %static_dir, "Serving static files");
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    Ok(router
        .layer(middleware::from_fn_with_state(
            Duration::from_secs(config.request_timeout_secs),
            request_timeout,
        ))
        .layer(cors_layer(&config.cors_allowed_origins)?))
}

/// CORS restricted to known browser origins, with credentials
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim())
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin {:?}: {}", origin, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        .allow_credentials(true))
}
