pub mod cors;
pub mod health;
pub mod report;

use axum::{
    Router, extract::DefaultBodyLimit, http::StatusCode, middleware, routing::get,
};
use tower_http::timeout::TimeoutLayer;

use crate::AppState;
use cors::{CorsHeaders, cors_headers};

pub const SEND_REPORT_PATH: &str = "/api/send-report";

/// The timeout sits inside the CORS middleware so a 408 carries the same
/// headers as every other response.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsHeaders::new(state.config.allow_origin.clone());
    let body_limit = state.config.body_limit_bytes;
    let request_timeout = state.config.request_timeout;

    Router::new()
        .route(
            SEND_REPORT_PATH,
            get(report::diagnostics)
                .post(report::send_report)
                .options(report::preflight)
                .head(report::method_not_allowed)
                .fallback(report::method_not_allowed),
        )
        .route("/api/health", get(health::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::from_fn_with_state(cors, cors_headers))
}
