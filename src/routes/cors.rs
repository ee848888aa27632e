//! Fixed CORS response headers.
//!
//! Every response carries the same three headers, errors included, so the
//! browser can read failure bodies as well as successes.

use axum::{
    extract::{Request, State},
    http::{
        HeaderValue,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
    },
    middleware::Next,
    response::Response,
};

pub const ALLOW_METHODS: &str = "POST, OPTIONS, GET";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

#[derive(Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
}

impl CorsHeaders {
    pub fn new(allow_origin: HeaderValue) -> Self {
        Self { allow_origin }
    }
}

pub async fn cors_headers(
    State(cors): State<CorsHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, cors.allow_origin.clone());
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );

    response
}
