//! Shared helpers: an in-process stand-in for the identity and Graph
//! endpoints, and a router wired to it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode, Uri, header::AUTHORIZATION},
    response::Response,
    routing::post,
};
use report_mailer::{AppState, Config, graph::GraphClient, routes};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::util::ServiceExt;

#[derive(Debug, Clone)]
pub struct TokenCall {
    pub tenant: String,
    pub form: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct MailCall {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct StubState {
    token_reply: (StatusCode, String),
    mail_reply: (StatusCode, String),
    token_calls: Arc<Mutex<Vec<TokenCall>>>,
    mail_calls: Arc<Mutex<Vec<MailCall>>>,
}

pub struct Upstream {
    pub base_url: String,
    token_calls: Arc<Mutex<Vec<TokenCall>>>,
    mail_calls: Arc<Mutex<Vec<MailCall>>>,
}

impl Upstream {
    pub fn token_calls(&self) -> Vec<TokenCall> {
        self.token_calls.lock().unwrap().clone()
    }

    pub fn mail_calls(&self) -> Vec<MailCall> {
        self.mail_calls.lock().unwrap().clone()
    }
}

async fn token_endpoint(
    State(stub): State<StubState>,
    Path(tenant): Path<String>,
    body: String,
) -> (StatusCode, String) {
    let form = body
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            (
                k.to_string(),
                urlencoding::decode(&v.replace('+', " "))
                    .unwrap()
                    .into_owned(),
            )
        })
        .collect();

    stub.token_calls
        .lock()
        .unwrap()
        .push(TokenCall { tenant, form });

    stub.token_reply.clone()
}

async fn send_mail_endpoint(
    State(stub): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    stub.mail_calls.lock().unwrap().push(MailCall {
        path: uri.path().to_string(),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    stub.mail_reply.clone()
}

/// Starts the stub on an ephemeral port.
pub async fn spawn_upstream(
    token_reply: (StatusCode, &str),
    mail_reply: (StatusCode, &str),
) -> Upstream {
    let stub = StubState {
        token_reply: (token_reply.0, token_reply.1.to_string()),
        mail_reply: (mail_reply.0, mail_reply.1.to_string()),
        token_calls: Arc::default(),
        mail_calls: Arc::default(),
    };

    let token_calls = stub.token_calls.clone();
    let mail_calls = stub.mail_calls.clone();

    let app = Router::new()
        .route("/{tenant}/oauth2/v2.0/token", post(token_endpoint))
        .route("/v1.0/users/{upn}/sendMail", post(send_mail_endpoint))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        base_url: format!("http://{addr}"),
        token_calls,
        mail_calls,
    }
}

pub fn token_ok() -> (StatusCode, &'static str) {
    (
        StatusCode::OK,
        r#"{"token_type":"Bearer","expires_in":3599,"access_token":"test-token"}"#,
    )
}

pub fn accepted() -> (StatusCode, &'static str) {
    (StatusCode::ACCEPTED, "")
}

pub const FULL_ENV: &[(&str, &str)] = &[
    ("M365_TENANT_ID", "tenant-123"),
    ("M365_CLIENT_ID", "client-456"),
    ("M365_CLIENT_SECRET", "s3cret+value"),
    ("M365_SENDER_UPN", "reports@example.com"),
];

/// Accepts connections and never answers them.
pub async fn spawn_silent_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{addr}")
}

/// Configuration whose upstream base URLs point at `base_url`.
pub fn config_with_env(base_url: &str, env: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    vars.insert("M365_LOGIN_BASE_URL".to_string(), base_url.to_string());
    vars.insert("GRAPH_BASE_URL".to_string(), base_url.to_string());

    Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn app_with_config(config: Config) -> Router {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    let graph = GraphClient::with_client(http, &config.login_base_url, &config.graph_base_url);

    routes::create_router(AppState { config, graph })
}

pub fn app_with_env(base_url: &str, env: &[(&str, &str)]) -> Router {
    app_with_config(config_with_env(base_url, env))
}

pub fn app_with_timeout(base_url: &str, env: &[(&str, &str)], timeout: Duration) -> Router {
    let mut config = config_with_env(base_url, env);
    config.request_timeout = timeout;
    app_with_config(config)
}

pub async fn call(app: Router, request: Request<Body>) -> (Response, Value) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (Response::from_parts(parts, Body::from(bytes)), json)
}

pub fn post_json(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/send-report")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub fn request(method: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/api/send-report")
        .body(Body::empty())
        .unwrap()
}
