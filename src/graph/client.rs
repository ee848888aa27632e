use std::time::Instant;

use opentelemetry::KeyValue;
use reqwest::StatusCode;
use tracing::{Instrument, Span};

use super::GRAPH_SCOPE;
use super::message::{SendMailRequest, TokenResponse};
use crate::config::Credentials;
use crate::error::{AppError, AppResult};
use crate::telemetry::metrics::{GRAPH_ERROR_COUNT, GRAPH_OPERATION_DURATION};

/// Bearer token for a single request. Never logged.
pub struct AccessToken(String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    login_base_url: String,
    graph_base_url: String,
}

impl GraphClient {
    pub fn new(login_base_url: &str, graph_base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), login_base_url, graph_base_url)
    }

    pub fn with_client(
        client: reqwest::Client,
        login_base_url: &str,
        graph_base_url: &str,
    ) -> Self {
        Self {
            client,
            login_base_url: login_base_url.trim_end_matches('/').to_string(),
            graph_base_url: graph_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base_url,
            urlencoding::encode(tenant_id)
        )
    }

    pub fn send_mail_url(&self, sender_upn: &str) -> String {
        format!(
            "{}/v1.0/users/{}/sendMail",
            self.graph_base_url,
            urlencoding::encode(sender_upn)
        )
    }

    /// Client-credentials exchange. A fresh token is requested on every call.
    pub async fn acquire_token(&self, credentials: &Credentials) -> AppResult<AccessToken> {
        let span = tracing::info_span!(
            "graph.token",
            otel.name = "graph.token",
            graph.operation = "token",
            server.address = %host_of(&self.login_base_url),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let start = Instant::now();
        let request = self
            .client
            .post(self.token_url(&credentials.tenant_id))
            .form(&params);
        let result = send_for_text(request).instrument(span.clone()).await;
        record_call("token", &span, start, &result);

        let (status, body) = result?;
        if !status.is_success() {
            return Err(AppError::Token { status, body });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Internal(format!("Invalid token response: {e}")))?;

        Ok(AccessToken(token.access_token))
    }

    pub async fn send_mail(
        &self,
        token: &AccessToken,
        sender_upn: &str,
        payload: &SendMailRequest,
    ) -> AppResult<()> {
        let span = tracing::info_span!(
            "graph.send_mail",
            otel.name = "graph.send_mail",
            graph.operation = "send_mail",
            server.address = %host_of(&self.graph_base_url),
            mail.attachment.name = %payload
                .message
                .attachments
                .first()
                .map(|a| a.name.as_str())
                .unwrap_or(""),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        let start = Instant::now();
        let request = self
            .client
            .post(self.send_mail_url(sender_upn))
            .bearer_auth(token.secret())
            .json(payload);
        let result = send_for_text(request).instrument(span.clone()).await;
        record_call("send_mail", &span, start, &result);

        let (status, body) = result?;
        if !status.is_success() {
            return Err(AppError::SendMail { status, body });
        }

        Ok(())
    }
}

/// Upstream bodies are read as text before any interpretation so failures can
/// be passed through verbatim.
async fn send_for_text(request: reqwest::RequestBuilder) -> AppResult<(StatusCode, String)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

fn record_call(
    operation: &'static str,
    span: &Span,
    start: Instant,
    result: &AppResult<(StatusCode, String)>,
) {
    let duration = start.elapsed().as_secs_f64();

    let (status_class, error_type) = match result {
        Ok((status, _)) => {
            span.record("http.response.status_code", status.as_u16() as i64);
            let class = format!("{}xx", status.as_u16() / 100);
            let error_type = (!status.is_success()).then(|| status.as_u16().to_string());
            (class, error_type)
        }
        Err(err) => ("none".to_string(), Some(classify_error(err).to_string())),
    };

    match &error_type {
        Some(error_type) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.type", error_type.as_str());
            GRAPH_ERROR_COUNT.add(
                1,
                &[
                    KeyValue::new("graph.operation", operation),
                    KeyValue::new("error.type", error_type.clone()),
                ],
            );
        }
        None => {
            span.record("otel.status_code", "OK");
        }
    }

    GRAPH_OPERATION_DURATION.record(
        duration,
        &[
            KeyValue::new("graph.operation", operation),
            KeyValue::new("http.status_class", status_class),
        ],
    );
}

fn classify_error(err: &AppError) -> &'static str {
    match err {
        AppError::Upstream(e) if e.is_timeout() => "timeout",
        AppError::Upstream(e) if e.is_connect() => "network_error",
        AppError::Upstream(e) if e.is_body() || e.is_decode() => "body_error",
        _ => "unknown_error",
    }
}

fn host_of(base_url: &str) -> String {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default()
}
