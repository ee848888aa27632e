use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
};
use chrono::{SecondsFormat, Utc};
use opentelemetry::KeyValue;
use serde::Serialize;

use crate::AppState;
use crate::config::EnvPresence;
use crate::error::{AppError, AppResult};
use crate::graph::SendMailRequest;
use crate::report::ReportRequestBody;
use crate::telemetry::metrics::REPORT_SEND_COUNT;

pub const DIAGNOSTIC_HINT: &str = "Use POST with JSON body";

#[derive(Debug, Serialize)]
pub struct Diagnostics {
    pub ok: bool,
    pub hint: &'static str,
    pub env: EnvPresence,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct SendReportResponse {
    pub success: bool,
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Reports which credentials are configured, never their values.
pub async fn diagnostics(State(state): State<AppState>) -> Json<Diagnostics> {
    Json(Diagnostics {
        ok: true,
        hint: DIAGNOSTIC_HINT,
        env: state.config.m365.presence(),
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub async fn send_report(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<SendReportResponse>> {
    let result = deliver(&state, &body).await;

    REPORT_SEND_COUNT.add(1, &[KeyValue::new("outcome", outcome(&result))]);

    result.map(|()| Json(SendReportResponse { success: true }))
}

async fn deliver(state: &AppState, body: &[u8]) -> AppResult<()> {
    let report = ReportRequestBody::parse(body)?.validate()?;
    let credentials = state.config.m365.credentials()?;

    let token = state.graph.acquire_token(&credentials).await?;

    let payload = SendMailRequest::from(&report);
    state
        .graph
        .send_mail(&token, &credentials.sender_upn, &payload)
        .await?;

    tracing::info!(
        attachment = %report.filename,
        attachment_b64_len = report.content_base64.len(),
        "Report sent"
    );

    Ok(())
}

fn outcome(result: &AppResult<()>) -> &'static str {
    match result {
        Ok(()) => "sent",
        Err(AppError::InvalidJson(_) | AppError::MissingFields) => "rejected",
        Err(AppError::MissingConfig(_)) => "misconfigured",
        Err(AppError::Token { .. }) => "token_error",
        Err(AppError::SendMail { .. }) => "send_error",
        Err(_) => "failed",
    }
}
