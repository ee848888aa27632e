use std::env;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use serde::Serialize;

use crate::error::AppError;

pub const TENANT_ID_VAR: &str = "M365_TENANT_ID";
pub const CLIENT_ID_VAR: &str = "M365_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "M365_CLIENT_SECRET";
pub const SENDER_UPN_VAR: &str = "M365_SENDER_UPN";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub allow_origin: HeaderValue,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
    pub login_base_url: String,
    pub graph_base_url: String,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
    pub m365: M365Settings,
}

/// Microsoft 365 application credentials. Every field is optional at startup;
/// absence is reported by the diagnostic endpoint and rejected when sending.
#[derive(Clone, Default)]
pub struct M365Settings {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub sender_upn: Option<String>,
}

impl std::fmt::Debug for M365Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("M365Settings")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("sender_upn", &self.sender_upn)
            .finish()
    }
}

/// Credentials that passed presence validation.
#[derive(Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub sender_upn: String,
}

/// Which credentials are configured, keyed by variable name when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnvPresence {
    #[serde(rename = "M365_TENANT_ID")]
    pub tenant_id: bool,
    #[serde(rename = "M365_CLIENT_ID")]
    pub client_id: bool,
    #[serde(rename = "M365_CLIENT_SECRET")]
    pub client_secret: bool,
    #[serde(rename = "M365_SENDER_UPN")]
    pub sender_upn: bool,
}

impl M365Settings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            tenant_id: read(TENANT_ID_VAR),
            client_id: read(CLIENT_ID_VAR),
            client_secret: read(CLIENT_SECRET_VAR),
            sender_upn: read(SENDER_UPN_VAR),
        }
    }

    pub fn presence(&self) -> EnvPresence {
        EnvPresence {
            tenant_id: is_set(&self.tenant_id),
            client_id: is_set(&self.client_id),
            client_secret: is_set(&self.client_secret),
            sender_upn: is_set(&self.sender_upn),
        }
    }

    /// Names of the unset variables, always in declaration order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (TENANT_ID_VAR, &self.tenant_id),
            (CLIENT_ID_VAR, &self.client_id),
            (CLIENT_SECRET_VAR, &self.client_secret),
            (SENDER_UPN_VAR, &self.sender_upn),
        ]
        .into_iter()
        .filter(|(_, value)| !is_set(value))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn credentials(&self) -> Result<Credentials, AppError> {
        match (
            &self.tenant_id,
            &self.client_id,
            &self.client_secret,
            &self.sender_upn,
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret), Some(sender_upn))
                if self.missing().is_empty() =>
            {
                Ok(Credentials {
                    tenant_id: tenant_id.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    sender_upn: sender_upn.clone(),
                })
            }
            _ => Err(AppError::MissingConfig(self.missing())),
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("APP_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()
            .context("APP_PORT must be a number")?;

        let request_timeout_secs: u64 = lookup("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse()
            .context("REQUEST_TIMEOUT_SECS must be a number")?;

        let body_limit_bytes = lookup("BODY_LIMIT_BYTES")
            .unwrap_or_else(|| "10485760".to_string())
            .parse()
            .context("BODY_LIMIT_BYTES must be a number")?;

        let allow_origin = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".to_string());
        let allow_origin = HeaderValue::from_str(&allow_origin)
            .context("CORS_ALLOW_ORIGIN must be a valid header value")?;

        Ok(Self {
            port,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            allow_origin,
            request_timeout: Duration::from_secs(request_timeout_secs),
            body_limit_bytes,
            login_base_url: lookup("M365_LOGIN_BASE_URL")
                .unwrap_or_else(|| "https://login.microsoftonline.com".to_string()),
            graph_base_url: lookup("GRAPH_BASE_URL")
                .unwrap_or_else(|| "https://graph.microsoft.com".to_string()),
            otel_service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "report-mailer".to_string()),
            otel_exporter_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| "http://localhost:4317".to_string()),
            m365: M365Settings::from_lookup(&lookup),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
