use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Champs requis: to, contentBase64")]
    MissingFields,

    #[error("Env vars missing")]
    MissingConfig(Vec<&'static str>),

    #[error("Token error")]
    Token { status: StatusCode, body: String },

    #[error("Graph sendMail error")]
    SendMail { status: StatusCode, body: String },

    #[error("Use POST")]
    MethodNotAllowed,

    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<&'static str>>,
}

impl ErrorBody {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            missing: None,
        }
    }

    fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::message(error)
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidJson(_) | AppError::MissingFields => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Token { status, .. } | AppError::SendMail { status, .. } => *status,
            AppError::MissingConfig(_) | AppError::Upstream(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            AppError::InvalidJson(e) => ErrorBody::with_details(self.to_string(), e.to_string()),
            AppError::MissingConfig(missing) => ErrorBody {
                missing: Some(missing.clone()),
                ..ErrorBody::message(self.to_string())
            },
            AppError::Token { body, .. } | AppError::SendMail { body, .. } => {
                ErrorBody::with_details(self.to_string(), body.clone())
            }
            AppError::MissingFields
            | AppError::MethodNotAllowed
            | AppError::Upstream(_)
            | AppError::Internal(_) => ErrorBody::message(self.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::InvalidJson(e) => {
                tracing::warn!(error = %e, "Rejected request body");
            }
            AppError::MissingFields | AppError::MethodNotAllowed => {
                tracing::warn!(error = %self, "Rejected request");
            }
            AppError::MissingConfig(missing) => {
                tracing::error!(missing = ?missing, "M365 configuration incomplete");
            }
            AppError::Token { status, .. } => {
                tracing::warn!(upstream.status = status.as_u16(), "Token request rejected");
            }
            AppError::SendMail { status, .. } => {
                tracing::warn!(upstream.status = status.as_u16(), "sendMail request rejected");
            }
            AppError::Upstream(e) => {
                tracing::error!(error = %e, "send-report error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "send-report error");
            }
        }

        (status, Json(self.body())).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    async fn response_json(error: AppError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AppError::MissingFields.to_string(),
            "Champs requis: to, contentBase64"
        );
        assert_eq!(AppError::MethodNotAllowed.to_string(), "Use POST");
        assert_eq!(
            AppError::MissingConfig(vec![]).to_string(),
            "Env vars missing"
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).to_string(),
            "boom"
        );
    }

    #[test]
    fn test_error_status_codes() {
        let invalid = serde_json::from_str::<Value>("{").unwrap_err();
        let test_cases = vec![
            (AppError::InvalidJson(invalid), StatusCode::BAD_REQUEST),
            (AppError::MissingFields, StatusCode::BAD_REQUEST),
            (AppError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
            (
                AppError::MissingConfig(vec!["M365_TENANT_ID"]),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Token {
                    status: StatusCode::UNAUTHORIZED,
                    body: String::new(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::SendMail {
                    status: StatusCode::FORBIDDEN,
                    body: String::new(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                AppError::Internal("x".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.status(), expected_status, "{error:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let parse_error = serde_json::from_str::<Value>("not json").unwrap_err();
        let expected_details = parse_error.to_string();

        let (status, body) = response_json(AppError::InvalidJson(parse_error)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "Invalid JSON", "details": expected_details})
        );
    }

    #[tokio::test]
    async fn test_missing_config_body() {
        let (status, body) =
            response_json(AppError::MissingConfig(vec!["M365_CLIENT_ID", "M365_SENDER_UPN"]))
                .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "error": "Env vars missing",
                "missing": ["M365_CLIENT_ID", "M365_SENDER_UPN"],
            })
        );
    }

    #[tokio::test]
    async fn test_upstream_bodies_are_passed_verbatim() {
        let raw = r#"{"error":"invalid_client"}"#;
        let (status, body) = response_json(AppError::Token {
            status: StatusCode::UNAUTHORIZED,
            body: raw.to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"error": "Token error", "details": raw}));

        let (status, body) = response_json(AppError::SendMail {
            status: StatusCode::BAD_REQUEST,
            body: "ErrorInvalidRecipients".to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"error": "Graph sendMail error", "details": "ErrorInvalidRecipients"})
        );
    }

    #[tokio::test]
    async fn test_simple_bodies() {
        let (status, body) = response_json(AppError::MethodNotAllowed).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, json!({"error": "Use POST"}));

        let (status, body) = response_json(AppError::Internal("connection reset".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "connection reset"}));
    }

    #[test]
    fn test_app_result_err() {
        fn returns_err() -> AppResult<()> {
            Err(AppError::MissingFields)
        }
        let result = returns_err();
        assert!(matches!(result, Err(AppError::MissingFields)));
    }
}
