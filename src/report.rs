use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const DEFAULT_SUBJECT: &str = "Rapport d'audit";
pub const DEFAULT_TEXT: &str = "Bonjour, veuillez trouver le rapport en pièce jointe.";
pub const DEFAULT_FILENAME: &str = "rapport.pdf";

/// Inbound body as sent by the caller. Fields that are absent or not strings
/// deserialize to `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequestBody {
    #[serde(default, deserialize_with = "string_or_none")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub content_base64: Option<String>,
}

/// Only JSON strings are kept. Any other value, truthy numbers and objects
/// included, reads as absent, so `{"to": 5}` fails the required-field check
/// instead of being forwarded as a recipient.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// A validated report with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub filename: String,
    /// Base64 PDF, forwarded as given.
    pub content_base64: String,
}

impl ReportRequestBody {
    /// Decodes a raw request body. An empty body reads as `{}`, a JSON string
    /// is decoded a second time, and any non-object value carries no fields.
    pub fn parse(raw: &[u8]) -> AppResult<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(raw).map_err(AppError::InvalidJson)?;
        let value = match value {
            Value::String(inner) => {
                serde_json::from_str(&inner).map_err(AppError::InvalidJson)?
            }
            other => other,
        };

        match value {
            Value::Object(_) => {
                serde_json::from_value(value).map_err(|e| AppError::Internal(e.to_string()))
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(self) -> AppResult<ReportRequest> {
        let to = self.to.filter(|v| !v.is_empty());
        let content_base64 = self.content_base64.filter(|v| !v.is_empty());

        let (Some(to), Some(content_base64)) = (to, content_base64) else {
            return Err(AppError::MissingFields);
        };

        Ok(ReportRequest {
            to,
            subject: self.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            text: self.text.unwrap_or_else(|| DEFAULT_TEXT.to_string()),
            filename: self.filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            content_base64,
        })
    }
}
