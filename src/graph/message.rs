use serde::{Deserialize, Serialize};

use crate::report::ReportRequest;

pub const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Body of `POST /users/{id}/sendMail`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub message: Message,
    pub save_to_sent_items: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub subject: String,
    pub body: ItemBody,
    pub to_recipients: Vec<Recipient>,
    pub attachments: Vec<FileAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    pub name: String,
    pub content_type: String,
    pub content_bytes: String,
}

impl From<&ReportRequest> for SendMailRequest {
    fn from(report: &ReportRequest) -> Self {
        Self {
            message: Message {
                subject: report.subject.clone(),
                body: ItemBody {
                    content_type: "Text".to_string(),
                    content: report.text.clone(),
                },
                to_recipients: vec![Recipient {
                    email_address: EmailAddress {
                        address: report.to.clone(),
                    },
                }],
                attachments: vec![FileAttachment {
                    odata_type: FILE_ATTACHMENT_TYPE.to_string(),
                    name: report.filename.clone(),
                    content_type: PDF_CONTENT_TYPE.to_string(),
                    content_bytes: report.content_base64.clone(),
                }],
            },
            save_to_sent_items: true,
        }
    }
}

/// Successful token endpoint response. Other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}
