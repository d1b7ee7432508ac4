use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Status envelope returned by the backend, on errors and some successes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomHttpResponse {
    pub http_status_code: u16,
    pub http_status: String,
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<String>,
}

impl CustomHttpResponse {
    /// Envelope built from a bare status, without any backend message.
    pub fn from_status(status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or_default().to_uppercase();

        Self {
            http_status_code: status.as_u16(),
            http_status: reason.replace(' ', "_"),
            reason,
            ..Default::default()
        }
    }
}
