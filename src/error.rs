//! Error handler for the user management client.

use reqwest::StatusCode;
use reqwest::header::InvalidHeaderValue;
use thiserror::Error;
use validator::ValidationErrors;

use crate::model::CustomHttpResponse;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Message shown when the backend gave nothing better.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred. Please try again.";
/// Title shown alongside [`DEFAULT_ERROR_MESSAGE`].
pub const DEFAULT_ERROR_TITLE: &str = "Error";

/// Enum representing client-side errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend answered {status}: {}", body.message)]
    Api {
        status: u16,
        body: CustomHttpResponse,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("login response carries no token header")]
    MissingToken,

    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("invalid header value")]
    Header(#[from] InvalidHeaderValue),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("storage failure, {details}")]
    Storage {
        details: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl ClientError {
    /// Wrap a persistent storage failure.
    pub fn storage<E>(details: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            details: details.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Build an [`ClientError::Api`] out of a non-2xx status and its raw body.
    ///
    /// Bodies that are not shaped like a [`CustomHttpResponse`] are replaced
    /// by an envelope derived from the status code.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let body = serde_json::from_slice::<CustomHttpResponse>(body)
            .unwrap_or_else(|_| CustomHttpResponse::from_status(status));

        Self::Api {
            status: status.as_u16(),
            body,
        }
    }

    /// Backend envelope carried by this error, if any.
    pub fn response(&self) -> Option<&CustomHttpResponse> {
        match self {
            ClientError::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    /// `(message, title)` pair to show to the user.
    pub fn notification(&self) -> (String, String) {
        match self.response() {
            Some(body) if !body.message.is_empty() => {
                (body.message.clone(), body.reason.clone())
            },
            _ => (
                DEFAULT_ERROR_MESSAGE.to_owned(),
                DEFAULT_ERROR_TITLE.to_owned(),
            ),
        }
    }
}
