//! Transport seam between the services and the network.

mod client;
#[cfg(test)]
pub(crate) mod mock;

pub use client::ReqwestTransport;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use crate::error::{ClientError, Result};
use crate::model::{FormData, User};

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(FormData),
}

/// Events reported while a multipart upload is in flight.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadEvent {
    /// The request left the client.
    Sent,
    /// `loaded` of `total` file bytes were handed to the connection.
    Progress { loaded: u64, total: u64 },
    /// The upload completed and the backend answered.
    Response(User),
}

/// Outgoing request.
#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Body,
    /// Where to report upload progress, if anyone listens.
    pub progress: Option<UnboundedSender<UploadEvent>>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Body::Empty,
            progress: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Serialize `body` as JSON.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Body::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, form: FormData) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    pub fn progress(mut self, sender: UnboundedSender<UploadEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Header value as text, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Fully buffered response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Turn any non-2xx answer into [`ClientError::Api`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, &self.body))
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Port for sending requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and buffer its response, whatever its status.
    async fn send(&self, request: Request) -> Result<Response>;
}

/// Join `segments` onto `host`, percent-encoding each of them.
pub fn endpoint(host: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(host)?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);

    Ok(url.to_string())
}
