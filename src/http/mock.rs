//! Scripted transport for unit tests. MUST NEVER be used in production.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::{Request, Response, Transport, UploadEvent};
use crate::error::Result;

/// Records every request and replays queued responses in order.
///
/// When the queue is empty, answers `200 OK` with an empty JSON object.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<Request>>,
    responses: Mutex<VecDeque<Response>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn respond(&self, status: StatusCode, body: serde_json::Value) -> &Self {
        self.respond_with_headers(status, &[], body)
    }

    pub fn respond_with_headers(
        &self,
        status: StatusCode,
        headers: &[(&str, &str)],
        body: serde_json::Value,
    ) -> &Self {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }

        self.responses.lock().push_back(Response {
            status,
            headers: map,
            body: serde_json::to_vec(&body).unwrap(),
        });
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn last(&self) -> Request {
        self.requests.lock().last().cloned().expect("no request sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        if let Some(progress) = &request.progress {
            let _ = progress.send(UploadEvent::Sent);
        }
        self.requests.lock().push(request);

        Ok(self.responses.lock().pop_front().unwrap_or_else(|| Response {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: b"{}".to_vec(),
        }))
    }
}
