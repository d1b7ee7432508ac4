use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use tokio::sync::mpsc::UnboundedSender;

use super::{Body, Request, Response, Transport, UploadEvent};
use crate::error::Result;
use crate::model::{FormData, ProfileImage};

const USER_AGENT: &str = concat!("usermanager/", env!("CARGO_PKG_VERSION"));
/// Granularity of upload progress reports.
const CHUNK_SIZE: usize = 16 * 1024;

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// Timeouts are left to the underlying client configuration.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a new [`ReqwestTransport`].
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    /// Reuse an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let Request {
            method,
            url,
            headers,
            body,
            progress,
        } = request;

        tracing::debug!(
            %method,
            %url,
            authorized = headers.contains_key(reqwest::header::AUTHORIZATION),
            "sending request"
        );

        let builder = self.client.request(method, &url).headers(headers);
        let builder = match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(form) => builder.multipart(multipart(form, progress.as_ref())?),
        };

        if let Some(progress) = &progress {
            let _ = progress.send(UploadEvent::Sent);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(%url, status = status.as_u16(), size_bytes = body.len(), "received response");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

fn multipart(form: FormData, progress: Option<&UnboundedSender<UploadEvent>>) -> Result<Form> {
    let total = form.upload_size();
    let mut multipart = Form::new();

    for (name, value) in form.fields() {
        multipart = multipart.text(name.clone(), value.clone());
    }

    let mut offset = 0;
    for (name, file) in form.files() {
        let part = file_part(file, progress.cloned(), offset, total)?;
        offset += file.len() as u64;
        multipart = multipart.part(name.clone(), part);
    }

    Ok(multipart)
}

/// Build a file part, streamed in chunks when progress is observed.
///
/// `offset` is the number of bytes of previous files in the same form.
fn file_part(
    file: &ProfileImage,
    progress: Option<UnboundedSender<UploadEvent>>,
    offset: u64,
    total: u64,
) -> Result<Part> {
    let part = match progress {
        None => Part::bytes(file.bytes.clone()),
        Some(progress) => {
            let chunks: Vec<Vec<u8>> =
                file.bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
            let mut loaded = offset;
            let stream = futures_util::stream::iter(chunks).map(move |chunk| {
                loaded += chunk.len() as u64;
                let _ = progress.send(UploadEvent::Progress { loaded, total });
                Ok::<_, std::io::Error>(chunk)
            });

            Part::stream_with_length(reqwest::Body::wrap_stream(stream), file.len() as u64)
        },
    }
    .file_name(file.file_name.clone());

    Ok(match &file.content_type {
        Some(content_type) => part.mime_str(content_type)?,
        None => part,
    })
}
