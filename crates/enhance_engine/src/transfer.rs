use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::wire::server_message;
use crate::{
    DirectTransfer, JobStatus, PollingTransfer, Submission, TransferError, TransferErrorKind,
    UploadPayload,
};

/// Which backend contract the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Upload returns a job id; status is polled until terminal.
    #[default]
    Polling,
    /// Upload response body is the enhanced audio.
    Direct,
}

impl BackendKind {
    /// Multipart field name each backend expects the audio under.
    pub fn default_upload_field(self) -> &'static str {
        match self {
            BackendKind::Polling => "audio",
            BackendKind::Direct => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub base_url: String,
    pub backend: BackendKind,
    pub upload_field: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_result_bytes: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            backend: BackendKind::default(),
            upload_field: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            max_result_bytes: 512 * 1024 * 1024,
        }
    }
}

impl TransferSettings {
    pub fn upload_field(&self) -> &str {
        self.upload_field
            .as_deref()
            .unwrap_or_else(|| self.backend.default_upload_field())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `fetch_status` is meaningful.
    pub polls_status: bool,
    /// Results stay on the server and can be fetched by filename.
    pub server_side_results: bool,
}

/// Outbound calls to the enhancement service. No call is ever retried here.
#[async_trait::async_trait]
pub trait TransferClient: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    async fn submit(&self, payload: UploadPayload) -> Result<Submission, TransferError>;

    async fn fetch_status(&self, _processing_id: &str) -> Result<JobStatus, TransferError> {
        Err(unsupported("status polling"))
    }

    /// Downloads a finished output for saving.
    async fn fetch_result(&self, _file_name: &str) -> Result<Bytes, TransferError> {
        Err(unsupported("server-side results"))
    }

    /// Address a player can stream a finished output from.
    fn result_url(&self, _file_name: &str) -> Result<Url, TransferError> {
        Err(unsupported("server-side results"))
    }

    async fn health(&self) -> Result<serde_json::Value, TransferError>;
}

/// Builds the variant selected by `settings.backend`.
pub fn build_transfer(
    settings: TransferSettings,
) -> Result<Arc<dyn TransferClient>, TransferError> {
    Ok(match settings.backend {
        BackendKind::Polling => Arc::new(PollingTransfer::new(settings)?),
        BackendKind::Direct => Arc::new(DirectTransfer::new(settings)?),
    })
}

fn unsupported(what: &str) -> TransferError {
    TransferError::new(
        TransferErrorKind::Unsupported,
        format!("{what} is not available with this backend"),
    )
}

/// HTTP plumbing shared by both backend variants.
#[derive(Debug, Clone)]
pub(crate) struct HttpEndpoint {
    client: reqwest::Client,
    base: Url,
    upload_field: String,
    max_result_bytes: u64,
}

impl HttpEndpoint {
    pub fn new(settings: &TransferSettings) -> Result<Self, TransferError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| TransferError::new(TransferErrorKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(TransferError::new(
                TransferErrorKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| TransferError::new(TransferErrorKind::Network, err.to_string()))?;

        Ok(Self {
            client,
            base,
            upload_field: settings.upload_field().to_string(),
            max_result_bytes: settings.max_result_bytes,
        })
    }

    /// `base` extended by percent-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, TransferError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                TransferError::new(TransferErrorKind::InvalidUrl, "base url has no path")
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn post_upload(
        &self,
        payload: UploadPayload,
    ) -> Result<reqwest::Response, TransferError> {
        let url = self.endpoint(&["enhance"])?;
        let part = reqwest::multipart::Part::bytes(payload.bytes.to_vec())
            .file_name(payload.file_name)
            .mime_str(payload.mime)
            .map_err(map_reqwest_error)?;
        let form = reqwest::multipart::Form::new().part(self.upload_field.clone(), part);

        self.client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)
    }

    pub async fn get(&self, segments: &[&str]) -> Result<reqwest::Response, TransferError> {
        let url = self.endpoint(segments)?;
        self.client.get(url).send().await.map_err(map_reqwest_error)
    }

    /// Fails with the server's own message on a non-success status.
    pub async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TransferError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        let message = server_message(&body)
            .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
        Err(TransferError::new(
            TransferErrorKind::Server {
                status: Some(status.as_u16()),
            },
            message,
        ))
    }

    pub async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransferError> {
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| TransferError::new(TransferErrorKind::Decode, err.to_string()))
    }

    pub fn is_json(response: &reqwest::Response) -> bool {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim())
            .is_some_and(|ct| ct.eq_ignore_ascii_case("application/json"))
    }

    /// Reads an audio body, refusing anything above the configured limit.
    pub async fn read_audio(&self, response: reqwest::Response) -> Result<Bytes, TransferError> {
        let max_bytes = self.max_result_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(TransferError::new(
                    TransferErrorKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut audio = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = audio.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(TransferError::new(
                    TransferErrorKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            audio.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(audio))
    }

    pub async fn health(&self) -> Result<serde_json::Value, TransferError> {
        let response = Self::ensure_success(self.get(&["health"]).await?).await?;
        Self::read_json(response).await
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(TransferErrorKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return TransferError::new(TransferErrorKind::Decode, err.to_string());
    }
    TransferError::new(TransferErrorKind::Network, err.to_string())
}
