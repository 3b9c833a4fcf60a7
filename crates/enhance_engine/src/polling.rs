use bytes::Bytes;
use engine_logging::engine_debug;
use url::Url;

use crate::transfer::HttpEndpoint;
use crate::wire::{EnhanceResponse, StatusResponse};
use crate::{
    Capabilities, JobStatus, Submission, TransferClient, TransferError, TransferSettings,
    UploadPayload,
};

/// Job-id backend: `POST /enhance` queues, `GET /status/{id}` reports,
/// `GET /download/{f}` streams and `GET /outputs/{f}` saves.
#[derive(Debug, Clone)]
pub struct PollingTransfer {
    http: HttpEndpoint,
}

impl PollingTransfer {
    pub fn new(settings: TransferSettings) -> Result<Self, TransferError> {
        Ok(Self {
            http: HttpEndpoint::new(&settings)?,
        })
    }
}

#[async_trait::async_trait]
impl TransferClient for PollingTransfer {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            polls_status: true,
            server_side_results: true,
        }
    }

    async fn submit(&self, payload: UploadPayload) -> Result<Submission, TransferError> {
        engine_debug!(
            "POST enhance file={} bytes={}",
            payload.file_name,
            payload.bytes.len()
        );
        let response = self.http.post_upload(payload).await?;
        let response = HttpEndpoint::ensure_success(response).await?;
        let body: EnhanceResponse = HttpEndpoint::read_json(response).await?;
        body.into_submission()
    }

    async fn fetch_status(&self, processing_id: &str) -> Result<JobStatus, TransferError> {
        let response = self.http.get(&["status", processing_id]).await?;
        let response = HttpEndpoint::ensure_success(response).await?;
        let body: StatusResponse = HttpEndpoint::read_json(response).await?;
        Ok(body.into())
    }

    async fn fetch_result(&self, file_name: &str) -> Result<Bytes, TransferError> {
        let response = self.http.get(&["outputs", file_name]).await?;
        let response = HttpEndpoint::ensure_success(response).await?;
        self.http.read_audio(response).await
    }

    fn result_url(&self, file_name: &str) -> Result<Url, TransferError> {
        self.http.endpoint(&["download", file_name])
    }

    async fn health(&self) -> Result<serde_json::Value, TransferError> {
        self.http.health().await
    }
}
