use engine_logging::engine_debug;

use crate::transfer::HttpEndpoint;
use crate::wire::EnhanceResponse;
use crate::{
    Capabilities, Submission, TransferClient, TransferError, TransferErrorKind, TransferSettings,
    UploadPayload,
};

/// Single-call backend: the upload response body is the enhanced audio.
#[derive(Debug, Clone)]
pub struct DirectTransfer {
    http: HttpEndpoint,
}

impl DirectTransfer {
    pub fn new(settings: TransferSettings) -> Result<Self, TransferError> {
        Ok(Self {
            http: HttpEndpoint::new(&settings)?,
        })
    }
}

#[async_trait::async_trait]
impl TransferClient for DirectTransfer {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            polls_status: false,
            server_side_results: false,
        }
    }

    async fn submit(&self, payload: UploadPayload) -> Result<Submission, TransferError> {
        engine_debug!(
            "POST enhance (direct) file={} bytes={}",
            payload.file_name,
            payload.bytes.len()
        );
        let response = self.http.post_upload(payload).await?;
        let response = HttpEndpoint::ensure_success(response).await?;

        // A JSON body where audio was expected is an application-level answer.
        if HttpEndpoint::is_json(&response) {
            let body: EnhanceResponse = HttpEndpoint::read_json(response).await?;
            if !body.success {
                return body.into_submission();
            }
            return Err(TransferError::new(
                TransferErrorKind::Decode,
                "expected audio in the enhance response",
            ));
        }

        let audio = self.http.read_audio(response).await?;
        if audio.is_empty() {
            return Err(TransferError::new(
                TransferErrorKind::Decode,
                "enhance response was empty",
            ));
        }
        Ok(Submission::Finished { audio })
    }

    async fn health(&self) -> Result<serde_json::Value, TransferError> {
        self.http.health().await
    }
}
