//! JSON bodies exchanged with the enhancement service.

use serde::Deserialize;

use crate::{JobStatus, Submission, TransferError, TransferErrorKind};

#[derive(Debug, Deserialize)]
pub(crate) struct EnhanceResponse {
    #[serde(default)]
    pub success: bool,
    pub processing_id: Option<String>,
    pub error: Option<String>,
}

impl EnhanceResponse {
    pub fn into_submission(self) -> Result<Submission, TransferError> {
        if !self.success {
            return Err(TransferError::new(
                TransferErrorKind::Server { status: None },
                self.error.unwrap_or_else(|| "Upload failed".to_string()),
            ));
        }
        match self.processing_id {
            Some(processing_id) if !processing_id.is_empty() => {
                Ok(Submission::Queued { processing_id })
            }
            _ => Err(TransferError::new(
                TransferErrorKind::Decode,
                "upload response has no processing_id",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub status: String,
    pub progress: Option<f64>,
    pub result: Option<StatusResult>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResult {
    #[serde(default)]
    pub success: bool,
    pub output_filename: Option<String>,
    pub error: Option<String>,
}

impl From<StatusResponse> for JobStatus {
    fn from(response: StatusResponse) -> Self {
        match response.status.as_str() {
            "processing" | "uploading" => JobStatus::Processing {
                progress: response.progress.map(clamp_progress),
            },
            "completed" => match response.result {
                Some(StatusResult {
                    success: true,
                    output_filename: Some(output_filename),
                    ..
                }) => JobStatus::Completed { output_filename },
                Some(result) => JobStatus::Failed {
                    message: result
                        .error
                        .unwrap_or_else(|| "Enhancement failed".to_string()),
                },
                None => JobStatus::Failed {
                    message: "Enhancement failed".to_string(),
                },
            },
            "error" => JobStatus::Failed {
                message: response
                    .error
                    .unwrap_or_else(|| "Processing failed".to_string()),
            },
            other => JobStatus::Unknown {
                status: other.to_string(),
            },
        }
    }
}

fn clamp_progress(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Pulls a human readable message out of an error body, if it has one.
/// Flask handlers answer `{"error": ..}`, FastAPI ones `{"detail": ..}`.
pub(crate) fn server_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error", "detail"]
        .iter()
        .filter_map(|key| value.get(key)?.as_str())
        .find(|message| !message.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> JobStatus {
        serde_json::from_str::<StatusResponse>(json).unwrap().into()
    }

    #[test]
    fn processing_progress_is_rounded_and_clamped() {
        assert_eq!(
            status(r#"{"status":"processing","progress":42.6}"#),
            JobStatus::Processing { progress: Some(43) }
        );
        assert_eq!(
            status(r#"{"status":"processing","progress":140}"#),
            JobStatus::Processing { progress: Some(100) }
        );
        assert_eq!(
            status(r#"{"status":"processing"}"#),
            JobStatus::Processing { progress: None }
        );
    }

    #[test]
    fn completed_without_success_is_failure() {
        assert_eq!(
            status(r#"{"status":"completed","result":{"success":false,"error":"clipped"}}"#),
            JobStatus::Failed {
                message: "clipped".into()
            }
        );
        assert_eq!(
            status(r#"{"status":"completed"}"#),
            JobStatus::Failed {
                message: "Enhancement failed".into()
            }
        );
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        assert_eq!(
            status(r#"{"status":"queued"}"#),
            JobStatus::Unknown {
                status: "queued".into()
            }
        );
    }

    #[test]
    fn error_message_falls_back() {
        assert_eq!(
            status(r#"{"status":"error"}"#),
            JobStatus::Failed {
                message: "Processing failed".into()
            }
        );
    }

    #[test]
    fn upload_rejection_uses_server_message() {
        let response: EnhanceResponse =
            serde_json::from_str(r#"{"success":false,"error":"too large"}"#).unwrap();
        let err = response.into_submission().unwrap_err();
        assert_eq!(err.kind, TransferErrorKind::Server { status: None });
        assert_eq!(err.message, "too large");

        let response: EnhanceResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(response.into_submission().unwrap_err().message, "Upload failed");
    }

    #[test]
    fn server_message_reads_error_or_detail() {
        assert_eq!(server_message(br#"{"error":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(server_message(br#"{"detail":"bad wav"}"#).as_deref(), Some("bad wav"));
        assert_eq!(server_message(b"<html>502</html>"), None);
        assert_eq!(server_message(br#"{"error":""}"#), None);
    }
}
