use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;

pub type JobId = u64;

/// Parsed answer of the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Processing { progress: Option<u8> },
    Completed { output_filename: String },
    Failed { message: String },
    Unknown { status: String },
}

/// What the server did with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Queued as a job; poll `processing_id` for its outcome.
    Queued { processing_id: String },
    /// Enhanced synchronously; the response body is the audio.
    Finished { audio: Bytes },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    UploadAccepted {
        job_id: JobId,
        processing_id: String,
    },
    UploadFinished {
        job_id: JobId,
        audio: PathBuf,
    },
    UploadFailed {
        job_id: JobId,
        error: TransferError,
    },
    Status {
        job_id: JobId,
        result: Result<JobStatus, TransferError>,
    },
    CooldownElapsed {
        job_id: JobId,
    },
    ProgressFrame {
        generation: u64,
        step: u32,
    },
    Downloaded(Result<PathBuf, String>),
    Health(Result<serde_json::Value, TransferError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransferError {
    pub kind: TransferErrorKind,
    pub message: String,
}

impl TransferError {
    pub(crate) fn new(kind: TransferErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferErrorKind {
    InvalidUrl,
    Input,
    Network,
    Timeout,
    /// HTTP failure status, or `success: false` with `status: None`.
    Server { status: Option<u16> },
    Decode,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Unsupported,
}

impl fmt::Display for TransferErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferErrorKind::InvalidUrl => write!(f, "invalid url"),
            TransferErrorKind::Input => write!(f, "unreadable input"),
            TransferErrorKind::Network => write!(f, "network error"),
            TransferErrorKind::Timeout => write!(f, "timeout"),
            TransferErrorKind::Server { status: Some(code) } => write!(f, "http status {code}"),
            TransferErrorKind::Server { status: None } => write!(f, "rejected by server"),
            TransferErrorKind::Decode => write!(f, "malformed response"),
            TransferErrorKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            TransferErrorKind::Unsupported => write!(f, "not supported by this backend"),
        }
    }
}
