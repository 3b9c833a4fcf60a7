use std::path::PathBuf;

use crate::{JobError, JobId, SelectedInput};

/// What the status endpoint said about a job, already checked for
/// application-level success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    Processing { progress: Option<u8> },
    Completed { output_filename: String },
    Failed { message: String },
    /// A status string the client does not understand.
    Unknown { status: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Client started; used to trigger the connectivity check.
    Started,
    /// User chose a file or a bundled sample.
    InputSelected(SelectedInput),
    /// User clicked Enhance.
    EnhanceClicked,
    /// User navigated away from the current job.
    CancelClicked,
    /// User asked to save the enhanced audio.
    DownloadClicked,
    /// Server accepted the upload and queued a job.
    UploadAccepted {
        job_id: JobId,
        processing_id: String,
    },
    /// Server answered the upload with finished audio, stored at `audio`.
    UploadFinished { job_id: JobId, audio: PathBuf },
    UploadFailed { job_id: JobId, error: JobError },
    StatusReceived { job_id: JobId, report: StatusReport },
    StatusFailed { job_id: JobId, error: JobError },
    /// One step of a progress animation elapsed.
    ProgressFrame { generation: u64, step: u32 },
    /// Post-terminal delay for hiding transient UI elapsed.
    CooldownElapsed { job_id: JobId },
    DownloadFinished { path: PathBuf },
    DownloadFailed { message: String },
    HealthChecked { reachable: bool },
}
