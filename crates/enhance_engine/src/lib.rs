//! Enhance engine: transfer clients, timers and effect execution.
mod direct;
mod engine;
mod input;
mod persist;
mod polling;
mod schedule;
mod transfer;
mod types;
mod wire;

pub use direct::DirectTransfer;
pub use engine::{DownloadSource, EngineConfig, EngineHandle};
pub use input::{audio_mime, describe_file, load_payload, resolve_sample, InputError, UploadPayload};
pub use persist::{ensure_output_dir, safe_file_name, AtomicFileWriter, MediaStore, PersistError};
pub use polling::PollingTransfer;
pub use schedule::TaskScheduler;
pub use transfer::{build_transfer, BackendKind, Capabilities, TransferClient, TransferSettings};
pub use types::{EngineEvent, JobId, JobStatus, Submission, TransferError, TransferErrorKind};
