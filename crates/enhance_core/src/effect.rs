use std::time::Duration;

use crate::{Animation, JobId, MediaSource, SelectedInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckHealth,
    Upload {
        job_id: JobId,
        input: SelectedInput,
    },
    /// Fetch the job status once, after `delay`.
    SchedulePoll {
        job_id: JobId,
        processing_id: String,
        delay: Duration,
    },
    ScheduleCooldown {
        job_id: JobId,
        delay: Duration,
    },
    /// Cancel every timer still pending for the job.
    CancelJob { job_id: JobId },
    /// Start driving an animation, replacing any running one.
    AnimateProgress(Animation),
    StopAnimation,
    ReleaseMedia(MediaSource),
    Download {
        source: MediaSource,
        file_name: String,
    },
}
