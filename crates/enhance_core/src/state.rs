use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::playback::{MediaSource, PlaybackSurface};
use crate::progress::{ProgressPresenter, ProgressTiming};
use crate::view_model::{AppViewModel, LifecyclePhase, Severity, StatusLine};

/// Client-side identity of one enhancement attempt. Distinct from the
/// server's processing id, which only exists once the upload is accepted.
pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedInput {
    File {
        path: PathBuf,
        file_name: String,
        size_bytes: u64,
    },
    Sample {
        name: String,
        path: PathBuf,
    },
}

impl SelectedInput {
    pub fn display_name(&self) -> &str {
        match self {
            SelectedInput::File { file_name, .. } => file_name,
            SelectedInput::Sample { name, .. } => name,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            SelectedInput::File { path, .. } | SelectedInput::Sample { path, .. } => path,
        }
    }

    /// Size is only known for user files; samples are assumed non-empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, SelectedInput::File { size_bytes: 0, .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request could not be sent or its response could not be read.
    Network,
    /// Non-success HTTP status or a `success: false` payload.
    Server,
    /// The status endpoint reported a failed job.
    Processing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Uploading,
    Processing,
    Completed,
    Errored,
}

impl JobPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobPhase::Uploading | JobPhase::Processing)
    }
}

/// Everything known about the current attempt. Built fresh by every start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobController {
    id: JobId,
    phase: JobPhase,
    input_name: String,
    processing_id: Option<String>,
    progress: u8,
    result: Option<MediaSource>,
    error: Option<JobError>,
    polls: u32,
}

impl JobController {
    pub(crate) fn new(id: JobId, input_name: String) -> Self {
        Self {
            id,
            phase: JobPhase::Uploading,
            input_name,
            processing_id: None,
            progress: 0,
            result: None,
            error: None,
            polls: 0,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn processing_id(&self) -> Option<&str> {
        self.processing_id.as_deref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&MediaSource> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// Status requests scheduled so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub(crate) fn accept(&mut self, processing_id: String) {
        self.phase = JobPhase::Processing;
        self.processing_id = Some(processing_id);
    }

    pub(crate) fn record_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
    }

    pub(crate) fn record_poll(&mut self) {
        self.polls += 1;
    }

    pub(crate) fn complete(&mut self, result: MediaSource) {
        self.phase = JobPhase::Completed;
        self.progress = 100;
        self.result = Some(result);
    }

    pub(crate) fn fail(&mut self, error: JobError) {
        self.phase = JobPhase::Errored;
        self.error = Some(error);
    }
}

/// Fixed delays the lifecycle is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub progress: ProgressTiming,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            cooldown: Duration::from_millis(2000),
            progress: ProgressTiming::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    timing: Timing,
    input: Option<SelectedInput>,
    job: Option<JobController>,
    last_job_id: JobId,
    start_enabled: bool,
    progress: ProgressPresenter,
    progress_visible: bool,
    playback: PlaybackSurface,
    status: Option<StatusLine>,
    server_reachable: Option<bool>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_timing(Timing::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timing(timing: Timing) -> Self {
        Self {
            timing,
            input: None,
            job: None,
            last_job_id: 0,
            start_enabled: true,
            progress: ProgressPresenter::new(timing.progress),
            progress_visible: false,
            playback: PlaybackSurface::default(),
            status: None,
            server_reachable: None,
            dirty: false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self
                .job
                .as_ref()
                .map_or(LifecyclePhase::Idle, |job| job.phase.into()),
            job_id: self.job.as_ref().map(JobController::id),
            input_name: self.input.as_ref().map(|i| i.display_name().to_string()),
            input_size: match &self.input {
                Some(SelectedInput::File { size_bytes, .. }) => Some(*size_bytes),
                _ => None,
            },
            can_start: self.can_start(),
            can_download: self.download_source().is_some(),
            progress_visible: self.progress_visible,
            displayed_progress: self.progress.displayed(),
            progress_animating: self.progress.is_animating(),
            status: self.status.clone(),
            original: self.playback.original().cloned(),
            enhanced: self.playback.enhanced().cloned(),
            media_session: self.playback.session(),
            server_reachable: self.server_reachable,
        }
    }

    pub fn job(&self) -> Option<&JobController> {
        self.job.as_ref()
    }

    pub fn input(&self) -> Option<&SelectedInput> {
        self.input.as_ref()
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn displayed_progress(&self) -> u8 {
        self.progress.displayed()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn can_start(&self) -> bool {
        self.start_enabled
            && self.input.as_ref().is_some_and(|input| !input.is_empty())
            && !self.in_flight()
    }

    pub(crate) fn in_flight(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.phase.is_in_flight())
    }

    /// The current job, but only when `job_id` still refers to it.
    pub(crate) fn current_job_mut(&mut self, job_id: JobId) -> Option<&mut JobController> {
        self.job.as_mut().filter(|job| job.id == job_id)
    }

    pub(crate) fn set_input(&mut self, input: SelectedInput) {
        self.input = Some(input);
    }

    pub(crate) fn begin_job(&mut self) -> Option<(JobId, SelectedInput)> {
        let input = self.input.clone()?;
        self.last_job_id += 1;
        let id = self.last_job_id;
        self.job = Some(JobController::new(id, input.display_name().to_string()));
        self.start_enabled = false;
        self.progress.reset();
        self.progress_visible = true;
        self.status = None;
        Some((id, input))
    }

    /// Drops the current job without a terminal state. Returns its id.
    pub(crate) fn abandon_job(&mut self) -> Option<JobId> {
        let job = self.job.take()?;
        self.start_enabled = true;
        self.progress.reset();
        self.progress_visible = false;
        Some(job.id)
    }

    pub(crate) fn set_start_enabled(&mut self, enabled: bool) {
        self.start_enabled = enabled;
    }

    pub(crate) fn progress_mut(&mut self) -> &mut ProgressPresenter {
        &mut self.progress
    }

    pub(crate) fn set_progress_visible(&mut self, visible: bool) {
        self.progress_visible = visible;
    }

    pub(crate) fn playback_mut(&mut self) -> &mut PlaybackSurface {
        &mut self.playback
    }

    pub(crate) fn set_status(&mut self, severity: Severity, message: impl Into<String>) {
        self.status = Some(StatusLine {
            severity,
            message: message.into(),
        });
    }

    pub(crate) fn set_server_reachable(&mut self, reachable: bool) {
        self.server_reachable = Some(reachable);
    }

    /// What a download would save, if the current job produced a result.
    pub(crate) fn download_source(&self) -> Option<(MediaSource, String)> {
        let job = self.job.as_ref()?;
        if job.phase != JobPhase::Completed {
            return None;
        }
        let result = job.result.clone()?;
        let file_name = match &result {
            MediaSource::ServerResult { file_name } => file_name.clone(),
            _ => format!("enhanced_{}", job.input_name),
        };
        Some((result, file_name))
    }
}
