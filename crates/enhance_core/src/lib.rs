//! Enhance core: pure job lifecycle state machine and view-model helpers.
mod effect;
mod msg;
mod playback;
mod progress;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{Msg, StatusReport};
pub use playback::{MediaSource, PlaybackSurface};
pub use progress::{Animation, ProgressCommand, ProgressPresenter, ProgressTiming};
pub use state::{
    AppState, ErrorKind, JobController, JobError, JobId, JobPhase, SelectedInput, Timing,
};
pub use update::update;
pub use view_model::{
    format_duration, format_file_size, AppViewModel, LifecyclePhase, Severity, StatusLine,
};
