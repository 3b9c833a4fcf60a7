use std::time::Duration;

use crate::{
    AppState, Effect, ErrorKind, JobError, JobId, JobPhase, MediaSource, Msg, ProgressCommand,
    SelectedInput, Severity, StatusReport,
};

const SERVER_UNREACHABLE: &str =
    "Unable to connect to the enhancement server. Please ensure the backend is running.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => vec![Effect::CheckHealth],
        Msg::InputSelected(input) => select_input(&mut state, input),
        Msg::EnhanceClicked => start_enhance(&mut state),
        Msg::CancelClicked => {
            if !state.in_flight() {
                return (state, Vec::new());
            }
            let effects = supersede(&mut state);
            state.set_status(Severity::Error, "Enhancement cancelled");
            state.mark_dirty();
            effects
        }
        Msg::DownloadClicked => match state.download_source() {
            Some((source, file_name)) => vec![Effect::Download { source, file_name }],
            None => Vec::new(),
        },
        Msg::UploadAccepted {
            job_id,
            processing_id,
        } => {
            let Some(job) = state.current_job_mut(job_id) else {
                return (state, Vec::new());
            };
            if job.phase() != JobPhase::Uploading {
                return (state, Vec::new());
            }
            job.accept(processing_id.clone());
            job.record_poll();
            state.set_status(Severity::Processing, "Processing audio...");
            state.mark_dirty();
            vec![Effect::SchedulePoll {
                job_id,
                processing_id,
                delay: Duration::ZERO,
            }]
        }
        Msg::UploadFinished { job_id, audio } => {
            let audio = MediaSource::Owned(audio);
            let accepted = state
                .current_job_mut(job_id)
                .is_some_and(|job| job.phase() == JobPhase::Uploading);
            if !accepted {
                // Late result of a superseded job: nobody will ever play it.
                return (state, vec![Effect::ReleaseMedia(audio)]);
            }
            complete(&mut state, job_id, audio)
        }
        Msg::UploadFailed { job_id, error } => {
            let accepted = state
                .current_job_mut(job_id)
                .is_some_and(|job| job.phase() == JobPhase::Uploading);
            if !accepted {
                return (state, Vec::new());
            }
            fail(&mut state, job_id, error)
        }
        Msg::StatusReceived { job_id, report } => {
            let accepted = state
                .current_job_mut(job_id)
                .is_some_and(|job| job.phase() == JobPhase::Processing);
            if !accepted {
                return (state, Vec::new());
            }
            apply_status(&mut state, job_id, report)
        }
        Msg::StatusFailed { job_id, error } => {
            let accepted = state
                .current_job_mut(job_id)
                .is_some_and(|job| job.phase() == JobPhase::Processing);
            if !accepted {
                return (state, Vec::new());
            }
            fail(&mut state, job_id, error)
        }
        Msg::ProgressFrame { generation, step } => {
            if state.progress_mut().apply_frame(generation, step).is_some() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::CooldownElapsed { job_id } => {
            let Some(job) = state.current_job_mut(job_id) else {
                return (state, Vec::new());
            };
            match job.phase() {
                JobPhase::Errored => state.set_start_enabled(true),
                JobPhase::Completed => {}
                JobPhase::Uploading | JobPhase::Processing => return (state, Vec::new()),
            }
            state.set_progress_visible(false);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DownloadFinished { path } => {
            state.set_status(Severity::Success, format!("Saved to {}", path.display()));
            state.mark_dirty();
            Vec::new()
        }
        Msg::DownloadFailed { message: _ } => {
            state.set_status(Severity::Error, "Download failed. Please try again.");
            state.mark_dirty();
            Vec::new()
        }
        Msg::HealthChecked { reachable } => {
            state.set_server_reachable(reachable);
            if !reachable {
                state.set_status(Severity::Error, SERVER_UNREACHABLE);
            }
            state.mark_dirty();
            Vec::new()
        }
    };

    (state, effects)
}

fn select_input(state: &mut AppState, input: SelectedInput) -> Vec<Effect> {
    let mut effects = supersede(state);
    let original = MediaSource::LocalFile(input.path().clone());
    effects.extend(
        state
            .playback_mut()
            .set_original(original)
            .into_iter()
            .map(Effect::ReleaseMedia),
    );
    effects.extend(
        state
            .playback_mut()
            .clear_enhanced()
            .into_iter()
            .map(Effect::ReleaseMedia),
    );
    state.set_input(input);
    state.mark_dirty();
    effects
}

fn start_enhance(state: &mut AppState) -> Vec<Effect> {
    if !state.can_start() {
        return Vec::new();
    }
    let previous = state.job().map(|job| job.id());
    let Some((job_id, input)) = state.begin_job() else {
        return Vec::new();
    };

    let mut effects = Vec::with_capacity(4);
    if let Some(previous) = previous {
        effects.push(Effect::CancelJob { job_id: previous });
    }
    effects.push(Effect::StopAnimation);
    effects.extend(
        state
            .playback_mut()
            .clear_enhanced()
            .into_iter()
            .map(Effect::ReleaseMedia),
    );
    effects.push(Effect::Upload { job_id, input });
    state.mark_dirty();
    effects
}

/// Drops the current job so nothing it still produces can reach the UI.
fn supersede(state: &mut AppState) -> Vec<Effect> {
    match state.abandon_job() {
        Some(job_id) => vec![Effect::CancelJob { job_id }, Effect::StopAnimation],
        None => Vec::new(),
    }
}

fn apply_status(state: &mut AppState, job_id: JobId, report: StatusReport) -> Vec<Effect> {
    match report {
        StatusReport::Processing { progress } => {
            let interval = state.timing().poll_interval;
            let Some(job) = state.current_job_mut(job_id) else {
                return Vec::new();
            };
            if let Some(progress) = progress {
                job.record_progress(progress);
            }
            job.record_poll();
            let target = job.progress();
            let Some(processing_id) = job.processing_id().map(str::to_owned) else {
                return Vec::new();
            };

            let mut effects = progress_effects(state, target);
            effects.push(Effect::SchedulePoll {
                job_id,
                processing_id,
                delay: interval,
            });
            state.mark_dirty();
            effects
        }
        StatusReport::Completed { output_filename } => complete(
            state,
            job_id,
            MediaSource::ServerResult {
                file_name: output_filename,
            },
        ),
        StatusReport::Failed { message } => {
            fail(state, job_id, JobError::new(ErrorKind::Processing, message))
        }
        StatusReport::Unknown { status } => fail(
            state,
            job_id,
            JobError::new(
                ErrorKind::Processing,
                format!("Unexpected job status: {status}"),
            ),
        ),
    }
}

fn complete(state: &mut AppState, job_id: JobId, result: MediaSource) -> Vec<Effect> {
    let cooldown = state.timing().cooldown;
    let Some(job) = state.current_job_mut(job_id) else {
        return Vec::new();
    };
    job.complete(result.clone());

    let mut effects: Vec<Effect> = state
        .playback_mut()
        .set_enhanced(result)
        .into_iter()
        .map(Effect::ReleaseMedia)
        .collect();
    effects.extend(progress_effects(state, 100));
    effects.push(Effect::ScheduleCooldown {
        job_id,
        delay: cooldown,
    });
    state.set_status(Severity::Success, "Enhancement completed successfully!");
    state.set_start_enabled(true);
    state.mark_dirty();
    effects
}

fn fail(state: &mut AppState, job_id: JobId, error: JobError) -> Vec<Effect> {
    let cooldown = state.timing().cooldown;
    let Some(job) = state.current_job_mut(job_id) else {
        return Vec::new();
    };
    let message = format!("Error: {}", error.message);
    job.fail(error);
    state.set_status(Severity::Error, message);
    state.mark_dirty();
    vec![Effect::ScheduleCooldown {
        job_id,
        delay: cooldown,
    }]
}

fn progress_effects(state: &mut AppState, target: u8) -> Vec<Effect> {
    match state.progress_mut().set_target(target) {
        ProgressCommand::Snap(_) => vec![Effect::StopAnimation],
        ProgressCommand::Animate(animation) => vec![Effect::AnimateProgress(animation)],
    }
}
