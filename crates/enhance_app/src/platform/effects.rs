use std::sync::{mpsc, Arc};
use std::thread;

use engine_logging::{engine_debug, engine_info, engine_warn, job_info, set_current_job};
use enhance_core::{Effect, ErrorKind, JobError, MediaSource, Msg, SelectedInput, StatusReport};
use enhance_engine::{
    DownloadSource, EngineConfig, EngineEvent, EngineHandle, JobStatus, TransferClient,
    TransferError, TransferErrorKind,
};

use super::app::Input;

/// Executes core effects on the engine and feeds engine events back into
/// the message loop.
pub struct EffectRunner {
    engine: EngineHandle,
    transfer: Arc<dyn TransferClient>,
}

impl EffectRunner {
    pub fn new(
        transfer: Arc<dyn TransferClient>,
        config: EngineConfig,
        input_tx: mpsc::Sender<Input>,
    ) -> std::io::Result<Self> {
        let (engine, events) = EngineHandle::spawn(transfer.clone(), config)?;
        spawn_event_loop(events, input_tx)?;
        Ok(Self { engine, transfer })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CheckHealth => self.engine.check_health(),
                Effect::Upload { job_id, input } => {
                    set_current_job(job_id);
                    job_info!("uploading {:?}", input.path());
                    self.engine
                        .upload(job_id, input.path().clone(), upload_name(&input));
                }
                Effect::SchedulePoll {
                    job_id,
                    processing_id,
                    delay,
                } => self.engine.poll(job_id, processing_id, delay),
                Effect::ScheduleCooldown { job_id, delay } => self.engine.cooldown(job_id, delay),
                Effect::CancelJob { job_id } => {
                    engine_debug!("dropping job {}", job_id);
                    self.engine.cancel_job(job_id);
                }
                Effect::AnimateProgress(animation) => self.engine.animate(
                    animation.generation,
                    animation.steps,
                    animation.step_interval,
                ),
                Effect::StopAnimation => self.engine.stop_animation(),
                Effect::ReleaseMedia(source) => {
                    // Only client-created files are ever deleted.
                    if let MediaSource::Owned(path) = source {
                        self.engine.release(path);
                    }
                }
                Effect::Download { source, file_name } => {
                    engine_info!("saving {}", file_name);
                    self.engine.download(download_source(source), file_name);
                }
            }
        }
    }

    /// Waits for the engine to stop and remove the media it still owns.
    pub fn shutdown(self) {
        self.engine.shutdown();
    }

    /// Location a player can open `source` from.
    pub fn resolve(&self, source: &MediaSource) -> String {
        match source {
            MediaSource::LocalFile(path) | MediaSource::Owned(path) => path.display().to_string(),
            MediaSource::ServerResult { file_name }
                if !self.transfer.capabilities().server_side_results =>
            {
                file_name.clone()
            }
            MediaSource::ServerResult { file_name } => match self.transfer.result_url(file_name) {
                Ok(url) => url.to_string(),
                Err(err) => {
                    engine_warn!("no playable address for {}: {}", file_name, err);
                    file_name.clone()
                }
            },
        }
    }
}

fn spawn_event_loop(
    events: mpsc::Receiver<EngineEvent>,
    input_tx: mpsc::Sender<Input>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name("engine-events".to_string())
        .spawn(move || {
            while let Ok(event) = events.recv() {
                if input_tx.send(Input::Msg(map_event(event))).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

fn upload_name(input: &SelectedInput) -> String {
    input.display_name().to_string()
}

fn download_source(source: MediaSource) -> DownloadSource {
    match source {
        MediaSource::ServerResult { file_name } => DownloadSource::Server { file_name },
        MediaSource::LocalFile(path) | MediaSource::Owned(path) => DownloadSource::File(path),
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadAccepted {
            job_id,
            processing_id,
        } => Msg::UploadAccepted {
            job_id,
            processing_id,
        },
        EngineEvent::UploadFinished { job_id, audio } => Msg::UploadFinished { job_id, audio },
        EngineEvent::UploadFailed { job_id, error } => Msg::UploadFailed {
            job_id,
            error: map_error(error),
        },
        EngineEvent::Status { job_id, result } => match result {
            Ok(status) => Msg::StatusReceived {
                job_id,
                report: map_status(status),
            },
            Err(error) => Msg::StatusFailed {
                job_id,
                error: map_error(error),
            },
        },
        EngineEvent::CooldownElapsed { job_id } => Msg::CooldownElapsed { job_id },
        EngineEvent::ProgressFrame { generation, step } => Msg::ProgressFrame { generation, step },
        EngineEvent::Downloaded(Ok(path)) => Msg::DownloadFinished { path },
        EngineEvent::Downloaded(Err(message)) => Msg::DownloadFailed { message },
        EngineEvent::Health(Ok(body)) => {
            engine_info!("server health: {}", body);
            if body.get("model_loaded").and_then(|v| v.as_bool()) == Some(false) {
                engine_warn!("server is up but reports no model loaded");
            }
            Msg::HealthChecked { reachable: true }
        }
        EngineEvent::Health(Err(err)) => {
            engine_warn!("health check failed: {}", err);
            Msg::HealthChecked { reachable: false }
        }
    }
}

fn map_status(status: JobStatus) -> StatusReport {
    match status {
        JobStatus::Processing { progress } => StatusReport::Processing { progress },
        JobStatus::Completed { output_filename } => StatusReport::Completed { output_filename },
        JobStatus::Failed { message } => StatusReport::Failed { message },
        JobStatus::Unknown { status } => StatusReport::Unknown { status },
    }
}

fn map_error(error: TransferError) -> JobError {
    let kind = match error.kind {
        TransferErrorKind::Server { .. } => ErrorKind::Server,
        TransferErrorKind::InvalidUrl
        | TransferErrorKind::Input
        | TransferErrorKind::Network
        | TransferErrorKind::Timeout
        | TransferErrorKind::Decode
        | TransferErrorKind::TooLarge { .. }
        | TransferErrorKind::Unsupported => ErrorKind::Network,
    };
    JobError::new(kind, error.message)
}
