use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::input::load_payload;
use crate::persist::{AtomicFileWriter, MediaStore};
use crate::schedule::TaskScheduler;
use crate::{EngineEvent, JobId, Submission, TransferClient, TransferError, TransferErrorKind};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where audio returned by the direct backend is kept while playable.
    pub media_dir: PathBuf,
    /// Where user-initiated downloads are saved.
    pub download_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            media_dir: std::env::temp_dir().join("enhance-client"),
            download_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    /// Output kept by the server under this name.
    Server { file_name: String },
    /// Audio already on disk.
    File(PathBuf),
}

enum EngineCommand {
    Upload {
        job_id: JobId,
        path: PathBuf,
        file_name: String,
    },
    Poll {
        job_id: JobId,
        processing_id: String,
        delay: Duration,
    },
    Cooldown {
        job_id: JobId,
        delay: Duration,
    },
    CancelJob {
        job_id: JobId,
    },
    Animate {
        generation: u64,
        steps: u32,
        interval: Duration,
    },
    StopAnimation,
    Download {
        source: DownloadSource,
        file_name: String,
    },
    Release {
        path: PathBuf,
    },
    CheckHealth,
}

/// Front door to the IO side. Commands are executed on a dedicated runtime
/// thread; results come back through the receiver returned by [`EngineHandle::spawn`].
///
/// Dropping the handle shuts the engine down and waits for it, so files the
/// engine still owns are gone once the handle is.
pub struct EngineHandle {
    cmd_tx: Option<mpsc::Sender<EngineCommand>>,
    worker: Option<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn spawn(
        transfer: Arc<dyn TransferClient>,
        config: EngineConfig,
    ) -> std::io::Result<(Self, mpsc::Receiver<EngineEvent>)> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        let worker = thread::Builder::new()
            .name("enhance-engine".to_string())
            .spawn(move || {
                let mut worker = Worker {
                    transfer,
                    scheduler: TaskScheduler::new(runtime.handle().clone()),
                    media: Arc::new(MediaStore::new(config.media_dir.clone())),
                    config,
                    event_tx,
                    runtime: runtime.handle().clone(),
                };
                while let Ok(command) = cmd_rx.recv() {
                    worker.handle(command);
                }
                engine_debug!("engine command channel closed");
                drop(worker);
                runtime.shutdown_timeout(Duration::from_secs(1));
            })?;

        Ok((
            Self {
                cmd_tx: Some(cmd_tx),
                worker: Some(worker),
            },
            event_rx,
        ))
    }

    /// Stops accepting commands, cancels pending timers, removes owned media
    /// and waits for the engine thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        drop(self.cmd_tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                engine_warn!("engine thread panicked during shutdown");
            }
        }
    }

    pub fn upload(&self, job_id: JobId, path: PathBuf, file_name: impl Into<String>) {
        self.send(EngineCommand::Upload {
            job_id,
            path,
            file_name: file_name.into(),
        });
    }

    pub fn poll(&self, job_id: JobId, processing_id: impl Into<String>, delay: Duration) {
        self.send(EngineCommand::Poll {
            job_id,
            processing_id: processing_id.into(),
            delay,
        });
    }

    pub fn cooldown(&self, job_id: JobId, delay: Duration) {
        self.send(EngineCommand::Cooldown { job_id, delay });
    }

    pub fn cancel_job(&self, job_id: JobId) {
        self.send(EngineCommand::CancelJob { job_id });
    }

    pub fn animate(&self, generation: u64, steps: u32, interval: Duration) {
        self.send(EngineCommand::Animate {
            generation,
            steps,
            interval,
        });
    }

    pub fn stop_animation(&self) {
        self.send(EngineCommand::StopAnimation);
    }

    pub fn download(&self, source: DownloadSource, file_name: impl Into<String>) {
        self.send(EngineCommand::Download {
            source,
            file_name: file_name.into(),
        });
    }

    pub fn release(&self, path: PathBuf) {
        self.send(EngineCommand::Release { path });
    }

    pub fn check_health(&self) {
        self.send(EngineCommand::CheckHealth);
    }

    fn send(&self, command: EngineCommand) {
        let sent = self
            .cmd_tx
            .as_ref()
            .is_some_and(|tx| tx.send(command).is_ok());
        if !sent {
            engine_warn!("engine thread is gone; command dropped");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    transfer: Arc<dyn TransferClient>,
    scheduler: TaskScheduler,
    media: Arc<MediaStore>,
    config: EngineConfig,
    event_tx: mpsc::Sender<EngineEvent>,
    runtime: tokio::runtime::Handle,
}

impl Worker {
    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Upload {
                job_id,
                path,
                file_name,
            } => {
                let transfer = self.transfer.clone();
                let media = self.media.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let event = upload(transfer.as_ref(), &media, job_id, path, file_name).await;
                    let _ = event_tx.send(event);
                });
            }
            EngineCommand::Poll {
                job_id,
                processing_id,
                delay,
            } => {
                let event_tx = self.event_tx.clone();
                if !self.transfer.capabilities().polls_status {
                    let error = TransferError::new(
                        TransferErrorKind::Unsupported,
                        "this backend has no status endpoint",
                    );
                    let _ = event_tx.send(EngineEvent::Status {
                        job_id,
                        result: Err(error),
                    });
                    return;
                }
                let transfer = self.transfer.clone();
                self.scheduler.schedule(job_id, delay, async move {
                    let result = transfer.fetch_status(&processing_id).await;
                    if let Err(err) = &result {
                        engine_warn!("status for job {} failed: {}", job_id, err.kind);
                    }
                    let _ = event_tx.send(EngineEvent::Status { job_id, result });
                });
            }
            EngineCommand::Cooldown { job_id, delay } => {
                let event_tx = self.event_tx.clone();
                self.scheduler.schedule(job_id, delay, async move {
                    let _ = event_tx.send(EngineEvent::CooldownElapsed { job_id });
                });
            }
            EngineCommand::CancelJob { job_id } => {
                if self.scheduler.cancel_job(job_id) {
                    engine_debug!("cancelled pending timers of job {}", job_id);
                }
            }
            EngineCommand::Animate {
                generation,
                steps,
                interval,
            } => {
                let event_tx = self.event_tx.clone();
                self.scheduler.start_animation(move |token| {
                    drive_animation(generation, steps, interval, token, event_tx)
                });
            }
            EngineCommand::StopAnimation => self.scheduler.stop_animation(),
            EngineCommand::Download { source, file_name } => {
                let server_side = matches!(source, DownloadSource::Server { .. });
                if server_side && !self.transfer.capabilities().server_side_results {
                    engine_warn!("{} is not kept on the server by this backend", file_name);
                    let _ = self.event_tx.send(EngineEvent::Downloaded(Err(
                        "this backend keeps no results on the server".to_string(),
                    )));
                    return;
                }
                let transfer = self.transfer.clone();
                let writer = AtomicFileWriter::new(self.config.download_dir.clone());
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = download(transfer.as_ref(), &writer, source, &file_name).await;
                    match &result {
                        Ok(path) => engine_info!("saved enhanced audio to {:?}", path),
                        Err(err) => engine_warn!("download of {} failed: {}", file_name, err),
                    }
                    let _ = event_tx.send(EngineEvent::Downloaded(result));
                });
            }
            EngineCommand::Release { path } => match self.media.release(&path) {
                Ok(true) => engine_debug!("released {:?}", path),
                Ok(false) => {}
                Err(err) => engine_warn!("could not release {:?}: {}", path, err),
            },
            EngineCommand::CheckHealth => {
                let transfer = self.transfer.clone();
                let event_tx = self.event_tx.clone();
                self.runtime.spawn(async move {
                    let result = transfer.health().await;
                    let _ = event_tx.send(EngineEvent::Health(result));
                });
            }
        }
    }
}

async fn upload(
    transfer: &dyn TransferClient,
    media: &MediaStore,
    job_id: JobId,
    path: PathBuf,
    file_name: String,
) -> EngineEvent {
    let payload = match load_payload(&path, &file_name).await {
        Ok(payload) => payload,
        Err(err) => {
            return EngineEvent::UploadFailed {
                job_id,
                error: TransferError::new(TransferErrorKind::Input, err.to_string()),
            }
        }
    };

    match transfer.submit(payload).await {
        Ok(Submission::Queued { processing_id }) => {
            engine_info!("job {} queued as {}", job_id, processing_id);
            EngineEvent::UploadAccepted {
                job_id,
                processing_id,
            }
        }
        Ok(Submission::Finished { audio }) => match media.store(job_id, &audio) {
            Ok(audio) => EngineEvent::UploadFinished { job_id, audio },
            Err(err) => EngineEvent::UploadFailed {
                job_id,
                error: TransferError::new(TransferErrorKind::Input, err.to_string()),
            },
        },
        Err(error) => {
            engine_warn!("upload for job {} failed: {}", job_id, error.kind);
            EngineEvent::UploadFailed { job_id, error }
        }
    }
}

async fn download(
    transfer: &dyn TransferClient,
    writer: &AtomicFileWriter,
    source: DownloadSource,
    file_name: &str,
) -> Result<PathBuf, String> {
    let audio = match source {
        DownloadSource::Server { file_name } => transfer
            .fetch_result(&file_name)
            .await
            .map_err(|err| err.to_string())?
            .to_vec(),
        DownloadSource::File(path) => tokio::fs::read(&path)
            .await
            .map_err(|err| err.to_string())?,
    };
    writer
        .write(file_name, &audio)
        .map_err(|err| err.to_string())
}

/// Emits one frame per `interval` until the last step or cancellation.
async fn drive_animation(
    generation: u64,
    steps: u32,
    interval: Duration,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    // The first tick completes immediately; frames start one interval in.
    ticker.tick().await;
    for step in 1..=steps {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }
        if event_tx
            .send(EngineEvent::ProgressFrame { generation, step })
            .is_err()
        {
            return;
        }
    }
}
