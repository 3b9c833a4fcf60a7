use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use engine_logging::{engine_info, engine_warn};
use enhance_core::{update, AppState, LifecyclePhase, MediaSource, Msg, SelectedInput, Severity};
use enhance_engine::{build_transfer, describe_file, resolve_sample, EngineEvent, EngineHandle};

use super::config::ClientConfig;
use super::effects::EffectRunner;
use super::logging;
use super::render::{MediaPresenter, PlayerPresenter, TerminalPresenter, TerminalRenderer};
use super::repl::{parse_line, ReplCommand, HELP};
use crate::cli::{CliArgs, Command};

const SERVER_UNREACHABLE: &str =
    "Unable to connect to the enhancement server. Please ensure the backend is running.";

/// Everything the message loop reacts to.
pub enum Input {
    Msg(Msg),
    Repl(ReplCommand),
    Invalid(String),
    Closed,
}

pub fn run_app(args: CliArgs) -> anyhow::Result<ExitCode> {
    let (mut config, config_problem) = match ClientConfig::load(&args.config) {
        Ok(Some(config)) => (config, None),
        Ok(None) => (ClientConfig::default(), None),
        Err(err) => (ClientConfig::default(), Some(err)),
    };
    config.apply_overrides(&args);

    logging::initialize(config.log_destination, args.debug);
    if let Some(err) = config_problem {
        engine_warn!("{}; using defaults", err);
        eprintln!("Warning: {err}; using defaults");
    }
    engine_info!(
        "enhance-client starting: server={} backend={:?}",
        config.server_url,
        config.backend
    );

    match args.command {
        Command::InitConfig { force } => {
            let path = config.save(&args.config, force)?;
            println!("wrote {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => check_health(&config),
        Command::Enhance {
            file,
            sample,
            download,
        } => {
            if let Some(dir) = &download {
                config.download_dir = dir.clone();
            }
            let input = match (file, sample) {
                (Some(path), _) => file_input(path)?,
                (None, Some(name)) => sample_input(&config.samples_dir, name)?,
                (None, None) => bail!("nothing to enhance: give a file or --sample"),
            };
            let mut session = Session::start(&config)?;
            let outcome = session.run_once(input, download.is_some());
            session.shutdown();
            Ok(if outcome? {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Interactive => {
            let mut session = Session::start(&config)?;
            let outcome = session.run_interactive();
            session.shutdown();
            outcome.map(|()| ExitCode::SUCCESS)
        }
    }
}

fn file_input(path: PathBuf) -> anyhow::Result<SelectedInput> {
    let (file_name, size_bytes) = describe_file(&path)?;
    Ok(SelectedInput::File {
        path,
        file_name,
        size_bytes,
    })
}

fn sample_input(samples_dir: &Path, name: String) -> anyhow::Result<SelectedInput> {
    let path = resolve_sample(samples_dir, &name)?;
    Ok(SelectedInput::Sample { name, path })
}

fn check_health(config: &ClientConfig) -> anyhow::Result<ExitCode> {
    let transfer = build_transfer(config.transfer_settings()).context("invalid server settings")?;
    let (engine, events) = EngineHandle::spawn(transfer, config.engine_config())
        .context("could not start the transfer engine")?;
    engine.check_health();

    let wait = Duration::from_secs(config.request_timeout_secs.saturating_add(5));
    let outcome = match events.recv_timeout(wait) {
        Ok(EngineEvent::Health(Ok(body))) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::SUCCESS)
        }
        Ok(EngineEvent::Health(Err(err))) => {
            eprintln!("{SERVER_UNREACHABLE}\n{err}");
            Ok(ExitCode::FAILURE)
        }
        Ok(other) => bail!("unexpected engine event {other:?}"),
        Err(_) => bail!("no answer from the health check within {wait:?}"),
    };
    engine.shutdown();
    outcome
}

/// One message loop: core state, the engine behind it and the terminal.
struct Session<W: Write> {
    state: AppState,
    runner: EffectRunner,
    renderer: TerminalRenderer<W>,
    media: Box<dyn MediaPresenter>,
    inputs: mpsc::Receiver<Input>,
    input_tx: mpsc::Sender<Input>,
    samples_dir: PathBuf,
}

impl Session<io::Stdout> {
    fn start(config: &ClientConfig) -> anyhow::Result<Self> {
        let presenter = TerminalPresenter::new(io::stdout());
        let media: Box<dyn MediaPresenter> = match &config.player {
            Some(program) => Box::new(PlayerPresenter::new(presenter, program.clone())),
            None => Box::new(presenter),
        };
        Self::with_output(config, io::stdout(), media)
    }
}

impl<W: Write> Session<W> {
    fn with_output(
        config: &ClientConfig,
        out: W,
        media: Box<dyn MediaPresenter>,
    ) -> anyhow::Result<Self> {
        let transfer =
            build_transfer(config.transfer_settings()).context("invalid server settings")?;
        let (input_tx, inputs) = mpsc::channel();
        let runner = EffectRunner::new(transfer, config.engine_config(), input_tx.clone())
            .context("could not start the transfer engine")?;

        Ok(Self {
            state: AppState::with_timing(config.timing()),
            runner,
            renderer: TerminalRenderer::new(out),
            media,
            inputs,
            input_tx,
            samples_dir: config.samples_dir.clone(),
        })
    }

    /// Stops the engine, which removes any media it still owns, and hands
    /// back the output.
    fn shutdown(self) -> W {
        self.runner.shutdown();
        self.renderer.into_inner()
    }

    fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.enqueue(effects);
        if state.consume_dirty() {
            let view = state.view();
            let runner = &self.runner;
            self.renderer.render(
                &view,
                self.media.as_mut(),
                &|source: &MediaSource| runner.resolve(source),
            )?;
        }
        self.state = state;
        Ok(())
    }

    /// Checks the server, enhances `input` and returns once the job is
    /// settled; with `download` the result is also saved first. Returns
    /// whether everything succeeded.
    fn run_once(&mut self, input: SelectedInput, download: bool) -> anyhow::Result<bool> {
        self.dispatch(Msg::Started)?;
        while self.state.view().server_reachable.is_none() {
            match self.inputs.recv() {
                Ok(Input::Msg(msg)) => self.dispatch(msg)?,
                Ok(_) => {}
                Err(_) => bail!("engine stopped before the health check finished"),
            }
        }

        self.dispatch(Msg::InputSelected(input))?;
        self.dispatch(Msg::EnhanceClicked)?;
        if self.state.job().is_none() {
            self.renderer
                .message("Nothing to enhance: the selected file is empty.")?;
            return Ok(false);
        }

        let mut download_requested = false;
        while let Ok(input) = self.inputs.recv() {
            let Input::Msg(msg) = input else {
                continue;
            };
            let download_settled =
                matches!(msg, Msg::DownloadFinished { .. } | Msg::DownloadFailed { .. });
            self.dispatch(msg)?;

            let view = self.state.view();
            match view.phase {
                LifecyclePhase::Errored => return Ok(false),
                LifecyclePhase::Completed if download_settled => {
                    let failed = view
                        .status
                        .is_some_and(|status| status.severity == Severity::Error);
                    return Ok(!failed);
                }
                // Let the bar finish its last animation before leaving.
                LifecyclePhase::Completed if !view.progress_animating => {
                    if !download {
                        return Ok(true);
                    }
                    if !download_requested {
                        download_requested = true;
                        self.dispatch(Msg::DownloadClicked)?;
                    }
                }
                _ => {}
            }
        }
        bail!("engine stopped before the job finished")
    }

    fn run_interactive(&mut self) -> anyhow::Result<()> {
        spawn_stdin_reader(self.input_tx.clone())?;
        self.renderer.message(HELP)?;
        self.dispatch(Msg::Started)?;

        while let Ok(input) = self.inputs.recv() {
            match input {
                Input::Msg(msg) => self.dispatch(msg)?,
                Input::Repl(ReplCommand::Quit) | Input::Closed => break,
                Input::Repl(command) => self.handle_command(command)?,
                Input::Invalid(problem) => self.renderer.message(&problem)?,
            }
        }
        self.dispatch(Msg::CancelClicked)
    }

    fn handle_command(&mut self, command: ReplCommand) -> anyhow::Result<()> {
        match command {
            ReplCommand::Select(path) => match file_input(path) {
                Ok(input) => {
                    let empty = input.is_empty();
                    self.dispatch(Msg::InputSelected(input))?;
                    if empty {
                        self.renderer.message("The selected file is empty.")?;
                    }
                }
                Err(err) => self.renderer.message(&format!("{err:#}"))?,
            },
            ReplCommand::Sample(name) => match sample_input(&self.samples_dir, name) {
                Ok(input) => self.dispatch(Msg::InputSelected(input))?,
                Err(err) => self.renderer.message(&format!("{err:#}"))?,
            },
            ReplCommand::Enhance => {
                let view = self.state.view();
                if view.can_start {
                    self.dispatch(Msg::EnhanceClicked)?;
                } else if view.input_name.is_none() {
                    self.renderer.message("Select a file or sample first.")?;
                } else {
                    self.renderer.message("Enhance is not available right now.")?;
                }
            }
            ReplCommand::Download => {
                if self.state.view().can_download {
                    self.dispatch(Msg::DownloadClicked)?;
                } else {
                    self.renderer.message("No enhanced audio to save yet.")?;
                }
            }
            ReplCommand::Cancel => self.dispatch(Msg::CancelClicked)?,
            ReplCommand::Status => {
                let view = self.state.view();
                self.renderer.summary(&view)?;
            }
            ReplCommand::Help => self.renderer.message(HELP)?,
            ReplCommand::Quit => {}
        }
        Ok(())
    }
}

fn spawn_stdin_reader(input_tx: mpsc::Sender<Input>) -> io::Result<()> {
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let input = match parse_line(&line) {
                    Ok(Some(command)) => Input::Repl(command),
                    Ok(None) => continue,
                    Err(problem) => Input::Invalid(problem),
                };
                if input_tx.send(input).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(Input::Closed);
        })?;
    Ok(())
}
