use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use enhance_core::{ProgressTiming, Timing};
use enhance_engine::{
    ensure_output_dir, AtomicFileWriter, BackendKind, EngineConfig, PersistError,
    TransferSettings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;
use crate::cli::CliArgs;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("could not serialize config: {0}")]
    Serialize(String),
    #[error("{0:?} already exists")]
    Exists(PathBuf),
    #[error(transparent)]
    Write(#[from] PersistError),
}

/// Settings read from the RON config file. Every field is optional in the
/// file; absent ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub backend: BackendKind,
    /// Multipart field name; `None` uses the backend's own.
    pub upload_field: Option<String>,
    pub poll_interval_ms: u64,
    pub cooldown_ms: u64,
    pub progress_duration_ms: u64,
    pub progress_step_ms: u64,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_result_mib: u64,
    pub samples_dir: PathBuf,
    pub download_dir: PathBuf,
    /// Scratch space for audio returned by the direct backend.
    pub media_dir: Option<PathBuf>,
    /// Program launched with the enhanced audio's location once it is ready.
    pub player: Option<String>,
    pub log_destination: LogDestination,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let transfer = TransferSettings::default();
        let timing = Timing::default();
        Self {
            server_url: transfer.base_url,
            backend: transfer.backend,
            upload_field: None,
            poll_interval_ms: millis(timing.poll_interval),
            cooldown_ms: millis(timing.cooldown),
            progress_duration_ms: millis(timing.progress.duration),
            progress_step_ms: millis(timing.progress.step),
            connect_timeout_secs: transfer.connect_timeout.as_secs(),
            request_timeout_secs: transfer.request_timeout.as_secs(),
            max_result_mib: transfer.max_result_bytes / (1024 * 1024),
            samples_dir: PathBuf::from("samples"),
            download_dir: PathBuf::from("."),
            media_dir: None,
            player: None,
            log_destination: LogDestination::default(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ClientConfig {
    /// Reads `path`. A missing file is not an error and yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content)
            .map(Some)
            .map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            })
    }

    fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    /// Writes this config as pretty RON, refusing to replace an existing
    /// file unless `force` is set.
    pub fn save(&self, path: &Path, force: bool) -> Result<PathBuf, ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::Exists(path.to_path_buf()));
        }
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "enhance-client.ron".to_string());

        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(self, pretty)
            .map_err(|err| ConfigError::Serialize(err.to_string()))?;

        ensure_output_dir(&dir)?;
        Ok(AtomicFileWriter::new(dir).write(&file_name, content.as_bytes())?)
    }

    /// Command line flags win over the file.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(server) = &args.server {
            self.server_url = server.clone();
        }
        if let Some(backend) = args.backend {
            self.backend = backend.into();
        }
    }

    pub fn timing(&self) -> Timing {
        Timing {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            cooldown: Duration::from_millis(self.cooldown_ms),
            progress: ProgressTiming {
                duration: Duration::from_millis(self.progress_duration_ms),
                step: Duration::from_millis(self.progress_step_ms.max(1)),
            },
        }
    }

    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            base_url: self.server_url.clone(),
            backend: self.backend,
            upload_field: self.upload_field.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_result_bytes: self.max_result_mib.saturating_mul(1024 * 1024),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            download_dir: self.download_dir.clone(),
            ..EngineConfig::default()
        };
        if let Some(media_dir) = &self.media_dir {
            config.media_dir = media_dir.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let temp = TempDir::new().unwrap();
        let loaded = ClientConfig::load(&temp.path().join("absent.ron")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.ron");
        fs::write(
            &path,
            r#"(server_url: "http://10.0.0.5:8000", backend: direct, poll_interval_ms: 250)"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap().unwrap();
        assert_eq!(config.server_url, "http://10.0.0.5:8000");
        assert_eq!(config.backend, BackendKind::Direct);
        assert_eq!(config.timing().poll_interval, Duration::from_millis(250));
        assert_eq!(config.cooldown_ms, 2000);
        assert_eq!(config.transfer_settings().upload_field(), "file");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("client.ron");
        fs::write(&path, "(server_url: 42").unwrap();
        assert!(matches!(
            ClientConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn defaults_match_lifecycle_timing() {
        let config = ClientConfig::default();
        assert_eq!(config.timing(), Timing::default());
        assert_eq!(config.timing().progress.steps(), 25);
    }

    #[test]
    fn saved_config_loads_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("client.ron");
        let config = ClientConfig {
            player: Some("mpv".into()),
            ..ClientConfig::default()
        };
        config.save(&path, false).unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap(), Some(config.clone()));
        assert!(matches!(
            config.save(&path, false),
            Err(ConfigError::Exists(_))
        ));
        config.save(&path, true).unwrap();
    }

    #[test]
    fn flags_override_file() {
        let args = CliArgs::try_parse_from([
            "enhance-client",
            "--server",
            "http://gpu-box:5000",
            "--backend",
            "direct",
            "health",
        ])
        .unwrap();
        let mut config = ClientConfig::default();
        config.apply_overrides(&args);
        assert_eq!(config.server_url, "http://gpu-box:5000");
        assert_eq!(config.backend, BackendKind::Direct);
    }
}
