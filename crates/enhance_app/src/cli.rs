use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use enhance_engine::BackendKind;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "enhance-client",
    about = "Send audio to an enhancement service and compare the result"
)]
pub struct CliArgs {
    /// RON configuration file; defaults are used when it does not exist
    #[arg(long, global = true, default_value = "enhance-client.ron")]
    pub config: PathBuf,

    /// Base URL of the enhancement service
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Backend contract spoken by the service
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Enable debug mode with verbose logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Enhance one file (or bundled sample) and exit
    Enhance {
        /// Audio file to upload
        #[arg(required_unless_present = "sample")]
        file: Option<PathBuf>,

        /// Use a bundled sample instead of a file
        #[arg(long, conflicts_with = "file")]
        sample: Option<String>,

        /// Save the enhanced audio into this directory
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Line-driven session: select, enhance, download, cancel
    Interactive,
    /// Check that the service is reachable
    Health,
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Polling,
    Direct,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Polling => BackendKind::Polling,
            BackendArg::Direct => BackendKind::Direct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhance_accepts_file_or_sample() {
        let args = CliArgs::try_parse_from(["enhance-client", "enhance", "a.wav"]).unwrap();
        assert!(matches!(args.command, Command::Enhance { file: Some(_), .. }));

        let args = CliArgs::try_parse_from([
            "enhance-client",
            "--backend",
            "direct",
            "enhance",
            "--sample",
            "sample.wav",
        ])
        .unwrap();
        assert_eq!(args.backend, Some(BackendArg::Direct));
        assert!(matches!(args.command, Command::Enhance { sample: Some(_), .. }));

        assert!(CliArgs::try_parse_from(["enhance-client", "enhance"]).is_err());
        assert!(
            CliArgs::try_parse_from(["enhance-client", "enhance", "a.wav", "--sample", "s.wav"])
                .is_err()
        );
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let args = CliArgs::try_parse_from(["enhance-client", "health", "--server", "http://x:1"])
            .unwrap();
        assert_eq!(args.server.as_deref(), Some("http://x:1"));
        assert!(matches!(args.command, Command::Health));
    }
}
