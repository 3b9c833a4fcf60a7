mod cli;
mod platform;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let args = cli::CliArgs::parse();
    match platform::run_app(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("enhance-client: {err:#}");
            ExitCode::FAILURE
        }
    }
}
