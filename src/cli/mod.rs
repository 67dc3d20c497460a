//! Command-line parsing for the `ipc` binary.
//!
//! Parsing only; dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ipc", version, about = "INE monthly series acquisition and SARIMA forecasting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the configured series and persist it.
    Acquire(RunArgs),
    /// Fit the model on the persisted series and persist the forecast.
    Forecast(RunArgs),
    /// Acquire, then forecast.
    Run(RunArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Path to the JSON configuration document.
    #[arg(short, long, env = "IPC_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Also write each presented table as JSON under `<storage root>/artifacts/`.
    #[arg(long)]
    pub artifacts: bool,
}

impl Command {
    pub fn args(&self) -> &RunArgs {
        match self {
            Command::Acquire(args) | Command::Forecast(args) | Command::Run(args) => args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommand_with_defaults() {
        let cli = Cli::try_parse_from(["ipc", "acquire"]).unwrap();
        assert!(matches!(cli.command, Command::Acquire(_)));
        // Default applies unless IPC_CONFIG is set in the test environment.
        if std::env::var_os("IPC_CONFIG").is_none() {
            assert_eq!(cli.command.args().config, PathBuf::from(DEFAULT_CONFIG_PATH));
        }
        assert!(!cli.command.args().artifacts);
    }

    #[test]
    fn parses_explicit_config_and_artifacts() {
        let cli = Cli::try_parse_from(["ipc", "run", "--config", "other.json", "--artifacts"]).unwrap();
        let args = cli.command.args();
        assert_eq!(args.config, PathBuf::from("other.json"));
        assert!(args.artifacts);
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["ipc", "plot"]).is_err());
    }
}
