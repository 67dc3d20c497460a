//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads and validates configuration before any work starts
//! - runs the requested flows and hands their tables to the sinks

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Command, RunArgs};
use crate::config::{load_acquisition_config, load_model_config, load_storage_config};
use crate::data::IneClient;
use crate::domain::{AcquisitionConfig, ModelConfig};
use crate::error::AppError;
use crate::io::Storage;
use crate::report::{JsonArtifactSink, ReportSink, TableArtifact, TerminalSink, format_fit_summary};

pub mod pipeline;
pub mod retry;

use retry::RetryPolicy;

const DEFAULT_LOG_FILTER: &str = "ipc_forecast=info";

/// Entry point for the `ipc` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let result = dispatch(&cli.command);
    if let Err(err) = &result {
        error!(kind = err.kind(), exit_code = err.exit_code(), error = %err, "run failed");
    }
    result
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    // Logs go to stderr so stdout carries only the presented tables.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn dispatch(command: &Command) -> Result<(), AppError> {
    let args = command.args();
    let ctx = RunContext::new(args)?;

    match command {
        Command::Acquire(_) => {
            let acquisition = load_acquisition_config(&args.config)?;
            ctx.acquire(&acquisition)
        }
        Command::Forecast(_) => {
            let model = load_model_config(&args.config)?;
            ctx.forecast(&model)
        }
        Command::Run(_) => {
            let acquisition = load_acquisition_config(&args.config)?;
            let model = load_model_config(&args.config)?;
            ctx.acquire(&acquisition)?;
            ctx.forecast(&model)
        }
    }
}

/// Collaborators shared by both flows within one invocation.
struct RunContext {
    storage: Storage,
    retry: RetryPolicy,
    sinks: Vec<Box<dyn ReportSink>>,
}

impl RunContext {
    fn new(args: &RunArgs) -> Result<Self, AppError> {
        let storage = Storage::new(load_storage_config(&args.config)?.root);
        info!(config = %args.config.display(), root = %storage.root().display(), "configuration loaded");

        let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(TerminalSink)];
        if args.artifacts {
            sinks.push(Box::new(JsonArtifactSink::new(artifacts_dir(storage.root()))));
        }

        Ok(Self {
            storage,
            retry: RetryPolicy::default(),
            sinks,
        })
    }

    fn acquire(&self, config: &AcquisitionConfig) -> Result<(), AppError> {
        let client = IneClient::new()?;
        let today = Local::now().date_naive();
        let out = pipeline::run_acquire(config, &client, &self.storage, &self.retry, today)?;
        self.publish(&TableArtifact::window(&out.window))
    }

    fn forecast(&self, config: &ModelConfig) -> Result<(), AppError> {
        let out = pipeline::run_forecast(config, &self.storage, &self.retry)?;
        for line in format_fit_summary(&out.model).lines() {
            info!("{line}");
        }
        self.publish(&TableArtifact::forecast(&out.forecast))
    }

    fn publish(&self, artifact: &TableArtifact) -> Result<(), AppError> {
        for sink in &self.sinks {
            sink.publish(artifact)?;
        }
        Ok(())
    }
}

fn artifacts_dir(root: &Path) -> PathBuf {
    root.join("artifacts")
}
