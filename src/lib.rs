use self::cli::{Cli, Ecosystem, JobArgs};
use self::config::Config;
use self::emr::AwsEmrLauncher;
use self::job::clock::SystemClock;
use self::job::env::ProcessEnv;
use self::job::error::RequestLoadError;
use self::job::{JobError, JobRequest, JobRunner, MavenRunner};
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_error::ExtractSpanTrace;
use tracing_error::SpanTrace;

pub(crate) mod cli;
pub mod config;
pub mod emr;
pub mod error;
pub mod job;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load config.\n{0}")]
    ConfigError(#[from] config::ConfigLoadError),

    #[error("Failed to load job request.\n{0}")]
    RequestError(#[from] RequestLoadError),

    #[error("Training job stopped due to following error:\n{0}")]
    JobError(#[from] JobError),

    #[error("Failed to render output: {0}")]
    OutputError(#[from] serde_json::Error),
}

impl ExtractSpanTrace for AppError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            AppError::JobError(e) => e.span_trace(),
            _ => None,
        }
    }
}

pub async fn app() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::new_from_file(path).await?,
        None => Config::default(),
    };

    info!("Config Loaded.");

    match cli.ecosystem {
        Ecosystem::Maven(args) => run_maven(&config, &args).await,
    }
}

async fn run_maven(config: &Config, args: &JobArgs) -> Result<(), AppError> {
    let request = JobRequest::from_file(&args.request).await?;

    if args.dry_run {
        let mut runner = MavenRunner::new(config, Box::new(ProcessEnv), &SystemClock, ());
        let cluster_config = runner.prepare(&request)?;
        println!(
            "{}",
            serde_json::to_string_pretty(&cluster_config.redacted())?
        );
        return Ok(());
    }

    let launcher = AwsEmrLauncher::from_config(config).await;

    info!("EMR Client Initialized.");

    let mut runner = MavenRunner::new(config, Box::new(ProcessEnv), &SystemClock, launcher);
    let response = runner.run(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
