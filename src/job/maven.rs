use std::collections::BTreeMap;

use tracing::{Level, error, info, instrument};

use crate::config::{ClusterSettings, Config};
use crate::emr::{ClusterConfig, ClusterLauncher, LaunchResponse};
use crate::error::SpannedExt;

use super::builder::{JobBuilder, JobRunner};
use super::clock::Clock;
use super::env::EnvLookup;
use super::error::JobError;
use super::request::JobRequest;

pub fn job_name(environment: &str, ecosystem: &str, timestamp: &str) -> String {
    format!("{environment}_{ecosystem}_{timestamp}")
}

pub fn bootstrap_uri(bucket_name: &str) -> String {
    format!("s3://{bucket_name}/bootstrap.sh")
}

pub fn log_uri(environment: &str, log_bucket_suffix: &str, job_name: &str) -> String {
    format!("s3://{environment}-{log_bucket_suffix}/{job_name}.log")
}

/// Trains the maven ecosystem model on EMR.
pub struct MavenRunner<L> {
    builder: JobBuilder,
    cluster: ClusterSettings,
    launcher: L,
}

impl<L> MavenRunner<L> {
    pub const ECOSYSTEM: &'static str = "maven";

    pub fn new(config: &Config, env: Box<dyn EnvLookup>, clock: &dyn Clock, launcher: L) -> Self {
        MavenRunner {
            builder: JobBuilder::new(Self::ECOSYSTEM, config.training.clone(), env, clock),
            cluster: config.cluster.clone(),
            launcher,
        }
    }

    /// Constructs the job and derives its cluster configuration without submitting it.
    pub fn prepare(&mut self, request: &JobRequest) -> Result<ClusterConfig, JobError> {
        self.builder.construct(request)?;
        self.cluster_config()
    }

    fn cluster_config(&self) -> Result<ClusterConfig, JobError> {
        let context = self.builder.context()?;
        let name = job_name(
            &context.environment,
            context.ecosystem,
            self.builder.timestamp(),
        );
        let log_uri = log_uri(
            &context.environment,
            &self.cluster.log_bucket_suffix,
            &name,
        );

        Ok(ClusterConfig {
            log_uri,
            ecosystem: context.ecosystem.to_string(),
            s3_bootstrap_uri: bootstrap_uri(&context.bucket_name),
            training_repo_url: context.training_file_url.clone(),
            training_file_name: self.builder.training().file_name().to_string(),
            python: self.builder.training().python.clone(),
            properties: context.properties.clone(),
            hyper_params: context.hyper_params.clone(),
            tags: BTreeMap::from([
                ("environment".to_string(), context.environment.clone()),
                ("ecosystem".to_string(), context.ecosystem.to_string()),
                ("data_version".to_string(), context.data_version.clone()),
            ]),
            settings: self.cluster.clone(),
            name,
        })
    }
}

impl<L: ClusterLauncher> JobRunner for MavenRunner<L> {
    fn builder_mut(&mut self) -> &mut JobBuilder {
        &mut self.builder
    }

    #[instrument("maven_runner/run", level = Level::DEBUG, skip_all)]
    async fn run(&mut self, request: &JobRequest) -> Result<LaunchResponse, JobError> {
        let cluster_config = self.prepare(request)?;
        info!("Submitting EMR job flow '{}'...", cluster_config.name);

        let response = self
            .launcher
            .launch(&cluster_config)
            .await
            .with_span_trace()?;

        let rendered = serde_json::to_string(&response).unwrap_or_else(|_| format!("{response:?}"));
        info!("Submission result: {}", rendered);

        if !response.is_success() {
            error!(
                "EMR job flow '{}' submission returned status code {}: {}",
                cluster_config.name,
                response.status_code(),
                rendered
            );
        }

        Ok(response)
    }
}
