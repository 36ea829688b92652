use std::future::Future;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_emr::error::DisplayErrorContext;
use aws_sdk_emr::operation::RequestId;
use thiserror::Error;
use tracing::{Instrument, Level, debug, instrument, trace_span};

use crate::config::Config;

use super::cluster_config::ClusterConfig;
use super::response::{HTTP_OK, LaunchResponse, ResponseMetadata};

const REQUEST_ID_HEADER: &str = "x-amzn-RequestId";

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("RunJobFlow request produced no response: {0}")]
    NoResponse(String),
}

/// Submits a job flow to a managed cluster service.
pub trait ClusterLauncher: Send + Sync {
    fn launch(
        &self,
        config: &ClusterConfig,
    ) -> impl Future<Output = Result<LaunchResponse, LaunchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct AwsEmrLauncher {
    client: aws_sdk_emr::Client,
}

impl AwsEmrLauncher {
    pub fn new(client: aws_sdk_emr::Client) -> Self {
        Self { client }
    }

    /// Client for the configured region, credentials from the default chain.
    pub async fn from_config(config: &Config) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(config.operation_timeout)
            .build();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .timeout_config(timeouts)
            .load()
            .await;
        Self::new(aws_sdk_emr::Client::new(&sdk_config))
    }
}

impl ClusterLauncher for AwsEmrLauncher {
    #[instrument(
        "aws_emr/launch",
        level = Level::DEBUG,
        skip_all,
        fields(job_flow_name = %config.name)
    )]
    async fn launch(&self, config: &ClusterConfig) -> Result<LaunchResponse, LaunchError> {
        let settings = &config.settings;
        let request = self
            .client
            .run_job_flow()
            .name(&config.name)
            .log_uri(&config.log_uri)
            .release_label(&settings.release_label)
            .instances(config.instances())
            .set_applications(Some(config.applications()))
            .set_bootstrap_actions(Some(config.bootstrap_actions()))
            .set_steps(Some(config.steps()))
            .set_configurations(Some(config.configurations()))
            .set_tags(Some(config.sdk_tags()))
            .visible_to_all_users(settings.visible_to_all_users)
            .job_flow_role(&settings.job_flow_role)
            .service_role(&settings.service_role);

        let result = request
            .send()
            .instrument(trace_span!("run_job_flow"))
            .await;

        match result {
            Ok(output) => Ok(LaunchResponse {
                job_flow_id: output.job_flow_id().map(str::to_string),
                cluster_arn: output.cluster_arn().map(str::to_string),
                response_metadata: ResponseMetadata {
                    http_status_code: HTTP_OK,
                    request_id: output.request_id().map(str::to_string),
                },
                error: None,
            }),
            Err(err) => {
                let message = DisplayErrorContext(&err).to_string();
                match err.raw_response() {
                    Some(raw) => {
                        debug!("RunJobFlow answered with HTTP {}", raw.status().as_u16());
                        Ok(LaunchResponse {
                            job_flow_id: None,
                            cluster_arn: None,
                            response_metadata: ResponseMetadata {
                                http_status_code: raw.status().as_u16(),
                                request_id: raw
                                    .headers()
                                    .get(REQUEST_ID_HEADER)
                                    .map(str::to_string),
                            },
                            error: Some(message),
                        })
                    }
                    None => Err(LaunchError::NoResponse(message)),
                }
            }
        }
    }
}
