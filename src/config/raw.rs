use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;
use thiserror::Error;

use super::{ClusterSettings, Config, TrainingSettings};

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
pub(super) struct RawConfig {
    #[serde(default = "default_region")]
    pub(super) region: String,

    #[serde(default = "default_operation_timeout")]
    pub(super) operation_timeout: DurationString,

    #[serde(default)]
    pub(super) cluster: RawClusterSettings,

    #[serde(default)]
    pub(super) training: RawTrainingSettings,
}

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
pub(super) struct RawClusterSettings {
    /// EMR release, e.g. "emr-5.10.0"
    #[serde(default = "default_release_label")]
    pub(super) release_label: String,

    #[serde(default = "default_instance_type")]
    pub(super) instance_type: String,

    #[serde(default = "default_instance_count")]
    pub(super) instance_count: i32,

    #[serde(default = "default_applications")]
    pub(super) applications: Vec<String>,

    #[serde(default = "default_job_flow_role")]
    pub(super) job_flow_role: String,

    #[serde(default = "default_service_role")]
    pub(super) service_role: String,

    #[serde(default = "default_visible_to_all_users")]
    pub(super) visible_to_all_users: bool,

    #[serde(default = "default_log_bucket_suffix")]
    pub(super) log_bucket_suffix: String,
}

#[cfg_attr(test, derive(PartialEq))]
#[derive(Deserialize, Debug, Clone)]
pub(super) struct RawTrainingSettings {
    #[serde(default = "default_branch")]
    pub(super) branch: String,

    /// Path of the training entrypoint relative to the repository root
    #[serde(default = "default_file_path")]
    pub(super) file_path: String,

    #[serde(default = "default_python")]
    pub(super) python: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            operation_timeout: default_operation_timeout(),
            cluster: RawClusterSettings::default(),
            training: RawTrainingSettings::default(),
        }
    }
}

impl Default for RawClusterSettings {
    fn default() -> Self {
        Self {
            release_label: default_release_label(),
            instance_type: default_instance_type(),
            instance_count: default_instance_count(),
            applications: default_applications(),
            job_flow_role: default_job_flow_role(),
            service_role: default_service_role(),
            visible_to_all_users: default_visible_to_all_users(),
            log_bucket_suffix: default_log_bucket_suffix(),
        }
    }
}

impl Default for RawTrainingSettings {
    fn default() -> Self {
        Self {
            branch: default_branch(),
            file_path: default_file_path(),
            python: default_python(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_operation_timeout() -> DurationString {
    DurationString::new(Duration::from_secs(60))
}
fn default_release_label() -> String {
    "emr-5.10.0".to_string()
}
fn default_instance_type() -> String {
    "m3.xlarge".to_string()
}
const fn default_instance_count() -> i32 {
    1
}
fn default_applications() -> Vec<String> {
    vec!["MXNet".to_string()]
}
fn default_job_flow_role() -> String {
    "EMR_EC2_DefaultRole".to_string()
}
fn default_service_role() -> String {
    "EMR_DefaultRole".to_string()
}
const fn default_visible_to_all_users() -> bool {
    true
}
fn default_log_bucket_suffix() -> String {
    "automated-analytics-spark-jobs".to_string()
}
fn default_branch() -> String {
    "master".to_string()
}
fn default_file_path() -> String {
    "training/train.py".to_string()
}
fn default_python() -> String {
    "python3.6".to_string()
}

#[derive(Error, Debug)]
pub enum ConfigParseError {
    #[error("cluster.instance_count must be at least 1, got {0}")]
    InstanceCountTooSmall(i32),

    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("training.file_path '{0}' must not end with '/'")]
    TrainingFileIsDirectory(String),
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigParseError;
    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        if raw.cluster.instance_count < 1 {
            return Err(ConfigParseError::InstanceCountTooSmall(
                raw.cluster.instance_count,
            ));
        }

        for (name, value) in [
            ("region", &raw.region),
            ("cluster.release_label", &raw.cluster.release_label),
            ("cluster.instance_type", &raw.cluster.instance_type),
            ("cluster.log_bucket_suffix", &raw.cluster.log_bucket_suffix),
            ("training.branch", &raw.training.branch),
            ("training.file_path", &raw.training.file_path),
            ("training.python", &raw.training.python),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigParseError::EmptyField(name));
            }
        }

        if raw.training.file_path.ends_with('/') {
            return Err(ConfigParseError::TrainingFileIsDirectory(
                raw.training.file_path,
            ));
        }

        Ok(Config {
            region: raw.region,
            operation_timeout: raw.operation_timeout.into(),
            cluster: ClusterSettings {
                release_label: raw.cluster.release_label,
                instance_type: raw.cluster.instance_type,
                instance_count: raw.cluster.instance_count,
                applications: raw.cluster.applications,
                job_flow_role: raw.cluster.job_flow_role,
                service_role: raw.cluster.service_role,
                visible_to_all_users: raw.cluster.visible_to_all_users,
                log_bucket_suffix: raw.cluster.log_bucket_suffix,
            },
            training: TrainingSettings {
                branch: raw.training.branch,
                file_path: raw.training.file_path,
                python: raw.training.python,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialize_omitted() {
        let raw: RawConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(raw, RawConfig::default());

        let config = Config::try_from(raw).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.operation_timeout, Duration::from_secs(60));
        assert_eq!(config.cluster.release_label, "emr-5.10.0");
        assert_eq!(config.cluster.instance_count, 1);
        assert_eq!(config.cluster.applications, vec!["MXNet"]);
        assert_eq!(config.training.file_path, "training/train.py");
        assert_eq!(config.training.file_name(), "train.py");
    }

    #[test]
    fn test_config_deserialize_partial() {
        let yaml_data = r#"
          region: eu-west-1
          operation_timeout: 2m
          cluster:
            instance_count: 3
            applications: [Spark, MXNet]
          training:
            branch: main
        "#;

        let config = Config::try_from(serde_yaml::from_str::<RawConfig>(yaml_data).unwrap())
            .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.operation_timeout, Duration::from_secs(120));
        assert_eq!(config.cluster.instance_count, 3);
        assert_eq!(config.cluster.applications, vec!["Spark", "MXNet"]);
        assert_eq!(config.cluster.instance_type, "m3.xlarge");
        assert_eq!(config.training.branch, "main");
        assert_eq!(config.training.python, "python3.6");
    }

    #[test]
    fn test_config_rejects_zero_instances() {
        let raw: RawConfig = serde_yaml::from_str("cluster: {instance_count: 0}").unwrap();
        assert!(matches!(
            Config::try_from(raw),
            Err(ConfigParseError::InstanceCountTooSmall(0))
        ));
    }

    #[test]
    fn test_config_rejects_empty_region() {
        let raw: RawConfig = serde_yaml::from_str("region: ''").unwrap();
        assert!(matches!(
            Config::try_from(raw),
            Err(ConfigParseError::EmptyField("region"))
        ));
    }
}
