mod raw;

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use self::raw::RawConfig;
pub use self::raw::ConfigParseError;

/// Cluster sizing and naming used for every submitted job flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSettings {
    pub release_label: String,
    pub instance_type: String,
    pub instance_count: i32,
    pub applications: Vec<String>,
    pub job_flow_role: String,
    pub service_role: String,
    pub visible_to_all_users: bool,

    /// Suffix of the per-environment log bucket, `{environment}-{suffix}`
    pub log_bucket_suffix: String,
}

/// Where the training entrypoint lives inside the source repository.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSettings {
    pub branch: String,
    pub file_path: String,

    /// Interpreter the training step runs the entrypoint with
    pub python: String,
}

impl TrainingSettings {
    /// Last segment of `file_path`, the name the file has once downloaded.
    pub fn file_name(&self) -> &str {
        self.file_path
            .rsplit('/')
            .next()
            .unwrap_or(self.file_path.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub region: String,
    pub operation_timeout: Duration,
    pub cluster: ClusterSettings,
    pub training: TrainingSettings,
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deserialize config file: {0}")]
    Deserialize(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] ConfigParseError),
}

impl Config {
    #[instrument("config/load", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn new_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigLoadError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigLoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Config, ConfigLoadError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        debug!("Raw config: {:?}", raw);
        Ok(Config::try_from(raw)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::try_from(RawConfig::default()).expect("built-in config defaults are valid")
    }
}
