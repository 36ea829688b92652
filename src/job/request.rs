use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{RequestLoadError, ValidationError};

/// Job parameters as handed over by the caller.
///
/// Every field is optional at the type level so that a request missing
/// several fields can be reported in one go by [`JobRequest::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub environment: Option<String>,
    pub data_version: Option<String>,
    pub bucket_name: Option<String>,

    /// `owner/repo` or a GitHub URL
    pub github_repo: Option<String>,

    pub hyper_params: Option<Value>,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
}

/// The required fields of a request, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RequiredFields<'a> {
    pub(crate) environment: &'a str,
    pub(crate) data_version: &'a str,
    pub(crate) bucket_name: &'a str,
    pub(crate) github_repo: &'a str,
}

impl JobRequest {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<JobRequest, RequestLoadError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RequestLoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_text(&text)
    }

    /// Parses YAML, which also covers JSON requests.
    pub fn from_text(text: &str) -> Result<JobRequest, RequestLoadError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub(crate) fn validate(&self) -> Result<RequiredFields<'_>, ValidationError> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let fields = [
            ("environment", present(&self.environment)),
            ("data_version", present(&self.data_version)),
            ("bucket_name", present(&self.bucket_name)),
            ("github_repo", present(&self.github_repo)),
        ];

        match fields {
            [
                (_, Some(environment)),
                (_, Some(data_version)),
                (_, Some(bucket_name)),
                (_, Some(github_repo)),
            ] => Ok(RequiredFields {
                environment,
                data_version,
                bucket_name,
                github_repo,
            }),
            _ => Err(ValidationError {
                missing: fields
                    .iter()
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| *name)
                    .collect(),
            }),
        }
    }
}
