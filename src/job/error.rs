use thiserror::Error;
use tracing_error::{ExtractSpanTrace, SpanTrace};

use crate::emr::launcher::LaunchError;
use crate::error::SpannedErr;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Job request is missing required fields: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepoRefError {
    #[error("'{0}' is not a GitHub repository reference of the form 'owner/repo'")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum HyperParamsError {
    #[error("hyper_params must be a mapping, got {0}")]
    NotAMapping(&'static str),

    #[error("Failed to serialize hyper_params: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum RequestLoadError {
    #[error("Failed to read request file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deserialize job request: {0}")]
    Deserialize(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid job request: {0}")]
    Validation(#[from] SpannedErr<ValidationError>),

    #[error("Invalid github_repo: {0}")]
    RepoRef(#[from] SpannedErr<RepoRefError>),

    #[error("Invalid hyper_params: {0}")]
    HyperParams(#[from] SpannedErr<HyperParamsError>),

    #[error("Failed to launch cluster: {0}")]
    Launch(#[from] SpannedErr<LaunchError>),

    #[error("run is not implemented for the base job builder; use an ecosystem runner")]
    NotImplemented,

    #[error("Job context accessed before construct succeeded")]
    NotConstructed,
}

impl ExtractSpanTrace for JobError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            JobError::Validation(e) => e.span_trace(),
            JobError::RepoRef(e) => e.span_trace(),
            JobError::HyperParams(e) => e.span_trace(),
            JobError::Launch(e) => e.span_trace(),
            JobError::NotImplemented | JobError::NotConstructed => None,
        }
    }
}
