use serde::{Deserialize, Serialize};

pub const HTTP_OK: u16 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub http_status_code: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Result of a `RunJobFlow` submission, passed back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_flow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_arn: Option<String>,

    pub response_metadata: ResponseMetadata,

    /// Service error text when the API answered with a failure status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LaunchResponse {
    pub fn status_code(&self) -> u16 {
        self.response_metadata.http_status_code
    }

    pub fn is_success(&self) -> bool {
        self.status_code() == HTTP_OK
    }
}
