pub mod cluster_config;
pub mod launcher;
pub mod response;

pub use cluster_config::ClusterConfig;
pub use launcher::{AwsEmrLauncher, ClusterLauncher, LaunchError};
pub use response::LaunchResponse;
