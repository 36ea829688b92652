pub mod builder;
pub mod clock;
pub mod env;
pub mod error;
pub mod github;
pub mod maven;
pub mod request;

pub use builder::{JobBuilder, JobContext, JobRunner};
pub use error::JobError;
pub use maven::MavenRunner;
pub use request::JobRequest;
