use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;
use tracing::{Level, debug, error, info, instrument};

use crate::config::TrainingSettings;
use crate::emr::response::LaunchResponse;
use crate::error::{SpannedErr, SpannedExt};

use super::clock::{Clock, job_timestamp};
use super::env::{ACCESS_KEY_VAR, EnvLookup, SECRET_KEY_VAR, resolve};
use super::error::{HyperParamsError, JobError};
use super::github::{parse_github_repo, training_file_url};
use super::request::JobRequest;

pub const BUCKET_NAME_PROPERTY: &str = "BUCKET_NAME";

/// Everything derived from a validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct JobContext {
    pub environment: String,
    pub ecosystem: &'static str,
    pub data_version: String,
    pub bucket_name: String,
    pub training_file_url: String,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,

    /// Compact JSON text of the request's hyper_params
    pub hyper_params: Option<String>,

    /// Exported into the cluster's environment
    pub properties: BTreeMap<String, String>,
}

/// Shared request handling for every ecosystem runner.
pub struct JobBuilder {
    ecosystem: &'static str,
    timestamp: String,
    training: TrainingSettings,
    env: Box<dyn EnvLookup>,
    context: Option<JobContext>,
}

impl std::fmt::Debug for JobBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobBuilder")
            .field("ecosystem", &self.ecosystem)
            .field("timestamp", &self.timestamp)
            .field("constructed", &self.context.is_some())
            .finish()
    }
}

impl JobBuilder {
    /// The job timestamp is taken from `clock` here, once per builder.
    pub fn new(
        ecosystem: &'static str,
        training: TrainingSettings,
        env: Box<dyn EnvLookup>,
        clock: &dyn Clock,
    ) -> JobBuilder {
        JobBuilder {
            ecosystem,
            timestamp: job_timestamp(clock),
            training,
            env,
            context: None,
        }
    }

    /// UTC creation time, `YYYY_MM_DD_HH_MM_SS`
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn training(&self) -> &TrainingSettings {
        &self.training
    }

    pub fn context(&self) -> Result<&JobContext, JobError> {
        self.context.as_ref().ok_or(JobError::NotConstructed)
    }

    #[instrument(
        "job_builder/construct",
        level = Level::DEBUG,
        skip_all,
        fields(ecosystem = self.ecosystem)
    )]
    pub fn construct(&mut self, request: &JobRequest) -> Result<(), JobError> {
        self.context = None;

        let fields = match request.validate() {
            Ok(fields) => fields,
            Err(e) => {
                error!("Rejected job request: {}", e);
                return Err(JobError::from(SpannedErr::capture(e)));
            }
        };

        let (owner, repo) = parse_github_repo(fields.github_repo)
            .inspect_err(|e| error!("{}", e))
            .with_span_trace()?;
        let training_file_url = training_file_url(
            &owner,
            &repo,
            &self.training.branch,
            &self.training.file_path,
        );
        debug!("Training file resolved to {}", training_file_url);

        let aws_access_key = resolve(
            self.env.as_ref(),
            ACCESS_KEY_VAR,
            request.aws_access_key.as_deref(),
        );
        let aws_secret_key = resolve(
            self.env.as_ref(),
            SECRET_KEY_VAR,
            request.aws_secret_key.as_deref(),
        );
        if aws_access_key.is_none() || aws_secret_key.is_none() {
            debug!("S3 credentials are not fully set; the job will run without them.");
        }

        let hyper_params = match &request.hyper_params {
            Some(value) => serialize_hyper_params(value)
                .inspect_err(|e| error!("Failed to process hyper_params: {}", e))
                .with_span_trace()?,
            None => None,
        };

        let properties = BTreeMap::from([
            (
                ACCESS_KEY_VAR.to_string(),
                aws_access_key.clone().unwrap_or_default(),
            ),
            (
                SECRET_KEY_VAR.to_string(),
                aws_secret_key.clone().unwrap_or_default(),
            ),
            (
                BUCKET_NAME_PROPERTY.to_string(),
                fields.bucket_name.to_string(),
            ),
        ]);

        info!(
            "Constructed {} job for environment '{}' (data version '{}').",
            self.ecosystem, fields.environment, fields.data_version
        );

        self.context = Some(JobContext {
            environment: fields.environment.to_string(),
            ecosystem: self.ecosystem,
            data_version: fields.data_version.to_string(),
            bucket_name: fields.bucket_name.to_string(),
            training_file_url,
            aws_access_key,
            aws_secret_key,
            hyper_params,
            properties,
        });
        Ok(())
    }
}

/// Compact JSON of a hyperparameter mapping. An empty mapping yields `None`.
fn serialize_hyper_params(value: &Value) -> Result<Option<String>, HyperParamsError> {
    match value {
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(_) => Ok(Some(serde_json::to_string(value)?)),
        Value::Null => Ok(None),
        Value::Array(_) => Err(HyperParamsError::NotAMapping("a list")),
        Value::String(_) => Err(HyperParamsError::NotAMapping("a string")),
        Value::Number(_) => Err(HyperParamsError::NotAMapping("a number")),
        Value::Bool(_) => Err(HyperParamsError::NotAMapping("a boolean")),
    }
}

/// The `{construct, run}` contract every ecosystem runner fulfils.
pub trait JobRunner: Send {
    fn builder_mut(&mut self) -> &mut JobBuilder;

    fn construct(&mut self, request: &JobRequest) -> Result<(), JobError> {
        self.builder_mut().construct(request)
    }

    fn run(
        &mut self,
        _request: &JobRequest,
    ) -> impl Future<Output = Result<LaunchResponse, JobError>> + Send {
        async { Err(JobError::NotImplemented) }
    }
}

impl JobRunner for JobBuilder {
    fn builder_mut(&mut self) -> &mut JobBuilder {
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::config::Config;
    use crate::job::clock::FixedClock;
    use crate::job::error::ValidationError;
    use crate::job::request::tests::request;

    /// In-memory sink for formatted log lines.
    #[derive(Clone, Default)]
    pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        pub(crate) fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Routes this thread's events into a buffer until the guard drops.
    pub(crate) fn capture_logs() -> (LogBuffer, DefaultGuard) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    pub(crate) fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2018, 3, 7, 9, 5, 42).unwrap())
    }

    pub(crate) fn env(pairs: &[(&str, &str)]) -> Box<dyn EnvLookup> {
        Box::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    pub(crate) fn stage_request() -> JobRequest {
        request(&[
            ("environment", "stage"),
            ("data_version", "v1"),
            ("bucket_name", "b1"),
            ("github_repo", "org/repo"),
            ("aws_access_key", "request-access"),
            ("aws_secret_key", "request-secret"),
        ])
    }

    fn builder(env_pairs: &[(&str, &str)]) -> JobBuilder {
        JobBuilder::new(
            "maven",
            Config::default().training,
            env(env_pairs),
            &fixed_clock(),
        )
    }

    #[test]
    fn test_construct_resolves_context() {
        let mut builder = builder(&[]);
        builder.construct(&stage_request()).unwrap();

        let context = builder.context().unwrap();
        assert_eq!(context.environment, "stage");
        assert_eq!(context.ecosystem, "maven");
        assert_eq!(context.bucket_name, "b1");
        assert_eq!(
            context.training_file_url,
            "https://raw.githubusercontent.com/org/repo/master/training/train.py"
        );
        assert_eq!(context.hyper_params, None);
        assert_eq!(builder.timestamp(), "2018_03_07_09_05_42");
    }

    #[test]
    fn test_construct_uses_request_credentials_without_env() {
        let mut builder = builder(&[]);
        builder.construct(&stage_request()).unwrap();

        let context = builder.context().unwrap();
        assert_eq!(context.aws_access_key.as_deref(), Some("request-access"));
        assert_eq!(context.aws_secret_key.as_deref(), Some("request-secret"));
        assert_eq!(context.properties[ACCESS_KEY_VAR], "request-access");
        assert_eq!(context.properties[SECRET_KEY_VAR], "request-secret");
        assert_eq!(context.properties[BUCKET_NAME_PROPERTY], "b1");
    }

    #[test]
    fn test_construct_env_credentials_override_request() {
        let mut builder = builder(&[
            (ACCESS_KEY_VAR, "env-access"),
            (SECRET_KEY_VAR, "env-secret"),
        ]);
        builder.construct(&stage_request()).unwrap();

        let context = builder.context().unwrap();
        assert_eq!(context.aws_access_key.as_deref(), Some("env-access"));
        assert_eq!(context.aws_secret_key.as_deref(), Some("env-secret"));
        assert_eq!(context.properties[ACCESS_KEY_VAR], "env-access");
    }

    #[test]
    fn test_construct_without_any_credentials() {
        let mut request = stage_request();
        request.aws_access_key = None;
        request.aws_secret_key = None;

        let mut builder = builder(&[]);
        builder.construct(&request).unwrap();

        let context = builder.context().unwrap();
        assert_eq!(context.aws_access_key, None);
        assert_eq!(context.properties[SECRET_KEY_VAR], "");
    }

    #[test]
    fn test_construct_serializes_hyper_params_compactly() {
        let mut request = stage_request();
        request.hyper_params = Some(json!({"a": 1}));

        let mut builder = builder(&[]);
        builder.construct(&request).unwrap();
        assert_eq!(
            builder.context().unwrap().hyper_params.as_deref(),
            Some(r#"{"a":1}"#)
        );

        request.hyper_params = Some(json!({"epochs": 10, "lr": 0.5, "layers": [64, 32]}));
        builder.construct(&request).unwrap();
        assert_eq!(
            builder.context().unwrap().hyper_params.as_deref(),
            Some(r#"{"epochs":10,"lr":0.5,"layers":[64,32]}"#)
        );
    }

    #[test]
    fn test_construct_keeps_hyper_params_key_order() {
        let mut request = stage_request();
        request.hyper_params = Some(
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": {"b": 1, "a": 2}}"#).unwrap(),
        );

        let mut builder = builder(&[]);
        builder.construct(&request).unwrap();
        assert_eq!(
            builder.context().unwrap().hyper_params.as_deref(),
            Some(r#"{"zeta":1,"alpha":2,"mid":{"b":1,"a":2}}"#)
        );
    }

    #[test]
    fn test_construct_rejects_non_mapping_hyper_params() {
        let mut request = stage_request();
        request.hyper_params = Some(json!([1, 2]));

        let mut builder = builder(&[]);
        let err = builder.construct(&request).unwrap_err();
        assert!(matches!(
            err,
            JobError::HyperParams(SpannedErr {
                err: HyperParamsError::NotAMapping("a list"),
                ..
            })
        ));
        assert!(matches!(builder.context(), Err(JobError::NotConstructed)));
    }

    #[test]
    fn test_construct_reports_missing_fields() {
        let mut builder = builder(&[]);
        let err = builder
            .construct(&request(&[("environment", "stage"), ("github_repo", "org/repo")]))
            .unwrap_err();

        match err {
            JobError::Validation(SpannedErr { err, .. }) => assert_eq!(
                err,
                ValidationError {
                    missing: vec!["data_version", "bucket_name"]
                }
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_construct_logs_missing_fields() {
        let (logs, _guard) = capture_logs();

        let mut builder = builder(&[]);
        let _ = builder
            .construct(&request(&[("environment", "stage"), ("github_repo", "org/repo")]));

        let lines = logs.lines();
        assert!(
            lines
                .iter()
                .any(|l| l.contains("ERROR") && l.contains("data_version, bucket_name")),
            "{lines:#?}"
        );
    }

    #[test]
    fn test_construct_rejects_bad_repo() {
        let mut request = stage_request();
        request.github_repo = Some("not-a-repo".to_string());

        let mut builder = builder(&[]);
        assert!(matches!(
            builder.construct(&request),
            Err(JobError::RepoRef(_))
        ));
    }

    #[tokio::test]
    async fn test_base_builder_run_is_not_implemented() {
        let mut builder = builder(&[]);
        assert!(matches!(
            builder.run(&stage_request()).await,
            Err(JobError::NotImplemented)
        ));
    }
}
