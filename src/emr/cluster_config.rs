use std::collections::{BTreeMap, HashMap};

use aws_sdk_emr::types::{
    ActionOnFailure, Application, BootstrapActionConfig, Configuration, HadoopJarStepConfig,
    JobFlowInstancesConfig, ScriptBootstrapActionConfig, StepConfig, Tag,
};
use serde::Serialize;

use crate::config::ClusterSettings;

pub(crate) const COMMAND_RUNNER_JAR: &str = "command-runner.jar";
pub(crate) const HADOOP_HOME: &str = "/home/hadoop";
const REDACTED: &str = "<redacted>";

/// One `command-runner.jar` invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSpec {
    pub name: String,
    pub args: Vec<String>,
}

/// Description of one EMR job flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterConfig {
    pub name: String,
    pub log_uri: String,
    pub ecosystem: String,
    pub s3_bootstrap_uri: String,
    pub training_repo_url: String,
    pub training_file_name: String,
    pub python: String,
    pub properties: BTreeMap<String, String>,
    pub hyper_params: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub settings: ClusterSettings,
}

impl ClusterConfig {
    pub fn step_specs(&self) -> Vec<StepSpec> {
        let training_file = format!("{HADOOP_HOME}/{}", self.training_file_name);
        let mut train_args = vec![self.python.clone(), training_file];
        train_args.extend(self.hyper_params.iter().cloned());

        vec![
            StepSpec {
                name: "Setup - copy files".to_string(),
                args: vec![
                    "aws".to_string(),
                    "s3".to_string(),
                    "cp".to_string(),
                    self.s3_bootstrap_uri.clone(),
                    format!("{HADOOP_HOME}/"),
                ],
            },
            StepSpec {
                name: "Setup - download training file".to_string(),
                args: vec![
                    "wget".to_string(),
                    self.training_repo_url.clone(),
                    "-P".to_string(),
                    format!("{HADOOP_HOME}/"),
                ],
            },
            StepSpec {
                name: "Run training job".to_string(),
                args: train_args,
            },
        ]
    }

    /// Copy safe to print: credential properties are masked.
    pub fn redacted(&self) -> ClusterConfig {
        let mut redacted = self.clone();
        for (key, value) in redacted.properties.iter_mut() {
            if key != "BUCKET_NAME" && !value.is_empty() {
                *value = REDACTED.to_string();
            }
        }
        redacted
    }

    pub(crate) fn instances(&self) -> JobFlowInstancesConfig {
        JobFlowInstancesConfig::builder()
            .instance_count(self.settings.instance_count)
            .master_instance_type(&self.settings.instance_type)
            .slave_instance_type(&self.settings.instance_type)
            .keep_job_flow_alive_when_no_steps(false)
            .termination_protected(false)
            .build()
    }

    pub(crate) fn applications(&self) -> Vec<Application> {
        self.settings
            .applications
            .iter()
            .map(|name| Application::builder().name(name).build())
            .collect()
    }

    pub(crate) fn bootstrap_actions(&self) -> Vec<BootstrapActionConfig> {
        let script = ScriptBootstrapActionConfig::builder()
            .path(&self.s3_bootstrap_uri)
            .build();
        vec![
            BootstrapActionConfig::builder()
                .name("Bootstrap the cluster")
                .script_bootstrap_action(script)
                .build(),
        ]
    }

    pub(crate) fn steps(&self) -> Vec<StepConfig> {
        self.step_specs()
            .into_iter()
            .map(|spec| {
                let jar_step = HadoopJarStepConfig::builder()
                    .jar(COMMAND_RUNNER_JAR)
                    .set_args(Some(spec.args))
                    .build();
                StepConfig::builder()
                    .name(spec.name)
                    .action_on_failure(ActionOnFailure::TerminateCluster)
                    .hadoop_jar_step(jar_step)
                    .build()
            })
            .collect()
    }

    /// Exports the properties into both the hadoop and spark environments.
    pub(crate) fn configurations(&self) -> Vec<Configuration> {
        let exported: HashMap<String, String> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        ["hadoop-env", "spark-env"]
            .into_iter()
            .map(|classification| {
                let export = Configuration::builder()
                    .classification("export")
                    .set_properties(Some(exported.clone()))
                    .build();
                Configuration::builder()
                    .classification(classification)
                    .configurations(export)
                    .build()
            })
            .collect()
    }

    pub(crate) fn sdk_tags(&self) -> Vec<Tag> {
        self.tags
            .iter()
            .map(|(key, value)| Tag::builder().key(key).value(value).build())
            .collect()
    }
}
