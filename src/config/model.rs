// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::dag::{Subtask, TaskGraph};
use crate::engine::{DEFAULT_MAX_CONCURRENCY, DEFAULT_POLL_INTERVAL, ScheduleOptions};
use crate::errors::Result;
use crate::types::{Payload, deserialize_duration, deserialize_opt_duration};

/// Plan file as read from TOML, before semantic validation.
///
/// ```toml
/// [config]
/// plan_id = "nightly"
/// max_concurrency = 3
/// default_timeout = "30s"
///
/// [[subtask]]
/// id = "fetch"
/// kind = "command"
/// input = { cmd = "echo hello" }
///
/// [[subtask]]
/// id = "summarise"
/// kind = "echo"
/// after = ["fetch"]
/// timeout = "5s"
/// ```
///
/// Subtasks are an array so declaration order is preserved; it is also the
/// dispatch order among ready subtasks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPlanFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub subtask: Vec<SubtaskConfig>,
}

/// Validated plan file. Only obtainable through `TryFrom<RawPlanFile>`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub config: ConfigSection,
    pub subtask: Vec<SubtaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Graph id; the loader falls back to the file stem.
    #[serde(default)]
    pub plan_id: Option<String>,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub default_timeout: Option<Duration>,

    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval: Duration,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            plan_id: None,
            max_concurrency: default_max_concurrency(),
            default_timeout: None,
            poll_interval: default_poll_interval(),
        }
    }
}

/// One `[[subtask]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubtaskConfig {
    pub id: String,

    /// Worker kind, looked up in the registry at dispatch time.
    pub kind: String,

    /// This subtask waits for all subtasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub timeout: Option<Duration>,

    #[serde(default)]
    pub input: Option<toml::Value>,
}

impl SubtaskConfig {
    /// The input as a JSON payload (`null` when absent).
    pub fn payload(&self) -> Result<Payload> {
        match &self.input {
            Some(value) => Ok(serde_json::to_value(value)?),
            None => Ok(Payload::Null),
        }
    }
}

impl PlanFile {
    pub(crate) fn new_unchecked(config: ConfigSection, subtask: Vec<SubtaskConfig>) -> Self {
        Self { config, subtask }
    }

    /// Build the task graph described by this plan. `fallback_id` is used
    /// when `[config].plan_id` is not set.
    pub fn to_graph(&self, fallback_id: &str) -> Result<TaskGraph> {
        let id = self.config.plan_id.as_deref().unwrap_or(fallback_id);

        let subtasks = self
            .subtask
            .iter()
            .map(|cfg| {
                let mut subtask = Subtask::new(cfg.id.clone(), cfg.kind.clone())
                    .with_input(cfg.payload()?);
                for dep in &cfg.after {
                    subtask = subtask.after(dep.clone());
                }
                if let Some(timeout) = cfg.timeout {
                    subtask = subtask.with_timeout(timeout);
                }
                Ok(subtask)
            })
            .collect::<Result<Vec<_>>>()?;

        TaskGraph::new(id, subtasks)
    }

    pub fn schedule_options(&self) -> ScheduleOptions {
        ScheduleOptions::new(self.config.max_concurrency, self.config.default_timeout)
            .with_poll_interval(self.config.poll_interval)
    }
}
