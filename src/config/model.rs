// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level definition file as read from TOML.
///
/// ```toml
/// [scheduler]
/// poll_interval_ms = 250
///
/// [process.nightly_etl]
/// minute = "0"
/// hour = "2"
///
/// [process.nightly_etl.task.extract]
/// interpreter = "python3"
/// code = "scripts/extract.py"
///
/// [process.nightly_etl.task.load]
/// interpreter = "python3"
/// code = "scripts/load.py"
/// after = ["extract"]
/// ```
///
/// All sections are optional and have reasonable defaults, except that at
/// least one `[process.<name>]` must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Engine behaviour from `[scheduler]`.
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// All process definitions from `[process.<name>]`.
    ///
    /// Keys are the process names.
    #[serde(default)]
    pub process: BTreeMap<String, ProcessConfig>,
}

/// Validated configuration.
///
/// Constructed only through `ConfigFile::try_from(RawConfigFile)`, which
/// checks recurrence fields, dependency references, and acyclicity.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub process: BTreeMap<String, ProcessConfig>,
}

impl ConfigFile {
    /// Construct without re-validating. Used by `validate` after checks pass.
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        process: BTreeMap<String, ProcessConfig>,
    ) -> Self {
        Self { scheduler, process }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Poll interval of the scheduler loop in milliseconds.
    ///
    /// Due-process evaluation is latched to minute boundaries regardless of
    /// the poll interval; polling faster only reduces dispatch latency.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Exit the runtime once no job or task instance can make progress
    /// without operator intervention. Used for one-shot invocations.
    #[serde(default)]
    pub exit_when_idle: bool,
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            exit_when_idle: false,
        }
    }
}

/// `[process.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessConfig {
    #[serde(default)]
    pub description: String,

    /// Inactive processes are never evaluated for due runs.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Start a new job even if the latest job ended in error.
    #[serde(default)]
    pub run_if_err: bool,

    /// Start a new job even if the latest job is still running.
    #[serde(default)]
    pub run_overlap: bool,

    /// Recurrence fields, crontab style: `*`, or a comma-separated list of
    /// integers and `low-high` ranges.
    #[serde(default = "default_star")]
    pub minute: String,
    #[serde(default = "default_star")]
    pub hour: String,
    #[serde(default = "default_star")]
    pub day_of_month: String,
    #[serde(default = "default_star")]
    pub month: String,
    /// ISO numbering: Monday = 1 .. Sunday = 7.
    #[serde(default = "default_star")]
    pub day_of_week: String,

    /// Tasks from `[process.<name>.task.<task>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[process.<name>.task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub description: String,

    /// Inactive tasks get no instance when a job is created.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Interpreter binary used to run `code`.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Path of the script artifact handed to the interpreter.
    pub code: String,

    /// Whitespace-separated arguments appended after the script path.
    #[serde(default)]
    pub arguments: String,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_star() -> String {
    "*".to_string()
}

fn default_interpreter() -> String {
    "sh".to_string()
}
