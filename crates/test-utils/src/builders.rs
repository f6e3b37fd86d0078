#![allow(dead_code)]

use std::collections::BTreeMap;

use jobflow::config::{ConfigFile, ProcessConfig, RawConfigFile, SchedulerSection, TaskConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                scheduler: SchedulerSection::default(),
                process: BTreeMap::new(),
            },
        }
    }

    pub fn with_process(mut self, name: &str, process: ProcessConfig) -> Self {
        self.config.process.insert(name.to_string(), process);
        self
    }

    pub fn exit_when_idle(mut self, val: bool) -> Self {
        self.config.scheduler.exit_when_idle = val;
        self
    }

    pub fn poll_interval_ms(mut self, val: u64) -> Self {
        self.config.scheduler.poll_interval_ms = val;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Raw variant for tests that assert on validation failures.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProcessConfig`. Defaults to an always-due recurrence
/// (`* * * * *`), active, no overlap and no re-run-after-error.
pub struct ProcessConfigBuilder {
    process: ProcessConfig,
}

impl ProcessConfigBuilder {
    pub fn new() -> Self {
        Self {
            process: ProcessConfig {
                description: String::new(),
                active: true,
                run_if_err: false,
                run_overlap: false,
                minute: "*".to_string(),
                hour: "*".to_string(),
                day_of_month: "*".to_string(),
                month: "*".to_string(),
                day_of_week: "*".to_string(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn active(mut self, val: bool) -> Self {
        self.process.active = val;
        self
    }

    pub fn run_if_err(mut self, val: bool) -> Self {
        self.process.run_if_err = val;
        self
    }

    pub fn run_overlap(mut self, val: bool) -> Self {
        self.process.run_overlap = val;
        self
    }

    pub fn minute(mut self, val: &str) -> Self {
        self.process.minute = val.to_string();
        self
    }

    pub fn hour(mut self, val: &str) -> Self {
        self.process.hour = val.to_string();
        self
    }

    pub fn day_of_month(mut self, val: &str) -> Self {
        self.process.day_of_month = val.to_string();
        self
    }

    pub fn month(mut self, val: &str) -> Self {
        self.process.month = val.to_string();
        self
    }

    pub fn day_of_week(mut self, val: &str) -> Self {
        self.process.day_of_week = val.to_string();
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.process.task.insert(name.to_string(), task);
        self
    }

    pub fn build(self) -> ProcessConfig {
        self.process
    }
}

impl Default for ProcessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(code: &str) -> Self {
        Self {
            task: TaskConfig {
                description: String::new(),
                active: true,
                interpreter: "sh".to_string(),
                code: code.to_string(),
                arguments: String::new(),
                after: vec![],
            },
        }
    }

    pub fn interpreter(mut self, val: &str) -> Self {
        self.task.interpreter = val.to_string();
        self
    }

    pub fn arguments(mut self, val: &str) -> Self {
        self.task.arguments = val.to_string();
        self
    }

    pub fn active(mut self, val: bool) -> Self {
        self.task.active = val;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
