// src/engine/mod.rs

//! Scheduling and execution engine.
//!
//! This module ties together:
//! - the job/task-instance state machine ([`state`])
//! - the pure scheduler core that ticks once per poll interval ([`core`])
//! - the async runtime event loop that reacts to:
//!   - interval ticks
//!   - task completion events from executors
//!   - on-demand run triggers and management actions
//!   - shutdown signals
//!
//! The pure core lives in [`core`]; the async/IO shell is implemented in
//! [`runtime`].

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::config::SchedulerSection;
use crate::model::{JobId, ManagementAction, ProcessId, TaskInstanceId};

/// Result of one external task execution, as reported by an executor.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Whether the process exited successfully (exit code 0).
    pub success: bool,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr; for a failed spawn, the spawn error text.
    pub stderr: String,
}

impl ExecOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Description of a task instance the engine wants an executor to run now.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub instance: TaskInstanceId,
    pub job: JobId,
    pub task_name: String,
    /// Interpreter binary, e.g. `python3` or `sh`.
    pub interpreter: String,
    /// Script artifact handed to the interpreter.
    pub code: PathBuf,
    /// Whitespace-separated argument string appended after the script path.
    pub arguments: String,
}

/// Events flowing into the runtime from executors and external callers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// An executor finished running a task instance.
    TaskCompleted {
        instance: TaskInstanceId,
        outcome: ExecOutcome,
    },
    /// Run this process now, skipping the due-time check (overlap/error
    /// gating still applies).
    RunProcess { process: ProcessId },
    /// Operator action on a task instance.
    ManageInstance {
        instance: TaskInstanceId,
        action: ManagementAction,
    },
    /// Operator cancellation of a whole job.
    CancelJob { job: JobId },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Engine options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// How often the scheduler loop polls for ready work. Due-process
    /// evaluation is additionally latched to minute boundaries.
    pub poll_interval: Duration,
    /// If true, stop the runtime once no job or instance can make progress
    /// without operator intervention (used for one-shot invocations).
    pub exit_when_idle: bool,
}

impl EngineOptions {
    pub fn from_config(section: &SchedulerSection) -> Self {
        Self {
            poll_interval: Duration::from_millis(section.poll_interval_ms),
            exit_when_idle: section.exit_when_idle,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            exit_when_idle: false,
        }
    }
}

/// Decision returned by the core after a tick or an event.
#[derive(Debug)]
pub struct EngineStep {
    /// Task instances to hand to the executor.
    pub dispatched: Vec<ExecRequest>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Callback invoked with (instance, error text) when a task execution fails.
///
/// Registered by the host application; failures inside the hook are the
/// host's problem, the engine only calls it.
pub type TaskErrorHook = Box<dyn Fn(TaskInstanceId, &str) + Send>;

/// Current host-local wall-clock time, as the engine core expects it.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub mod core;
pub mod runtime;
pub mod state;

pub use self::core::Engine;
pub use self::runtime::Runtime;
