// src/model/definition.rs

//! Durable definitions: processes and their tasks.

use std::path::PathBuf;

use crate::model::{ProcessId, TaskId};
use crate::recurrence::Schedule;

/// A recurring scheduled unit with a cron-like trigger.
#[derive(Debug, Clone)]
pub struct ProcessDefinition {
    pub id: ProcessId,
    pub name: String,
    pub description: String,
    pub active: bool,
    /// Allow a new job even when the latest job ended in error.
    pub run_if_err: bool,
    /// Allow a new job while the latest job is still running.
    pub run_overlap: bool,
    pub schedule: Schedule,
}

/// One step of a process's work: an external command to execute.
///
/// Dependency edges between tasks live in the per-process
/// [`crate::dag::TaskGraph`], not on the definition itself.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub process: ProcessId,
    pub name: String,
    pub description: String,
    pub active: bool,
    /// Interpreter binary, e.g. `python3` or `sh`.
    pub interpreter: String,
    /// Path to the script artifact handed to the interpreter.
    pub code: PathBuf,
    /// Whitespace-separated argument string appended after the script path.
    pub arguments: String,
}
