// src/model/status.rs

//! Status enumerations and the transition legality tables.
//!
//! Every status mutation in the engine goes through
//! [`crate::engine::state::set_status`], which consults
//! [`transition_allowed`]. The groupings below (`is_run_eligible`, `is_ok`,
//! ...) are the membership sets the scheduler and the state machine key off.

use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a [`crate::model::Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Created; task instances may still be pending or running.
    Initialized,
    /// All task instances resolved successfully (or the job was a no-op run).
    Finished,
    /// Cancelled by an operator.
    Cancelled,
    /// At least one task instance failed.
    Error,
}

impl JobStatus {
    /// A job can be cancelled only while it is initialized or in error.
    pub fn is_cancelable(self) -> bool {
        matches!(self, JobStatus::Initialized | JobStatus::Error)
    }

    /// Statuses that completion reconciliation considers for finishing.
    pub fn is_unfinished(self) -> bool {
        matches!(self, JobStatus::Initialized | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Initialized => "initialized",
            JobStatus::Finished => "finished",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Lifecycle status of a [`crate::model::TaskInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskInstanceStatus {
    /// Waiting for parent instances to resolve.
    Awaiting,
    /// Dispatched to the executor; running.
    Initialized,
    /// Executed successfully.
    Finished,
    /// Cancelled by an operator or a job cancel.
    Cancelled,
    /// Reopened by an operator after a terminal status; will run again.
    Reopened,
    /// Marked for re-execution after an error.
    Retry,
    /// Manually declared resolved despite an error.
    Forced,
    /// Execution failed.
    Error,
}

impl TaskInstanceStatus {
    /// Statuses the scheduler may dispatch for execution.
    pub fn is_run_eligible(self) -> bool {
        matches!(
            self,
            TaskInstanceStatus::Awaiting
                | TaskInstanceStatus::Reopened
                | TaskInstanceStatus::Retry
        )
    }

    /// "Successfully resolved" for dependency readiness and job completion.
    pub fn is_ok(self) -> bool {
        matches!(
            self,
            TaskInstanceStatus::Finished
                | TaskInstanceStatus::Cancelled
                | TaskInstanceStatus::Forced
        )
    }

    /// Open statuses: entering one of these clears the end timestamp.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            TaskInstanceStatus::Initialized
                | TaskInstanceStatus::Awaiting
                | TaskInstanceStatus::Reopened
                | TaskInstanceStatus::Retry
        )
    }

    /// Closed statuses: entering one of these sets the end timestamp.
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            TaskInstanceStatus::Finished
                | TaskInstanceStatus::Cancelled
                | TaskInstanceStatus::Forced
                | TaskInstanceStatus::Error
        )
    }

    /// Statuses an operator may reopen from.
    pub fn can_reopen(self) -> bool {
        matches!(
            self,
            TaskInstanceStatus::Finished
                | TaskInstanceStatus::Cancelled
                | TaskInstanceStatus::Forced
        )
    }
}

impl fmt::Display for TaskInstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskInstanceStatus::Awaiting => "awaiting",
            TaskInstanceStatus::Initialized => "initialized",
            TaskInstanceStatus::Finished => "finished",
            TaskInstanceStatus::Cancelled => "cancelled",
            TaskInstanceStatus::Reopened => "reopened",
            TaskInstanceStatus::Retry => "retry",
            TaskInstanceStatus::Forced => "forced",
            TaskInstanceStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Whether `set_status` accepts a transition from `current` to `requested`.
///
/// Only operator-facing target statuses are guarded; the remaining
/// transitions are driven exclusively by the scheduler and the executor.
pub fn transition_allowed(current: TaskInstanceStatus, requested: TaskInstanceStatus) -> bool {
    match requested {
        TaskInstanceStatus::Cancelled => matches!(
            current,
            TaskInstanceStatus::Awaiting | TaskInstanceStatus::Error
        ),
        TaskInstanceStatus::Retry => current == TaskInstanceStatus::Error,
        TaskInstanceStatus::Forced => current == TaskInstanceStatus::Error,
        _ => true,
    }
}

/// Operator action on a task instance.
///
/// Each action maps onto a guarded state-machine operation; requesting one
/// against an instance outside its legality set is rejected without mutating
/// anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementAction {
    /// Declare an errored instance resolved.
    Force,
    /// Queue an errored instance for re-execution.
    Retry,
    /// Reopen a terminal instance and its descendants.
    Reopen,
    /// Cancel an awaiting or errored instance.
    Cancel,
}

impl ManagementAction {
    /// The status a plain `set_status` action transitions to.
    ///
    /// `Reopen` is not a bare status set; it goes through
    /// [`crate::engine::state::reopen`] instead.
    pub fn target_status(self) -> TaskInstanceStatus {
        match self {
            ManagementAction::Force => TaskInstanceStatus::Forced,
            ManagementAction::Retry => TaskInstanceStatus::Retry,
            ManagementAction::Reopen => TaskInstanceStatus::Reopened,
            ManagementAction::Cancel => TaskInstanceStatus::Cancelled,
        }
    }
}

impl fmt::Display for ManagementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ManagementAction::Force => "force",
            ManagementAction::Retry => "retry",
            ManagementAction::Reopen => "reopen",
            ManagementAction::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

impl FromStr for ManagementAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "force" => Ok(ManagementAction::Force),
            "retry" => Ok(ManagementAction::Retry),
            "reopen" => Ok(ManagementAction::Reopen),
            "cancel" => Ok(ManagementAction::Cancel),
            other => Err(format!(
                "invalid management action: {other} (expected \"force\", \"retry\", \"reopen\" or \"cancel\")"
            )),
        }
    }
}
