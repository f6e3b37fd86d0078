// src/model/instance.rs

//! Run records: jobs and task instances.
//!
//! These are the only shared mutable state in the engine. They are mutated
//! exclusively through the state-machine entry points in
//! [`crate::engine::state`], never by raw field assignment from workers.

use chrono::NaiveDateTime;

use crate::model::{JobId, JobStatus, ProcessId, TaskId, TaskInstanceId, TaskInstanceStatus};

/// One triggered run of a process definition.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub process: ProcessId,
    pub status: JobStatus,
    pub dt_start: NaiveDateTime,
    pub dt_end: Option<NaiveDateTime>,
    pub observations: String,
}

/// One task's execution record within a job.
///
/// Created alongside its job, one per task definition that was active at job
/// creation time. Holds non-owning references (ids) to its job and task.
#[derive(Debug, Clone)]
pub struct TaskInstance {
    pub id: TaskInstanceId,
    pub job: JobId,
    pub task: TaskId,
    pub status: TaskInstanceStatus,
    pub dt_created: NaiveDateTime,
    pub dt_start: Option<NaiveDateTime>,
    pub dt_end: Option<NaiveDateTime>,
    pub observations: String,
}

impl TaskInstance {
    pub fn new(
        id: TaskInstanceId,
        job: JobId,
        task: TaskId,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            job,
            task,
            status: TaskInstanceStatus::Awaiting,
            dt_created: now,
            dt_start: None,
            dt_end: None,
            observations: String::new(),
        }
    }
}
