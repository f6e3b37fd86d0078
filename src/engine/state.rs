// src/engine/state.rs

//! State-machine entry points for jobs and task instances.
//!
//! Every status mutation in the system goes through the functions in this
//! module, never through raw field assignment. This keeps the bookkeeping
//! invariants (end-time handling, observation clearing, job revival and
//! failure coupling) in one place, and makes the legality tables from
//! [`crate::model::status`] impossible to bypass.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::engine::ExecOutcome;
use crate::errors::{JobflowError, Result};
use crate::model::status::transition_allowed;
use crate::model::{JobId, JobStatus, ManagementAction, TaskInstanceId, TaskInstanceStatus};
use crate::store::Store;

/// Single guarded entry point for task-instance status changes.
///
/// Rejects transitions the legality table forbids, then applies the side
/// effects of entering the new status:
/// - run-eligible statuses (awaiting, reopened, retry) clear observations
///   and revive a finished/errored job back to initialized
/// - initialized stamps the start time and clears observations
/// - open statuses clear the end time, closed statuses stamp it
pub fn set_status(
    store: &mut Store,
    instance: TaskInstanceId,
    status: TaskInstanceStatus,
    now: NaiveDateTime,
) -> Result<()> {
    let (current, job_id) = {
        let inst = store.instance(instance)?;
        (inst.status, inst.job)
    };

    if !transition_allowed(current, status) {
        return Err(JobflowError::IllegalTransition(format!(
            "cannot move task instance {instance} from {current} to {status}"
        )));
    }

    if status.is_run_eligible() {
        // A manual retry/reopen revives a finished or errored job.
        let job = store.job_mut(job_id)?;
        if matches!(job.status, JobStatus::Error | JobStatus::Finished) {
            debug!(job = %job_id, from = %job.status, "reviving job to initialized");
            job.status = JobStatus::Initialized;
        }
    }

    let inst = store.instance_mut(instance)?;

    if status.is_run_eligible() {
        inst.observations.clear();
    }

    if status == TaskInstanceStatus::Initialized {
        inst.dt_start = Some(now);
        inst.observations.clear();
    }

    if status.is_open() {
        inst.dt_end = None;
    } else if status.is_closed() {
        inst.dt_end = Some(now);
    }

    debug!(instance = %instance, from = %current, to = %status, "task instance transition");
    inst.status = status;
    Ok(())
}

/// Reopen a task instance and, recursively, every descendant instance in the
/// same job.
///
/// Descendants are reset to `awaiting`; the root itself becomes `reopened`.
/// Reopening the root is only legal from a terminal ok status; the check
/// happens before any recursive mutation.
pub fn reopen(
    store: &mut Store,
    instance: TaskInstanceId,
    is_root: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let current = store.instance(instance)?.status;
    if is_root && !current.can_reopen() {
        return Err(JobflowError::IllegalTransition(format!(
            "cannot reopen task instance {instance} in status {current}"
        )));
    }

    for child in store.child_instances(instance)? {
        reopen(store, child, false, now)?;
    }

    let target = if is_root {
        TaskInstanceStatus::Reopened
    } else {
        TaskInstanceStatus::Awaiting
    };
    set_status(store, instance, target, now)
}

/// Whether every parent instance of this instance (same job) is in an ok
/// status. An instance with no parent instances is always ready.
pub fn ready_to_run(store: &Store, instance: TaskInstanceId) -> Result<bool> {
    for parent in store.parent_instances(instance)? {
        if !store.instance(parent)?.status.is_ok() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Apply an operator action to a task instance.
pub fn apply_management(
    store: &mut Store,
    instance: TaskInstanceId,
    action: ManagementAction,
    now: NaiveDateTime,
) -> Result<()> {
    info!(instance = %instance, %action, "applying management action");
    match action {
        ManagementAction::Reopen => reopen(store, instance, true, now),
        _ => set_status(store, instance, action.target_status(), now),
    }
}

/// Cancel a job and every owned instance that is awaiting or in error.
///
/// Legal only while the job is initialized or in error. The store is
/// single-writer, so the job flip and the bulk instance update commit
/// together; a partial cancel cannot be observed.
pub fn cancel_job(store: &mut Store, job: JobId, now: NaiveDateTime) -> Result<()> {
    let status = store.job(job)?.status;
    if !status.is_cancelable() {
        return Err(JobflowError::IllegalTransition(format!(
            "cannot cancel job {job} in status {status}"
        )));
    }

    store.job_mut(job)?.status = JobStatus::Cancelled;

    let targets: Vec<TaskInstanceId> = store
        .instances_of_job(job)
        .into_iter()
        .filter(|i| {
            matches!(
                i.status,
                TaskInstanceStatus::Awaiting | TaskInstanceStatus::Error
            )
        })
        .map(|i| i.id)
        .collect();

    for instance in targets {
        set_status(store, instance, TaskInstanceStatus::Cancelled, now)?;
    }

    info!(job = %job, "job cancelled");
    Ok(())
}

/// Completion reconciliation for one job.
///
/// An unfinished job that owns at least one instance, all of them in ok
/// statuses, becomes `finished` with an end timestamp. A job with zero
/// instances never auto-finishes through this rule.
///
/// Returns whether the job was finished by this call.
pub fn reconcile_job(store: &mut Store, job: JobId, now: NaiveDateTime) -> Result<bool> {
    if !store.job(job)?.status.is_unfinished() {
        return Ok(false);
    }

    let instances = store.instances_of_job(job);
    if instances.is_empty() || !instances.iter().all(|i| i.status.is_ok()) {
        return Ok(false);
    }

    let j = store.job_mut(job)?;
    j.status = JobStatus::Finished;
    j.dt_end = Some(now);
    info!(job = %job, "all task instances resolved; job finished");
    Ok(true)
}

/// Force a job into error after a task execution failure.
///
/// A cancelled job keeps its terminal state; a late completion from an
/// orphaned worker must not disturb it.
pub fn fail_job(store: &mut Store, job: JobId) -> Result<()> {
    let j = store.job_mut(job)?;
    if j.status != JobStatus::Cancelled {
        j.status = JobStatus::Error;
    }
    Ok(())
}

/// Apply an executor outcome to a task instance.
///
/// Success: instance finished, observations = captured stdout.
/// Failure: observations = stdout plus the failure detail, instance in
/// error, owning job forced to error immediately so dependent-task gating
/// sees it on the next tick.
///
/// Returns `true` if the outcome was a failure (the caller invokes the
/// error-notification hook).
pub fn apply_outcome(
    store: &mut Store,
    instance: TaskInstanceId,
    outcome: ExecOutcome,
    now: NaiveDateTime,
) -> Result<bool> {
    let job = store.instance(instance)?.job;

    if outcome.success {
        set_status(store, instance, TaskInstanceStatus::Finished, now)?;
        store.instance_mut(instance)?.observations = outcome.stdout;
        debug!(instance = %instance, job = %job, "task instance finished");
        return Ok(false);
    }

    let mut observations = outcome.stdout;
    if !observations.is_empty() && !observations.ends_with('\n') {
        observations.push('\n');
    }
    observations.push_str("execution failed: ");
    observations.push_str(&outcome.stderr);

    set_status(store, instance, TaskInstanceStatus::Error, now)?;
    store.instance_mut(instance)?.observations = observations;
    fail_job(store, job)?;

    warn!(instance = %instance, job = %job, "task instance failed; job marked as error");
    Ok(true)
}
