// tests/state_machine.rs

//! Job / task-instance state machine: guarded transitions, reopen cascades,
//! job cancel and completion reconciliation.

use chrono::NaiveDateTime;

use jobflow::engine::{state, ExecOutcome};
use jobflow::errors::JobflowError;
use jobflow::model::{JobId, JobStatus, ManagementAction, ProcessId, TaskInstanceId, TaskInstanceStatus};
use jobflow::store::Store;

use jobflow_test_utils::builders::{ConfigFileBuilder, ProcessConfigBuilder, TaskConfigBuilder};
use jobflow_test_utils::fixed_now;

/// Store with one process `p` holding the chain a -> b -> c.
fn chain_store() -> (Store, ProcessId) {
    let cfg = ConfigFileBuilder::new()
        .with_process(
            "p",
            ProcessConfigBuilder::new()
                .with_task("a", TaskConfigBuilder::new("a.sh").build())
                .with_task("b", TaskConfigBuilder::new("b.sh").after("a").build())
                .with_task("c", TaskConfigBuilder::new("c.sh").after("b").build())
                .build(),
        )
        .build();

    let store = Store::from_config(&cfg).unwrap();
    let process = store.process_by_name("p").unwrap().id;
    (store, process)
}

fn inst(store: &Store, job: JobId, name: &str) -> TaskInstanceId {
    let process = store.job(job).unwrap().process;
    let task = store.task_by_name(process, name).unwrap().id;
    store.instance_of_job_task(job, task).unwrap().id
}

fn finish(store: &mut Store, instance: TaskInstanceId, now: NaiveDateTime) {
    state::set_status(store, instance, TaskInstanceStatus::Initialized, now).unwrap();
    state::apply_outcome(store, instance, ExecOutcome::success("ok"), now).unwrap();
}

fn fail(store: &mut Store, instance: TaskInstanceId, now: NaiveDateTime) {
    state::set_status(store, instance, TaskInstanceStatus::Initialized, now).unwrap();
    state::apply_outcome(store, instance, ExecOutcome::failure("partial", "boom"), now).unwrap();
}

#[test]
fn job_creation_snapshots_active_tasks_as_awaiting() {
    let (mut store, process) = chain_store();
    let now = fixed_now();

    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();

    let instances = store.instances_of_job(job);
    assert_eq!(instances.len(), 3);
    for instance in instances {
        assert_eq!(instance.status, TaskInstanceStatus::Awaiting);
        assert_eq!(instance.dt_created, now);
        assert_eq!(instance.dt_start, None);
        assert_eq!(instance.dt_end, None);
    }
}

#[test]
fn inactive_tasks_get_no_instance() {
    let (mut store, process) = chain_store();
    let b = store.task_by_name(process, "b").unwrap().id;
    store.deactivate_task(b).unwrap();

    let job = store
        .create_job(process, JobStatus::Initialized, fixed_now())
        .unwrap();

    assert_eq!(store.instances_of_job(job).len(), 2);
    assert!(store.instance_of_job_task(job, b).is_none());
}

#[test]
fn job_created_finished_gets_no_instances() {
    let (mut store, process) = chain_store();
    let now = fixed_now();

    let job = store.create_job(process, JobStatus::Finished, now).unwrap();

    assert!(store.instances_of_job(job).is_empty());
    let job = store.job(job).unwrap();
    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(job.dt_end, Some(now));
}

#[test]
fn cancel_is_only_legal_from_awaiting_or_error() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");

    // Awaiting -> cancelled is fine.
    state::set_status(&mut store, b, TaskInstanceStatus::Cancelled, now).unwrap();

    // Finished -> cancelled is rejected and mutates nothing.
    finish(&mut store, a, now);
    let err = state::set_status(&mut store, a, TaskInstanceStatus::Cancelled, now).unwrap_err();
    assert!(matches!(err, JobflowError::IllegalTransition(_)));
    assert_eq!(store.instance(a).unwrap().status, TaskInstanceStatus::Finished);
}

#[test]
fn retry_and_force_are_only_legal_from_error() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");

    assert!(state::set_status(&mut store, a, TaskInstanceStatus::Retry, now).is_err());
    assert!(state::set_status(&mut store, a, TaskInstanceStatus::Forced, now).is_err());

    fail(&mut store, a, now);
    state::set_status(&mut store, a, TaskInstanceStatus::Retry, now).unwrap();

    fail(&mut store, b, now);
    state::apply_management(&mut store, b, ManagementAction::Force, now).unwrap();
    assert_eq!(store.instance(b).unwrap().status, TaskInstanceStatus::Forced);
}

#[test]
fn run_eligible_entry_clears_observations_and_revives_job() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");

    fail(&mut store, a, now);
    assert_eq!(store.job(job).unwrap().status, JobStatus::Error);
    assert!(!store.instance(a).unwrap().observations.is_empty());
    assert!(store.instance(a).unwrap().dt_end.is_some());

    state::set_status(&mut store, a, TaskInstanceStatus::Retry, now).unwrap();

    let a_rec = store.instance(a).unwrap();
    assert!(a_rec.observations.is_empty());
    assert_eq!(a_rec.dt_end, None);
    assert_eq!(store.job(job).unwrap().status, JobStatus::Initialized);
}

#[test]
fn initialized_entry_stamps_start_and_closed_entry_stamps_end() {
    let (mut store, process) = chain_store();
    let start = fixed_now();
    let end = start + chrono::Duration::seconds(90);
    let job = store.create_job(process, JobStatus::Initialized, start).unwrap();
    let a = inst(&store, job, "a");

    state::set_status(&mut store, a, TaskInstanceStatus::Initialized, start).unwrap();
    assert_eq!(store.instance(a).unwrap().dt_start, Some(start));
    assert_eq!(store.instance(a).unwrap().dt_end, None);

    state::apply_outcome(&mut store, a, ExecOutcome::success("done"), end).unwrap();
    let a_rec = store.instance(a).unwrap();
    assert_eq!(a_rec.status, TaskInstanceStatus::Finished);
    assert_eq!(a_rec.dt_end, Some(end));
    assert_eq!(a_rec.observations, "done");
}

#[test]
fn ready_to_run_requires_all_parents_ok() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");

    // No parents: always ready.
    assert!(state::ready_to_run(&store, a).unwrap());
    // Parent awaiting: not ready.
    assert!(!state::ready_to_run(&store, b).unwrap());

    finish(&mut store, a, now);
    assert!(state::ready_to_run(&store, b).unwrap());
}

#[test]
fn cancelled_parent_counts_as_resolved() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");

    state::set_status(&mut store, a, TaskInstanceStatus::Cancelled, now).unwrap();
    assert!(state::ready_to_run(&store, b).unwrap());
}

#[test]
fn inactive_parent_without_instance_does_not_gate_readiness() {
    let (mut store, process) = chain_store();
    let a = store.task_by_name(process, "a").unwrap().id;
    store.deactivate_task(a).unwrap();

    let job = store
        .create_job(process, JobStatus::Initialized, fixed_now())
        .unwrap();
    let b = inst(&store, job, "b");

    assert!(state::ready_to_run(&store, b).unwrap());
}

#[test]
fn reopen_cascades_descendants_to_awaiting() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");
    let c = inst(&store, job, "c");

    finish(&mut store, a, now);
    finish(&mut store, b, now);
    finish(&mut store, c, now);
    state::reconcile_job(&mut store, job, now).unwrap();
    assert_eq!(store.job(job).unwrap().status, JobStatus::Finished);

    state::reopen(&mut store, a, true, now).unwrap();

    assert_eq!(store.instance(a).unwrap().status, TaskInstanceStatus::Reopened);
    assert_eq!(store.instance(b).unwrap().status, TaskInstanceStatus::Awaiting);
    assert_eq!(store.instance(c).unwrap().status, TaskInstanceStatus::Awaiting);
    // Reopening revived the finished job.
    assert_eq!(store.job(job).unwrap().status, JobStatus::Initialized);
}

#[test]
fn reopen_is_rejected_for_open_instances_before_any_mutation() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");

    let err = state::reopen(&mut store, a, true, now).unwrap_err();
    assert!(matches!(err, JobflowError::IllegalTransition(_)));
    assert_eq!(store.instance(a).unwrap().status, TaskInstanceStatus::Awaiting);
    assert_eq!(store.instance(b).unwrap().status, TaskInstanceStatus::Awaiting);
}

#[test]
fn job_cancel_bulk_cancels_awaiting_and_error_instances() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");
    let c = inst(&store, job, "c");

    finish(&mut store, a, now);
    fail(&mut store, b, now);
    // Job is now in error, which is still cancelable.

    state::cancel_job(&mut store, job, now).unwrap();

    assert_eq!(store.job(job).unwrap().status, JobStatus::Cancelled);
    assert_eq!(store.instance(a).unwrap().status, TaskInstanceStatus::Finished);
    assert_eq!(store.instance(b).unwrap().status, TaskInstanceStatus::Cancelled);
    assert_eq!(store.instance(c).unwrap().status, TaskInstanceStatus::Cancelled);
}

#[test]
fn job_cancel_is_rejected_for_finished_jobs() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Finished, now).unwrap();

    let err = state::cancel_job(&mut store, job, now).unwrap_err();
    assert!(matches!(err, JobflowError::IllegalTransition(_)));
    assert_eq!(store.job(job).unwrap().status, JobStatus::Finished);
}

#[test]
fn reconciliation_finishes_jobs_with_all_ok_instances() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let later = now + chrono::Duration::minutes(5);
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");
    let b = inst(&store, job, "b");
    let c = inst(&store, job, "c");

    finish(&mut store, a, now);
    assert!(!state::reconcile_job(&mut store, job, now).unwrap());

    // A mixture of finished / cancelled / forced all counts as resolved.
    fail(&mut store, b, now);
    state::set_status(&mut store, b, TaskInstanceStatus::Forced, now).unwrap();
    state::set_status(&mut store, c, TaskInstanceStatus::Cancelled, now).unwrap();

    assert!(state::reconcile_job(&mut store, job, later).unwrap());
    let job = store.job(job).unwrap();
    assert_eq!(job.status, JobStatus::Finished);
    assert_eq!(job.dt_end, Some(later));
}

#[test]
fn reconciliation_never_finishes_an_instance_less_job() {
    let cfg = ConfigFileBuilder::new()
        .with_process(
            "empty",
            ProcessConfigBuilder::new()
                .with_task("only", TaskConfigBuilder::new("only.sh").active(false).build())
                .build(),
        )
        .build();
    let mut store = Store::from_config(&cfg).unwrap();
    let process = store.process_by_name("empty").unwrap().id;
    let now = fixed_now();

    // Forced into existence as initialized despite having no instances.
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    assert!(store.instances_of_job(job).is_empty());

    assert!(!state::reconcile_job(&mut store, job, now).unwrap());
    assert_eq!(store.job(job).unwrap().status, JobStatus::Initialized);
}

#[test]
fn failed_outcome_marks_instance_and_job_error() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");

    state::set_status(&mut store, a, TaskInstanceStatus::Initialized, now).unwrap();
    let failed = state::apply_outcome(
        &mut store,
        a,
        ExecOutcome::failure("some output", "exit status 3"),
        now,
    )
    .unwrap();

    assert!(failed);
    let a_rec = store.instance(a).unwrap();
    assert_eq!(a_rec.status, TaskInstanceStatus::Error);
    assert!(a_rec.observations.contains("some output"));
    assert!(a_rec.observations.contains("execution failed: exit status 3"));
    assert_eq!(store.job(job).unwrap().status, JobStatus::Error);
}

#[test]
fn late_completion_does_not_disturb_a_cancelled_job() {
    let (mut store, process) = chain_store();
    let now = fixed_now();
    let job = store.create_job(process, JobStatus::Initialized, now).unwrap();
    let a = inst(&store, job, "a");

    // a is in flight when the job is cancelled; cancel leaves it running.
    state::set_status(&mut store, a, TaskInstanceStatus::Initialized, now).unwrap();
    state::cancel_job(&mut store, job, now).unwrap();
    assert_eq!(store.instance(a).unwrap().status, TaskInstanceStatus::Initialized);

    // The worker reports back later: the instance record is updated, the
    // job's terminal state is not.
    state::apply_outcome(&mut store, a, ExecOutcome::failure("", "boom"), now).unwrap();
    assert_eq!(store.instance(a).unwrap().status, TaskInstanceStatus::Error);
    assert_eq!(store.job(job).unwrap().status, JobStatus::Cancelled);
}
