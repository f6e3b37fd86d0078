// src/engine/core.rs

//! Pure scheduler core.
//!
//! This module contains a synchronous, deterministic engine that the async
//! shell drives with ticks and [`RuntimeEvent`]s. Each call returns an
//! [`EngineStep`] describing what the IO shell should do next (dispatch task
//! instances, keep running or stop).
//!
//! The core owns the store and is its only writer: executors never mutate
//! run state directly, they report outcomes as events. That makes the core
//! extensively unit testable without Tokio, channels, or processes, and
//! serializes every status update through [`state`].

use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, error, info, warn};

use crate::engine::state;
use crate::engine::{EngineOptions, EngineStep, ExecOutcome, ExecRequest, RuntimeEvent, TaskErrorHook};
use crate::errors::Result;
use crate::model::{JobId, JobStatus, ManagementAction, ProcessId, TaskInstanceId, TaskInstanceStatus};
use crate::store::Store;

pub struct Engine {
    store: Store,
    options: EngineOptions,
    /// Minute boundary for which due processes were last evaluated.
    ///
    /// Edge-triggered latch: recurrence granularity is the minute, so due
    /// evaluation fires exactly once per distinct wall-clock minute no
    /// matter how often the loop polls within it.
    last_due_minute: Option<NaiveDateTime>,
    error_hook: Option<TaskErrorHook>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("last_due_minute", &self.last_due_minute)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(store: Store, options: EngineOptions) -> Self {
        Self {
            store,
            options,
            last_due_minute: None,
            error_hook: None,
        }
    }

    /// Register the optional error-notification hook, invoked with
    /// (instance, error text) whenever a task execution fails.
    pub fn with_error_hook(mut self, hook: TaskErrorHook) -> Self {
        self.error_hook = Some(hook);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// One scheduler tick.
    ///
    /// 1. On a fresh minute boundary, evaluate recurrence for every active
    ///    process and create jobs for due ones (overlap/error gating).
    /// 2. Dispatch every run-eligible instance whose parents are resolved.
    /// 3. Reconcile completion for unfinished jobs.
    ///
    /// A failure while processing one process or job is logged and does not
    /// abort the tick for the remaining entities.
    pub fn tick(&mut self, now: NaiveDateTime) -> EngineStep {
        if self.due_latch_fires(now) {
            self.start_due_jobs(now);
        }

        let dispatched = self.dispatch_ready(now);
        self.reconcile_jobs(now);

        EngineStep {
            dispatched,
            keep_running: self.keep_running(),
        }
    }

    /// Handle a single runtime event.
    ///
    /// Event-borne management failures are logged (the event sender is not
    /// around to receive an error); callers that want the domain error use
    /// the direct methods ([`Engine::manage_instance`], [`Engine::cancel_job`],
    /// [`Engine::run_process_now`]) instead.
    pub fn handle_event(&mut self, event: RuntimeEvent, now: NaiveDateTime) -> EngineStep {
        match event {
            RuntimeEvent::TaskCompleted { instance, outcome } => {
                if let Err(e) = self.complete_instance(instance, outcome, now) {
                    error!(instance = %instance, error = %e, "failed to apply task outcome");
                }
            }
            RuntimeEvent::RunProcess { process } => {
                if let Err(e) = self.run_process_now(process, now) {
                    error!(process = %process, error = %e, "on-demand run failed");
                }
            }
            RuntimeEvent::ManageInstance { instance, action } => {
                if let Err(e) = self.manage_instance(instance, action, now) {
                    warn!(instance = %instance, %action, error = %e, "management action rejected");
                }
            }
            RuntimeEvent::CancelJob { job } => {
                if let Err(e) = self.cancel_job(job, now) {
                    warn!(job = %job, error = %e, "job cancel rejected");
                }
            }
            RuntimeEvent::ShutdownRequested => {
                return EngineStep {
                    dispatched: Vec::new(),
                    keep_running: false,
                };
            }
        }

        EngineStep {
            dispatched: Vec::new(),
            keep_running: self.keep_running(),
        }
    }

    /// Apply an executor outcome, fire the error hook on failure, and
    /// eagerly reconcile the owning job.
    pub fn complete_instance(
        &mut self,
        instance: TaskInstanceId,
        outcome: ExecOutcome,
        now: NaiveDateTime,
    ) -> Result<()> {
        let failed = state::apply_outcome(&mut self.store, instance, outcome, now)?;

        if failed {
            if let Some(hook) = &self.error_hook {
                let observations = self.store.instance(instance)?.observations.clone();
                hook(instance, &observations);
            }
        }

        let job = self.store.instance(instance)?.job;
        state::reconcile_job(&mut self.store, job, now)?;
        Ok(())
    }

    /// Operator action on a task instance (management boundary).
    pub fn manage_instance(
        &mut self,
        instance: TaskInstanceId,
        action: ManagementAction,
        now: NaiveDateTime,
    ) -> Result<()> {
        state::apply_management(&mut self.store, instance, action, now)
    }

    /// Operator cancellation of a job (management boundary).
    pub fn cancel_job(&mut self, job: JobId, now: NaiveDateTime) -> Result<()> {
        state::cancel_job(&mut self.store, job, now)
    }

    /// Run a process now, skipping the due-time check (trigger boundary).
    ///
    /// Overlap/error gating still applies; returns the created job, or
    /// `None` when gating skipped the run.
    pub fn run_process_now(
        &mut self,
        process: ProcessId,
        now: NaiveDateTime,
    ) -> Result<Option<JobId>> {
        self.start_job_if_allowed(process, now)
    }

    /// No instance is in flight or dispatchable; nothing will progress
    /// without a new due run or an operator action.
    ///
    /// An awaiting instance behind a failed parent does not count: it can
    /// never become ready without a retry/force, so it does not keep a
    /// one-shot runtime alive.
    pub fn is_idle(&self) -> bool {
        let in_flight = self.store.jobs().any(|job| {
            self.store
                .instances_of_job(job.id)
                .iter()
                .any(|i| i.status == TaskInstanceStatus::Initialized)
        });
        if in_flight {
            return false;
        }

        !self
            .store
            .run_eligible_instances()
            .into_iter()
            .any(|instance| matches!(state::ready_to_run(&self.store, instance), Ok(true)))
    }

    fn keep_running(&self) -> bool {
        !self.options.exit_when_idle || !self.is_idle()
    }

    fn due_latch_fires(&mut self, now: NaiveDateTime) -> bool {
        let minute = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .expect("zeroing sub-minute components is always valid");

        if self.last_due_minute == Some(minute) {
            return false;
        }
        self.last_due_minute = Some(minute);
        true
    }

    fn start_due_jobs(&mut self, now: NaiveDateTime) {
        for process in self.store.active_processes() {
            let due = match self.store.process(process) {
                Ok(p) => p.schedule.matches(now),
                Err(e) => {
                    error!(process = %process, error = %e, "process vanished during tick");
                    continue;
                }
            };
            debug!(process = %process, due, "recurrence evaluated");

            if !due {
                continue;
            }

            if let Err(e) = self.start_job_if_allowed(process, now) {
                error!(process = %process, error = %e, "failed to start job; continuing tick");
            }
        }
    }

    /// Overlap/error gating plus job creation (step 2 of the tick).
    fn start_job_if_allowed(
        &mut self,
        process: ProcessId,
        now: NaiveDateTime,
    ) -> Result<Option<JobId>> {
        let p = self.store.process(process)?;
        let (name, run_if_err, run_overlap) = (p.name.clone(), p.run_if_err, p.run_overlap);

        // A process that has never run behaves as if its last job finished.
        let last_status = self
            .store
            .latest_job_for(process)
            .map(|j| j.status)
            .unwrap_or(JobStatus::Finished);

        if !run_if_err && last_status == JobStatus::Error {
            warn!(
                process = %name,
                "will not run: latest job ended in error and run_if_err is off"
            );
            return Ok(None);
        }

        if !run_overlap && last_status == JobStatus::Initialized {
            warn!(
                process = %name,
                "will not run: latest job has not finished and run_overlap is off"
            );
            return Ok(None);
        }

        // A process with no active tasks yields a no-op run: the job is
        // created finished, since reconciliation never finishes an
        // instance-less job.
        let has_active_tasks = self
            .store
            .tasks_of_process(process)
            .iter()
            .any(|t| t.active);
        let status = if has_active_tasks {
            JobStatus::Initialized
        } else {
            JobStatus::Finished
        };

        let job = self.store.create_job(process, status, now)?;
        info!(process = %name, job = %job, %status, "created job");
        Ok(Some(job))
    }

    /// Move every ready run-eligible instance to initialized and collect the
    /// execution requests for the IO shell (step 3 of the tick).
    fn dispatch_ready(&mut self, now: NaiveDateTime) -> Vec<ExecRequest> {
        let mut requests = Vec::new();

        for instance in self.store.run_eligible_instances() {
            match self.try_dispatch(instance, now) {
                Ok(Some(request)) => requests.push(request),
                Ok(None) => {}
                Err(e) => {
                    error!(
                        instance = %instance,
                        error = %e,
                        "failed to dispatch task instance; continuing tick"
                    );
                }
            }
        }

        requests
    }

    fn try_dispatch(
        &mut self,
        instance: TaskInstanceId,
        now: NaiveDateTime,
    ) -> Result<Option<ExecRequest>> {
        if !state::ready_to_run(&self.store, instance)? {
            return Ok(None);
        }

        state::set_status(&mut self.store, instance, TaskInstanceStatus::Initialized, now)?;

        let inst = self.store.instance(instance)?;
        let task = self.store.task(inst.task)?;
        info!(task = %task.name, instance = %instance, job = %inst.job, "dispatching task instance");

        Ok(Some(ExecRequest {
            instance,
            job: inst.job,
            task_name: task.name.clone(),
            interpreter: task.interpreter.clone(),
            code: task.code.clone(),
            arguments: task.arguments.clone(),
        }))
    }

    /// Completion reconciliation over all unfinished jobs (step 4).
    fn reconcile_jobs(&mut self, now: NaiveDateTime) {
        for job in self.store.unfinished_jobs() {
            if let Err(e) = state::reconcile_job(&mut self.store, job, now) {
                error!(job = %job, error = %e, "failed to reconcile job; continuing tick");
            }
        }
    }
}
