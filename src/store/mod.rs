// src/store/mod.rs

//! In-memory record store for definitions and run state.
//!
//! This is the durable-store boundary of the engine: CRUD plus the filtered
//! queries the scheduler needs (latest job per process, instances by status,
//! instances of a job). The store is owned by the single-writer engine core,
//! so multi-row updates (job cancel) are atomic by construction.
//!
//! Mutable access to jobs and task instances is crate-private; callers
//! outside the crate mutate run state only through the state-machine entry
//! points in [`crate::engine::state`].

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::ConfigFile;
use crate::dag::TaskGraph;
use crate::errors::{JobflowError, Result};
use crate::model::{
    Job, JobId, JobStatus, ProcessDefinition, ProcessId, TaskDefinition, TaskId, TaskInstance,
    TaskInstanceId,
};
use crate::recurrence::Schedule;

#[derive(Debug, Default)]
pub struct Store {
    processes: BTreeMap<ProcessId, ProcessDefinition>,
    tasks: BTreeMap<TaskId, TaskDefinition>,
    /// Dependency graph per process, kept acyclic by construction.
    graphs: HashMap<ProcessId, TaskGraph>,
    jobs: BTreeMap<JobId, Job>,
    instances: BTreeMap<TaskInstanceId, TaskInstance>,
    next_id: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the definitions of a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut store = Store::new();

        for (process_name, pc) in cfg.process.iter() {
            // Validation has already accepted these fields; parse again to
            // build the owned Schedule.
            let schedule = Schedule::parse(
                &pc.minute,
                &pc.hour,
                &pc.day_of_month,
                &pc.month,
                &pc.day_of_week,
            )?;

            let process_id = store.add_process(ProcessSpec {
                name: process_name.clone(),
                description: pc.description.clone(),
                active: pc.active,
                run_if_err: pc.run_if_err,
                run_overlap: pc.run_overlap,
                schedule,
            });

            let mut ids_by_name: HashMap<&str, TaskId> = HashMap::new();
            for (task_name, tc) in pc.task.iter() {
                let task_id = store.add_task(
                    process_id,
                    TaskSpec {
                        name: task_name.clone(),
                        description: tc.description.clone(),
                        active: tc.active,
                        interpreter: tc.interpreter.clone(),
                        code: tc.code.clone().into(),
                        arguments: tc.arguments.clone(),
                    },
                )?;
                ids_by_name.insert(task_name.as_str(), task_id);
            }

            // Edges go through TaskGraph::add_dependency, so the incremental
            // cycle check runs even though the config was already validated.
            for (task_name, tc) in pc.task.iter() {
                let task_id = ids_by_name[task_name.as_str()];
                for dep in tc.after.iter() {
                    let parent_id = ids_by_name[dep.as_str()];
                    store.add_dependency(parent_id, task_id)?;
                }
            }
        }

        Ok(store)
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ---- definitions ----------------------------------------------------

    pub fn add_process(&mut self, spec: ProcessSpec) -> ProcessId {
        let id = ProcessId(self.alloc_id());
        self.processes.insert(
            id,
            ProcessDefinition {
                id,
                name: spec.name,
                description: spec.description,
                active: spec.active,
                run_if_err: spec.run_if_err,
                run_overlap: spec.run_overlap,
                schedule: spec.schedule,
            },
        );
        self.graphs.insert(id, TaskGraph::new());
        id
    }

    pub fn add_task(&mut self, process: ProcessId, spec: TaskSpec) -> Result<TaskId> {
        if !self.processes.contains_key(&process) {
            return Err(JobflowError::NotFound(format!("process {process}")));
        }

        let id = TaskId(self.alloc_id());
        self.tasks.insert(
            id,
            TaskDefinition {
                id,
                process,
                name: spec.name,
                description: spec.description,
                active: spec.active,
                interpreter: spec.interpreter,
                code: spec.code,
                arguments: spec.arguments,
            },
        );
        self.graphs
            .get_mut(&process)
            .expect("graph exists for every process")
            .add_task(id);
        Ok(id)
    }

    /// Add a dependency edge between two tasks of the same process.
    ///
    /// Rejects edges across processes and edges that would close a cycle.
    pub fn add_dependency(&mut self, parent: TaskId, task: TaskId) -> Result<()> {
        let parent_process = self.task(parent)?.process;
        let task_process = self.task(task)?.process;
        if parent_process != task_process {
            return Err(JobflowError::ValidationError(format!(
                "tasks {parent} and {task} belong to different processes"
            )));
        }

        self.graphs
            .get_mut(&parent_process)
            .expect("graph exists for every process")
            .add_dependency(parent, task)
    }

    pub fn deactivate_task(&mut self, task: TaskId) -> Result<()> {
        let task = self
            .tasks
            .get_mut(&task)
            .ok_or_else(|| JobflowError::NotFound(format!("task {task}")))?;
        task.active = false;
        Ok(())
    }

    pub fn process(&self, id: ProcessId) -> Result<&ProcessDefinition> {
        self.processes
            .get(&id)
            .ok_or_else(|| JobflowError::NotFound(format!("process {id}")))
    }

    pub fn task(&self, id: TaskId) -> Result<&TaskDefinition> {
        self.tasks
            .get(&id)
            .ok_or_else(|| JobflowError::NotFound(format!("task {id}")))
    }

    pub fn graph(&self, process: ProcessId) -> Result<&TaskGraph> {
        self.graphs
            .get(&process)
            .ok_or_else(|| JobflowError::NotFound(format!("process {process}")))
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessDefinition> {
        self.processes.values()
    }

    pub fn active_processes(&self) -> Vec<ProcessId> {
        self.processes
            .values()
            .filter(|p| p.active)
            .map(|p| p.id)
            .collect()
    }

    pub fn process_by_name(&self, name: &str) -> Option<&ProcessDefinition> {
        self.processes.values().find(|p| p.name == name)
    }

    pub fn tasks_of_process(&self, process: ProcessId) -> Vec<&TaskDefinition> {
        self.tasks
            .values()
            .filter(|t| t.process == process)
            .collect()
    }

    pub fn task_by_name(&self, process: ProcessId, name: &str) -> Option<&TaskDefinition> {
        self.tasks
            .values()
            .find(|t| t.process == process && t.name == name)
    }

    // ---- jobs and instances ---------------------------------------------

    /// Create a job for a process, snapshotting one task instance per task
    /// definition that is active right now.
    ///
    /// A job created directly as `Finished` represents a no-op run and gets
    /// no instances (and an end timestamp).
    pub fn create_job(
        &mut self,
        process: ProcessId,
        status: JobStatus,
        now: NaiveDateTime,
    ) -> Result<JobId> {
        if !self.processes.contains_key(&process) {
            return Err(JobflowError::NotFound(format!("process {process}")));
        }

        let job_id = JobId(self.alloc_id());
        self.jobs.insert(
            job_id,
            Job {
                id: job_id,
                process,
                status,
                dt_start: now,
                dt_end: (status == JobStatus::Finished).then_some(now),
                observations: String::new(),
            },
        );

        if status != JobStatus::Finished {
            let task_ids: Vec<TaskId> = self
                .tasks_of_process(process)
                .into_iter()
                .filter(|t| t.active)
                .map(|t| t.id)
                .collect();

            for task_id in task_ids {
                let instance_id = TaskInstanceId(self.alloc_id());
                self.instances
                    .insert(instance_id, TaskInstance::new(instance_id, job_id, task_id, now));
            }
        }

        debug!(job = %job_id, process = %process, %status, "created job");
        Ok(job_id)
    }

    pub fn job(&self, id: JobId) -> Result<&Job> {
        self.jobs
            .get(&id)
            .ok_or_else(|| JobflowError::NotFound(format!("job {id}")))
    }

    pub(crate) fn job_mut(&mut self, id: JobId) -> Result<&mut Job> {
        self.jobs
            .get_mut(&id)
            .ok_or_else(|| JobflowError::NotFound(format!("job {id}")))
    }

    pub fn instance(&self, id: TaskInstanceId) -> Result<&TaskInstance> {
        self.instances
            .get(&id)
            .ok_or_else(|| JobflowError::NotFound(format!("task instance {id}")))
    }

    pub(crate) fn instance_mut(&mut self, id: TaskInstanceId) -> Result<&mut TaskInstance> {
        self.instances
            .get_mut(&id)
            .ok_or_else(|| JobflowError::NotFound(format!("task instance {id}")))
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Latest job of a process (highest id), if any.
    pub fn latest_job_for(&self, process: ProcessId) -> Option<&Job> {
        self.jobs
            .values()
            .filter(|j| j.process == process)
            .max_by_key(|j| j.id)
    }

    /// Jobs still subject to completion reconciliation.
    pub fn unfinished_jobs(&self) -> Vec<JobId> {
        self.jobs
            .values()
            .filter(|j| j.status.is_unfinished())
            .map(|j| j.id)
            .collect()
    }

    pub fn instances_of_job(&self, job: JobId) -> Vec<&TaskInstance> {
        self.instances.values().filter(|i| i.job == job).collect()
    }

    pub fn instance_of_job_task(&self, job: JobId, task: TaskId) -> Option<&TaskInstance> {
        self.instances
            .values()
            .find(|i| i.job == job && i.task == task)
    }

    /// Instances across all jobs that the scheduler may dispatch.
    pub fn run_eligible_instances(&self) -> Vec<TaskInstanceId> {
        self.instances
            .values()
            .filter(|i| i.status.is_run_eligible())
            .map(|i| i.id)
            .collect()
    }

    /// Instances of the same job whose task is a direct parent of this
    /// instance's task.
    ///
    /// A parent task that was inactive at job creation has no instance and
    /// therefore does not appear here.
    pub fn parent_instances(&self, instance: TaskInstanceId) -> Result<Vec<TaskInstanceId>> {
        self.related_instances(instance, TaskGraph::parents_of)
    }

    /// Instances of the same job whose task is a direct child of this
    /// instance's task.
    pub fn child_instances(&self, instance: TaskInstanceId) -> Result<Vec<TaskInstanceId>> {
        self.related_instances(instance, TaskGraph::children_of)
    }

    fn related_instances(
        &self,
        instance: TaskInstanceId,
        edges: for<'g> fn(&'g TaskGraph, TaskId) -> &'g [TaskId],
    ) -> Result<Vec<TaskInstanceId>> {
        let instance = self.instance(instance)?;
        let process = self.job(instance.job)?.process;
        let graph = self.graph(process)?;

        Ok(edges(graph, instance.task)
            .iter()
            .filter_map(|task| self.instance_of_job_task(instance.job, *task))
            .map(|i| i.id)
            .collect())
    }
}

/// Fields for [`Store::add_process`] (the id is allocated by the store).
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub name: String,
    pub description: String,
    pub active: bool,
    pub run_if_err: bool,
    pub run_overlap: bool,
    pub schedule: Schedule,
}

/// Fields for [`Store::add_task`].
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: String,
    pub description: String,
    pub active: bool,
    pub interpreter: String,
    pub code: std::path::PathBuf,
    pub arguments: String,
}
