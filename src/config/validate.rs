// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, ProcessConfig, RawConfigFile};
use crate::errors::{JobflowError, Result};
use crate::recurrence::Schedule;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::JobflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.process))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_processes(cfg)?;
    for (name, process) in cfg.process.iter() {
        validate_recurrence(name, process)?;
        validate_task_dependencies(name, process)?;
        validate_dag(name, process)?;
    }
    Ok(())
}

fn ensure_has_processes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.process.is_empty() {
        return Err(JobflowError::ConfigError(
            "config must contain at least one [process.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_recurrence(name: &str, process: &ProcessConfig) -> Result<()> {
    Schedule::parse(
        &process.minute,
        &process.hour,
        &process.day_of_month,
        &process.month,
        &process.day_of_week,
    )
    .map_err(|e| JobflowError::ConfigError(format!("process '{name}': {e}")))?;
    Ok(())
}

fn validate_task_dependencies(name: &str, process: &ProcessConfig) -> Result<()> {
    for (task_name, task) in process.task.iter() {
        for dep in task.after.iter() {
            if !process.task.contains_key(dep) {
                return Err(JobflowError::ConfigError(format!(
                    "process '{}': task '{}' has unknown dependency '{}' in `after`",
                    name, task_name, dep
                )));
            }
            if dep == task_name {
                return Err(JobflowError::ConfigError(format!(
                    "process '{}': task '{}' cannot depend on itself in `after`",
                    name, task_name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(name: &str, process: &ProcessConfig) -> Result<()> {
    // Build a simple petgraph graph from the tasks and their dependencies.
    //
    // Edge direction: dep -> task
    // For:
    //   [process.p.task.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task_name in process.task.keys() {
        graph.add_node(task_name.as_str());
    }

    for (task_name, task) in process.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), task_name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(JobflowError::CyclicDependency(format!(
                "process '{}': cycle detected in task DAG involving task '{}'",
                name, node
            )))
        }
    }
}
