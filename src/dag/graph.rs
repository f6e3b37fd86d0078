// src/dag/graph.rs

use std::collections::HashMap;

use crate::errors::{JobflowError, Result};
use crate::model::TaskId;

/// Internal node structure: stores immediate parents and children.
#[derive(Debug, Clone, Default)]
struct GraphNode {
    /// Direct parents: tasks that must resolve before this one can run.
    parents: Vec<TaskId>,
    /// Direct children: tasks that depend on this one.
    children: Vec<TaskId>,
}

/// Dependency graph for the task definitions of a single process.
///
/// Edges are directed parent -> child ("child depends on parent"). The graph
/// is kept acyclic by construction: [`TaskGraph::add_dependency`] walks the
/// full ancestor chain before accepting an edge.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: HashMap<TaskId, GraphNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task with no edges. Idempotent.
    pub fn add_task(&mut self, task: TaskId) {
        self.nodes.entry(task).or_default();
    }

    /// Add a dependency edge `parent -> task`.
    ///
    /// Fails with [`JobflowError::CyclicDependency`] if `parent` is reachable
    /// from `task` by following existing parent edges transitively, including
    /// the degenerate case `parent == task`. Duplicate edges are rejected as
    /// a validation error.
    pub fn add_dependency(&mut self, parent: TaskId, task: TaskId) -> Result<()> {
        if self.is_ancestor(task, parent) {
            return Err(JobflowError::CyclicDependency(format!(
                "adding edge {parent} -> {task} would close a cycle"
            )));
        }

        if self.parents_of(task).contains(&parent) {
            return Err(JobflowError::ValidationError(format!(
                "dependency {parent} -> {task} already exists"
            )));
        }

        self.nodes.entry(parent).or_default().children.push(task);
        self.nodes.entry(task).or_default().parents.push(parent);
        Ok(())
    }

    /// Whether `candidate` is `node` itself or a transitive ancestor of
    /// `node` (following parent edges upward).
    fn is_ancestor(&self, node: TaskId, candidate: TaskId) -> bool {
        let mut stack = vec![node];

        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            if let Some(n) = self.nodes.get(&current) {
                stack.extend(n.parents.iter().copied());
            }
        }

        false
    }

    /// All task ids in the graph.
    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.keys().copied()
    }

    /// Immediate parents of a task (the tasks it depends on).
    pub fn parents_of(&self, task: TaskId) -> &[TaskId] {
        self.nodes
            .get(&task)
            .map(|n| n.parents.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate children of a task (the tasks that depend on it).
    pub fn children_of(&self, task: TaskId) -> &[TaskId] {
        self.nodes
            .get(&task)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks with no parents. These are runnable as soon as a job starts.
    pub fn roots(&self) -> Vec<TaskId> {
        let mut roots: Vec<TaskId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.parents.is_empty())
            .map(|(id, _)| *id)
            .collect();
        roots.sort();
        roots
    }
}
