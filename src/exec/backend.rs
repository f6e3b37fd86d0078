// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production executor implementation in [`runner`].
//!
//! - `CommandExecutor` is the default implementation used by `jobflow`. It
//!   wraps the executor loop from [`spawn_executor`] and just forwards
//!   execution requests over an mpsc channel.
//! - Tests can provide their own `ExecutorBackend` that, for example,
//!   records which instances were dispatched and directly emits
//!   `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::{ExecRequest, RuntimeEvent};
use crate::errors::{Error, Result};

use super::runner::spawn_executor;

/// Trait abstracting how dispatched task instances are executed.
///
/// Production code uses [`CommandExecutor`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send {
    /// Dispatch the given task instances for execution.
    ///
    /// The implementation is free to:
    /// - spawn OS processes (production)
    /// - simulate completion and emit `RuntimeEvent`s (tests)
    fn spawn_ready_tasks(
        &mut self,
        requests: Vec<ExecRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
///
/// Internally, this just wraps the executor loop in [`spawn_executor`]. The
/// runtime calls `spawn_ready_tasks`, which forwards the requests to the
/// background executor via an mpsc channel.
pub struct CommandExecutor {
    tx: mpsc::Sender<ExecRequest>,
}

impl CommandExecutor {
    /// Create a new command executor backend, wiring it to the given runtime
    /// event sender.
    ///
    /// This spawns the background executor loop immediately.
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        let tx = spawn_executor(runtime_tx);
        Self { tx }
    }
}

impl ExecutorBackend for CommandExecutor {
    fn spawn_ready_tasks(
        &mut self,
        requests: Vec<ExecRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for request in requests {
                tx.send(request).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
