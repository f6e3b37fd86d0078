// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running the external commands
//! referenced by task definitions, using `tokio::process::Command`, and
//! reporting outcomes back to the orchestration runtime via `RuntimeEvent`s.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `CommandExecutor` that the runtime uses in production, and which tests
//!   can replace with a fake implementation.
//! - [`runner`] owns the executor loop and individual command execution.

pub mod backend;
pub mod runner;

pub use backend::{CommandExecutor, ExecutorBackend};
pub use runner::spawn_executor;
