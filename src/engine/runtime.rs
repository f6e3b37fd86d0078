// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{local_now, Engine, EngineStep, ExecRequest, RuntimeEvent};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

/// Drives the scheduler engine from interval ticks and `RuntimeEvent`s,
/// and delegates actual command execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around [`Engine`], which contains all the
/// scheduling semantics. This struct handles async IO: the poll timer,
/// reading events from channels, and dispatching tasks to the executor.
pub struct Runtime<E: ExecutorBackend> {
    engine: Engine,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(engine: Engine, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            engine,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Ticks the engine on every poll interval.
    /// - Feeds incoming `RuntimeEvent`s into the engine.
    /// - Hands dispatched task instances to the executor backend.
    pub async fn run(mut self) -> Result<()> {
        info!("jobflow runtime started");

        let mut ticker = tokio::time::interval(self.engine.options().poll_interval);

        loop {
            let step: EngineStep = tokio::select! {
                _ = ticker.tick() => self.engine.tick(local_now()),
                event = self.event_rx.recv() => match event {
                    Some(event) => {
                        debug!(?event, "runtime received event");
                        self.engine.handle_event(event, local_now())
                    }
                    None => {
                        info!("runtime event channel closed; exiting");
                        break;
                    }
                },
            };

            self.spawn_ready(step.dispatched).await?;

            if !step.keep_running {
                info!("engine requested exit; stopping runtime");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn spawn_ready(&mut self, requests: Vec<ExecRequest>) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = requests.iter().map(|r| r.task_name.as_str()).collect();
        let jobs: Vec<_> = requests.iter().map(|r| r.job).collect();
        debug!(?names, ?jobs, "spawning ready task instances");

        self.executor.spawn_ready_tasks(requests).await
    }
}
