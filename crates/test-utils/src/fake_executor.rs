use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use jobflow::engine::{ExecOutcome, ExecRequest, RuntimeEvent};
use jobflow::errors::Result;
use jobflow::exec::ExecutorBackend;

/// A fake executor that:
/// - records which task names were "run"
/// - immediately reports TaskCompleted for each dispatched instance,
///   succeeding unless the task name is in the failing set.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    /// Make the named task report a failed outcome instead of success.
    pub fn failing_task(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        requests: Vec<ExecRequest>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for request in requests {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(request.task_name.clone());
                }

                let outcome = if failing.contains(&request.task_name) {
                    ExecOutcome::failure(String::new(), "boom")
                } else {
                    ExecOutcome::success(format!("{} done", request.task_name))
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    instance: request.instance,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
