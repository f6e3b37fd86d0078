// src/exec/runner.rs

//! Executor loop and individual command execution.

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::{ExecOutcome, ExecRequest, RuntimeEvent};

/// Spawn the background executor loop.
///
/// The returned `mpsc::Sender<ExecRequest>` is what the runtime (or
/// [`super::CommandExecutor`]) uses to hand over dispatched instances. Each
/// request is executed on its own Tokio task; executions run concurrently
/// with each other and with subsequent scheduler ticks, and report back
/// exclusively through `RuntimeEvent::TaskCompleted`.
///
/// A job cancel never kills an in-flight execution: the process runs to
/// completion and its late outcome is applied through the normal path.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ExecRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(request) = rx.recv().await {
            let tx = runtime_tx.clone();
            tokio::spawn(async move {
                let outcome = run_command(&request).await;
                if tx
                    .send(RuntimeEvent::TaskCompleted {
                        instance: request.instance,
                        outcome,
                    })
                    .await
                    .is_err()
                {
                    debug!(
                        task = %request.task_name,
                        instance = %request.instance,
                        "runtime gone; dropping task completion"
                    );
                }
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

/// Run one task instance's command and capture its outcome.
///
/// The invocation is `interpreter code arg...`, with the argument string
/// split on whitespace. A spawn failure is reported as a failed outcome
/// rather than an error, so the instance always reaches a terminal status.
pub async fn run_command(request: &ExecRequest) -> ExecOutcome {
    info!(
        task = %request.task_name,
        instance = %request.instance,
        job = %request.job,
        interpreter = %request.interpreter,
        code = %request.code.display(),
        "starting task process"
    );

    let mut cmd = Command::new(&request.interpreter);
    cmd.arg(&request.code);
    for arg in request.arguments.split_whitespace() {
        cmd.arg(arg);
    }

    match cmd.output().await {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let code = output.status.code().unwrap_or(-1);

            info!(
                task = %request.task_name,
                instance = %request.instance,
                exit_code = code,
                success = output.status.success(),
                "task process exited"
            );

            ExecOutcome {
                success: output.status.success(),
                stdout,
                stderr,
            }
        }
        Err(err) => {
            error!(
                task = %request.task_name,
                instance = %request.instance,
                error = %err,
                "failed to spawn task process"
            );

            ExecOutcome::failure(String::new(), format!("failed to spawn process: {err}"))
        }
    }
}
