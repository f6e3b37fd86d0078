// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod model;
pub mod recurrence;
pub mod store;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::ConfigFile;
use crate::engine::{local_now, Engine, EngineOptions, Runtime, RuntimeEvent};
use crate::exec::CommandExecutor;
use crate::store::Store;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - definition loading
/// - store / engine / runtime
/// - executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let store = Store::from_config(&cfg)?;

    let mut options = EngineOptions::from_config(&cfg.scheduler);
    if args.once {
        options.exit_when_idle = true;
    }

    let mut engine = Engine::new(store, options);

    // On-demand trigger requested on the command line. Applied before the
    // loop starts so that `--once` cannot exit before the job exists.
    if let Some(name) = &args.run {
        let process = engine
            .store()
            .process_by_name(name)
            .ok_or_else(|| anyhow!("unknown process '{name}'"))?
            .id;
        let job = engine.run_process_now(process, local_now())?;
        info!(process = %name, ?job, "initial on-demand run");
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    // Command executor backend (real implementation in production).
    let executor = CommandExecutor::new(rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // Construct the async IO shell around the engine.
    let runtime = Runtime::new(engine, rt_rx, executor);
    runtime.run().await?;
    Ok(())
}

/// Simple dry-run output: print processes, recurrence fields, tasks and
/// their dependencies.
fn print_dry_run(cfg: &ConfigFile) {
    println!("jobflow dry-run");
    println!(
        "  scheduler.poll_interval_ms = {}",
        cfg.scheduler.poll_interval_ms
    );
    println!(
        "  scheduler.exit_when_idle = {}",
        cfg.scheduler.exit_when_idle
    );
    println!();

    println!("processes ({}):", cfg.process.len());
    for (name, process) in cfg.process.iter() {
        println!("  - {name}");
        if !process.description.is_empty() {
            println!("      description: {}", process.description);
        }
        if !process.active {
            println!("      active: false");
        }
        println!(
            "      recurrence: {} {} {} {} {}",
            process.minute,
            process.hour,
            process.day_of_month,
            process.month,
            process.day_of_week
        );
        if process.run_if_err {
            println!("      run_if_err: true");
        }
        if process.run_overlap {
            println!("      run_overlap: true");
        }

        println!("      tasks ({}):", process.task.len());
        for (task_name, task) in process.task.iter() {
            println!("        - {task_name}");
            println!("            cmd: {} {} {}", task.interpreter, task.code, task.arguments);
            if !task.active {
                println!("            active: false");
            }
            if !task.after.is_empty() {
                println!("            after: {:?}", task.after);
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
