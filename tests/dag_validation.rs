// tests/dag_validation.rs

//! Task graph construction: cycle rejection and config validation.

use jobflow::config::ConfigFile;
use jobflow::errors::JobflowError;
use jobflow::model::TaskId;
use jobflow::recurrence::Schedule;
use jobflow::store::{ProcessSpec, Store, TaskSpec};

use jobflow_test_utils::builders::{ConfigFileBuilder, ProcessConfigBuilder, TaskConfigBuilder};

fn store_with_tasks(names: &[&str]) -> (Store, Vec<TaskId>) {
    let mut store = Store::new();
    let process = store.add_process(ProcessSpec {
        name: "p".to_string(),
        description: String::new(),
        active: true,
        run_if_err: false,
        run_overlap: false,
        schedule: Schedule::any(),
    });

    let ids = names
        .iter()
        .map(|name| {
            store
                .add_task(
                    process,
                    TaskSpec {
                        name: name.to_string(),
                        description: String::new(),
                        active: true,
                        interpreter: "sh".to_string(),
                        code: format!("{name}.sh").into(),
                        arguments: String::new(),
                    },
                )
                .unwrap()
        })
        .collect();

    (store, ids)
}

#[test]
fn acyclic_edges_are_accepted() {
    let (mut store, ids) = store_with_tasks(&["a", "b", "c"]);
    store.add_dependency(ids[0], ids[1]).unwrap();
    store.add_dependency(ids[1], ids[2]).unwrap();
    // Diamond edge a -> c is still acyclic.
    store.add_dependency(ids[0], ids[2]).unwrap();
}

#[test]
fn self_loop_is_rejected() {
    let (mut store, ids) = store_with_tasks(&["a"]);
    let err = store.add_dependency(ids[0], ids[0]).unwrap_err();
    assert!(matches!(err, JobflowError::CyclicDependency(_)));
}

#[test]
fn transitive_cycle_is_rejected() {
    // a -> b -> c accepted; c -> a would close the cycle.
    let (mut store, ids) = store_with_tasks(&["a", "b", "c"]);
    store.add_dependency(ids[0], ids[1]).unwrap();
    store.add_dependency(ids[1], ids[2]).unwrap();

    let err = store.add_dependency(ids[2], ids[0]).unwrap_err();
    assert!(matches!(err, JobflowError::CyclicDependency(_)));

    // The rejected edge must not have been half-applied.
    let process = store.process_by_name("p").unwrap().id;
    let graph = store.graph(process).unwrap();
    assert!(graph.parents_of(ids[0]).is_empty());
    assert!(graph.children_of(ids[2]).is_empty());
}

#[test]
fn duplicate_edge_is_rejected() {
    let (mut store, ids) = store_with_tasks(&["a", "b"]);
    store.add_dependency(ids[0], ids[1]).unwrap();
    let err = store.add_dependency(ids[0], ids[1]).unwrap_err();
    assert!(matches!(err, JobflowError::ValidationError(_)));
}

#[test]
fn cross_process_edge_is_rejected() {
    let (mut store, ids) = store_with_tasks(&["a"]);
    let other = store.add_process(ProcessSpec {
        name: "q".to_string(),
        description: String::new(),
        active: true,
        run_if_err: false,
        run_overlap: false,
        schedule: Schedule::any(),
    });
    let foreign = store
        .add_task(
            other,
            TaskSpec {
                name: "z".to_string(),
                description: String::new(),
                active: true,
                interpreter: "sh".to_string(),
                code: "z.sh".into(),
                arguments: String::new(),
            },
        )
        .unwrap();

    let err = store.add_dependency(ids[0], foreign).unwrap_err();
    assert!(matches!(err, JobflowError::ValidationError(_)));
}

#[test]
fn config_cycle_is_rejected_at_load() {
    let raw = ConfigFileBuilder::new()
        .with_process(
            "p",
            ProcessConfigBuilder::new()
                .with_task("a", TaskConfigBuilder::new("a.sh").after("c").build())
                .with_task("b", TaskConfigBuilder::new("b.sh").after("a").build())
                .with_task("c", TaskConfigBuilder::new("c.sh").after("b").build())
                .build(),
        )
        .build_raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, JobflowError::CyclicDependency(_)));
}

#[test]
fn config_unknown_dependency_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_process(
            "p",
            ProcessConfigBuilder::new()
                .with_task("a", TaskConfigBuilder::new("a.sh").after("ghost").build())
                .build(),
        )
        .build_raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, JobflowError::ConfigError(_)));
}

#[test]
fn config_self_dependency_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_process(
            "p",
            ProcessConfigBuilder::new()
                .with_task("a", TaskConfigBuilder::new("a.sh").after("a").build())
                .build(),
        )
        .build_raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, JobflowError::ConfigError(_)));
}

#[test]
fn config_bad_recurrence_is_rejected_with_field_and_token() {
    let raw = ConfigFileBuilder::new()
        .with_process(
            "p",
            ProcessConfigBuilder::new()
                .minute("15,99")
                .with_task("a", TaskConfigBuilder::new("a.sh").build())
                .build(),
        )
        .build_raw();

    let err = ConfigFile::try_from(raw).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("minute"), "{msg}");
    assert!(msg.contains("99"), "{msg}");
}

#[test]
fn config_without_processes_is_rejected() {
    let raw = ConfigFileBuilder::new().build_raw();
    let err = ConfigFile::try_from(raw).unwrap_err();
    assert!(matches!(err, JobflowError::ConfigError(_)));
}
