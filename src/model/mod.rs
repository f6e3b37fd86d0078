// src/model/mod.rs

//! Core data model.
//!
//! - [`status`] defines the closed status enumerations and their legality
//!   tables.
//! - [`definition`] holds the durable definitions (processes and tasks).
//! - [`instance`] holds the run records (jobs and task instances).

pub mod definition;
pub mod instance;
pub mod status;

use std::fmt;

pub use definition::{ProcessDefinition, TaskDefinition};
pub use instance::{Job, TaskInstance};
pub use status::{JobStatus, ManagementAction, TaskInstanceStatus};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a [`ProcessDefinition`].
    ProcessId
);
id_type!(
    /// Identifier of a [`TaskDefinition`].
    TaskId
);
id_type!(
    /// Identifier of a [`Job`].
    JobId
);
id_type!(
    /// Identifier of a [`TaskInstance`].
    TaskInstanceId
);
