// src/config/mod.rs

//! Definition-file handling.
//!
//! - [`model`] maps the TOML file structure.
//! - [`loader`] reads and deserializes a file.
//! - [`validate`] turns a [`model::RawConfigFile`] into a validated
//!   [`model::ConfigFile`] (recurrence fields, dependency references,
//!   acyclicity).

pub mod loader;
pub mod model;
pub mod validate;

pub use model::{ConfigFile, ProcessConfig, RawConfigFile, SchedulerSection, TaskConfig};
