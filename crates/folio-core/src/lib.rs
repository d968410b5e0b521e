//! # folio-core
//!
//! Foundation types shared by every Folio crate.
//!
//! - **Portfolio model**: [`Project`], [`Task`], [`Subtask`], [`Activity`] and
//!   their status enums, serialized in the dashboard's camelCase JSON shape
//! - **Ids and time**: prefixed UUID v7 ids and ISO timestamp helpers
//! - **Logging**: `tracing` subscriber setup used by the binary and tests

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod portfolio;

pub use ids::{generate_id, now_iso, today};
pub use portfolio::{
    Activity, Portfolio, Priority, Project, ProjectStatus, Subtask, Task, TaskContext, WorkStatus,
};
