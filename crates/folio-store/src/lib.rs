//! # folio-store
//!
//! `SQLite` persistence for the Folio assistant.
//!
//! - **Connection**: `r2d2` pool with WAL and foreign keys on every connection
//! - **Migrations**: embedded, version-tracked schema for projects, tasks,
//!   subtasks, activities and the audit log
//! - **Repositories**: stateless per-table CRUD over `&Connection`
//! - **Persistence**: [`SqlitePersistence`], the engine's persistence
//!   collaborator, plus startup loading of the whole portfolio. Every call
//!   leaves a row in `audit_log`
//! - **Seed**: demo projects for an empty database

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod persistence;
pub mod repositories;
pub mod seed;

#[cfg(test)]
mod testutil;

pub use connection::{new_file, new_in_memory, open, ConnectionConfig, ConnectionPool};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use persistence::SqlitePersistence;
pub use repositories::{AuditEntry, AuditRepo};
pub use seed::{demo_projects, seed_if_empty};
