//! Table repositories. Stateless; every method takes `&Connection`.

pub mod activity;
pub mod audit;
pub mod project;
pub mod task;

pub use activity::ActivityRepo;
pub use audit::{AuditEntry, AuditRepo};
pub use project::ProjectRepo;
pub use task::{SubtaskRepo, TaskRepo};

use rusqlite::types::Type;

/// Decode a text enum column, rejecting unknown spellings.
pub(crate) fn parse_column<T>(
    index: usize,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unrecognized value \"{raw}\"").into(),
        )
    })
}
