//! Audit repository: the append-only `audit_log` table.

use rusqlite::{params, Connection};
use serde_json::Value;

use folio_core::now_iso;

use crate::errors::Result;

/// One recorded change.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditEntry {
    /// Row id; increases with every record.
    pub id: i64,
    /// UTC timestamp of the record.
    pub timestamp: String,
    /// Persistence call, e.g. `add_task`.
    pub action: String,
    /// `project`, `activity`, `task` or `subtask`.
    pub entity_type: String,
    /// Id of the affected entity.
    pub entity_id: String,
    /// Call-specific JSON payload.
    pub details: Option<Value>,
}

/// Audit repository.
pub struct AuditRepo;

impl AuditRepo {
    /// Append one entry and return its row id.
    pub fn record(
        conn: &Connection,
        action: &str,
        entity_type: &str,
        entity_id: &str,
        details: &Value,
    ) -> Result<i64> {
        let _ = conn.execute(
            "INSERT INTO audit_log (timestamp, action, entity_type, entity_id, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![now_iso(), action, entity_type, entity_id, details],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<AuditEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, action, entity_type, entity_id, details
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Every entry for one entity, oldest first.
    pub fn for_entity(conn: &Connection, entity_type: &str, entity_id: &str) -> Result<Vec<AuditEntry>> {
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, action, entity_type, entity_id, details
             FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![entity_type, entity_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
        Ok(AuditEntry {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            action: row.get(2)?,
            entity_type: row.get(3)?,
            entity_id: row.get(4)?,
            details: row.get(5)?,
        })
    }
}
