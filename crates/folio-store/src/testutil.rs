use rusqlite::Connection;

use crate::migrations::run_migrations;

/// In-memory connection with foreign keys on and the schema applied.
pub(crate) fn migrated() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    let _ = run_migrations(&conn).unwrap();
    conn
}
