pub mod migrations;
pub mod queries;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

/// Opens the booking store at `path` (`:memory:` for a throwaway database)
/// and brings its schema up to date.
pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = if path == ":memory:" {
        Connection::open_in_memory()
    } else {
        Connection::open(path)
    }
    .with_context(|| format!("failed to open database {path}"))?;

    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_memory_db_seeds_forms() {
        let conn = init_db(":memory:").unwrap();
        let closed: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM form_status WHERE is_active = 0",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(closed, 2);
    }
}
