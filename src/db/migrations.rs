use anyhow::Result;
use rusqlite::Connection;

/// Idempotent schema setup, run on every startup before any command.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS prayer_log (
            date       TEXT PRIMARY KEY,
            fajr       INTEGER NOT NULL DEFAULT 0,
            dhuhr      INTEGER NOT NULL DEFAULT 0,
            asr        INTEGER NOT NULL DEFAULT 0,
            maghrib    INTEGER NOT NULL DEFAULT 0,
            isha       INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS prayer_reminders (
            prayer  TEXT PRIMARY KEY
                    CHECK(prayer IN ('fajr','dhuhr','asr','maghrib','isha')),
            time    TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS pending_notifications (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            fire_at      TEXT NOT NULL,
            title        TEXT NOT NULL,
            body         TEXT NOT NULL,
            repeat_daily INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS prayer_times_cache (
            date     TEXT PRIMARY KEY,
            fajr     TEXT,
            sunrise  TEXT,
            dhuhr    TEXT,
            asr      TEXT,
            maghrib  TEXT,
            isha     TEXT
        );

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mihrab.db");
        let conn = Connection::open(&path).unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        // Schema is usable after a double run
        conn.execute(
            "INSERT INTO prayer_log (date, fajr) VALUES ('2025-08-27', 1)",
            [],
        )
        .unwrap();
    }
}
