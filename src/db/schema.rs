// Database schema — table creation and migrations.
//
// We use a simple version-based migration approach: a `schema_version` table
// tracks which migrations have run, and each migration is a function that
// executes SQL statements.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet.
///
/// This is idempotent — safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Tracks schema version for future migrations
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Accounts being monitored; posts reference these rows
        CREATE TABLE IF NOT EXISTS tracked_accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL DEFAULT 1,
            username TEXT NOT NULL,
            retention_days INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(owner_id, username)
        );

        -- Ingested posts. The composite primary key is the dedup invariant:
        -- the same provider id is never stored twice for one tracked account.
        -- owner_id is denormalized so orphaned posts (account row deleted)
        -- can still be purged per owner.
        CREATE TABLE IF NOT EXISTS posts (
            tracked_account_id INTEGER NOT NULL,
            id TEXT NOT NULL,
            owner_id INTEGER NOT NULL,
            author_username TEXT NOT NULL,
            created_at TEXT NOT NULL,
            text TEXT NOT NULL,
            quoted_text TEXT,
            is_retweet INTEGER NOT NULL DEFAULT 0,
            is_reply INTEGER NOT NULL DEFAULT 0,
            is_quote INTEGER NOT NULL DEFAULT 0,
            reply_to_id TEXT,
            like_count INTEGER NOT NULL DEFAULT 0,
            repost_count INTEGER NOT NULL DEFAULT 0,
            reply_count INTEGER NOT NULL DEFAULT 0,
            quote_count INTEGER NOT NULL DEFAULT 0,
            view_count INTEGER NOT NULL DEFAULT 0,
            translated_text TEXT,
            comment_text TEXT,
            quoted_translated_text TEXT,
            translated_at TEXT,
            fetched_at TEXT NOT NULL,
            raw_json TEXT,          -- display cache; never used for filtering or dedup
            PRIMARY KEY (tracked_account_id, id)
        );

        -- Append-only audit record per fetch run
        CREATE TABLE IF NOT EXISTS fetch_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            fetched_accounts INTEGER NOT NULL DEFAULT 0,
            new_posts INTEGER NOT NULL DEFAULT 0,
            skipped_old INTEGER NOT NULL DEFAULT 0,
            purged_expired INTEGER NOT NULL DEFAULT 0,
            purged_orphans INTEGER NOT NULL DEFAULT 0,
            errors TEXT,            -- JSON array of error messages
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Append-only audit record per translation run
        CREATE TABLE IF NOT EXISTS translate_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            attempted INTEGER NOT NULL DEFAULT 0,
            translated INTEGER NOT NULL DEFAULT 0,
            failed INTEGER NOT NULL DEFAULT 0,
            aborted INTEGER NOT NULL DEFAULT 0,
            errors TEXT,            -- JSON array of error messages
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Index for the untranslated-backlog query
        CREATE INDEX IF NOT EXISTS idx_posts_untranslated
            ON posts(owner_id, translated_text);

        -- Index for retention purges by age
        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at);
        ",
    )
    .context("Failed to create database tables")?;

    // Record initial schema version if not already set
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    // Migration v2: add bookmark_count to posts. Bookmarks are a newer
    // engagement metric the upstream API started exposing after the
    // original schema shipped.
    run_migration(conn, 2, |c| {
        c.execute_batch("ALTER TABLE posts ADD COLUMN bookmark_count INTEGER NOT NULL DEFAULT 0;")
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
/// The migration function receives the connection and should execute its SQL.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Count the number of tables in the database (useful for init confirmation).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        // Running create_tables twice should not error
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_table_count() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let count = table_count(&conn).unwrap();
        // schema_version, tracked_accounts, posts, fetch_logs,
        // translate_logs = 5 tables
        assert_eq!(count, 5i64);
    }

    #[test]
    fn test_migration_v2_adds_bookmark_column() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        conn.execute(
            "INSERT INTO posts (tracked_account_id, id, owner_id, author_username,
                                created_at, text, fetched_at, bookmark_count)
             VALUES (1, '100', 1, 'alice', '2026-01-01T00:00:00+00:00', 'hi',
                     '2026-01-01T00:00:00+00:00', 7)",
            [],
        )
        .unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT bookmark_count FROM posts WHERE id = '100'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 7);
    }

    #[test]
    fn test_migration_v2_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        // Run create_tables three times — the migration should only run once
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let versions: Vec<i64> = conn
            .prepare("SELECT version FROM schema_version ORDER BY version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }
}
