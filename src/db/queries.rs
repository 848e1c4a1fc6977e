// Database queries — CRUD operations for all tables.
//
// Every database interaction goes through this module. This keeps SQL
// contained in one place and gives the rest of the app clean Rust interfaces.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::{FetchLog, Post, TrackedAccount, TranslateLog};

/// Parse an RFC 3339 timestamp column, mapping failures into rusqlite's
/// conversion error so they surface through query_map like any other
/// column mismatch.
fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_timestamp_opt(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_timestamp(idx, v)).transpose()
}

// --- Tracked accounts ---

/// List all tracked accounts for an owner, oldest first.
pub fn list_tracked_accounts(conn: &Connection, owner_id: i64) -> Result<Vec<TrackedAccount>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, username, retention_days, created_at
         FROM tracked_accounts WHERE owner_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![owner_id], row_to_account)?;

    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(row?);
    }
    Ok(accounts)
}

/// Look up a tracked account by username (case-insensitive).
pub fn get_tracked_account(
    conn: &Connection,
    owner_id: i64,
    username: &str,
) -> Result<Option<TrackedAccount>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, username, retention_days, created_at
         FROM tracked_accounts WHERE owner_id = ?1 AND LOWER(username) = LOWER(?2)",
    )?;
    let result = stmt
        .query_row(params![owner_id, username], row_to_account)
        .optional()?;
    Ok(result)
}

/// Add a tracked account and return its id. Duplicate usernames for the
/// same owner are rejected by the UNIQUE constraint.
pub fn add_tracked_account(
    conn: &Connection,
    owner_id: i64,
    username: &str,
    retention_days: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO tracked_accounts (owner_id, username, retention_days)
         VALUES (?1, ?2, ?3)",
        params![owner_id, username, retention_days],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Remove a tracked account. Returns true if a row was deleted.
/// The account's posts are left in place — the next fetch run's orphan
/// purge removes them.
pub fn remove_tracked_account(conn: &Connection, owner_id: i64, username: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM tracked_accounts WHERE owner_id = ?1 AND LOWER(username) = LOWER(?2)",
        params![owner_id, username],
    )?;
    Ok(deleted > 0)
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrackedAccount> {
    Ok(TrackedAccount {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        username: row.get(2)?,
        retention_days: row.get(3)?,
        created_at: row.get(4)?,
    })
}

// --- Posts ---

const POST_COLUMNS: &str = "tracked_account_id, id, owner_id, author_username, created_at, text,
    quoted_text, is_retweet, is_reply, is_quote, reply_to_id,
    like_count, repost_count, reply_count, quote_count, view_count, bookmark_count,
    translated_text, comment_text, quoted_translated_text, translated_at,
    fetched_at, raw_json";

/// Insert posts, silently skipping duplicates. Returns how many rows were
/// actually inserted. Dedup-by-id is an invariant, not an error: the
/// composite primary key plus INSERT OR IGNORE makes re-fetching the same
/// posts a no-op.
pub fn insert_posts(conn: &Connection, posts: &[Post]) -> Result<usize> {
    let mut stmt = conn.prepare(&format!(
        "INSERT OR IGNORE INTO posts ({POST_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                 ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)"
    ))?;

    let mut inserted = 0;
    for post in posts {
        inserted += stmt.execute(params![
            post.tracked_account_id,
            post.id,
            post.owner_id,
            post.author_username,
            post.created_at.to_rfc3339(),
            post.text,
            post.quoted_text,
            post.is_retweet,
            post.is_reply,
            post.is_quote,
            post.reply_to_id,
            post.like_count,
            post.repost_count,
            post.reply_count,
            post.quote_count,
            post.view_count,
            post.bookmark_count,
            post.translated_text,
            post.comment_text,
            post.quoted_translated_text,
            post.translated_at.map(|t| t.to_rfc3339()),
            post.fetched_at.to_rfc3339(),
            post.raw_json,
        ])?;
    }
    Ok(inserted)
}

/// All stored posts for one tracked account, newest first.
pub fn posts_for_account(conn: &Connection, tracked_account_id: i64) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE tracked_account_id = ?1
         ORDER BY datetime(created_at) DESC"
    ))?;
    let rows = stmt.query_map(params![tracked_account_id], row_to_post)?;
    collect_posts(rows)
}

/// All stored posts for an owner across every tracked account, newest first.
pub fn posts_for_owner(conn: &Connection, owner_id: i64) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE owner_id = ?1
         ORDER BY datetime(created_at) DESC"
    ))?;
    let rows = stmt.query_map(params![owner_id], row_to_post)?;
    collect_posts(rows)
}

/// The untranslated backlog, oldest first so threads translate in order.
pub fn find_untranslated(conn: &Connection, owner_id: i64, limit: usize) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts
         WHERE owner_id = ?1 AND translated_text IS NULL
         ORDER BY datetime(created_at) ASC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![owner_id, limit as i64], row_to_post)?;
    collect_posts(rows)
}

pub fn count_untranslated(conn: &Connection, owner_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE owner_id = ?1 AND translated_text IS NULL",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Fetch a single post by provider id.
pub fn get_post(conn: &Connection, owner_id: i64, post_id: &str) -> Result<Option<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE owner_id = ?1 AND id = ?2"
    ))?;
    let result = stmt
        .query_row(params![owner_id, post_id], row_to_post)
        .optional()?;
    Ok(result)
}

/// Write translation results back to a post and stamp translated_at.
pub fn update_translation(
    conn: &Connection,
    tracked_account_id: i64,
    post_id: &str,
    translated_text: &str,
    comment_text: &str,
    quoted_translated_text: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE posts SET
            translated_text = ?3,
            comment_text = ?4,
            quoted_translated_text = ?5,
            translated_at = ?6
         WHERE tracked_account_id = ?1 AND id = ?2",
        params![
            tracked_account_id,
            post_id,
            translated_text,
            comment_text,
            quoted_translated_text,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Delete posts older than the cutoff for this owner, regardless of which
/// account they belong to. Returns the number of rows deleted.
pub fn purge_older_than(conn: &Connection, owner_id: i64, cutoff: DateTime<Utc>) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM posts
         WHERE owner_id = ?1 AND datetime(created_at) < datetime(?2)",
        params![owner_id, cutoff.to_rfc3339()],
    )?;
    Ok(deleted)
}

/// Delete posts whose owning account is no longer tracked. Returns the
/// number of rows deleted.
pub fn purge_orphaned(conn: &Connection, owner_id: i64, active_ids: &[i64]) -> Result<usize> {
    if active_ids.is_empty() {
        let deleted = conn.execute("DELETE FROM posts WHERE owner_id = ?1", params![owner_id])?;
        return Ok(deleted);
    }

    let placeholders = (2..active_ids.len() + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "DELETE FROM posts
         WHERE owner_id = ?1 AND tracked_account_id NOT IN ({placeholders})"
    );

    let deleted = conn.execute(
        &sql,
        rusqlite::params_from_iter(std::iter::once(owner_id).chain(active_ids.iter().copied())),
    )?;
    Ok(deleted)
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        tracked_account_id: row.get(0)?,
        id: row.get(1)?,
        owner_id: row.get(2)?,
        author_username: row.get(3)?,
        created_at: parse_timestamp(4, row.get(4)?)?,
        text: row.get(5)?,
        quoted_text: row.get(6)?,
        is_retweet: row.get(7)?,
        is_reply: row.get(8)?,
        is_quote: row.get(9)?,
        reply_to_id: row.get(10)?,
        like_count: row.get(11)?,
        repost_count: row.get(12)?,
        reply_count: row.get(13)?,
        quote_count: row.get(14)?,
        view_count: row.get(15)?,
        bookmark_count: row.get(16)?,
        translated_text: row.get(17)?,
        comment_text: row.get(18)?,
        quoted_translated_text: row.get(19)?,
        translated_at: parse_timestamp_opt(20, row.get(20)?)?,
        fetched_at: parse_timestamp(21, row.get(21)?)?,
        raw_json: row.get(22)?,
    })
}

fn collect_posts(
    rows: impl Iterator<Item = rusqlite::Result<Post>>,
) -> Result<Vec<Post>> {
    let mut posts = Vec::new();
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

// --- Audit logs ---

/// Append a fetch run's audit record. The id and created_at fields of the
/// input are ignored; the database assigns them.
pub fn insert_fetch_log(conn: &Connection, log: &FetchLog) -> Result<i64> {
    let errors_json = serde_json::to_string(&log.errors)?;
    conn.execute(
        "INSERT INTO fetch_logs
            (owner_id, fetched_accounts, new_posts, skipped_old,
             purged_expired, purged_orphans, errors)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            log.owner_id,
            log.fetched_accounts,
            log.new_posts,
            log.skipped_old,
            log.purged_expired,
            log.purged_orphans,
            errors_json,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append a translation run's audit record.
pub fn insert_translate_log(conn: &Connection, log: &TranslateLog) -> Result<i64> {
    let errors_json = serde_json::to_string(&log.errors)?;
    conn.execute(
        "INSERT INTO translate_logs
            (owner_id, attempted, translated, failed, aborted, errors)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            log.owner_id,
            log.attempted,
            log.translated,
            log.failed,
            log.aborted,
            errors_json,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent fetch runs, newest first.
pub fn recent_fetch_logs(conn: &Connection, owner_id: i64, limit: usize) -> Result<Vec<FetchLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, fetched_accounts, new_posts, skipped_old,
                purged_expired, purged_orphans, errors, created_at
         FROM fetch_logs WHERE owner_id = ?1
         ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![owner_id, limit as i64], |row| {
        let errors_json: Option<String> = row.get(7)?;
        Ok(FetchLog {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            fetched_accounts: row.get(2)?,
            new_posts: row.get(3)?,
            skipped_old: row.get(4)?,
            purged_expired: row.get(5)?,
            purged_orphans: row.get(6)?,
            errors: errors_json
                .map(|j| serde_json::from_str(&j).unwrap_or_default())
                .unwrap_or_default(),
            created_at: row.get(8)?,
        })
    })?;

    let mut logs = Vec::new();
    for row in rows {
        logs.push(row?);
    }
    Ok(logs)
}

/// Most recent translation runs, newest first.
pub fn recent_translate_logs(
    conn: &Connection,
    owner_id: i64,
    limit: usize,
) -> Result<Vec<TranslateLog>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, attempted, translated, failed, aborted, errors, created_at
         FROM translate_logs WHERE owner_id = ?1
         ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![owner_id, limit as i64], |row| {
        let errors_json: Option<String> = row.get(6)?;
        Ok(TranslateLog {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            attempted: row.get(2)?,
            translated: row.get(3)?,
            failed: row.get(4)?,
            aborted: row.get(5)?,
            errors: errors_json
                .map(|j| serde_json::from_str(&j).unwrap_or_default())
                .unwrap_or_default(),
            created_at: row.get(7)?,
        })
    })?;

    let mut logs = Vec::new();
    for row in rows {
        logs.push(row?);
    }
    Ok(logs)
}
