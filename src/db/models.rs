// Data models — Rust structs that map to database rows.
//
// These are the types that flow through the application. They're separate
// from the database queries so other modules can use them without depending
// on rusqlite directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored identity whose posts are periodically fetched.
///
/// Mutated only by the account-management commands; the pipeline just
/// reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedAccount {
    pub id: i64,
    pub owner_id: i64,
    pub username: String,
    /// Per-account retention window in days (capped at MAX_RETENTION_DAYS)
    pub retention_days: i64,
    pub created_at: String,
}

/// One ingested post. `(tracked_account_id, id)` is unique — a post is
/// never duplicated for the same tracked account.
///
/// Created on first fetch; afterwards only the translation fields are
/// mutated (by the translation pipeline) and the row may be deleted by
/// retention purge. Everything else is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Provider-assigned, globally stable id
    pub id: String,
    pub tracked_account_id: i64,
    pub owner_id: i64,
    pub author_username: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    /// Text of an embedded quoted post, if any
    pub quoted_text: Option<String>,
    pub is_retweet: bool,
    pub is_reply: bool,
    pub is_quote: bool,
    /// Parent post id when this post is a reply
    pub reply_to_id: Option<String>,
    // Engagement snapshot — immutable once fetched
    pub like_count: i64,
    pub repost_count: i64,
    pub reply_count: i64,
    pub quote_count: i64,
    pub view_count: i64,
    pub bookmark_count: i64,
    // Translation state — all null until the translation pipeline runs
    pub translated_text: Option<String>,
    pub comment_text: Option<String>,
    pub quoted_translated_text: Option<String>,
    pub translated_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    /// Full provider payload, stored verbatim as a display cache.
    /// Never authoritative for filtering or dedup — those use the
    /// normalized fields above.
    pub raw_json: Option<String>,
}

impl Post {
    /// True once the translation pipeline has processed this post.
    pub fn is_translated(&self) -> bool {
        self.translated_text.is_some()
    }
}

/// Audit record for one fetch run. Created once per run; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchLog {
    pub id: i64,
    pub owner_id: i64,
    pub fetched_accounts: i64,
    pub new_posts: i64,
    pub skipped_old: i64,
    pub purged_expired: i64,
    pub purged_orphans: i64,
    /// Error messages, one per failed account (JSON-encoded in the DB)
    pub errors: Vec<String>,
    pub created_at: String,
}

/// Audit record for one translation run. Created once per run; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateLog {
    pub id: i64,
    pub owner_id: i64,
    pub attempted: i64,
    pub translated: i64,
    pub failed: i64,
    /// True when the run was cancelled before all waves completed
    pub aborted: bool,
    /// Error messages, one per failed post (JSON-encoded in the DB)
    pub errors: Vec<String>,
    pub created_at: String,
}
