// PostStore trait — backend-agnostic async interface for all DB operations.
//
// Implementor: SqlitePostStore (wraps rusqlite). All methods are async so the
// sync rusqlite backend (behind a Mutex) and any future native-async backend
// fit behind a single interface. Orchestrators and the web layer hold an
// `Arc<dyn PostStore>`, which also makes them trivially testable against
// in-memory databases.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{FetchLog, Post, TrackedAccount, TranslateLog};

#[async_trait]
pub trait PostStore: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the database.
    async fn table_count(&self) -> Result<i64>;

    // --- Tracked accounts ---

    async fn list_tracked_accounts(&self, owner_id: i64) -> Result<Vec<TrackedAccount>>;

    async fn get_tracked_account(
        &self,
        owner_id: i64,
        username: &str,
    ) -> Result<Option<TrackedAccount>>;

    /// Add a tracked account and return its id.
    async fn add_tracked_account(
        &self,
        owner_id: i64,
        username: &str,
        retention_days: i64,
    ) -> Result<i64>;

    /// Remove a tracked account. Returns true if a row was deleted.
    async fn remove_tracked_account(&self, owner_id: i64, username: &str) -> Result<bool>;

    // --- Posts ---

    /// Insert posts, silently skipping duplicate `(tracked_account_id, id)`
    /// pairs. Returns how many rows were actually inserted.
    async fn insert_posts(&self, posts: &[Post]) -> Result<usize>;

    async fn posts_for_account(&self, tracked_account_id: i64) -> Result<Vec<Post>>;

    async fn posts_for_owner(&self, owner_id: i64) -> Result<Vec<Post>>;

    /// The untranslated backlog for an owner, oldest first.
    async fn find_untranslated(&self, owner_id: i64, limit: usize) -> Result<Vec<Post>>;

    async fn count_untranslated(&self, owner_id: i64) -> Result<i64>;

    async fn get_post(&self, owner_id: i64, post_id: &str) -> Result<Option<Post>>;

    /// Write translation results back to a post and stamp translated_at.
    async fn update_translation(
        &self,
        tracked_account_id: i64,
        post_id: &str,
        translated_text: &str,
        comment_text: &str,
        quoted_translated_text: Option<&str>,
    ) -> Result<()>;

    /// Delete posts older than the cutoff for this owner. Returns the
    /// number of rows deleted.
    async fn purge_older_than(&self, owner_id: i64, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Delete posts whose owning account is not in `active_ids`. Returns
    /// the number of rows deleted.
    async fn purge_orphaned(&self, owner_id: i64, active_ids: &[i64]) -> Result<usize>;

    // --- Audit logs ---

    async fn insert_fetch_log(&self, log: &FetchLog) -> Result<i64>;

    async fn insert_translate_log(&self, log: &TranslateLog) -> Result<i64>;

    async fn recent_fetch_logs(&self, owner_id: i64, limit: usize) -> Result<Vec<FetchLog>>;

    async fn recent_translate_logs(&self, owner_id: i64, limit: usize)
        -> Result<Vec<TranslateLog>>;
}
