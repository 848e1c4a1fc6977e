// SqlitePostStore — rusqlite backend implementing the PostStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Send.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.
// The lock is never held across .await points — Rust enforces this because
// MutexGuard is !Send.
//
// The free functions in queries.rs remain usable against a Connection
// directly, which keeps the SQL unit-testable without the async wrapper.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::{FetchLog, Post, TrackedAccount, TranslateLog};
use super::traits::PostStore;

pub struct SqlitePostStore {
    conn: Mutex<Connection>,
}

impl SqlitePostStore {
    /// Wrap an already-opened rusqlite Connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn list_tracked_accounts(&self, owner_id: i64) -> Result<Vec<TrackedAccount>> {
        let conn = self.conn.lock().await;
        super::queries::list_tracked_accounts(&conn, owner_id)
    }

    async fn get_tracked_account(
        &self,
        owner_id: i64,
        username: &str,
    ) -> Result<Option<TrackedAccount>> {
        let conn = self.conn.lock().await;
        super::queries::get_tracked_account(&conn, owner_id, username)
    }

    async fn add_tracked_account(
        &self,
        owner_id: i64,
        username: &str,
        retention_days: i64,
    ) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::add_tracked_account(&conn, owner_id, username, retention_days)
    }

    async fn remove_tracked_account(&self, owner_id: i64, username: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        super::queries::remove_tracked_account(&conn, owner_id, username)
    }

    async fn insert_posts(&self, posts: &[Post]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::insert_posts(&conn, posts)
    }

    async fn posts_for_account(&self, tracked_account_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn.lock().await;
        super::queries::posts_for_account(&conn, tracked_account_id)
    }

    async fn posts_for_owner(&self, owner_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn.lock().await;
        super::queries::posts_for_owner(&conn, owner_id)
    }

    async fn find_untranslated(&self, owner_id: i64, limit: usize) -> Result<Vec<Post>> {
        let conn = self.conn.lock().await;
        super::queries::find_untranslated(&conn, owner_id, limit)
    }

    async fn count_untranslated(&self, owner_id: i64) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::count_untranslated(&conn, owner_id)
    }

    async fn get_post(&self, owner_id: i64, post_id: &str) -> Result<Option<Post>> {
        let conn = self.conn.lock().await;
        super::queries::get_post(&conn, owner_id, post_id)
    }

    async fn update_translation(
        &self,
        tracked_account_id: i64,
        post_id: &str,
        translated_text: &str,
        comment_text: &str,
        quoted_translated_text: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        super::queries::update_translation(
            &conn,
            tracked_account_id,
            post_id,
            translated_text,
            comment_text,
            quoted_translated_text,
        )
    }

    async fn purge_older_than(&self, owner_id: i64, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::purge_older_than(&conn, owner_id, cutoff)
    }

    async fn purge_orphaned(&self, owner_id: i64, active_ids: &[i64]) -> Result<usize> {
        let conn = self.conn.lock().await;
        super::queries::purge_orphaned(&conn, owner_id, active_ids)
    }

    async fn insert_fetch_log(&self, log: &FetchLog) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::insert_fetch_log(&conn, log)
    }

    async fn insert_translate_log(&self, log: &TranslateLog) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::queries::insert_translate_log(&conn, log)
    }

    async fn recent_fetch_logs(&self, owner_id: i64, limit: usize) -> Result<Vec<FetchLog>> {
        let conn = self.conn.lock().await;
        super::queries::recent_fetch_logs(&conn, owner_id, limit)
    }

    async fn recent_translate_logs(
        &self,
        owner_id: i64,
        limit: usize,
    ) -> Result<Vec<TranslateLog>> {
        let conn = self.conn.lock().await;
        super::queries::recent_translate_logs(&conn, owner_id, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use chrono::Duration;

    async fn test_store() -> SqlitePostStore {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SqlitePostStore::new(conn)
    }

    fn sample_post(account_id: i64, id: &str, age_days: i64) -> Post {
        let now = Utc::now();
        Post {
            id: id.to_string(),
            tracked_account_id: account_id,
            owner_id: 1,
            author_username: "alice".to_string(),
            created_at: now - Duration::days(age_days),
            text: format!("post {id}"),
            quoted_text: None,
            is_retweet: false,
            is_reply: false,
            is_quote: false,
            reply_to_id: None,
            like_count: 1,
            repost_count: 2,
            reply_count: 3,
            quote_count: 0,
            view_count: 100,
            bookmark_count: 0,
            translated_text: None,
            comment_text: None,
            quoted_translated_text: None,
            translated_at: None,
            fetched_at: now,
            raw_json: Some(r#"{"id":"raw"}"#.to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_posts_deduplicates() {
        let store = test_store().await;
        let account = store.add_tracked_account(1, "alice", 1).await.unwrap();

        let posts = vec![sample_post(account, "100", 0), sample_post(account, "101", 0)];
        assert_eq!(store.insert_posts(&posts).await.unwrap(), 2);

        // Re-inserting the same ids is a silent no-op
        assert_eq!(store.insert_posts(&posts).await.unwrap(), 0);
        assert_eq!(store.posts_for_account(account).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_post_roundtrip_preserves_fields() {
        let store = test_store().await;
        let account = store.add_tracked_account(1, "alice", 1).await.unwrap();

        let mut post = sample_post(account, "100", 0);
        post.quoted_text = Some("quoted".to_string());
        post.is_quote = true;
        post.reply_to_id = Some("99".to_string());
        store.insert_posts(&[post.clone()]).await.unwrap();

        let loaded = store.get_post(1, "100").await.unwrap().unwrap();
        assert_eq!(loaded.text, post.text);
        assert_eq!(loaded.quoted_text.as_deref(), Some("quoted"));
        assert!(loaded.is_quote);
        assert_eq!(loaded.reply_to_id.as_deref(), Some("99"));
        assert_eq!(loaded.view_count, 100);
        assert_eq!(loaded.raw_json.as_deref(), Some(r#"{"id":"raw"}"#));
        // RFC 3339 roundtrip keeps the timestamp to the second
        assert_eq!(
            loaded.created_at.timestamp(),
            post.created_at.timestamp()
        );
    }

    #[tokio::test]
    async fn test_update_translation_marks_backlog_done() {
        let store = test_store().await;
        let account = store.add_tracked_account(1, "alice", 1).await.unwrap();
        store
            .insert_posts(&[sample_post(account, "100", 0)])
            .await
            .unwrap();

        assert_eq!(store.count_untranslated(1).await.unwrap(), 1);

        store
            .update_translation(account, "100", "翻译文本", "锐评一句", Some("引用翻译"))
            .await
            .unwrap();

        assert_eq!(store.count_untranslated(1).await.unwrap(), 0);
        let post = store.get_post(1, "100").await.unwrap().unwrap();
        assert_eq!(post.translated_text.as_deref(), Some("翻译文本"));
        assert_eq!(post.comment_text.as_deref(), Some("锐评一句"));
        assert_eq!(post.quoted_translated_text.as_deref(), Some("引用翻译"));
        assert!(post.translated_at.is_some());
    }

    #[tokio::test]
    async fn test_find_untranslated_oldest_first() {
        let store = test_store().await;
        let account = store.add_tracked_account(1, "alice", 7).await.unwrap();
        store
            .insert_posts(&[
                sample_post(account, "new", 0),
                sample_post(account, "old", 3),
            ])
            .await
            .unwrap();

        let backlog = store.find_untranslated(1, 10).await.unwrap();
        assert_eq!(backlog.len(), 2);
        assert_eq!(backlog[0].id, "old");
        assert_eq!(backlog[1].id, "new");
    }

    #[tokio::test]
    async fn test_purge_older_than() {
        let store = test_store().await;
        let account = store.add_tracked_account(1, "alice", 7).await.unwrap();
        store
            .insert_posts(&[
                sample_post(account, "fresh", 0),
                sample_post(account, "stale", 10),
            ])
            .await
            .unwrap();

        let cutoff = Utc::now() - Duration::days(7);
        assert_eq!(store.purge_older_than(1, cutoff).await.unwrap(), 1);

        let remaining = store.posts_for_account(account).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "fresh");
    }

    #[tokio::test]
    async fn test_purge_orphaned() {
        let store = test_store().await;
        let kept = store.add_tracked_account(1, "alice", 1).await.unwrap();
        let removed = store.add_tracked_account(1, "bob", 1).await.unwrap();
        store
            .insert_posts(&[sample_post(kept, "a1", 0), sample_post(removed, "b1", 0)])
            .await
            .unwrap();

        store.remove_tracked_account(1, "bob").await.unwrap();
        assert_eq!(store.purge_orphaned(1, &[kept]).await.unwrap(), 1);

        assert!(store.get_post(1, "b1").await.unwrap().is_none());
        assert!(store.get_post(1, "a1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_orphaned_with_no_active_accounts() {
        let store = test_store().await;
        let account = store.add_tracked_account(1, "alice", 1).await.unwrap();
        store
            .insert_posts(&[sample_post(account, "a1", 0)])
            .await
            .unwrap();
        store.remove_tracked_account(1, "alice").await.unwrap();

        assert_eq!(store.purge_orphaned(1, &[]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tracked_account_lookup_is_case_insensitive() {
        let store = test_store().await;
        store.add_tracked_account(1, "Alice", 2).await.unwrap();

        let found = store.get_tracked_account(1, "alice").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().retention_days, 2);

        assert!(store
            .get_tracked_account(1, "nobody")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_fetch_log_roundtrip() {
        let store = test_store().await;
        let log = FetchLog {
            id: 0,
            owner_id: 1,
            fetched_accounts: 3,
            new_posts: 12,
            skipped_old: 4,
            purged_expired: 2,
            purged_orphans: 1,
            errors: vec!["@bob: rate limited".to_string()],
            created_at: String::new(),
        };
        let id = store.insert_fetch_log(&log).await.unwrap();
        assert!(id > 0);

        let logs = store.recent_fetch_logs(1, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].new_posts, 12);
        assert_eq!(logs[0].errors, vec!["@bob: rate limited".to_string()]);
    }

    #[tokio::test]
    async fn test_translate_log_roundtrip() {
        let store = test_store().await;
        let log = TranslateLog {
            id: 0,
            owner_id: 1,
            attempted: 5,
            translated: 4,
            failed: 1,
            aborted: false,
            errors: vec!["post 103: timeout".to_string()],
            created_at: String::new(),
        };
        store.insert_translate_log(&log).await.unwrap();

        let logs = store.recent_translate_logs(1, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].translated, 4);
        assert!(!logs[0].aborted);
    }
}
