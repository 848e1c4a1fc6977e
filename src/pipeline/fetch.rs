// Fetch pipeline: synchronize tracked accounts' recent posts into storage.
//
// Accounts are processed strictly sequentially so progress events arrive
// in a stable, client-observable order. A single account's fetch failure
// is recorded and the run moves on; only a missing provider (checked by
// the factory before this runs) is fatal.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::MAX_RETENTION_DAYS;
use crate::db::models::{FetchLog, Post, TrackedAccount};
use crate::db::PostStore;
use crate::source::{FetchedPost, SourceProvider};

use super::progress::{AccountProgressEvent, CleanupEvent, EventSink, ProgressEvent};

/// Aggregate outcome of one fetch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchRunResult {
    pub fetched_accounts: usize,
    pub new_posts: usize,
    pub skipped_old: usize,
    pub purged_expired: usize,
    pub purged_orphans: usize,
    pub errors: Vec<String>,
}

/// Resolve the retention window for a run: the most generous per-account
/// setting wins over the owner default, and the hard cap always applies.
pub fn effective_retention(default_days: i64, accounts: &[TrackedAccount]) -> i64 {
    accounts
        .iter()
        .map(|a| a.retention_days)
        .max()
        .unwrap_or(default_days)
        .max(default_days)
        .clamp(1, MAX_RETENTION_DAYS)
}

pub struct FetchOrchestrator {
    provider: Arc<dyn SourceProvider>,
    store: Arc<dyn PostStore>,
    max_retention_days: i64,
}

impl FetchOrchestrator {
    pub fn new(provider: Arc<dyn SourceProvider>, store: Arc<dyn PostStore>) -> Self {
        Self {
            provider,
            store,
            max_retention_days: MAX_RETENTION_DAYS,
        }
    }

    /// Run one synchronization pass over the given accounts.
    ///
    /// `retention_days` is clamped to 1..=MAX_RETENTION_DAYS. When `events`
    /// is set, one `progress` event is emitted per account (plus a leading
    /// `cleanup` if the purges deleted anything and a trailing `done`).
    pub async fn run(
        &self,
        owner_id: i64,
        accounts: &[TrackedAccount],
        retention_days: i64,
        limit: usize,
        events: Option<&EventSink>,
    ) -> Result<FetchRunResult> {
        let now = Utc::now();
        let mut result = FetchRunResult::default();

        // Storage-bounding purge first: the hard cap applies regardless of
        // the per-owner setting, then orphans of untracked accounts go.
        let purge_cutoff = now - Duration::days(self.max_retention_days);
        result.purged_expired = self.store.purge_older_than(owner_id, purge_cutoff).await?;

        let active_ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
        result.purged_orphans = self.store.purge_orphaned(owner_id, &active_ids).await?;

        if result.purged_expired + result.purged_orphans > 0 {
            info!(
                expired = result.purged_expired,
                orphans = result.purged_orphans,
                "Purged stale posts"
            );
            if let Some(sink) = events {
                sink.emit(ProgressEvent::Cleanup(CleanupEvent {
                    purged_expired: result.purged_expired,
                    purged_orphans: result.purged_orphans,
                }));
            }
        }

        let retention = retention_days.clamp(1, self.max_retention_days);
        let cutoff = now - Duration::days(retention);
        let total = accounts.len();

        for (idx, account) in accounts.iter().enumerate() {
            match self
                .provider
                .fetch_recent_posts(&account.username, limit)
                .await
            {
                Ok(fetched) => {
                    let received = fetched.len();
                    let (fresh, old): (Vec<FetchedPost>, Vec<FetchedPost>) =
                        fetched.into_iter().partition(|p| p.created_at >= cutoff);

                    let rows: Vec<Post> = fresh
                        .into_iter()
                        .map(|p| stamp_post(p, account, now))
                        .collect();
                    let inserted = self.store.insert_posts(&rows).await?;

                    info!(
                        account = %account.username,
                        received,
                        inserted,
                        skipped_old = old.len(),
                        "Account synchronized"
                    );

                    result.fetched_accounts += 1;
                    result.new_posts += inserted;
                    result.skipped_old += old.len();

                    if let Some(sink) = events {
                        sink.emit(ProgressEvent::Account(AccountProgressEvent {
                            current: idx + 1,
                            total,
                            account: account.username.clone(),
                            tweets_received: received,
                            filtered: old.len(),
                            new_posts: inserted,
                            error: None,
                        }));
                    }
                }
                Err(e) => {
                    warn!(account = %account.username, error = %e, "Fetch failed, continuing");
                    let message = format!("@{}: {e}", account.username);
                    result.errors.push(message.clone());

                    if let Some(sink) = events {
                        sink.emit(ProgressEvent::Account(AccountProgressEvent {
                            current: idx + 1,
                            total,
                            account: account.username.clone(),
                            tweets_received: 0,
                            filtered: 0,
                            new_posts: 0,
                            error: Some(message),
                        }));
                    }
                }
            }
        }

        self.store
            .insert_fetch_log(&FetchLog {
                id: 0,
                owner_id,
                fetched_accounts: result.fetched_accounts as i64,
                new_posts: result.new_posts as i64,
                skipped_old: result.skipped_old as i64,
                purged_expired: result.purged_expired as i64,
                purged_orphans: result.purged_orphans as i64,
                errors: result.errors.clone(),
                created_at: String::new(),
            })
            .await?;

        if let Some(sink) = events {
            sink.emit(ProgressEvent::FetchDone(result.clone()));
        }

        Ok(result)
    }
}

/// Stamp provenance onto a fetched post, turning it into a storage row.
/// The verbatim provider payload rides along as a display cache only.
fn stamp_post(fetched: FetchedPost, account: &TrackedAccount, now: chrono::DateTime<Utc>) -> Post {
    Post {
        id: fetched.id,
        tracked_account_id: account.id,
        owner_id: account.owner_id,
        author_username: fetched.author_username,
        created_at: fetched.created_at,
        text: fetched.text,
        quoted_text: fetched.quoted_text,
        is_retweet: fetched.is_retweet,
        is_reply: fetched.is_reply,
        is_quote: fetched.is_quote,
        reply_to_id: fetched.reply_to_id,
        like_count: fetched.like_count,
        repost_count: fetched.repost_count,
        reply_count: fetched.reply_count,
        quote_count: fetched.quote_count,
        view_count: fetched.view_count,
        bookmark_count: fetched.bookmark_count,
        translated_text: None,
        comment_text: None,
        quoted_translated_text: None,
        translated_at: None,
        fetched_at: now,
        raw_json: Some(fetched.raw.to_string()),
    }
}
