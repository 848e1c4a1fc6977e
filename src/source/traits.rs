// Source provider trait — the swap-ready abstraction over "where posts
// come from".
//
// Two implementations: ApiSourceProvider (real upstream tweet API) and
// MockSourceProvider (canned data). The fetch pipeline only sees the trait,
// so the variant is chosen once, in the factory, from configuration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors a source provider can surface. The fetch pipeline treats all of
/// these as per-account and non-fatal; the distinctions exist so callers
/// can log and display them meaningfully.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("account @{0} not found")]
    AccountNotFound(String),

    #[error("rate limited by the upstream API")]
    RateLimited,

    #[error("the upstream API rejected our credentials")]
    CredentialsRequired,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A post as returned by a source provider — normalized fields plus the
/// verbatim provider payload. Provenance (owning account, fetched_at) is
/// stamped by the fetch pipeline when the post is written to storage.
#[derive(Debug, Clone)]
pub struct FetchedPost {
    pub id: String,
    pub author_username: String,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub quoted_text: Option<String>,
    pub is_retweet: bool,
    pub is_reply: bool,
    pub is_quote: bool,
    pub reply_to_id: Option<String>,
    pub like_count: i64,
    pub repost_count: i64,
    pub reply_count: i64,
    pub quote_count: i64,
    pub view_count: i64,
    pub bookmark_count: i64,
    /// Full provider payload, kept verbatim for display/replay.
    pub raw: serde_json::Value,
}

/// Capability to fetch an account's recent posts, newest first.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_recent_posts(
        &self,
        handle: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, SourceError>;
}
