// Mock source provider — canned posts for demos and local development.
//
// Selected with MAGPIE_SOURCE=mock. Produces a small, deterministic feed
// for any handle: a three-post self-reply chain, a quote post, and one
// post old enough to fall outside the default retention window.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use super::traits::{FetchedPost, SourceError, SourceProvider};

#[derive(Default)]
pub struct MockSourceProvider;

impl MockSourceProvider {
    fn make_post(
        handle: &str,
        seq: u32,
        age_hours: i64,
        text: &str,
        reply_to: Option<&str>,
    ) -> FetchedPost {
        let id = format!("mock-{handle}-{seq}");
        let created_at = Utc::now() - Duration::hours(age_hours);
        FetchedPost {
            id: id.clone(),
            author_username: handle.to_string(),
            created_at,
            text: text.to_string(),
            quoted_text: None,
            is_retweet: false,
            is_reply: reply_to.is_some(),
            is_quote: false,
            reply_to_id: reply_to.map(String::from),
            like_count: 10 + seq as i64,
            repost_count: seq as i64,
            reply_count: 1,
            quote_count: 0,
            view_count: 1000 + seq as i64 * 100,
            bookmark_count: 2,
            raw: json!({
                "id": id,
                "text": text,
                "author": { "userName": handle },
                "mock": true,
            }),
        }
    }
}

#[async_trait]
impl SourceProvider for MockSourceProvider {
    async fn fetch_recent_posts(
        &self,
        handle: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, SourceError> {
        let root_id = format!("mock-{handle}-1");
        let second_id = format!("mock-{handle}-2");

        let mut quote = Self::make_post(handle, 4, 1, "Quoting my earlier take.", None);
        quote.is_quote = true;
        quote.quoted_text = Some("The earlier take being quoted.".to_string());

        let posts = vec![
            quote,
            Self::make_post(handle, 3, 2, "Thread, part three.", Some(&second_id)),
            Self::make_post(handle, 2, 3, "Thread, part two.", Some(&root_id)),
            Self::make_post(handle, 1, 4, "Starting a thread about something.", None),
            // Old enough to be skipped under the default 1-day retention
            Self::make_post(handle, 0, 50, "An old post outside retention.", None),
        ];

        Ok(posts.into_iter().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_feed_contains_a_self_reply_chain() {
        let provider = MockSourceProvider;
        let posts = provider.fetch_recent_posts("alice", 10).await.unwrap();
        assert_eq!(posts.len(), 5);
        assert!(posts.iter().all(|p| p.author_username == "alice"));
        assert!(posts.iter().any(|p| p.reply_to_id.is_some()));
        assert!(posts.iter().any(|p| p.quoted_text.is_some()));
    }

    #[tokio::test]
    async fn mock_feed_respects_limit() {
        let provider = MockSourceProvider;
        let posts = provider.fetch_recent_posts("alice", 2).await.unwrap();
        assert_eq!(posts.len(), 2);
    }
}
