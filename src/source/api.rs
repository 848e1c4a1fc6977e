// Real source provider — thin reqwest wrapper over the upstream tweet API.
//
// The wire format is treated as opaque: we normalize the handful of fields
// the pipeline needs and keep the full payload verbatim in `raw`. Display
// code reads `raw`; filtering and dedup only ever use the normalized fields.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::traits::{FetchedPost, SourceError, SourceProvider};

/// Default base URL for the upstream tweet API.
pub const DEFAULT_API_URL: &str = "https://api.twitterapi.io";

pub struct ApiSourceProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiSourceProvider {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent("magpie/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl SourceProvider for ApiSourceProvider {
    async fn fetch_recent_posts(
        &self,
        handle: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, SourceError> {
        let url = format!("{}/twitter/user/last_tweets", self.base_url);
        let limit_param = limit.to_string();

        debug!(handle = handle, limit = limit, "Fetching recent posts");

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(&[("userName", handle), ("limit", &limit_param)])
            .send()
            .await
            .with_context(|| format!("Request to upstream API failed for @{handle}"))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SourceError::AccountNotFound(handle.to_string())),
            StatusCode::TOO_MANY_REQUESTS => return Err(SourceError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::CredentialsRequired)
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Other(anyhow!(
                    "Upstream API returned {status} for @{handle}: {body}"
                )));
            }
            _ => {}
        }

        let payload: TweetsResponse = response
            .json()
            .await
            .context("Failed to deserialize upstream API response")?;

        let mut posts = Vec::with_capacity(payload.tweets.len());
        for raw in payload.tweets {
            posts.push(normalize_tweet(raw)?);
        }

        debug!(handle = handle, count = posts.len(), "Fetched posts");
        Ok(posts)
    }
}

// -- Serde types for the upstream response --
//
// Only the fields we normalize are typed; everything else rides along in
// the raw JSON value.

#[derive(Deserialize)]
struct TweetsResponse {
    #[serde(default)]
    tweets: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTweet {
    id: String,
    text: String,
    created_at: String,
    author: ApiAuthor,
    #[serde(default)]
    is_reply: bool,
    in_reply_to_id: Option<String>,
    // The upstream keeps these two snake_case while everything else is
    // camelCase, so they need explicit renames.
    #[serde(default, rename = "retweeted_tweet")]
    retweeted_tweet: Option<serde_json::Value>,
    #[serde(default, rename = "quoted_tweet")]
    quoted_tweet: Option<QuotedTweet>,
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    retweet_count: i64,
    #[serde(default)]
    reply_count: i64,
    #[serde(default)]
    quote_count: i64,
    #[serde(default)]
    view_count: i64,
    #[serde(default)]
    bookmark_count: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAuthor {
    user_name: String,
}

#[derive(Deserialize)]
struct QuotedTweet {
    #[serde(default)]
    text: String,
}

fn normalize_tweet(raw: serde_json::Value) -> Result<FetchedPost, SourceError> {
    let tweet: ApiTweet = serde_json::from_value(raw.clone())
        .context("Unexpected tweet shape in upstream response")?;

    let created_at = parse_created_at(&tweet.created_at)
        .with_context(|| format!("Unparseable createdAt on tweet {}", tweet.id))?;

    Ok(FetchedPost {
        id: tweet.id,
        author_username: tweet.author.user_name,
        created_at,
        text: tweet.text,
        quoted_text: tweet.quoted_tweet.map(|q| q.text),
        is_retweet: tweet.retweeted_tweet.is_some(),
        is_reply: tweet.is_reply,
        is_quote: raw.get("quoted_tweet").map(|q| !q.is_null()).unwrap_or(false),
        reply_to_id: tweet.in_reply_to_id,
        like_count: tweet.like_count,
        repost_count: tweet.retweet_count,
        reply_count: tweet.reply_count,
        quote_count: tweet.quote_count,
        view_count: tweet.view_count,
        bookmark_count: tweet.bookmark_count,
        raw,
    })
}

/// The upstream sends either RFC 3339 or Twitter's legacy ctime-style
/// format ("Tue Dec 10 07:00:30 +0000 2024") depending on endpoint age.
fn parse_created_at(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    DateTime::parse_from_str(value, "%a %b %d %H:%M:%S %z %Y")
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| anyhow!("{e}: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_maps_fields_and_keeps_raw() {
        let raw = json!({
            "id": "1866",
            "text": "hello world",
            "createdAt": "2026-08-01T10:00:00+00:00",
            "author": { "userName": "alice" },
            "isReply": true,
            "inReplyToId": "1865",
            "quoted_tweet": { "text": "original" },
            "likeCount": 5,
            "retweetCount": 2,
            "replyCount": 1,
            "quoteCount": 0,
            "viewCount": 900,
            "bookmarkCount": 3,
            "extra_field_we_ignore": { "nested": true }
        });

        let post = normalize_tweet(raw.clone()).unwrap();
        assert_eq!(post.id, "1866");
        assert_eq!(post.author_username, "alice");
        assert!(post.is_reply);
        assert!(post.is_quote);
        assert!(!post.is_retweet);
        assert_eq!(post.reply_to_id.as_deref(), Some("1865"));
        assert_eq!(post.quoted_text.as_deref(), Some("original"));
        assert_eq!(post.repost_count, 2);
        assert_eq!(post.bookmark_count, 3);
        // The verbatim payload survives, unknown fields included
        assert_eq!(post.raw, raw);
    }

    #[test]
    fn parse_created_at_accepts_both_formats() {
        assert!(parse_created_at("2026-08-01T10:00:00+00:00").is_ok());
        assert!(parse_created_at("Tue Dec 10 07:00:30 +0000 2024").is_ok());
        assert!(parse_created_at("not a date").is_err());
    }
}
