// Translator trait — the swap-ready abstraction over the AI completion
// provider.
//
// The production implementation is AiTranslator (OpenAI- or Anthropic-style
// HTTP APIs). Tests substitute their own implementations to control timing
// and failure behavior.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The parsed result of translating one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Chinese translation of the post text
    pub translated_text: String,
    /// Short editorial remark; empty when the model skipped it
    pub comment_text: String,
    /// Translation of the embedded quoted post, when one was supplied
    pub quoted_translated_text: Option<String>,
}

/// Capability to translate a post (and optionally its quoted post) and
/// produce an editorial remark. Implementations must be async because
/// providers are HTTP APIs.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, quoted_text: Option<&str>) -> Result<Translation>;
}
