use std::env;

use anyhow::Result;

/// Which tweet source backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBackend {
    /// Real upstream tweet API — requires TWITTER_API_KEY
    Api,
    /// Canned in-memory posts — no credentials, used for demos and tests
    Mock,
}

/// Which request/response shape the AI completion provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiSdk {
    /// OpenAI-style `/chat/completions` (also OpenRouter, DeepSeek, etc.)
    OpenAi,
    /// Anthropic-style `/v1/messages`
    Anthropic,
}

/// Hard cap on the retention window. Posts older than this are purged on
/// every fetch run regardless of the per-account setting, which bounds
/// storage growth independent of user configuration.
pub const MAX_RETENTION_DAYS: i64 = 7;

/// Retention window used when nothing is configured.
pub const DEFAULT_RETENTION_DAYS: i64 = 1;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    pub db_path: String,
    /// Which source backend the fetch pipeline uses (default: Api)
    pub source_backend: SourceBackend,
    /// Base URL of the upstream tweet API
    pub source_api_url: String,
    /// API key for the upstream tweet API
    pub source_api_key: String,
    /// Display name of the AI provider (e.g. "openai", "deepseek")
    pub ai_provider: String,
    pub ai_api_key: String,
    pub ai_model: String,
    /// Custom completion endpoint, for OpenAI-compatible gateways
    pub ai_base_url: Option<String>,
    /// Which SDK shape the provider speaks (default: OpenAi)
    pub ai_sdk: AiSdk,
    /// Default per-owner retention window in days (clamped to MAX_RETENTION_DAYS)
    pub retention_days: i64,
    /// How many recent posts to request per tracked account
    pub fetch_limit: usize,
    /// Concurrent translation calls per wave
    pub translate_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only db_path has a meaningful default — source and AI credentials
    /// are validated lazily by the `require_*` guards so that commands
    /// like `init` and `status` work without them.
    pub fn load() -> Result<Self> {
        let source_backend = match env::var("MAGPIE_SOURCE").as_deref() {
            Ok("mock") => SourceBackend::Mock,
            // "api" or unset both default to the real API
            _ => SourceBackend::Api,
        };

        let ai_sdk = match env::var("AI_SDK").as_deref() {
            Ok("anthropic") => AiSdk::Anthropic,
            _ => AiSdk::OpenAi,
        };

        let retention_days = env::var("MAGPIE_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETENTION_DAYS)
            .clamp(1, MAX_RETENTION_DAYS);

        let fetch_limit = env::var("MAGPIE_FETCH_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);

        let translate_concurrency = env::var("MAGPIE_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Ok(Self {
            db_path: env::var("MAGPIE_DB_PATH").unwrap_or_else(|_| "./magpie.db".to_string()),
            source_backend,
            source_api_url: env::var("TWITTER_API_URL")
                .unwrap_or_else(|_| crate::source::api::DEFAULT_API_URL.to_string()),
            source_api_key: env::var("TWITTER_API_KEY").unwrap_or_default(),
            ai_provider: env::var("AI_PROVIDER").unwrap_or_default(),
            ai_api_key: env::var("AI_API_KEY").unwrap_or_default(),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            ai_base_url: env::var("AI_BASE_URL").ok(),
            ai_sdk,
            retention_days,
            fetch_limit,
            translate_concurrency,
        })
    }

    /// Check that the selected source backend has what it needs.
    /// The mock backend never needs credentials; the real API does.
    pub fn require_source(&self) -> Result<()> {
        if self.source_backend == SourceBackend::Api && self.source_api_key.is_empty() {
            anyhow::bail!(
                "TWITTER_API_KEY not set. Add it to your .env file,\n\
                 or set MAGPIE_SOURCE=mock to run against canned data."
            );
        }
        Ok(())
    }

    /// Check that an AI provider is configured.
    /// Call this before any operation that issues completion calls.
    pub fn require_translator(&self) -> Result<()> {
        if self.ai_provider.is_empty() {
            anyhow::bail!("AI_PROVIDER not set. Add it to your .env file.");
        }
        if self.ai_api_key.is_empty() {
            anyhow::bail!("AI_API_KEY not set. Add it to your .env file.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_translator_rejects_missing_key() {
        let config = Config {
            db_path: String::new(),
            source_backend: SourceBackend::Mock,
            source_api_url: String::new(),
            source_api_key: String::new(),
            ai_provider: "openai".to_string(),
            ai_api_key: String::new(),
            ai_model: "gpt-4o-mini".to_string(),
            ai_base_url: None,
            ai_sdk: AiSdk::OpenAi,
            retention_days: 1,
            fetch_limit: 50,
            translate_concurrency: 3,
        };
        assert!(config.require_translator().is_err());
    }

    #[test]
    fn require_source_accepts_mock_without_key() {
        let config = Config {
            db_path: String::new(),
            source_backend: SourceBackend::Mock,
            source_api_url: String::new(),
            source_api_key: String::new(),
            ai_provider: String::new(),
            ai_api_key: String::new(),
            ai_model: String::new(),
            ai_base_url: None,
            ai_sdk: AiSdk::OpenAi,
            retention_days: 1,
            fetch_limit: 50,
            translate_concurrency: 3,
        };
        assert!(config.require_source().is_ok());
    }
}
