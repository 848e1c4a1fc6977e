// Source layer — where posts come from.
//
// The provider is selected once per run from configuration: the real
// upstream API or the canned mock. Callers only ever hold the trait object.

pub mod api;
pub mod mock;
pub mod traits;

pub use traits::{FetchedPost, SourceError, SourceProvider};

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, SourceBackend};

/// Build the configured source provider.
///
/// Fails when the API backend is selected without credentials — this is
/// the one fatal "not configured" condition, surfaced before any account
/// is processed.
pub fn create_provider(config: &Config) -> Result<Arc<dyn SourceProvider>> {
    match config.source_backend {
        SourceBackend::Api => {
            config.require_source()?;
            let provider = api::ApiSourceProvider::new(&config.source_api_url, &config.source_api_key)?;
            Ok(Arc::new(provider))
        }
        SourceBackend::Mock => Ok(Arc::new(mock::MockSourceProvider)),
    }
}
