// Translation pipeline: drive the translator over the untranslated backlog
// in bounded waves.
//
// A wave is at most `concurrency` posts translated concurrently and awaited
// together — one post's failure neither delays nor cancels its wave-mates.
// Wave boundaries double as cancellation checkpoints: a wave in flight
// always finishes (its results are written and emitted), but once the flag
// is set no further wave starts and no `done` event is sent.

use std::sync::Arc;

use anyhow::Result;
use futures::future;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::models::{Post, TranslateLog};
use crate::db::PostStore;
use crate::translate::{Translation, Translator};

use super::progress::{
    CancelFlag, EventSink, ProgressEvent, TranslateErrorEvent, TranslatedEvent,
};

/// One successfully translated post.
#[derive(Debug, Clone, Serialize)]
pub struct TranslatedPost {
    pub post_id: String,
    #[serde(flatten)]
    pub translation: Translation,
}

/// One failed post.
#[derive(Debug, Clone, Serialize)]
pub struct PostFailure {
    pub post_id: String,
    pub error: String,
}

/// Full outcome of one translation run. Every processed post id appears in
/// exactly one of `translated` / `errors`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranslateRunResult {
    /// Posts actually processed (equals the input size unless aborted)
    pub attempted: usize,
    pub translated: Vec<TranslatedPost>,
    pub errors: Vec<PostFailure>,
    pub aborted: bool,
}

/// Count-only view of a run, used as the `done` event payload.
#[derive(Debug, Clone, Serialize)]
pub struct TranslateSummary {
    pub attempted: usize,
    pub translated: usize,
    pub failed: usize,
}

impl TranslateRunResult {
    pub fn summary(&self) -> TranslateSummary {
        TranslateSummary {
            attempted: self.attempted,
            translated: self.translated.len(),
            failed: self.errors.len(),
        }
    }
}

pub struct TranslationOrchestrator {
    translator: Arc<dyn Translator>,
    store: Arc<dyn PostStore>,
    concurrency: usize,
}

impl TranslationOrchestrator {
    pub fn new(
        translator: Arc<dyn Translator>,
        store: Arc<dyn PostStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            translator,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Translate a batch of posts in waves of at most `concurrency`.
    ///
    /// Events, when a sink is given, follow input order within each wave
    /// regardless of completion order. The cancel flag is checked before
    /// each wave only.
    pub async fn run_batch(
        &self,
        owner_id: i64,
        posts: &[Post],
        events: Option<&EventSink>,
        cancel: &CancelFlag,
    ) -> Result<TranslateRunResult> {
        let total = posts.len();
        let mut result = TranslateRunResult::default();
        let mut current = 0usize;

        for wave in posts.chunks(self.concurrency) {
            if cancel.is_cancelled() {
                result.aborted = true;
                info!(processed = current, total, "Translation run cancelled");
                break;
            }

            let outcomes =
                future::join_all(wave.iter().map(|post| self.translate_and_store(post))).await;

            for (post, outcome) in wave.iter().zip(outcomes) {
                current += 1;
                match outcome {
                    Ok(translation) => {
                        if let Some(sink) = events {
                            sink.emit(ProgressEvent::Translated(TranslatedEvent {
                                post_id: post.id.clone(),
                                translated_text: translation.translated_text.clone(),
                                comment_text: translation.comment_text.clone(),
                                quoted_translated_text: translation
                                    .quoted_translated_text
                                    .clone(),
                                current,
                                total,
                            }));
                        }
                        result.translated.push(TranslatedPost {
                            post_id: post.id.clone(),
                            translation,
                        });
                    }
                    Err(e) => {
                        warn!(post_id = %post.id, error = %e, "Translation failed");
                        let error = e.to_string();
                        if let Some(sink) = events {
                            sink.emit(ProgressEvent::TranslateError(TranslateErrorEvent {
                                post_id: post.id.clone(),
                                error: error.clone(),
                                current,
                                total,
                            }));
                        }
                        result.errors.push(PostFailure {
                            post_id: post.id.clone(),
                            error,
                        });
                    }
                }
            }
        }

        result.attempted = current;

        // The audit row is written even for cancelled runs, so history can
        // be reconstructed without replaying events.
        self.store
            .insert_translate_log(&TranslateLog {
                id: 0,
                owner_id,
                attempted: result.attempted as i64,
                translated: result.translated.len() as i64,
                failed: result.errors.len() as i64,
                aborted: result.aborted,
                errors: result
                    .errors
                    .iter()
                    .map(|f| format!("post {}: {}", f.post_id, f.error))
                    .collect(),
                created_at: String::new(),
            })
            .await?;

        if !result.aborted {
            if let Some(sink) = events {
                sink.emit(ProgressEvent::TranslateDone(result.summary()));
            }
        }

        Ok(result)
    }

    /// Ad-hoc single-post mode: translate one post and persist the result.
    pub async fn translate_one(&self, post: &Post) -> Result<Translation> {
        self.translate_and_store(post).await
    }

    /// Translate one post and write the result back immediately on success.
    async fn translate_and_store(&self, post: &Post) -> Result<Translation> {
        let translation = self
            .translator
            .translate(&post.text, post.quoted_text.as_deref())
            .await?;

        self.store
            .update_translation(
                post.tracked_account_id,
                &post.id,
                &translation.translated_text,
                &translation.comment_text,
                translation.quoted_translated_text.as_deref(),
            )
            .await?;

        Ok(translation)
    }
}
