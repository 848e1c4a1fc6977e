// Pipelines — the fetch and translation orchestrators plus the progress
// event stream they share.

pub mod fetch;
pub mod progress;
pub mod translate;

pub use fetch::{FetchOrchestrator, FetchRunResult};
pub use progress::{CancelFlag, EventSink, ProgressEvent};
pub use translate::{TranslateRunResult, TranslationOrchestrator};
