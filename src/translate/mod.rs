// Translation layer — prompt construction, the AI completion client, and
// response parsing.

pub mod client;
pub mod parser;
pub mod prompt;
pub mod traits;

pub use client::AiTranslator;
pub use traits::{Translation, Translator};
