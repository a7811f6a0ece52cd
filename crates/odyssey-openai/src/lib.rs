//! OpenAI-compatible `CompletionProvider` adapter.

mod openai_provider;

pub use openai_provider::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiConfig, OpenAiError, OpenAiProvider,
};
