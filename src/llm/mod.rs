//! Remote completion boundary
//!
//! The rest of the crate talks to the model through [`CompletionBackend`];
//! the production implementation targets OpenAI-compatible chat
//! completions endpoints. Tests substitute scripted backends.

mod openai;
pub mod streaming;
mod types;

pub use openai::OpenAiBackend;
pub use types::*;

use async_trait::async_trait;

use crate::errors::ShaiError;

/// Callback invoked for each incremental text chunk as it arrives.
pub type ChunkCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A remote completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Run one generation to completion.
    ///
    /// `on_chunk` is invoked for every incremental text delta; the
    /// concatenation of all deltas is returned once the stream is
    /// exhausted. The call blocks (asynchronously) until the stream ends
    /// or fails; nothing runs in the background afterwards.
    async fn complete(
        &self,
        messages: &[Message],
        params: &SamplingParams,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<String, ShaiError>;
}
