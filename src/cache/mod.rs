//! Disk completion cache
//!
//! Content-addressed store mapping a fingerprint of everything that
//! affects a generation (message list, model, sampling knobs) to the text
//! it produced. A hit replays the stored text verbatim without contacting
//! the remote model.
//!
//! The cache is strictly best-effort: unreadable or corrupt entries are
//! treated as misses and a failed write only logs a warning. There is no
//! eviction; entries persist until the user deletes the directory.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::errors::ShaiError;
use crate::llm::{Message, SamplingParams};

/// Deterministic digest over the ordered tuple of generation-affecting
/// inputs. Any change to any message, the model name, or a sampling
/// parameter changes the fingerprint.
pub fn fingerprint(messages: &[Message], params: &SamplingParams) -> String {
    let mut hasher = Sha256::new();
    // canonical JSON of the full request tuple; field order is fixed by
    // the struct definitions
    let encoded = serde_json::to_vec(&(messages, params)).expect("request types serialize");
    hasher.update(&encoded);
    hex::encode(hasher.finalize())
}

pub struct CompletionCache {
    cache_dir: PathBuf,
}

impl CompletionCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Resolve a generation through the cache.
    ///
    /// With `use_cache` false this is a pure pass-through: `compute` runs
    /// and the cache is neither read nor written. Otherwise a hit returns
    /// the stored text without invoking `compute`; a miss runs `compute`,
    /// stores the result under `fingerprint`, and returns it.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &str,
        use_cache: bool,
        compute: F,
    ) -> Result<String, ShaiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ShaiError>>,
    {
        if !use_cache {
            return compute().await;
        }

        if let Some(text) = self.lookup(fingerprint) {
            tracing::debug!(%fingerprint, "cache hit");
            return Ok(text);
        }

        let text = compute().await?;
        self.store(fingerprint, &text);
        Ok(text)
    }

    fn lookup(&self, fingerprint: &str) -> Option<String> {
        let path = self.cache_dir.join(fingerprint);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                // corrupt or unreadable entry: recompute instead of failing
                tracing::debug!(%fingerprint, error = %e, "cache entry unreadable, treating as miss");
                None
            }
        }
    }

    fn store(&self, fingerprint: &str, text: &str) {
        if let Err(e) = self.write_entry(fingerprint, text) {
            tracing::warn!(%fingerprint, error = %e, "failed to write cache entry");
        }
    }

    /// Atomic write through a temp file so a crash never leaves a
    /// half-written entry behind.
    fn write_entry(&self, fingerprint: &str, text: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.cache_dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.persist(self.cache_dir.join(fingerprint))
            .map_err(|e| e.error)?;
        Ok(())
    }
}
