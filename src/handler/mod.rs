//! Completion handler
//!
//! Orchestrates one generation end to end: resolve the message list from
//! the role and any prior session history, consult the disk cache, call
//! the remote boundary (streaming chunks to stdout as they arrive), and
//! commit the user/assistant exchange to the session store.
//!
//! The commit is two-phase: the user message only exists in the pending
//! message list until the remote call (or cache hit) succeeds, so a
//! failed generation leaves the session exactly as it was.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::{self, CompletionCache};
use crate::errors::ShaiError;
use crate::llm::{CompletionBackend, Message, Role, SamplingParams};
use crate::role::Role as SystemRole;
use crate::session::SessionStore;

pub struct CompletionHandler<'a> {
    backend: &'a dyn CompletionBackend,
    sessions: &'a mut SessionStore,
    cache: &'a CompletionCache,
}

impl<'a> CompletionHandler<'a> {
    pub fn new(
        backend: &'a dyn CompletionBackend,
        sessions: &'a mut SessionStore,
        cache: &'a CompletionCache,
    ) -> Self {
        Self {
            backend,
            sessions,
            cache,
        }
    }

    /// Run one generation and return the full text.
    ///
    /// Output is echoed to stdout: incrementally while streaming, or in
    /// one piece on a cache hit. When `chat_id` is given, the user and
    /// assistant messages are committed together after success; on
    /// failure nothing is appended.
    pub async fn handle(
        &mut self,
        prompt: &str,
        image_url: Option<&str>,
        role: &SystemRole,
        params: &SamplingParams,
        chat_id: Option<&str>,
        use_cache: bool,
    ) -> Result<String, ShaiError> {
        let mut messages = match chat_id {
            Some(id) => self.sessions.load(id)?,
            None => Vec::new(),
        };

        // first turn of a session gets the role's system instruction
        if !messages.iter().any(|m| m.role == Role::System) {
            messages.insert(0, Message::system(&role.role_text));
        }

        let user = match image_url {
            Some(url) => Message::user_with_image(prompt, url),
            None => Message::user(prompt),
        };
        messages.push(user.clone());

        let fingerprint = cache::fingerprint(&messages, params);
        let streamed = AtomicBool::new(false);

        let backend = self.backend;
        let pending = &messages;
        let streamed_flag = &streamed;
        let full_text = self
            .cache
            .get_or_compute(&fingerprint, use_cache, move || async move {
                streamed_flag.store(true, Ordering::SeqCst);
                backend
                    .complete(pending, params, &|chunk| {
                        print!("{chunk}");
                        let _ = std::io::stdout().flush();
                    })
                    .await
            })
            .await?;

        // a cache hit produced no stream, so echo the replayed text once
        if !streamed.load(Ordering::SeqCst) {
            print!("{full_text}");
        }
        if !full_text.ends_with('\n') {
            println!();
        }
        let _ = std::io::stdout().flush();

        if let Some(id) = chat_id {
            self.sessions
                .append_exchange(id, user, Message::assistant(full_text.clone()))?;
        }

        Ok(full_text)
    }
}
