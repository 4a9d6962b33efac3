//! Chat session store
//!
//! One JSON file per durable chat id, holding the ordered message log.
//! The id "temp" is a sentinel for a throwaway session that lives only in
//! process memory: it is never written to disk, never shows up in
//! `list_ids`, and vanishes when the process exits.
//!
//! Appends are the only mutation apart from an explicit `clear`. There is
//! no cross-process locking; concurrent writers to the same chat id are
//! last-writer-wins by design (one interactive user per id).

use std::path::PathBuf;

use crate::errors::ShaiError;
use crate::llm::Message;

/// Sentinel chat id for the in-memory session.
pub const TEMP_CHAT_ID: &str = "temp";

pub struct SessionStore {
    sessions_dir: PathBuf,
    temp: Vec<Message>,
}

impl SessionStore {
    /// Open the store. An inaccessible session directory is fatal.
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Result<Self, ShaiError> {
        let sessions_dir = sessions_dir.into();
        std::fs::create_dir_all(&sessions_dir)
            .map_err(|e| ShaiError::Storage(format!("cannot create session directory: {e}")))?;
        Ok(Self {
            sessions_dir,
            temp: Vec::new(),
        })
    }

    /// Ordered message log for a chat id; empty if the id is unseen.
    pub fn load(&self, chat_id: &str) -> Result<Vec<Message>, ShaiError> {
        if chat_id == TEMP_CHAT_ID {
            return Ok(self.temp.clone());
        }
        validate_chat_id(chat_id)?;

        let path = self.session_path(chat_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ShaiError::Storage(format!("cannot read chat '{chat_id}': {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| ShaiError::Storage(format!("chat '{chat_id}' is corrupt: {e}")))
    }

    /// Append a single message to a session.
    pub fn append(&mut self, chat_id: &str, message: Message) -> Result<(), ShaiError> {
        self.append_all(chat_id, vec![message])
    }

    /// Commit a user/assistant exchange as one append, so a failed
    /// generation never leaves a dangling user turn behind.
    pub fn append_exchange(
        &mut self,
        chat_id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<(), ShaiError> {
        self.append_all(chat_id, vec![user, assistant])
    }

    fn append_all(&mut self, chat_id: &str, messages: Vec<Message>) -> Result<(), ShaiError> {
        if chat_id == TEMP_CHAT_ID {
            self.temp.extend(messages);
            return Ok(());
        }
        validate_chat_id(chat_id)?;

        let mut log = self.load(chat_id)?;
        log.extend(messages);
        let content =
            serde_json::to_string_pretty(&log).map_err(|e| ShaiError::Storage(e.to_string()))?;
        std::fs::write(self.session_path(chat_id), content)
            .map_err(|e| ShaiError::Storage(format!("cannot write chat '{chat_id}': {e}")))?;
        Ok(())
    }

    /// Drop every message of a session.
    pub fn clear(&mut self, chat_id: &str) -> Result<(), ShaiError> {
        if chat_id == TEMP_CHAT_ID {
            self.temp.clear();
            return Ok(());
        }
        validate_chat_id(chat_id)?;

        let path = self.session_path(chat_id);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| ShaiError::Storage(format!("cannot clear chat '{chat_id}': {e}")))?;
        }
        Ok(())
    }

    /// All durable chat ids, sorted. The temp session never appears.
    pub fn list_ids(&self) -> Result<Vec<String>, ShaiError> {
        let entries = std::fs::read_dir(&self.sessions_dir)
            .map_err(|e| ShaiError::Storage(format!("cannot read session directory: {e}")))?;

        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    ids.push(stem.to_string_lossy().to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn exists(&self, chat_id: &str) -> bool {
        if chat_id == TEMP_CHAT_ID {
            return !self.temp.is_empty();
        }
        self.session_path(chat_id).exists()
    }

    fn session_path(&self, chat_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{chat_id}.json"))
    }
}

fn validate_chat_id(chat_id: &str) -> Result<(), ShaiError> {
    let ok = !chat_id.is_empty()
        && chat_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(ShaiError::Configuration(format!(
            "invalid chat id '{chat_id}': use letters, digits, '-', '_' and '.'"
        )))
    }
}
