//! Chat history — capped JSON transcript of rendered messages.
//!
//! One file per work dir, `jarvis_chat_history.json`, holding a JSON array of
//! `{ sender, text, timestamp }` objects.  Capped by entry count (FIFO —
//! oldest dropped first).  A file that does not parse is discarded on load.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::AppError;
use crate::subsystems::host::ChatMessage;

/// Storage identifier; also the file stem.
pub const STORAGE_KEY: &str = "jarvis_chat_history";

pub struct ChatHistory {
    path: PathBuf,
    cap: usize,
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    /// Load history from `dir`, starting empty when the file is missing or
    /// corrupt.  Corrupt files are removed.
    pub fn load(dir: &Path, cap: usize) -> Self {
        let path = dir.join(format!("{STORAGE_KEY}.json"));
        let messages = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<Vec<ChatMessage>>(&data) {
                Ok(mut messages) => {
                    trim_front(&mut messages, cap);
                    debug!(path = %path.display(), count = messages.len(), "chat history loaded");
                    messages
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding corrupt chat history");
                    if let Err(e) = fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %e, "cannot remove corrupt chat history");
                    }
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, cap, messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one message and write the whole capped list back.
    pub fn append(&mut self, message: ChatMessage) -> Result<(), AppError> {
        self.messages.push(message);
        trim_front(&mut self.messages, self.cap);
        self.save()
    }

    fn save(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::History(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let data = serde_json::to_string(&self.messages)
            .map_err(|e| AppError::History(format!("serialise history: {e}")))?;
        fs::write(&self.path, data)
            .map_err(|e| AppError::History(format!("cannot write {}: {e}", self.path.display())))
    }
}

fn trim_front(messages: &mut Vec<ChatMessage>, cap: usize) {
    if messages.len() > cap {
        let excess = messages.len() - cap;
        messages.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::host::Sender;
    use tempfile::TempDir;

    fn msg(sender: Sender, text: &str) -> ChatMessage {
        ChatMessage {
            sender,
            text: text.into(),
            timestamp: "2026-10-16T09:00:00+00:00".into(),
        }
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let h = ChatHistory::load(dir.path(), 10);
        assert!(h.messages().is_empty());
    }

    #[test]
    fn append_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let mut h = ChatHistory::load(dir.path(), 10);
        h.append(msg(Sender::User, "hi jarvis")).unwrap();
        h.append(msg(Sender::Bot, "Jarvis activated! How can I help you?")).unwrap();

        let reloaded = ChatHistory::load(dir.path(), 10);
        assert_eq!(reloaded.messages().len(), 2);
        assert_eq!(reloaded.messages()[0].sender, Sender::User);
        assert_eq!(reloaded.messages()[1].text, "Jarvis activated! How can I help you?");

        let raw = fs::read_to_string(reloaded.path()).unwrap();
        assert!(raw.contains("\"sender\":\"bot\""));
    }

    #[test]
    fn cap_drops_oldest() {
        let dir = TempDir::new().unwrap();
        let mut h = ChatHistory::load(dir.path(), 2);
        for text in ["one", "two", "three"] {
            h.append(msg(Sender::User, text)).unwrap();
        }
        let texts: Vec<_> = h.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[test]
    fn corrupt_file_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("{STORAGE_KEY}.json"));
        fs::write(&path, "{not json").unwrap();

        let h = ChatHistory::load(dir.path(), 10);
        assert!(h.messages().is_empty());
        assert!(!path.exists());
    }
}
