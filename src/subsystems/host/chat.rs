//! Console chat renderer with optional history persistence.

use std::io::Write as _;

use tracing::{info, warn};

use super::{ChatMessage, ChatRenderer, Sender};
use crate::subsystems::history::ChatHistory;

/// Prints chat lines to stdout and the banner to stderr.
pub struct ConsoleChat {
    bot_label: String,
    history: Option<ChatHistory>,
    banner: Option<String>,
}

impl ConsoleChat {
    pub fn new(bot_label: impl Into<String>, history: Option<ChatHistory>) -> Self {
        Self {
            bot_label: bot_label.into(),
            history,
            banner: None,
        }
    }

    /// Print every persisted message, oldest first.
    pub fn replay(&self) {
        let Some(history) = &self.history else { return };
        for message in history.messages() {
            println!("{}", self.line(message));
        }
    }

    fn line(&self, message: &ChatMessage) -> String {
        match message.sender {
            Sender::User => format!("You: {}", message.text),
            Sender::Bot => format!("{}: {}", self.bot_label, message.text),
        }
    }
}

impl ChatRenderer for ConsoleChat {
    fn render(&mut self, message: &ChatMessage) {
        println!("{}", self.line(message));
        let _ = std::io::stdout().flush();

        if let Some(history) = self.history.as_mut() {
            if let Err(e) = history.append(message.clone()) {
                warn!(error = %e, "chat history not saved");
            }
        }
    }

    fn show_banner(&mut self, text: &str) {
        if self.banner.as_deref() == Some(text) {
            return;
        }
        eprintln!("[voice] {text}");
        info!(banner = %text, "voice banner shown");
        self.banner = Some(text.to_string());
    }

    fn clear_banner(&mut self) {
        self.banner = None;
    }
}
