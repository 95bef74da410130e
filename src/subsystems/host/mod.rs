//! Host collaborator ports — the I/O edges the engine talks to.
//!
//! The engine never touches a browser, a microphone, a speaker or the wall
//! clock directly.  Each of those is a trait here, with concrete adapters in
//! the sibling modules and small test doubles next to the tests that need
//! them.

pub mod chat;
pub mod clock;
pub mod speech;
pub mod window;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use chat::ConsoleChat;
pub use clock::SystemClock;
pub use speech::{CommandSpeaker, SilentSpeaker};
pub use window::{HeadlessWindows, LauncherWindows};

// ── Window manager ────────────────────────────────────────────────────────────

/// Opaque handle issued by a [`WindowManager`] for one opened window/tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

pub trait WindowManager: Send {
    /// Open `url`; `None` when the host refuses (blocked, launcher missing…).
    fn open(&mut self, url: &str) -> Option<WindowHandle>;
    fn close(&mut self, handle: WindowHandle);
    fn is_closed(&mut self, handle: WindowHandle) -> bool;
}

// ── Speech ────────────────────────────────────────────────────────────────────

/// Lifecycle events emitted by a speech input provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Started,
    Ended,
    /// A finished transcript.
    Result(String),
    /// Provider-specific error kind (`"no-speech"`, `"not-allowed"`, …).
    Error(String),
}

/// Control side of a speech capture provider.  Events flow back over the
/// bus as [`SpeechEvent`]s.
pub trait SpeechInput: Send {
    fn start(&mut self) -> Result<(), AppError>;
    fn stop(&mut self);
}

/// Fire-and-forget speech synthesis.
pub trait SpeechOutput: Send {
    fn speak(&self, text: &str);
}

// ── Chat ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One rendered chat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: String,
}

/// Text output: chat transcript plus a single status banner slot.
pub trait ChatRenderer: Send {
    fn render(&mut self, message: &ChatMessage);
    fn show_banner(&mut self, text: &str);
    fn clear_banner(&mut self);
}

// ── Clock ─────────────────────────────────────────────────────────────────────

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
    /// Display name of the zone `now()` is expressed in.
    fn zone_name(&self) -> String;
}
