//! Speech output adapters.
//!
//! Speech input has no adapter here: the transcript feed in the comms
//! subsystem provides it (see `comms::transcript`).

use std::process::Stdio;

use tracing::{debug, warn};

use super::SpeechOutput;

/// Speaks by spawning `<command> <text>` (e.g. `espeak`, `say`).
///
/// The child is detached; tokio reaps it in the background once it exits.
/// Must be called from within a tokio runtime.
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }
}

impl SpeechOutput for CommandSpeaker {
    fn speak(&self, text: &str) {
        let spawned = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(_child) => debug!(program = %self.program, chars = text.len(), "speaking"),
            Err(e) => warn!(program = %self.program, error = %e, "tts command failed"),
        }
    }
}

/// Speaker that only logs what would have been said.
pub struct SilentSpeaker;

impl SpeechOutput for SilentSpeaker {
    fn speak(&self, text: &str) {
        debug!(%text, "speech output (silent)");
    }
}
