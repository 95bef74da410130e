//! Shared state for the Comms subsystem — capability boundary for channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below.  The raw [`BusHandle`] is private; channels cannot call
//! arbitrary bus methods.

use tokio::sync::mpsc;
use tracing::warn;

use crate::error::AppError;
use crate::subsystems::assistant::{METHOD_INPUT, METHOD_SPEECH};
use crate::subsystems::host::SpeechEvent;
use crate::supervisor::bus::{BusHandle, BusPayload, InputSource};

/// Events a channel sends back to the comms subsystem manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
    /// The transcript feed (re)opened its source.
    CaptureOpened { channel_id: String },
}

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    bus: BusHandle,
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(bus: BusHandle, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        Self { bus, event_tx }
    }

    /// Submit one line of user input and await the engine's response text.
    ///
    /// `Ok(None)` means the engine ignored the input (blank line).
    pub async fn send_message(
        &self,
        channel_id: &str,
        source: InputSource,
        content: String,
    ) -> Result<Option<String>, AppError> {
        let payload = BusPayload::Utterance {
            channel_id: channel_id.to_string(),
            source,
            content,
        };

        match self.bus.request(METHOD_INPUT, payload).await {
            Err(e) => Err(AppError::Comms(format!("bus error: {e}"))),
            Ok(Err(e)) => Err(AppError::Comms(format!(
                "assistant error {}: {}",
                e.code, e.message
            ))),
            Ok(Ok(BusPayload::Reply { text })) => Ok(text),
            Ok(Ok(_)) => Err(AppError::Comms("unexpected reply payload".to_string())),
        }
    }

    /// Forward a speech capture lifecycle event to the engine.
    pub async fn publish_speech(&self, event: SpeechEvent) -> Result<(), AppError> {
        self.bus
            .publish(METHOD_SPEECH, BusPayload::Speech(event))
            .await
            .map_err(|e| AppError::Comms(format!("bus error: {e}")))
    }

    /// Report an event to the comms subsystem manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up or has already exited.
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
