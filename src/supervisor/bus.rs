//! Supervisor event bus — typed messages between channels, timers and the
//! command-handling path.
//!
//! Every producer (PTY channel, transcript feed, timer service) holds a
//! cloneable [`BusHandle`].  The supervisor owns the single receiver, so all
//! messages are handled one at a time in arrival order.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::subsystems::host::SpeechEvent;
use crate::subsystems::timer::ScheduleId;

/// JSON-RPC style code: no handler owns the method.
pub const ERR_METHOD_NOT_FOUND: i32 = -32601;
/// JSON-RPC style code: payload does not fit the method.
pub const ERR_BAD_REQUEST: i32 = -32600;

/// Error returned by a handler in place of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bus error {code}: {message}")]
pub struct BusError {
    pub code: i32,
    pub message: String,
}

impl BusError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Transport failure while talking to the supervisor.
#[derive(Debug, Error)]
pub enum BusCallError {
    #[error("supervisor bus closed")]
    Closed,
    #[error("supervisor bus full")]
    Full,
    #[error("supervisor dropped the reply")]
    NoReply,
}

/// Where an utterance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// A submitted line of text.
    Text,
    /// A finished speech transcript.
    Voice,
}

/// Message bodies carried over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusPayload {
    /// Raw user input from a channel.
    Utterance {
        channel_id: String,
        source: InputSource,
        content: String,
    },
    /// Engine response; `None` when the input was ignored (blank).
    Reply { text: Option<String> },
    /// Speech capture lifecycle event.
    Speech(SpeechEvent),
    /// A scheduled timer came due.
    Timer(ScheduleId),
    Empty,
}

pub type BusResult = Result<BusPayload, BusError>;

pub enum BusMessage {
    Request {
        method: String,
        payload: BusPayload,
        reply_tx: oneshot::Sender<BusResult>,
    },
    Notification {
        method: String,
        payload: BusPayload,
    },
}

/// Cloneable producer side of the bus.
#[derive(Clone)]
pub struct BusHandle {
    tx: mpsc::Sender<BusMessage>,
}

impl BusHandle {
    /// Send a request and await the handler's result.
    pub async fn request(
        &self,
        method: &str,
        payload: BusPayload,
    ) -> Result<BusResult, BusCallError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BusMessage::Request {
                method: method.to_string(),
                payload,
                reply_tx,
            })
            .await
            .map_err(|_| BusCallError::Closed)?;
        reply_rx.await.map_err(|_| BusCallError::NoReply)
    }

    /// Fire-and-forget notification. Never waits; fails when the bus is full.
    pub fn notify(&self, method: &str, payload: BusPayload) -> Result<(), BusCallError> {
        self.tx
            .try_send(BusMessage::Notification {
                method: method.to_string(),
                payload,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => BusCallError::Full,
                mpsc::error::TrySendError::Closed(_) => BusCallError::Closed,
            })
    }

    /// Notification that waits for buffer space instead of failing.
    pub async fn publish(&self, method: &str, payload: BusPayload) -> Result<(), BusCallError> {
        self.tx
            .send(BusMessage::Notification {
                method: method.to_string(),
                payload,
            })
            .await
            .map_err(|_| BusCallError::Closed)
    }
}

/// Owns the supervisor-side channel end plus the handle template.
pub struct SupervisorBus {
    pub handle: BusHandle,
    pub rx: mpsc::Receiver<BusMessage>,
}

impl SupervisorBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        Self {
            handle: BusHandle { tx },
            rx,
        }
    }
}
