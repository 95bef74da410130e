//! Comms subsystem — manages the external input channels.
//!
//! # Architecture
//!
//! Each channel (PTY console, speech transcript feed) implements
//! [`Component`] and is spawned as an independent task by [`start`] via
//! [`spawn_components`].  Channels capture their shared
//! [`Arc<CommsState>`] at construction time.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events).  It is drained in a short-lived
//! background task that dies once all channel senders are dropped.
//!
//! # Starting
//!
//! [`start`] is synchronous — it returns as soon as the tasks are spawned.
//! The speech feed's control side is handed back so the engine can own it.

mod state;
#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-transcript")]
pub mod transcript;

pub use state::{CommsEvent, CommsState};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::subsystems::host::SpeechInput;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};
use crate::supervisor::bus::BusHandle;

/// Running comms channels plus the speech capture control, if any.
pub struct CommsHandle {
    pub channels: SubsystemHandle,
    pub speech_input: Option<Box<dyn SpeechInput>>,
    /// Channel ids that were loaded, for the startup summary.
    pub loaded: Vec<String>,
}

/// Spawn all configured comms channels.
///
/// If any channel exits with an error the shared `shutdown` token is
/// cancelled so siblings stop cooperatively.
pub fn start(config: &Config, bus: BusHandle, shutdown: CancellationToken) -> CommsHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(bus, event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();
    let mut speech_input: Option<Box<dyn SpeechInput>> = None;

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new("pty0", state.clone())));
        }
    }

    #[cfg(feature = "channel-transcript")]
    {
        if let Some(source) = config.speech.transcript_source.clone() {
            info!(source = %source.display(), "loading transcript feed");
            let (feed, control) = transcript::TranscriptFeed::new("voice0", source, state.clone());
            components.push(Box::new(feed));
            speech_input = Some(Box::new(control));
        }
    }

    #[cfg(not(feature = "channel-transcript"))]
    if config.speech_feed_should_load() {
        warn!("speech.transcript_source configured but channel-transcript is not compiled in");
    }

    if components.is_empty() {
        warn!("no comms channels configured — nothing to listen to");
    }

    let loaded = components.iter().map(|c| c.id().to_string()).collect();

    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
                CommsEvent::CaptureOpened { ref channel_id } => {
                    debug!(channel_id, "speech capture opened");
                }
            }
        }
    });

    CommsHandle {
        channels: spawn_components(components, shutdown),
        speech_input,
        loaded,
    }
}
