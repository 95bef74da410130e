//! Speech transcript feed — the speech input provider.
//!
//! Reads finished transcripts, one per line, from a file-like source (a FIFO
//! written by an external recognizer, a log being tailed, a test fixture).
//! Each line becomes a [`SpeechEvent::Result`]; opening the source emits
//! `Started`, end of stream or an explicit stop emits `Ended`, and failures
//! emit `Error(kind)`.
//!
//! Capture is controlled through [`FeedControl`], the engine's
//! [`SpeechInput`]: nothing is read until `start()` is called, and after the
//! stream ends the feed waits for the next `start()`.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{CommsEvent, CommsState};
use crate::error::AppError;
use crate::subsystems::host::{SpeechEvent, SpeechInput};
use crate::subsystems::runtime::{Component, ComponentFuture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCommand {
    Start,
    Stop,
}

/// Engine-side control of the transcript feed.
pub struct FeedControl {
    cmd_tx: mpsc::Sender<FeedCommand>,
}

impl SpeechInput for FeedControl {
    fn start(&mut self) -> Result<(), AppError> {
        self.cmd_tx
            .try_send(FeedCommand::Start)
            .map_err(|e| AppError::Speech(format!("transcript feed unavailable: {e}")))
    }

    fn stop(&mut self) {
        if let Err(e) = self.cmd_tx.try_send(FeedCommand::Stop) {
            debug!(error = %e, "transcript feed stop not delivered");
        }
    }
}

pub struct TranscriptFeed {
    channel_id: String,
    source: PathBuf,
    state: Arc<CommsState>,
    cmd_rx: mpsc::Receiver<FeedCommand>,
}

impl TranscriptFeed {
    pub fn new(
        channel_id: impl Into<String>,
        source: PathBuf,
        state: Arc<CommsState>,
    ) -> (Self, FeedControl) {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let feed = Self {
            channel_id: channel_id.into(),
            source,
            state,
            cmd_rx,
        };
        (feed, FeedControl { cmd_tx })
    }
}

impl Component for TranscriptFeed {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin((*self).run_feed(shutdown))
    }
}

/// Map an open failure onto the recognizer-style error kinds the engine
/// understands.
fn error_kind(e: &std::io::Error) -> String {
    match e.kind() {
        ErrorKind::NotFound => "audio-capture".to_string(),
        ErrorKind::PermissionDenied => "not-allowed".to_string(),
        _ => format!("io: {e}"),
    }
}

enum Next {
    Idle,
    Exit,
}

impl TranscriptFeed {
    async fn run_feed(mut self, shutdown: CancellationToken) -> Result<(), AppError> {
        info!(channel_id = %self.channel_id, source = %self.source.display(), "transcript feed ready");

        loop {
            // Idle: wait for a start request.
            let cmd = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                cmd = self.cmd_rx.recv() => cmd,
            };
            match cmd {
                None => break,
                Some(FeedCommand::Stop) => continue,
                Some(FeedCommand::Start) => {}
            }

            let opened = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                opened = File::open(&self.source) => opened,
            };

            let file = match opened {
                Ok(file) => file,
                Err(e) => {
                    warn!(source = %self.source.display(), error = %e, "transcript source unavailable");
                    if self.emit(SpeechEvent::Error(error_kind(&e))).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            if self.emit(SpeechEvent::Started).await.is_err() {
                break;
            }
            self.state.report_event(CommsEvent::CaptureOpened {
                channel_id: self.channel_id.clone(),
            });

            match self.capture(BufReader::new(file).lines(), &shutdown).await {
                Next::Idle => {}
                Next::Exit => break,
            }
        }

        self.state.report_event(CommsEvent::ChannelShutdown {
            channel_id: self.channel_id.clone(),
        });
        Ok(())
    }

    /// Stream lines until the source ends, a stop arrives, or shutdown.
    async fn capture(&mut self, mut lines: Lines<BufReader<File>>, shutdown: &CancellationToken) -> Next {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => return Next::Exit,

                cmd = self.cmd_rx.recv() => match cmd {
                    None => return Next::Exit,
                    Some(FeedCommand::Start) => debug!("transcript feed already capturing"),
                    Some(FeedCommand::Stop) => {
                        return match self.emit(SpeechEvent::Ended).await {
                            Ok(()) => Next::Idle,
                            Err(_) => Next::Exit,
                        };
                    }
                },

                line = lines.next_line() => {
                    let event = match line {
                        Ok(Some(text)) => {
                            let text = text.trim();
                            if text.is_empty() {
                                continue;
                            }
                            SpeechEvent::Result(text.to_string())
                        }
                        Ok(None) => SpeechEvent::Ended,
                        Err(e) => SpeechEvent::Error(format!("io: {e}")),
                    };
                    let finished = !matches!(event, SpeechEvent::Result(_));
                    if self.emit(event).await.is_err() {
                        return Next::Exit;
                    }
                    if finished {
                        return Next::Idle;
                    }
                }
            }
        }
    }

    async fn emit(&self, event: SpeechEvent) -> Result<(), AppError> {
        debug!(?event, "speech event");
        self.state.publish_speech(event).await.inspect_err(|e| {
            warn!(error = %e, "speech event not delivered, transcript feed exiting");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::bus::{BusMessage, BusPayload, SupervisorBus};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    async fn next_event(rx: &mut mpsc::Receiver<BusMessage>) -> SpeechEvent {
        let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout waiting for speech event")
            .expect("bus closed");
        match msg {
            BusMessage::Notification { method, payload: BusPayload::Speech(ev) } => {
                assert_eq!(method, "assistant/speech");
                ev
            }
            _ => panic!("expected speech notification"),
        }
    }

    #[tokio::test]
    async fn lines_become_results_then_ended() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "hi jarvis").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "  What time is it  ").unwrap();
        f.flush().unwrap();

        let bus = SupervisorBus::new(16);
        let mut rx = bus.rx;
        let (event_tx, _event_rx) = mpsc::channel(8);
        let state = Arc::new(CommsState::new(bus.handle.clone(), event_tx));
        let (feed, mut control) = TranscriptFeed::new("voice0", f.path().to_path_buf(), state);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(Box::new(feed).run(shutdown.clone()));

        control.start().unwrap();
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Started);
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Result("hi jarvis".into()));
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Result("What time is it".into()));
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Ended);

        // Restart re-reads from the top.
        control.start().unwrap();
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Started);

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn missing_source_reports_audio_capture() {
        let bus = SupervisorBus::new(16);
        let mut rx = bus.rx;
        let (event_tx, _event_rx) = mpsc::channel(8);
        let state = Arc::new(CommsState::new(bus.handle.clone(), event_tx));
        let (feed, mut control) =
            TranscriptFeed::new("voice0", PathBuf::from("/nonexistent/jarvis.fifo"), state);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(Box::new(feed).run(shutdown.clone()));

        control.start().unwrap();
        assert_eq!(next_event(&mut rx).await, SpeechEvent::Error("audio-capture".into()));

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }

    #[test]
    fn start_fails_once_feed_is_gone() {
        let bus = SupervisorBus::new(1);
        let (event_tx, _event_rx) = mpsc::channel(1);
        let state = Arc::new(CommsState::new(bus.handle.clone(), event_tx));
        let (feed, mut control) = TranscriptFeed::new("voice0", PathBuf::from("x"), state);
        drop(feed);
        assert!(control.start().is_err());
    }
}
