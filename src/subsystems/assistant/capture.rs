//! Speech capture lifecycle.
//!
//! Keeps the microphone feed cycling while the assistant waits for its wake
//! word: every `Ended`/`Error` schedules a restart after a fixed delay, and
//! the restart only goes through when the assistant is still inactive and
//! nothing is listening.

use std::time::Duration;

use tracing::{debug, warn};

use crate::subsystems::host::{ChatRenderer, SpeechInput};
use crate::subsystems::timer::{ScheduleId, TimerHandle};

pub const NOT_INITIALIZED: &str = "Voice recognition is not initialized.";
pub const START_FAILED: &str = "Error starting voice recognition. Please try again.";

/// Classified capture failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorKind {
    NotAllowed,
    NoSpeech,
    AudioCapture,
    Other(String),
}

impl CaptureErrorKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "not-allowed" | "denied" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            other => Self::Other(other.to_string()),
        }
    }

    /// User-visible banner text.
    pub fn banner(&self) -> String {
        match self {
            Self::NotAllowed => "Microphone access denied. Please allow microphone access in your browser settings.".to_string(),
            Self::NoSpeech => "No speech detected. Please try again.".to_string(),
            Self::AudioCapture => "No microphone found. Please check your microphone.".to_string(),
            Self::Other(kind) => format!("Voice recognition error: {kind}"),
        }
    }
}

pub struct CaptureController {
    input: Option<Box<dyn SpeechInput>>,
    listening: bool,
    restart_delay: Duration,
    pending_restart: Option<ScheduleId>,
}

impl CaptureController {
    pub fn new(input: Option<Box<dyn SpeechInput>>, restart_delay: Duration) -> Self {
        Self {
            input,
            listening: false,
            restart_delay,
            pending_restart: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Ask the provider to start unless it is already listening.
    pub fn start(&mut self, chat: &mut dyn ChatRenderer) {
        let Some(input) = self.input.as_mut() else {
            debug!("capture start requested without a provider");
            chat.show_banner(NOT_INITIALIZED);
            return;
        };
        if self.listening {
            debug!("capture already running");
            return;
        }
        match input.start() {
            Ok(()) => debug!("capture start requested"),
            Err(e) => {
                self.listening = false;
                warn!(error = %e, "capture failed to start");
                chat.show_banner(START_FAILED);
            }
        }
    }

    pub fn on_started(&mut self, chat: &mut dyn ChatRenderer) {
        debug!("capture started");
        self.listening = true;
        chat.clear_banner();
    }

    pub fn on_ended(&mut self, timers: &TimerHandle, restart_method: &str) {
        debug!("capture ended");
        self.listening = false;
        self.schedule_restart(timers, restart_method);
    }

    pub fn on_error(
        &mut self,
        kind: &str,
        chat: &mut dyn ChatRenderer,
        timers: &TimerHandle,
        restart_method: &str,
    ) {
        let kind = CaptureErrorKind::parse(kind);
        warn!(?kind, "capture error");
        self.listening = false;
        chat.show_banner(&kind.banner());
        self.schedule_restart(timers, restart_method);
    }

    /// A restart timer fired.  Stale ids are ignored.
    pub fn on_restart_due(&mut self, id: &ScheduleId, active: bool, chat: &mut dyn ChatRenderer) {
        if self.pending_restart.as_ref() != Some(id) {
            debug!(schedule_id = %id, "stale capture restart ignored");
            return;
        }
        self.pending_restart = None;
        if active {
            debug!("assistant active, capture restart skipped");
            return;
        }
        self.start(chat);
    }

    pub fn stop(&mut self, timers: &TimerHandle) {
        if let Some(id) = self.pending_restart.take() {
            timers.cancel(&id);
        }
        if let Some(input) = self.input.as_mut() {
            if self.listening {
                input.stop();
            }
        }
        self.listening = false;
    }

    fn schedule_restart(&mut self, timers: &TimerHandle, restart_method: &str) {
        if let Some(previous) = self.pending_restart.take() {
            timers.cancel(&previous);
        }
        match timers.schedule(self.restart_delay, restart_method) {
            Ok(id) => self.pending_restart = Some(id),
            Err(e) => warn!(error = %e, "capture restart not scheduled"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::error::AppError;
    use crate::subsystems::host::ChatMessage;
    use crate::subsystems::timer::{self, TimerCommand};

    #[derive(Default)]
    pub(crate) struct MicLog {
        pub starts: usize,
        pub stops: usize,
        pub fail: bool,
    }

    pub(crate) struct FakeMic(pub Arc<Mutex<MicLog>>);

    impl SpeechInput for FakeMic {
        fn start(&mut self) -> Result<(), AppError> {
            let mut log = self.0.lock().unwrap();
            if log.fail {
                return Err(AppError::Speech("busy".into()));
            }
            log.starts += 1;
            Ok(())
        }
        fn stop(&mut self) {
            self.0.lock().unwrap().stops += 1;
        }
    }

    #[derive(Default)]
    struct Banner(Option<String>);

    impl ChatRenderer for Banner {
        fn render(&mut self, _message: &ChatMessage) {}
        fn show_banner(&mut self, text: &str) {
            self.0 = Some(text.to_string());
        }
        fn clear_banner(&mut self) {
            self.0 = None;
        }
    }

    fn scheduled_id(rx: &mut tokio::sync::mpsc::Receiver<TimerCommand>) -> ScheduleId {
        match rx.try_recv().unwrap() {
            TimerCommand::Schedule { id, delay, .. } => {
                assert_eq!(delay, Duration::from_secs(1));
                id
            }
            other => panic!("expected schedule, got {other:?}"),
        }
    }

    #[test]
    fn error_kinds_and_banners() {
        assert_eq!(CaptureErrorKind::parse("denied"), CaptureErrorKind::NotAllowed);
        assert_eq!(
            CaptureErrorKind::parse("no-speech").banner(),
            "No speech detected. Please try again."
        );
        assert_eq!(
            CaptureErrorKind::parse("audio-capture").banner(),
            "No microphone found. Please check your microphone."
        );
        assert_eq!(
            CaptureErrorKind::parse("network").banner(),
            "Voice recognition error: network"
        );
    }

    #[test]
    fn missing_provider_shows_banner() {
        let mut capture = CaptureController::new(None, Duration::from_secs(1));
        let mut chat = Banner::default();
        capture.start(&mut chat);
        assert_eq!(chat.0.as_deref(), Some(NOT_INITIALIZED));
    }

    #[test]
    fn failed_start_shows_banner() {
        let log = Arc::new(Mutex::new(MicLog { fail: true, ..Default::default() }));
        let mut capture = CaptureController::new(Some(Box::new(FakeMic(log))), Duration::from_secs(1));
        let mut chat = Banner::default();
        capture.start(&mut chat);
        assert_eq!(chat.0.as_deref(), Some(START_FAILED));
        assert!(!capture.is_listening());
    }

    #[test]
    fn started_clears_banner_and_blocks_double_start() {
        let log = Arc::new(Mutex::new(MicLog::default()));
        let mut capture = CaptureController::new(Some(Box::new(FakeMic(log.clone()))), Duration::from_secs(1));
        let mut chat = Banner(Some("old".into()));
        capture.start(&mut chat);
        capture.on_started(&mut chat);
        capture.start(&mut chat);
        assert!(chat.0.is_none());
        assert_eq!(log.lock().unwrap().starts, 1);
    }

    #[test]
    fn error_restarts_only_while_inactive() {
        let log = Arc::new(Mutex::new(MicLog::default()));
        let mut capture = CaptureController::new(Some(Box::new(FakeMic(log.clone()))), Duration::from_secs(1));
        let (timers, mut rx) = timer::channel(8);
        let mut chat = Banner::default();

        capture.on_error("no-speech", &mut chat, &timers, "assistant/capture_restart");
        assert_eq!(chat.0.as_deref(), Some("No speech detected. Please try again."));
        let id = scheduled_id(&mut rx);
        capture.on_restart_due(&id, true, &mut chat);
        assert_eq!(log.lock().unwrap().starts, 0);

        capture.on_ended(&timers, "assistant/capture_restart");
        let id = scheduled_id(&mut rx);
        capture.on_restart_due(&ScheduleId("stale".into()), false, &mut chat);
        assert_eq!(log.lock().unwrap().starts, 0);
        capture.on_restart_due(&id, false, &mut chat);
        assert_eq!(log.lock().unwrap().starts, 1);
    }

    #[test]
    fn stop_cancels_pending_restart() {
        let log = Arc::new(Mutex::new(MicLog::default()));
        let mut capture = CaptureController::new(Some(Box::new(FakeMic(log.clone()))), Duration::from_secs(1));
        let (timers, mut rx) = timer::channel(8);
        let mut chat = Banner::default();
        capture.start(&mut chat);
        capture.on_started(&mut chat);
        capture.on_ended(&timers, "assistant/capture_restart");
        let id = scheduled_id(&mut rx);

        capture.stop(&timers);
        match rx.try_recv().unwrap() {
            TimerCommand::Cancel { id: cancelled } => assert_eq!(cancelled, id),
            other => panic!("expected cancel, got {other:?}"),
        }
        // Not listening after `Ended`, so no provider stop call.
        assert_eq!(log.lock().unwrap().stops, 0);
    }
}
