//! Assistant subsystem — the command interpretation engine.
//!
//! [`Assistant`] owns every piece of mutable assistant state (activation
//! flag, open sessions, capture lifecycle) together with its host
//! collaborators, and is registered with the supervisor as the `assistant`
//! bus handler.  Because the supervisor hands out `&mut self` from a single
//! task, utterances, speech events and timer firings are processed strictly
//! one at a time.
//!
//! # Bus methods
//!
//! | method                        | kind         | payload                  |
//! |-------------------------------|--------------|--------------------------|
//! | `assistant/input`             | request      | `Utterance` → `Reply`    |
//! | `assistant/speech`            | notification | `Speech(SpeechEvent)`    |
//! | `assistant/deactivate`        | notification | `Timer(id)`              |
//! | `assistant/capture_restart`   | notification | `Timer(id)`              |

pub mod activation;
pub mod calculator;
pub mod calendar;
pub mod capture;
pub mod router;
pub mod sessions;
pub mod websites;

use std::sync::Arc;
use std::time::Duration;

use chrono::SecondsFormat;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::subsystems::host::{
    ChatMessage, ChatRenderer, Clock, Sender, SpeechEvent, SpeechInput, SpeechOutput,
    WindowManager,
};
use crate::subsystems::timer::{ScheduleId, TimerHandle};
use crate::supervisor::bus::{
    BusError, BusPayload, BusResult, ERR_BAD_REQUEST, ERR_METHOD_NOT_FOUND, InputSource,
};
use crate::supervisor::dispatch::BusHandler;

use activation::{Activation, ActivationState, Gate};
use capture::CaptureController;
use router::{Intent, Router};
use sessions::SessionRegistry;

pub const METHOD_INPUT: &str = "assistant/input";
pub const METHOD_SPEECH: &str = "assistant/speech";
pub const METHOD_DEACTIVATE: &str = "assistant/deactivate";
pub const METHOD_CAPTURE_RESTART: &str = "assistant/capture_restart";

pub const ACTIVATED_REPLY: &str = "Jarvis activated! How can I help you?";
pub const PROMPT_REPLY: &str = "Say \"Hi Jarvis\" to activate me first.";
pub const DEACTIVATED_NOTICE: &str = "Jarvis deactivated. Say \"Jarvis\" to reactivate.";

/// One piece of user input, as typed or transcribed and in normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub raw: String,
    pub normalized: String,
}

impl Utterance {
    /// `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            normalized: raw.to_lowercase(),
        })
    }
}

/// Host-side pieces the engine drives.
pub struct Collaborators {
    pub windows: Box<dyn WindowManager>,
    pub speech_in: Option<Box<dyn SpeechInput>>,
    pub speech_out: Box<dyn SpeechOutput>,
    pub chat: Box<dyn ChatRenderer>,
    pub clock: Arc<dyn Clock>,
    pub timers: TimerHandle,
}

pub struct Assistant {
    activation: Activation,
    router: Router,
    sessions: SessionRegistry,
    capture: CaptureController,
    deactivate_delay: Duration,
    windows: Box<dyn WindowManager>,
    speech_out: Box<dyn SpeechOutput>,
    chat: Box<dyn ChatRenderer>,
    clock: Arc<dyn Clock>,
    timers: TimerHandle,
}

impl Assistant {
    pub fn new(config: &Config, parts: Collaborators) -> Self {
        Self {
            activation: Activation::new(&config.assistant.wake_word),
            router: Router::default(),
            sessions: SessionRegistry::new(),
            capture: CaptureController::new(parts.speech_in, config.speech.restart_delay),
            deactivate_delay: config.assistant.deactivate_delay,
            windows: parts.windows,
            speech_out: parts.speech_out,
            chat: parts.chat,
            clock: parts.clock,
            timers: parts.timers,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.activation.state()
    }

    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn is_listening(&self) -> bool {
        self.capture.is_listening()
    }

    /// Kick off speech capture once at startup.
    pub fn start_capture(&mut self) {
        self.capture.start(self.chat.as_mut());
    }

    /// Process one line of input.  Returns the response shown to the user,
    /// or `None` when the input was blank.
    pub fn handle_input(&mut self, source: InputSource, raw: &str) -> Option<String> {
        let utterance = Utterance::new(raw)?;
        debug!(?source, text = %utterance.normalized, "input");
        self.render(Sender::User, &utterance.raw);

        let reply = match self.activation.gate(&utterance.normalized) {
            Gate::Wake => {
                info!("assistant activated");
                self.reply(ACTIVATED_REPLY, true);
                ACTIVATED_REPLY.to_string()
            }
            Gate::Prompt => {
                self.reply(PROMPT_REPLY, false);
                PROMPT_REPLY.to_string()
            }
            Gate::Route => {
                let reply = self.route(&utterance);
                self.reply(&reply, true);
                reply
            }
        };
        Some(reply)
    }

    pub fn on_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Started => self.capture.on_started(self.chat.as_mut()),
            SpeechEvent::Ended => self.capture.on_ended(&self.timers, METHOD_CAPTURE_RESTART),
            SpeechEvent::Error(kind) => self.capture.on_error(
                &kind,
                self.chat.as_mut(),
                &self.timers,
                METHOD_CAPTURE_RESTART,
            ),
            SpeechEvent::Result(transcript) => {
                debug!(%transcript, "speech result");
                self.handle_input(InputSource::Voice, &transcript.to_lowercase());
            }
        }
    }

    pub fn on_deactivate_timer(&mut self, id: &ScheduleId) {
        if !self.activation.complete_deactivation(id) {
            debug!(schedule_id = %id, "stale deactivation ignored");
            return;
        }
        info!("assistant deactivated");
        self.reply(DEACTIVATED_NOTICE, false);
        self.capture.start(self.chat.as_mut());
    }

    pub fn on_capture_restart(&mut self, id: &ScheduleId) {
        let active = self.activation.is_active();
        self.capture.on_restart_due(id, active, self.chat.as_mut());
    }

    /// Go inactive, drop the pending deactivation and stop capture.
    pub fn teardown(&mut self) {
        if let Some(id) = self.activation.teardown() {
            self.timers.cancel(&id);
        }
        self.capture.stop(&self.timers);
        info!(open_sessions = self.sessions.len(), "assistant torn down");
    }

    fn route(&mut self, utterance: &Utterance) -> String {
        let intent = self.router.classify(&utterance.normalized);
        debug!(?intent, "routed");

        let clock = self.clock.as_ref();
        let reply = match &intent {
            Intent::CloseAll => {
                self.sessions.close_all(self.windows.as_mut());
                router::HOME_REPLY.to_string()
            }
            Intent::CloseNamed(site) => {
                if self.sessions.close_by_name(self.windows.as_mut(), site) {
                    format!("{site} band kar diya gaya.")
                } else {
                    format!("{site} khula nahi tha ya band nahi ho sakta.")
                }
            }
            Intent::OpenWebsite(entry) => {
                if self.sessions.open(self.windows.as_mut(), entry.name, entry.url) {
                    format!("Opening {} for you!", entry.name)
                } else {
                    warn!(site = entry.name, "window open refused");
                    format!("Sorry, I couldn't open {}. Please try again.", entry.name)
                }
            }
            Intent::Time => calendar::describe_time(clock),
            Intent::Date => calendar::describe_date(clock),
            Intent::Timestamp => calendar::describe_timestamp(clock),
            Intent::DayOfWeek => calendar::describe_day_of_week(clock),
            Intent::Weather => router::WEATHER_REPLY.to_string(),
            Intent::Calculator => router::calculator_reply(&utterance.normalized, &utterance.raw),
            Intent::Greeting => router::GREETING_REPLY.to_string(),
            Intent::Help => router::HELP_REPLY.to_string(),
            Intent::Goodbye => router::GOODBYE_REPLY.to_string(),
            Intent::Deactivate => router::DEACTIVATE_REPLY.to_string(),
            Intent::Fallback => router::fallback_reply(&utterance.raw),
        };

        if intent.deactivates() {
            self.schedule_deactivation();
        }
        reply
    }

    fn schedule_deactivation(&mut self) {
        match self.timers.schedule(self.deactivate_delay, METHOD_DEACTIVATE) {
            Ok(id) => {
                debug!(schedule_id = %id, delay = ?self.deactivate_delay, "deactivation scheduled");
                if let Some(previous) = self.activation.defer_deactivation(id) {
                    self.timers.cancel(&previous);
                }
            }
            Err(e) => {
                warn!(error = %e, "deactivation timer unavailable, deactivating now");
                if let Some(previous) = self.activation.teardown() {
                    self.timers.cancel(&previous);
                }
                self.reply(DEACTIVATED_NOTICE, false);
            }
        }
    }

    fn reply(&mut self, text: &str, speak: bool) {
        self.render(Sender::Bot, text);
        if speak {
            self.speech_out.speak(text);
        }
    }

    fn render(&mut self, sender: Sender, text: &str) {
        let message = ChatMessage {
            sender,
            text: text.to_string(),
            timestamp: self.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        self.chat.render(&message);
    }
}

impl BusHandler for Assistant {
    fn prefix(&self) -> &str {
        "assistant"
    }

    fn handle_request(
        &mut self,
        method: &str,
        payload: BusPayload,
        reply_tx: oneshot::Sender<BusResult>,
    ) {
        let result = match (method, payload) {
            (METHOD_INPUT, BusPayload::Utterance { channel_id, source, content }) => {
                debug!(%channel_id, "utterance received");
                let text = self.handle_input(source, &content);
                Ok(BusPayload::Reply { text })
            }
            (METHOD_INPUT, _) => Err(BusError::new(
                ERR_BAD_REQUEST,
                "assistant/input expects an utterance",
            )),
            (other, _) => Err(BusError::new(
                ERR_METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        };
        let _ = reply_tx.send(result);
    }

    fn handle_notification(&mut self, method: &str, payload: BusPayload) {
        match (method, payload) {
            (METHOD_SPEECH, BusPayload::Speech(event)) => self.on_speech_event(event),
            (METHOD_DEACTIVATE, BusPayload::Timer(id)) => self.on_deactivate_timer(&id),
            (METHOD_CAPTURE_RESTART, BusPayload::Timer(id)) => self.on_capture_restart(&id),
            (method, payload) => debug!(%method, ?payload, "unexpected assistant notification"),
        }
    }

    fn shutdown(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tokio::sync::mpsc;

    use crate::subsystems::assistant::calendar::tests::ist_afternoon;
    use crate::subsystems::assistant::capture::tests::{FakeMic, MicLog};
    use crate::subsystems::host::HeadlessWindows;
    use crate::subsystems::timer::{self, TimerCommand};

    #[derive(Default)]
    struct Seen {
        lines: Vec<(Sender, String)>,
        spoken: Vec<String>,
        banner: Option<String>,
    }

    struct FakeChat(Arc<Mutex<Seen>>);

    impl ChatRenderer for FakeChat {
        fn render(&mut self, message: &ChatMessage) {
            self.0.lock().unwrap().lines.push((message.sender, message.text.clone()));
        }
        fn show_banner(&mut self, text: &str) {
            self.0.lock().unwrap().banner = Some(text.to_string());
        }
        fn clear_banner(&mut self) {
            self.0.lock().unwrap().banner = None;
        }
    }

    struct FakeVoice(Arc<Mutex<Seen>>);

    impl SpeechOutput for FakeVoice {
        fn speak(&self, text: &str) {
            self.0.lock().unwrap().spoken.push(text.to_string());
        }
    }

    struct Harness {
        assistant: Assistant,
        seen: Arc<Mutex<Seen>>,
        mic: Arc<Mutex<MicLog>>,
        timer_rx: mpsc::Receiver<TimerCommand>,
    }

    fn harness() -> Harness {
        let dir = std::env::temp_dir();
        let config = Config::test_default(&dir);
        let seen = Arc::new(Mutex::new(Seen::default()));
        let mic = Arc::new(Mutex::new(MicLog::default()));
        let (timers, timer_rx) = timer::channel(16);
        let assistant = Assistant::new(
            &config,
            Collaborators {
                windows: Box::new(HeadlessWindows::new()),
                speech_in: Some(Box::new(FakeMic(mic.clone()))),
                speech_out: Box::new(FakeVoice(seen.clone())),
                chat: Box::new(FakeChat(seen.clone())),
                clock: Arc::new(ist_afternoon()),
                timers,
            },
        );
        Harness { assistant, seen, mic, timer_rx }
    }

    fn next_schedule(rx: &mut mpsc::Receiver<TimerCommand>) -> (ScheduleId, String) {
        loop {
            match rx.try_recv().expect("timer command") {
                TimerCommand::Schedule { id, target_method, .. } => return (id, target_method),
                TimerCommand::Cancel { .. } => continue,
            }
        }
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut h = harness();
        assert_eq!(h.assistant.handle_input(InputSource::Text, "   "), None);
        assert!(h.seen.lock().unwrap().lines.is_empty());
    }

    #[test]
    fn inactive_prompts_without_speaking() {
        let mut h = harness();
        let reply = h.assistant.handle_input(InputSource::Text, "open youtube");
        assert_eq!(reply.as_deref(), Some(PROMPT_REPLY));
        assert!(h.assistant.sessions().is_empty());
        let seen = h.seen.lock().unwrap();
        assert_eq!(seen.lines[0], (Sender::User, "open youtube".to_string()));
        assert!(seen.spoken.is_empty());
    }

    #[test]
    fn wake_acknowledges_once_and_speaks() {
        let mut h = harness();
        let reply = h.assistant.handle_input(InputSource::Text, "Hi Jarvis");
        assert_eq!(reply.as_deref(), Some(ACTIVATED_REPLY));
        assert!(h.assistant.is_active());
        assert_eq!(h.seen.lock().unwrap().spoken, vec![ACTIVATED_REPLY.to_string()]);
    }

    #[test]
    fn routed_replies_are_rendered_and_spoken() {
        let mut h = harness();
        h.assistant.handle_input(InputSource::Text, "jarvis");
        let reply = h.assistant.handle_input(InputSource::Text, "what time is it").unwrap();
        assert_eq!(reply, "The current time is 3:04:05 PM (Asia/Kolkata)");
        let seen = h.seen.lock().unwrap();
        assert_eq!(seen.spoken.last(), Some(&reply));
        assert_eq!(seen.lines.last(), Some(&(Sender::Bot, reply.clone())));
    }

    #[test]
    fn open_and_close_sites() {
        let mut h = harness();
        h.assistant.handle_input(InputSource::Text, "jarvis");
        assert_eq!(
            h.assistant.handle_input(InputSource::Text, "open Facebook").as_deref(),
            Some("Opening facebook for you!")
        );
        h.assistant.handle_input(InputSource::Text, "instagram");
        assert_eq!(h.assistant.sessions().names(), vec!["facebook", "instagram"]);

        assert_eq!(
            h.assistant.handle_input(InputSource::Text, "close facebook").as_deref(),
            Some("facebook band kar diya gaya.")
        );
        assert_eq!(
            h.assistant.handle_input(InputSource::Text, "close facebook").as_deref(),
            Some("facebook khula nahi tha ya band nahi ho sakta.")
        );
        assert_eq!(
            h.assistant.handle_input(InputSource::Text, "home page").as_deref(),
            Some(router::HOME_REPLY)
        );
        assert!(h.assistant.sessions().is_empty());
    }

    #[test]
    fn goodbye_defers_deactivation() {
        let mut h = harness();
        h.assistant.handle_input(InputSource::Text, "jarvis");
        h.assistant.handle_input(InputSource::Text, "goodbye");
        let (id, method) = next_schedule(&mut h.timer_rx);
        assert_eq!(method, METHOD_DEACTIVATE);

        // Still routed during the delay.
        assert_eq!(
            h.assistant.handle_input(InputSource::Text, "hello").as_deref(),
            Some(router::GREETING_REPLY)
        );

        h.assistant.handle_notification(METHOD_DEACTIVATE, BusPayload::Timer(id));
        assert!(!h.assistant.is_active());
        let seen = h.seen.lock().unwrap();
        assert_eq!(seen.lines.last(), Some(&(Sender::Bot, DEACTIVATED_NOTICE.to_string())));
        assert_ne!(seen.spoken.last().map(String::as_str), Some(DEACTIVATED_NOTICE));
    }

    #[test]
    fn second_goodbye_cancels_first_timer() {
        let mut h = harness();
        h.assistant.handle_input(InputSource::Text, "jarvis");
        h.assistant.handle_input(InputSource::Text, "bye");
        let (first, _) = next_schedule(&mut h.timer_rx);
        h.assistant.handle_input(InputSource::Text, "turn off");
        let second = match h.timer_rx.try_recv().unwrap() {
            TimerCommand::Schedule { id, .. } => id,
            other => panic!("expected schedule, got {other:?}"),
        };
        match h.timer_rx.try_recv().unwrap() {
            TimerCommand::Cancel { id } => assert_eq!(id, first),
            other => panic!("expected cancel, got {other:?}"),
        }

        h.assistant.on_deactivate_timer(&first);
        assert!(h.assistant.is_active());
        h.assistant.on_deactivate_timer(&second);
        assert!(!h.assistant.is_active());
    }

    #[test]
    fn voice_results_are_lowercased_input() {
        let mut h = harness();
        h.assistant.on_speech_event(SpeechEvent::Result("Hi JARVIS".into()));
        assert!(h.assistant.is_active());
        assert_eq!(h.seen.lock().unwrap().lines[0], (Sender::User, "hi jarvis".to_string()));
    }

    #[test]
    fn capture_restarts_while_waiting_for_wake_word() {
        let mut h = harness();
        h.assistant.start_capture();
        h.assistant.on_speech_event(SpeechEvent::Started);
        assert!(h.assistant.is_listening());
        h.assistant.on_speech_event(SpeechEvent::Error("no-speech".into()));
        assert_eq!(
            h.seen.lock().unwrap().banner.as_deref(),
            Some("No speech detected. Please try again.")
        );
        let (id, method) = next_schedule(&mut h.timer_rx);
        assert_eq!(method, METHOD_CAPTURE_RESTART);
        h.assistant.handle_notification(METHOD_CAPTURE_RESTART, BusPayload::Timer(id));
        assert_eq!(h.mic.lock().unwrap().starts, 2);
    }

    #[test]
    fn bus_requests() {
        let mut h = harness();
        let (tx, mut rx) = oneshot::channel();
        h.assistant.handle_request(
            METHOD_INPUT,
            BusPayload::Utterance {
                channel_id: "pty0".into(),
                source: InputSource::Text,
                content: "jarvis".into(),
            },
            tx,
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Ok(BusPayload::Reply { text: Some(ACTIVATED_REPLY.to_string()) })
        );

        let (tx, mut rx) = oneshot::channel();
        h.assistant.handle_request(METHOD_INPUT, BusPayload::Empty, tx);
        assert_eq!(rx.try_recv().unwrap().unwrap_err().code, ERR_BAD_REQUEST);

        let (tx, mut rx) = oneshot::channel();
        h.assistant.handle_request("assistant/nope", BusPayload::Empty, tx);
        assert_eq!(rx.try_recv().unwrap().unwrap_err().code, ERR_METHOD_NOT_FOUND);
    }

    #[test]
    fn shutdown_tears_down() {
        let mut h = harness();
        h.assistant.handle_input(InputSource::Text, "jarvis");
        h.assistant.handle_input(InputSource::Text, "exit");
        let (id, _) = next_schedule(&mut h.timer_rx);
        BusHandler::shutdown(&mut h.assistant);
        assert!(!h.assistant.is_active());
        match h.timer_rx.try_recv().unwrap() {
            TimerCommand::Cancel { id: cancelled } => assert_eq!(cancelled, id),
            other => panic!("expected cancel, got {other:?}"),
        }
    }
}
