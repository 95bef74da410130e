//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or an explicit path), then applies `JARVIS_WORK_DIR` and
//! `JARVIS_LOG_LEVEL` env overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
}

/// Engine behaviour knobs (`[assistant]`).
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Token whose presence activates the engine.
    pub wake_word: String,
    /// Delay between a farewell response and the actual deactivation.
    pub deactivate_delay: Duration,
    /// Display name for the local time zone; `None` falls back to `TZ`.
    pub time_zone: Option<String>,
}

/// Speech capture / synthesis configuration (`[speech]`).
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Text-to-speech command, invoked as `<cmd> <text>`.
    pub tts_command: Option<String>,
    /// Line-oriented transcript stream produced by an external recognizer.
    pub transcript_source: Option<PathBuf>,
    /// Backoff before capture restarts after an end or an error.
    pub restart_delay: Duration,
}

/// Window manager configuration (`[windows]`).
#[derive(Debug, Clone)]
pub struct WindowsConfig {
    /// Launcher invoked as `<cmd> <url>`; `None` keeps windows headless.
    pub browser_command: Option<String>,
}

/// Chat history persistence (`[history]`).
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub cap: usize,
    /// Print persisted messages to the console on startup.
    pub replay: bool,
}

/// Fully-resolved supervisor configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub comms: CommsConfig,
    pub assistant: AssistantConfig,
    pub speech: SpeechConfig,
    pub windows: WindowsConfig,
    pub history: HistoryConfig,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if a speech transcript feed is configured.
    pub fn speech_feed_should_load(&self) -> bool {
        self.speech.transcript_source.is_some()
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    supervisor: RawSupervisor,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    assistant: RawAssistant,
    #[serde(default)]
    speech: RawSpeech,
    #[serde(default)]
    windows: RawWindows,
    #[serde(default)]
    history: RawHistory,
}

#[derive(Deserialize)]
struct RawSupervisor {
    bot_name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
}

#[derive(Deserialize)]
struct RawPty {
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize)]
struct RawAssistant {
    #[serde(default = "default_wake_word")]
    wake_word: String,
    #[serde(default = "default_deactivate_delay_ms")]
    deactivate_delay_ms: u64,
    #[serde(default)]
    time_zone: Option<String>,
}

impl Default for RawAssistant {
    fn default() -> Self {
        Self {
            wake_word: default_wake_word(),
            deactivate_delay_ms: default_deactivate_delay_ms(),
            time_zone: None,
        }
    }
}

#[derive(Deserialize)]
struct RawSpeech {
    #[serde(default)]
    tts_command: Option<String>,
    #[serde(default)]
    transcript_source: Option<String>,
    #[serde(default = "default_restart_delay_ms")]
    restart_delay_ms: u64,
}

impl Default for RawSpeech {
    fn default() -> Self {
        Self {
            tts_command: None,
            transcript_source: None,
            restart_delay_ms: default_restart_delay_ms(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawWindows {
    #[serde(default)]
    browser_command: Option<String>,
}

#[derive(Deserialize)]
struct RawHistory {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_history_cap")]
    cap: usize,
    #[serde(default)]
    replay: bool,
}

impl Default for RawHistory {
    fn default() -> Self {
        Self {
            enabled: true,
            cap: default_history_cap(),
            replay: false,
        }
    }
}

fn default_wake_word() -> String {
    "jarvis".to_string()
}

fn default_deactivate_delay_ms() -> u64 {
    2000
}

fn default_restart_delay_ms() -> u64 {
    1000
}

fn default_history_cap() -> usize {
    500
}

fn default_true() -> bool {
    true
}

/// Load config from `path` (or `config/default.toml`), then apply env-var
/// overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("JARVIS_WORK_DIR").ok();
    let log_level_override = env::var("JARVIS_LOG_LEVEL").ok();
    load_from(
        Path::new(path.unwrap_or(DEFAULT_CONFIG_PATH)),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let s = parsed.supervisor;

    let work_dir = expand_home(work_dir_override.unwrap_or(&s.work_dir));
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();

    let wake_word = parsed.assistant.wake_word.trim().to_lowercase();
    if wake_word.is_empty() {
        return Err(AppError::Config("assistant.wake_word must not be empty".into()));
    }
    if parsed.history.cap == 0 {
        return Err(AppError::Config("history.cap must be > 0".into()));
    }

    Ok(Config {
        bot_name: s.bot_name,
        work_dir,
        log_level,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
            },
        },
        assistant: AssistantConfig {
            wake_word,
            deactivate_delay: Duration::from_millis(parsed.assistant.deactivate_delay_ms),
            time_zone: non_empty(parsed.assistant.time_zone),
        },
        speech: SpeechConfig {
            tts_command: non_empty(parsed.speech.tts_command),
            transcript_source: non_empty(parsed.speech.transcript_source)
                .map(|p| expand_home(&p)),
            restart_delay: Duration::from_millis(parsed.speech.restart_delay_ms),
        },
        windows: WindowsConfig {
            browser_command: non_empty(parsed.windows.browser_command),
        },
        history: HistoryConfig {
            enabled: parsed.history.enabled,
            cap: parsed.history.cap,
            replay: parsed.history.replay,
        },
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Safe `Config` for tests — headless windows, silent speech, no feed.
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            comms: CommsConfig {
                pty: PtyConfig { enabled: false },
            },
            assistant: AssistantConfig {
                wake_word: default_wake_word(),
                deactivate_delay: Duration::from_millis(default_deactivate_delay_ms()),
                time_zone: Some("UTC".into()),
            },
            speech: SpeechConfig {
                tts_command: None,
                transcript_source: None,
                restart_delay: Duration::from_millis(default_restart_delay_ms()),
            },
            windows: WindowsConfig {
                browser_command: None,
            },
            history: HistoryConfig {
                enabled: false,
                cap: default_history_cap(),
                replay: false,
            },
        }
    }
}
