//! Jarvis assistant — supervisor entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Start supervisor bus and timer service
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Start comms channels (console, speech transcript feed)
//!   8. Build the assistant engine and start speech capture
//!   9. Spawn supervisor run-loop
//!  10. Wait for comms to finish, cancel token, join supervisor

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use jarvis_assistant::config::{self, Config};
use jarvis_assistant::error::AppError;
use jarvis_assistant::logger;
use jarvis_assistant::subsystems::assistant::{Assistant, Collaborators};
use jarvis_assistant::subsystems::comms;
use jarvis_assistant::subsystems::history::ChatHistory;
use jarvis_assistant::subsystems::host::{
    CommandSpeaker, ConsoleChat, HeadlessWindows, LauncherWindows, SilentSpeaker, SpeechOutput,
    SystemClock, WindowManager,
};
use jarvis_assistant::subsystems::timer::{self, TimerService};
use jarvis_assistant::supervisor::{self, bus::SupervisorBus, dispatch::BusHandler};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    // Shared shutdown token — Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();

    let bus = SupervisorBus::new(64);
    let bus_handle = bus.handle.clone();

    let (timers, timer_rx) = timer::channel(32);
    let timer_task = tokio::spawn(
        TimerService::new(bus_handle.clone(), timer_rx, shutdown.clone()).run(),
    );

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let comms = comms::start(&config, bus_handle, shutdown.clone());

    let history = config
        .history
        .enabled
        .then(|| ChatHistory::load(&config.work_dir, config.history.cap));
    let chat = ConsoleChat::new(config.bot_name.clone(), history);
    if config.history.replay {
        chat.replay();
    }

    let mut assistant = Assistant::new(
        &config,
        Collaborators {
            windows: window_manager(&config),
            speech_in: comms.speech_input,
            speech_out: speaker(&config),
            chat: Box::new(chat),
            clock: Arc::new(SystemClock::new(config.assistant.time_zone.clone())),
            timers,
        },
    );
    assistant.start_capture();

    let handlers: Vec<Box<dyn BusHandler>> = vec![Box::new(assistant)];

    let sup_token = shutdown.clone();
    let sup_handle = tokio::spawn(async move {
        supervisor::run(bus, sup_token, handlers).await;
    });

    print_startup_summary(&config, &comms.loaded);

    let result = comms.channels.join().await;

    // If comms exited on EOF (not Ctrl-C), still signal everything to stop.
    shutdown.cancel();
    sup_handle.await.ok();
    timer_task.await.ok();

    {
        use std::io::Write as _;
        println!("\nBye :) ...");
        let _ = std::io::stdout().flush();
    }

    result
}

fn window_manager(config: &Config) -> Box<dyn WindowManager> {
    match config.windows.browser_command.as_deref().and_then(LauncherWindows::new) {
        Some(launcher) => Box::new(launcher),
        None => {
            info!("no browser launcher configured — windows are tracked only");
            Box::new(HeadlessWindows::new())
        }
    }
}

fn speaker(config: &Config) -> Box<dyn SpeechOutput> {
    match config.speech.tts_command.as_deref().and_then(CommandSpeaker::new) {
        Some(speaker) => Box::new(speaker),
        None => Box::new(SilentSpeaker),
    }
}

fn print_startup_summary(config: &Config, channels: &[String]) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 58;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let channel_line = if channels.is_empty() {
        "none".to_string()
    } else {
        channels.join(", ")
    };
    let browser_line = config
        .windows
        .browser_command
        .clone()
        .unwrap_or_else(|| "headless".to_string());
    let tts_line = config
        .speech
        .tts_command
        .clone()
        .unwrap_or_else(|| "silent".to_string());
    let history_line = if config.history.enabled {
        format!("on (cap {})", config.history.cap)
    } else {
        "off".to_string()
    };

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ 🤖 Jarvis Assistant                                          ║");
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ 🧾 Name: {:<51}║", config.bot_name);
    println!("║ 🧠 PID: {:<52}║", std::process::id());
    println!("║ 🔑 Wake word: {:<46}║", config.assistant.wake_word);
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║   {}║", fit(format!("📡 channels: {channel_line}")));
    println!("║   {}║", fit(format!("🌐 browser: {browser_line}")));
    println!("║   {}║", fit(format!("🔊 speech: {tts_line}")));
    println!("║   {}║", fit(format!("🗂️  history: {history_line}")));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!("💡 Say or type \"Hi {}\" to begin", config.bot_name);
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: jarvis-assistant [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug
    //   -vvvv+  → trace
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, config_path }
}
