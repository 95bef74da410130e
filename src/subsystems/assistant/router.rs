//! Ordered intent classification.
//!
//! Rules are tried top to bottom and the first hit wins, so the order is the
//! priority: closing beats opening, opening a site beats every keyword
//! intent, and arithmetic beats small talk.

use std::sync::LazyLock;

use regex::Regex;

use super::calculator;
use super::websites::{WebsiteDirectory, WebsiteEntry};

pub const HOME_REPLY: &str =
    "Sabhi khule hue page band kar diye gaye. Aap home page par aa gaye hain.";
pub const WEATHER_REPLY: &str = "I'm sorry, I don't have access to real-time weather data yet.";
pub const GREETING_REPLY: &str = "Hello! How can I assist you today?";
pub const HELP_REPLY: &str = "I can help you with: opening websites, time/date/day/timestamp, advanced calculations, greetings, and general conversation. Try saying \"calculate 15 plus 23\" or \"what time is it\" or \"what day is today\"!";
pub const GOODBYE_REPLY: &str = "Goodbye! Say \"Jarvis\" when you need me again.";
pub const DEACTIVATE_REPLY: &str = "Deactivating Jarvis. Say \"Jarvis\" to reactivate.";
pub const CALC_HELP_REPLY: &str = "I can perform: addition (+), subtraction (-), multiplication (*), division (/), percentage (%), square root, power, and more. Try saying \"calculate 15 plus 23\" or \"what is 10 percent of 200\" or \"square root of 16\"!";
pub const CALC_GREETING_REPLY: &str = "Calculator activated! I can help with: addition, subtraction, multiplication, division, percentage, square root, power, and more. What would you like to calculate?";

const HOME: &[&str] = &["home page", "ghar aa jao", "ghar par aa jao", "home par aa jao"];
const TIME: &[&str] = &["time", "what time"];
const DATE: &[&str] = &["date", "what date", "today"];
const TIMESTAMP: &[&str] = &["timestamp", "current timestamp"];
const DAY: &[&str] = &["day", "what day", "day of week"];
const WEATHER: &[&str] = &["weather"];
const CALCULATOR: &[&str] = &["calculate", "math", "calculator"];
const GREETING: &[&str] = &["hello", "hi", "hey"];
const HELP: &[&str] = &["help", "what can you do"];
const GOODBYE: &[&str] = &["goodbye", "bye", "exit"];
const DEACTIVATE: &[&str] = &["deactivate", "turn off"];

static CLOSE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:close kar do|close karo|band kar do|band karo|close)\s+([a-z0-9 .]+)")
        .expect("close pattern is valid")
});

static CLOSE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9 .]+?)\s+(?:close kar do|close karo|band kar do|band karo)$")
        .expect("close suffix pattern is valid")
});

/// A classified utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    CloseAll,
    /// Close sessions whose name contains the token.
    CloseNamed(String),
    OpenWebsite(&'static WebsiteEntry),
    Time,
    Date,
    Timestamp,
    DayOfWeek,
    Weather,
    Calculator,
    Greeting,
    Help,
    Goodbye,
    Deactivate,
    Fallback,
}

impl Intent {
    /// Whether handling this intent ends the active session.
    pub fn deactivates(&self) -> bool {
        matches!(self, Intent::Goodbye | Intent::Deactivate)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Router {
    directory: WebsiteDirectory,
}

impl Router {
    /// Classify a normalized (trimmed, lowercased) utterance.
    pub fn classify(&self, text: &str) -> Intent {
        if any_keyword(text, HOME) {
            return Intent::CloseAll;
        }
        if let Some(site) = close_target(text) {
            return Intent::CloseNamed(site);
        }
        if let Some(entry) = self.directory.resolve(text) {
            return Intent::OpenWebsite(entry);
        }

        let rules: &[(&[&str], Intent)] = &[
            (TIME, Intent::Time),
            (DATE, Intent::Date),
            (TIMESTAMP, Intent::Timestamp),
            (DAY, Intent::DayOfWeek),
            (WEATHER, Intent::Weather),
        ];
        for (keywords, intent) in rules {
            if any_keyword(text, keywords) {
                return intent.clone();
            }
        }

        if any_keyword(text, CALCULATOR) || calculator::is_math_command(text) {
            return Intent::Calculator;
        }
        if any_keyword(text, GREETING) {
            return Intent::Greeting;
        }
        if any_keyword(text, HELP) {
            return Intent::Help;
        }
        if any_keyword(text, GOODBYE) {
            return Intent::Goodbye;
        }
        if any_keyword(text, DEACTIVATE) {
            return Intent::Deactivate;
        }
        Intent::Fallback
    }
}

/// Calculator replies: help and bare-word greetings first, then evaluation
/// of the raw phrase.
pub fn calculator_reply(normalized: &str, raw: &str) -> String {
    if any_keyword(normalized, HELP) {
        return CALC_HELP_REPLY.to_string();
    }
    if normalized == "calculator" || normalized == "math" {
        return CALC_GREETING_REPLY.to_string();
    }
    calculator::respond(raw)
}

pub fn fallback_reply(utterance: &str) -> String {
    format!("I heard you say: \"{utterance}\". How can I help you with that?")
}

/// Site token of a close command, in either `close <site>` or
/// `<site> band karo` form.
fn close_target(text: &str) -> Option<String> {
    let caps = CLOSE_SUFFIX.captures(text).or_else(|| CLOSE_PREFIX.captures(text))?;
    let site = caps.get(1)?.as_str().trim();
    (!site.is_empty()).then(|| site.to_string())
}

fn any_keyword(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| contains_keyword(text, k))
}

/// Substring match that refuses to split a word: the keyword must not be
/// flanked by ASCII alphanumerics.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    text.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}
