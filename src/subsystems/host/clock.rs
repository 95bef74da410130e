//! Wall-clock adapter backed by chrono's local time.

use chrono::{DateTime, FixedOffset, Local};

use super::Clock;

/// Reads the system clock in the local zone.
///
/// The zone name comes from config when set, otherwise from `TZ`, otherwise
/// it is rendered from the current UTC offset (`UTC+05:30`).
pub struct SystemClock {
    zone: Option<String>,
}

impl SystemClock {
    pub fn new(zone: Option<String>) -> Self {
        Self { zone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn zone_name(&self) -> String {
        if let Some(zone) = &self.zone {
            return zone.clone();
        }
        match std::env::var("TZ") {
            Ok(tz) if !tz.trim().is_empty() => tz.trim_start_matches(':').to_string(),
            _ => offset_label(self.now().offset()),
        }
    }
}

fn offset_label(offset: &FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        return "UTC".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("UTC{sign}{:02}:{:02}", secs / 3600, (secs % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_zone_wins() {
        let clock = SystemClock::new(Some("Asia/Kolkata".into()));
        assert_eq!(clock.zone_name(), "Asia/Kolkata");
    }

    #[test]
    fn offset_labels() {
        assert_eq!(offset_label(&FixedOffset::east_opt(0).unwrap()), "UTC");
        assert_eq!(offset_label(&FixedOffset::east_opt(19_800).unwrap()), "UTC+05:30");
        assert_eq!(offset_label(&FixedOffset::west_opt(18_000).unwrap()), "UTC-05:00");
    }
}
