//! Externally polled display values (clock, stats, media, monitors).
//!
//! Every field is optional or stale-tolerant: the poller publishes whatever
//! it has and the tick renders the last snapshot it received.

use chrono::{Local, NaiveDate};

/// What is playing, as reported by the media session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MediaInfo {
    pub title: String,
    pub artist: String,
    pub playing: bool,
    pub source: String,
}

/// Playback key sent to the media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCommand {
    Previous,
    PlayPause,
    Next,
}

impl MediaCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::PlayPause => "play-pause",
            Self::Next => "next",
        }
    }
}

/// One capturable monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DisplayValues {
    /// `HH:MM`.
    pub clock: String,
    /// e.g. `MONDAY 19 OCT`.
    pub date: String,
    pub today: Option<NaiveDate>,
    pub cpu_pct: Option<u8>,
    pub ram_pct: Option<u8>,
    pub gpu_pct: Option<u8>,
    pub battery_pct: Option<u8>,
    pub plugged_in: bool,
    pub media: Option<MediaInfo>,
    pub monitors: Vec<MonitorInfo>,
}

impl DisplayValues {
    /// Values carrying only the local wall clock.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            clock: now.format("%H:%M").to_string(),
            date: now.format("%A %d %b").to_string().to_uppercase(),
            today: Some(now.date_naive()),
            ..Default::default()
        }
    }
}

/// Something that can be polled for display values. Called off the tick.
pub trait DisplayValuesSource: Send {
    fn poll(&mut self) -> DisplayValues;
}

/// Wall clock from the system plus a fixed monitor list. CPU, battery and
/// media come from collaborators that are not wired in headless mode.
#[derive(Debug, Clone, Default)]
pub struct SystemDisplayValues {
    pub monitors: Vec<MonitorInfo>,
}

impl DisplayValuesSource for SystemDisplayValues {
    fn poll(&mut self) -> DisplayValues {
        DisplayValues {
            monitors: self.monitors.clone(),
            ..DisplayValues::now()
        }
    }
}

/// Returns the same values every poll. Used by tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDisplayValues(pub DisplayValues);

impl DisplayValuesSource for StaticDisplayValues {
    fn poll(&mut self) -> DisplayValues {
        self.0.clone()
    }
}
