//! Stopwatch shared by the timer view and the large stopwatch popup.
//!
//! Time advances only through `advance`, driven by the view update hook,
//! so the displayed value is a pure function of the ticks fed in.

use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwatch {
    running: bool,
    elapsed: Duration,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Start when paused, pause when running.
    pub fn toggle(&mut self) {
        self.running = !self.running;
    }

    /// Stop and zero.
    pub fn reset(&mut self) {
        self.running = false;
        self.elapsed = Duration::ZERO;
    }

    pub fn add_minute(&mut self) {
        self.elapsed += Duration::from_secs(60);
    }

    pub fn advance(&mut self, dt: Duration) {
        if self.running {
            self.elapsed += dt;
        }
    }

    pub fn whole_seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }

    pub fn centiseconds(&self) -> u64 {
        (self.elapsed.as_millis() / 10) as u64
    }

    /// `MM:SS`, as shown on the wrist.
    pub fn short_text(&self) -> String {
        let s = self.whole_seconds();
        format!("{:02}:{:02}", s / 60, s % 60)
    }

    /// `MM:SS.CC`, as shown in the popup.
    pub fn long_text(&self) -> String {
        let cs = self.centiseconds();
        format!("{}.{:02}", self.short_text(), cs % 100)
    }
}
