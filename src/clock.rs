//! Time sources for the tick.
//!
//! The runtime reads time only through `Clock`: `SystemClock` in the
//! binary, `TestClock` in tests so cadence and stopwatch behavior can be
//! stepped deterministically.

use chrono::{DateTime, Local, NaiveDate};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

pub trait Clock: Send + Sync {
    /// Monotonic instant used for tick deltas and refresh cadence.
    fn now(&self) -> Instant;

    /// Wall-clock time as milliseconds since the UNIX epoch.
    fn unix_millis(&self) -> i64;

    /// `unix_millis` in the local timezone.
    fn local_now(&self) -> Option<DateTime<Local>> {
        DateTime::from_timestamp_millis(self.unix_millis()).map(|utc| utc.with_timezone(&Local))
    }

    /// Local calendar date of `unix_millis`.
    fn local_date(&self) -> Option<NaiveDate> {
        self.local_now().map(|t| t.date_naive())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_millis(&self) -> i64 {
        system_unix_millis()
    }
}

fn system_unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug)]
struct TestTime {
    instant: Instant,
    unix_ms: i64,
}

/// Manually advanced clock. Both readings move together.
#[derive(Debug)]
pub struct TestClock {
    time: Mutex<TestTime>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    /// Starts at the current real time.
    pub fn new() -> Self {
        Self::at_unix_millis(system_unix_millis())
    }

    /// Starts at a fixed wall-clock time.
    pub fn at_unix_millis(ms: i64) -> Self {
        Self {
            time: Mutex::new(TestTime {
                instant: Instant::now(),
                unix_ms: ms,
            }),
        }
    }

    fn time(&self) -> MutexGuard<'_, TestTime> {
        self.time.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn advance(&self, duration: Duration) {
        let mut t = self.time();
        t.instant += duration;
        t.unix_ms += duration.as_millis() as i64;
    }

    pub fn set_unix_millis(&self, ms: i64) {
        self.time().unix_ms = ms;
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.time().instant
    }

    fn unix_millis(&self) -> i64 {
        self.time().unix_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_system_clock_returns_time() {
        let clock = SystemClock;
        let now = clock.now();
        assert!(clock.unix_millis() > 0);
        assert!(clock.now() >= now);
        assert!(clock.local_date().is_some());
    }

    #[test]
    fn test_test_clock_advance() {
        let clock = TestClock::new();
        let t0 = clock.now();
        let ms0 = clock.unix_millis();

        clock.advance(Duration::from_millis(1500));

        assert_eq!(clock.now() - t0, Duration::from_millis(1500));
        assert_eq!(clock.unix_millis() - ms0, 1500);
    }

    #[test]
    fn test_local_date_follows_wall_clock() {
        // 2026-10-19 12:00 UTC; noon keeps the date stable across timezones
        // within +-11h.
        let clock = TestClock::at_unix_millis(1_792_411_200_000);
        assert_eq!(clock.local_date(), NaiveDate::from_ymd_opt(2026, 10, 19));
        clock.advance(Duration::from_secs(86_400));
        assert_eq!(clock.local_date(), NaiveDate::from_ymd_opt(2026, 10, 20));
    }

    #[test]
    fn test_local_now_tracks_test_clock() {
        let clock = TestClock::at_unix_millis(1_792_411_200_000);
        assert_eq!(clock.local_now().map(|t| t.timestamp_millis()), Some(1_792_411_200_000));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.local_now().map(|t| t.timestamp_millis()), Some(1_792_411_200_250));
    }

    #[test]
    fn test_clock_trait_object() {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::at_unix_millis(1000));
        assert_eq!(clock.unix_millis(), 1000);
    }
}
