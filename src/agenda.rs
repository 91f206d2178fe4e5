//! In-memory calendar events.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

/// Most events returned by `upcoming`.
pub const MAX_UPCOMING: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub date: NaiveDate,
    /// Free-form `HH:MM` text, possibly empty.
    pub time: String,
    /// Repeats every year on the same month/day.
    pub yearly: bool,
}

impl Event {
    /// The occurrence on or after `from - 1 day`, for yearly events the
    /// date moved into `from`'s year (or the next one).
    pub fn next_occurrence(&self, from: NaiveDate) -> Option<NaiveDate> {
        if !self.yearly {
            return Some(self.date);
        }
        let this_year = self.date.with_year(from.year());
        match this_year {
            Some(d) if d >= from - Duration::days(1) => Some(d),
            _ => self.date.with_year(from.year() + 1),
        }
    }

    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        self.date == date
            || (self.yearly && self.date.month() == date.month() && self.date.day() == date.day())
    }
}

#[derive(Debug, Default)]
pub struct EventBook {
    events: Vec<Event>,
    next_id: u64,
    revision: u64,
}

impl EventBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, title: &str, date: NaiveDate, time: &str, yearly: bool) -> u64 {
        self.next_id += 1;
        self.events.push(Event {
            id: self.next_id,
            title: title.to_string(),
            date,
            time: time.to_string(),
            yearly,
        });
        self.revision += 1;
        debug!("calendar: added '{}' on {} (yearly={})", title, date, yearly);
        self.next_id
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        self.events.iter().filter(|e| e.occurs_on(date)).collect()
    }

    pub fn has_events_on(&self, date: NaiveDate) -> bool {
        self.events.iter().any(|e| e.occurs_on(date))
    }

    /// Events from yesterday through `days` days ahead, soonest first.
    pub fn upcoming(&self, today: NaiveDate, days: i64) -> Vec<&Event> {
        let start = today - Duration::days(1);
        let end = today + Duration::days(days);
        let mut found: Vec<(NaiveDate, &Event)> = self
            .events
            .iter()
            .filter_map(|e| e.next_occurrence(today).map(|d| (d, e)))
            .filter(|(d, _)| *d >= start && *d <= end)
            .collect();
        found.sort_by_key(|(d, e)| (*d, e.id));
        found.into_iter().take(MAX_UPCOMING).map(|(_, e)| e).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_yearly_matches_any_year() {
        let mut book = EventBook::new();
        book.add("birthday", d(1990, 6, 15), "", true);
        book.add("dentist", d(2026, 6, 15), "10:00", false);
        assert_eq!(book.events_on(d(2026, 6, 15)).len(), 2);
        assert_eq!(book.events_on(d(2027, 6, 15)).len(), 1);
        assert!(!book.has_events_on(d(2026, 6, 16)));
    }

    #[test]
    fn test_upcoming_window_sorted() {
        let mut book = EventBook::new();
        let today = d(2026, 10, 19);
        book.add("far", d(2026, 11, 30), "", false);
        book.add("later", d(2026, 10, 24), "", false);
        book.add("soon", d(2026, 10, 20), "", false);
        book.add("yesterday", d(2026, 10, 18), "", false);
        book.add("old", d(2026, 10, 1), "", false);
        let titles: Vec<&str> = book.upcoming(today, 7).iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["yesterday", "soon", "later"]);
    }

    #[test]
    fn test_yearly_rolls_into_next_year() {
        let mut book = EventBook::new();
        book.add("new year", d(2000, 1, 2), "", true);
        let today = d(2026, 12, 30);
        let up = book.upcoming(today, 7);
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].next_occurrence(today), Some(d(2027, 1, 2)));
    }

    #[test]
    fn test_upcoming_capped() {
        let mut book = EventBook::new();
        let today = d(2026, 3, 1);
        for i in 0..15 {
            book.add(&format!("e{}", i), today, "", false);
        }
        assert_eq!(book.upcoming(today, 7).len(), MAX_UPCOMING);
    }
}
