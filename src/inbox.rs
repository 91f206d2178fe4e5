//! In-memory notification log shown on the wrist.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tracing::debug;

/// Maximum notifications kept; older ones are dropped.
pub const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub icon: String,
    pub title: String,
    pub message: String,
    pub posted_at: DateTime<Local>,
    pub read: bool,
}

/// Newest-first notification list.
#[derive(Debug, Default)]
pub struct NotificationLog {
    items: VecDeque<Notification>,
    next_id: u64,
    revision: u64,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a notification stamped `posted_at` and return its id.
    pub fn post(&mut self, posted_at: DateTime<Local>, icon: &str, title: &str, message: &str) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push_front(Notification {
            id,
            icon: icon.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            posted_at,
            read: false,
        });
        self.items.truncate(MAX_NOTIFICATIONS);
        self.revision += 1;
        debug!("notifications: posted #{} '{}'", id, title);
        id
    }

    pub fn unread(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.read = true;
        }
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.revision += 1;
    }

    /// Up to `count` newest notifications.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Notification> {
        self.items.iter().take(count)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bumped on every mutation; part of the render fingerprint.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Local> {
        Local.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_newest_first_and_unread() {
        let mut log = NotificationLog::new();
        log.post(at(1_000), "i", "first", "");
        log.post(at(2_000), "i", "second", "");
        let titles: Vec<&str> = log.recent(10).map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);
        assert_eq!(log.unread(), 2);
        log.mark_all_read();
        assert_eq!(log.unread(), 0);
    }

    #[test]
    fn test_post_keeps_caller_timestamp() {
        let mut log = NotificationLog::new();
        log.post(at(1_792_411_200_000), "i", "stamped", "");
        let n = log.recent(1).next().unwrap();
        assert_eq!(n.posted_at.timestamp_millis(), 1_792_411_200_000);
    }

    #[test]
    fn test_capped() {
        let mut log = NotificationLog::new();
        for i in 0..60 {
            log.post(at(i * 1_000), "i", &format!("n{}", i), "");
        }
        assert_eq!(log.len(), MAX_NOTIFICATIONS);
        assert_eq!(log.recent(1).next().unwrap().title, "n59");
    }

    #[test]
    fn test_clear_bumps_revision() {
        let mut log = NotificationLog::new();
        log.post(at(0), "i", "a", "b");
        let rev = log.revision();
        log.clear();
        assert!(log.is_empty());
        assert!(log.revision() > rev);
    }
}
