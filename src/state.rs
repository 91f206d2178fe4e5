//! Application state: the single struct the views mutate.
//!
//! Owned by the `ViewMachine` and borrowed mutably only while an action is
//! applied or the update hook runs. Everything else reads it.

use chrono::{DateTime, Datelike, Local, Months, NaiveDate};
use tracing::info;

use crate::agenda::EventBook;
use crate::display::MediaCommand;
use crate::inbox::NotificationLog;
use crate::views::calculator::Calculator;
use crate::views::stopwatch::Stopwatch;

pub const TITLE_MAX_CHARS: usize = 30;
pub const TIME_MAX_CHARS: usize = 5;

/// Text field of the add-event form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Title,
    Time,
}

/// Add-event form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EventForm {
    pub title: String,
    pub time: String,
    pub yearly: bool,
    /// Field receiving keyboard input; the keyboard is hidden when `None`.
    pub focus: Option<FormField>,
}

impl EventForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Append to the focused field, respecting its length limit.
    pub fn type_char(&mut self, c: char) {
        let (field, max) = match self.focus {
            Some(FormField::Title) => (&mut self.title, TITLE_MAX_CHARS),
            Some(FormField::Time) => (&mut self.time, TIME_MAX_CHARS),
            None => return,
        };
        if field.chars().count() < max {
            field.push(c);
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            Some(FormField::Title) => {
                self.title.pop();
            }
            Some(FormField::Time) => {
                self.time.pop();
            }
            None => {}
        }
    }
}

#[derive(Debug)]
pub struct AppState {
    pub calculator: Calculator,
    pub stopwatch: Stopwatch,
    pub notifications: NotificationLog,
    pub events: EventBook,
    pub form: EventForm,
    pub themes: Vec<String>,
    pub theme: usize,
    pub today: NaiveDate,
    /// Date the add-event form and the month popup operate on.
    pub selected_date: NaiveDate,
    /// Months between the current month and the one the popup shows.
    pub month_offset: i32,
    /// Monitor being mirrored, if the screen panel is shown.
    pub mirror: Option<usize>,
    pub monitor_count: usize,
    /// Wall-clock time of the current tick.
    pub now: DateTime<Local>,
    media_outbox: Vec<MediaCommand>,
}

impl AppState {
    pub fn new(themes: Vec<String>, today: NaiveDate) -> Self {
        info!("app state: {} theme(s), today {}", themes.len(), today);
        Self {
            calculator: Calculator::new(),
            stopwatch: Stopwatch::new(),
            notifications: NotificationLog::new(),
            events: EventBook::new(),
            form: EventForm::default(),
            themes,
            theme: 0,
            today,
            selected_date: today,
            month_offset: 0,
            mirror: None,
            monitor_count: 0,
            now: DateTime::default(),
            media_outbox: Vec::new(),
        }
    }

    pub fn theme_name(&self) -> &str {
        self.themes.get(self.theme).map(String::as_str).unwrap_or("default")
    }

    pub fn next_theme(&mut self) {
        if !self.themes.is_empty() {
            self.theme = (self.theme + 1) % self.themes.len();
        }
    }

    pub fn set_theme(&mut self, index: usize) {
        if index < self.themes.len() {
            self.theme = index;
        }
    }

    /// First day of the month the calendar popup shows.
    pub fn displayed_month(&self) -> NaiveDate {
        let first = self.today.with_day(1).unwrap_or(self.today);
        let shift = Months::new(self.month_offset.unsigned_abs());
        let shifted = if self.month_offset >= 0 {
            first.checked_add_months(shift)
        } else {
            first.checked_sub_months(shift)
        };
        shifted.unwrap_or(first)
    }

    /// Move the current day forward. The selection follows while it was
    /// still on the old day.
    pub fn set_today(&mut self, today: NaiveDate) {
        if today != self.today {
            if self.selected_date == self.today {
                self.selected_date = today;
            }
            self.today = today;
        }
    }

    /// Show `monitor` on the screen panel; selecting the mirrored monitor
    /// again hides it.
    pub fn toggle_mirror(&mut self, monitor: usize) {
        self.mirror = match self.mirror {
            Some(m) if m == monitor => None,
            _ => Some(monitor),
        };
    }

    pub fn push_media(&mut self, command: MediaCommand) {
        self.media_outbox.push(command);
    }

    /// Commands queued by the views since the last call.
    pub fn take_media(&mut self) -> Vec<MediaCommand> {
        std::mem::take(&mut self.media_outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn state() -> AppState {
        AppState::new(vec!["A".into(), "B".into(), "C".into()], d(2026, 10, 19))
    }

    #[test]
    fn test_form_limits() {
        let mut form = EventForm::default();
        form.type_char('X');
        assert!(form.title.is_empty());
        form.focus = Some(FormField::Time);
        for c in "12:345".chars() {
            form.type_char(c);
        }
        assert_eq!(form.time, "12:34");
        form.focus = Some(FormField::Title);
        for _ in 0..40 {
            form.type_char('A');
        }
        assert_eq!(form.title.len(), TITLE_MAX_CHARS);
        form.backspace();
        assert_eq!(form.title.len(), TITLE_MAX_CHARS - 1);
    }

    #[test]
    fn test_theme_cycles() {
        let mut s = state();
        s.next_theme();
        s.next_theme();
        s.next_theme();
        assert_eq!(s.theme_name(), "A");
        s.set_theme(2);
        assert_eq!(s.theme_name(), "C");
        s.set_theme(9);
        assert_eq!(s.theme, 2);
    }

    #[test]
    fn test_displayed_month_crosses_years() {
        let mut s = state();
        s.month_offset = 3;
        assert_eq!(s.displayed_month(), d(2027, 1, 1));
        s.month_offset = -10;
        assert_eq!(s.displayed_month(), d(2025, 12, 1));
    }

    #[test]
    fn test_mirror_toggle() {
        let mut s = state();
        s.toggle_mirror(1);
        assert_eq!(s.mirror, Some(1));
        s.toggle_mirror(0);
        assert_eq!(s.mirror, Some(0));
        s.toggle_mirror(0);
        assert_eq!(s.mirror, None);
    }

    #[test]
    fn test_media_outbox_drains() {
        let mut s = state();
        s.push_media(MediaCommand::Next);
        assert_eq!(s.take_media(), vec![MediaCommand::Next]);
        assert!(s.take_media().is_empty());
    }

    #[test]
    fn test_selection_follows_today() {
        let mut s = state();
        s.set_today(d(2026, 10, 20));
        assert_eq!(s.selected_date, d(2026, 10, 20));
        s.selected_date = d(2026, 11, 1);
        s.set_today(d(2026, 10, 21));
        assert_eq!(s.selected_date, d(2026, 11, 1));
    }
}
