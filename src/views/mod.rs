//! View state machine: active view, popup, hit regions and actions.
//!
//! Each view publishes axis-aligned pixel regions bound to actions. A click
//! runs the first region containing it; clicks outside every region are
//! absorbed. Actions mutate `AppState` synchronously, so the render step of
//! the same tick already sees the result.

use chrono::NaiveDate;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info};

pub mod calculator;
pub mod regions;
pub mod stopwatch;

use crate::display::{DisplayValues, MediaCommand};
use crate::state::{AppState, FormField};
use crate::vr::render_cache::RenderFingerprint;
use calculator::CalcKey;

// ── Identifiers ──────────────────────────────────────────────

/// Views of the wrist panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    Home,
    Notifications,
    Calendar,
    AddEvent,
    Screens,
    Timer,
    Calculator,
    Settings,
}

impl ViewId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Notifications => "notifications",
            Self::Calendar => "calendar",
            Self::AddEvent => "add-event",
            Self::Screens => "screens",
            Self::Timer => "timer",
            Self::Calculator => "calculator",
            Self::Settings => "settings",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "home" => Some(Self::Home),
            "notifications" => Some(Self::Notifications),
            "calendar" => Some(Self::Calendar),
            "add-event" => Some(Self::AddEvent),
            "screens" => Some(Self::Screens),
            "timer" => Some(Self::Timer),
            "calculator" => Some(Self::Calculator),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

/// Content of the head-relative popup panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopupKind {
    CalendarMonth,
    Stopwatch,
}

impl PopupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalendarMonth => "calendar-month",
            Self::Stopwatch => "stopwatch",
        }
    }
}

// ── Regions and actions ──────────────────────────────────────

/// Pixel rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    /// Rectangle at (x, y) spanning `w` x `h`, both edges included.
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x + w,
            y1: y + h,
        }
    }

    pub const fn bounds(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn center(&self) -> (u32, u32) {
        ((self.x0 + self.x1) / 2, (self.y0 + self.y1) / 2)
    }
}

/// What a region does when clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(ViewId),
    Media(MediaCommand),
    MarkAllRead,
    ClearNotifications,
    OpenPopup(PopupKind),
    ClosePopup,
    /// Reset the add-event form and open it.
    BeginAddEvent,
    Focus(FormField),
    ToggleYearly,
    Type(char),
    Erase,
    SaveEvent,
    ToggleMirror(usize),
    CloseMirror,
    StopwatchToggle,
    StopwatchReset,
    StopwatchAddMinute,
    Calc(CalcKey),
    NextTheme,
    SetTheme(usize),
    ShiftMonth(i32),
    SelectDate(NaiveDate),
}

#[derive(Debug, Clone)]
pub struct HitRegion {
    pub name: Cow<'static, str>,
    pub rect: PixelRect,
    pub action: Action,
}

impl HitRegion {
    pub fn new(name: impl Into<Cow<'static, str>>, rect: PixelRect, action: Action) -> Self {
        Self {
            name: name.into(),
            rect,
            action,
        }
    }
}

/// First region containing (x, y).
pub fn region_at(regions: &[HitRegion], x: u32, y: u32) -> Option<&HitRegion> {
    regions.iter().find(|r| r.rect.contains(x, y))
}

// ── Machine ──────────────────────────────────────────────────

pub struct ViewMachine {
    view: ViewId,
    popup: Option<PopupKind>,
    state: AppState,
}

impl ViewMachine {
    /// Starts on the home view with no popup.
    pub fn new(state: AppState) -> Self {
        Self {
            view: ViewId::Home,
            popup: None,
            state,
        }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn popup(&self) -> Option<PopupKind> {
        self.popup
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn main_regions(&self) -> Vec<HitRegion> {
        regions::view_regions(self.view, &self.state)
    }

    pub fn popup_regions(&self) -> Vec<HitRegion> {
        match self.popup {
            Some(kind) => regions::popup_regions(kind, &self.state),
            None => Vec::new(),
        }
    }

    /// Dispatch a click on the wrist panel. Returns the action that ran.
    pub fn dispatch_main(&mut self, x: u32, y: u32) -> Option<Action> {
        let regions = self.main_regions();
        self.dispatch_in(&regions, x, y)
    }

    /// Dispatch a click on the popup panel.
    pub fn dispatch_popup(&mut self, x: u32, y: u32) -> Option<Action> {
        let regions = self.popup_regions();
        self.dispatch_in(&regions, x, y)
    }

    fn dispatch_in(&mut self, regions: &[HitRegion], x: u32, y: u32) -> Option<Action> {
        let Some(region) = region_at(regions, x, y) else {
            debug!("views: click ({}, {}) on {} absorbed", x, y, self.view.as_str());
            return None;
        };
        debug!("views: click ({}, {}) -> '{}'", x, y, region.name);
        let action = region.action.clone();
        self.apply(action.clone());
        Some(action)
    }

    pub fn request_navigation(&mut self, view: ViewId) {
        if view != self.view {
            info!("views: {} -> {}", self.view.as_str(), view.as_str());
            self.view = view;
        }
    }

    pub fn apply(&mut self, action: Action) {
        let state = &mut self.state;
        match action {
            Action::Navigate(view) => self.request_navigation(view),
            Action::Media(command) => state.push_media(command),
            Action::MarkAllRead => state.notifications.mark_all_read(),
            Action::ClearNotifications => state.notifications.clear(),
            Action::OpenPopup(kind) => {
                info!("views: popup {} opened", kind.as_str());
                self.popup = Some(kind);
            }
            Action::ClosePopup => self.popup = None,
            Action::BeginAddEvent => {
                state.form.reset();
                self.request_navigation(ViewId::AddEvent);
            }
            Action::Focus(field) => state.form.focus = Some(field),
            Action::ToggleYearly => state.form.yearly = !state.form.yearly,
            Action::Type(c) => state.form.type_char(c),
            Action::Erase => state.form.backspace(),
            Action::SaveEvent => {
                if !state.form.title.is_empty() {
                    let title = state.form.title.clone();
                    state
                        .events
                        .add(&title, state.selected_date, &state.form.time, state.form.yearly);
                    let now = state.now;
                    state.notifications.post(now, "✅", "Event created", &title);
                }
                self.request_navigation(ViewId::Calendar);
            }
            Action::ToggleMirror(monitor) => state.toggle_mirror(monitor),
            Action::CloseMirror => state.mirror = None,
            Action::StopwatchToggle => state.stopwatch.toggle(),
            Action::StopwatchReset => state.stopwatch.reset(),
            Action::StopwatchAddMinute => state.stopwatch.add_minute(),
            Action::Calc(key) => state.calculator.press(key),
            Action::NextTheme => state.next_theme(),
            Action::SetTheme(index) => state.set_theme(index),
            Action::ShiftMonth(delta) => state.month_offset += delta,
            Action::SelectDate(date) => state.selected_date = date,
        }
    }

    /// Time-driven update, run every tick whether or not a click happened.
    pub fn update(&mut self, dt: Duration, display: &DisplayValues) {
        let state = &mut self.state;
        state.stopwatch.advance(dt);
        if let Some(today) = display.today {
            state.set_today(today);
        }
        state.monitor_count = display.monitors.len();
        if let Some(m) = state.mirror {
            if m >= state.monitor_count {
                info!("views: monitor {} gone, closing mirror", m);
                state.mirror = None;
            }
        }
    }

    // ── Fingerprints ─────────────────────────────────────────

    /// Everything the wrist panel's pixels depend on for the active view.
    pub fn main_fingerprint(&self, display: &DisplayValues) -> RenderFingerprint {
        let s = &self.state;
        let base = (self.view, s.theme);
        match self.view {
            ViewId::Home => RenderFingerprint::of(&(
                base,
                display.clock.as_str(),
                display.date.as_str(),
                (display.cpu_pct, display.ram_pct, display.gpu_pct),
                (display.battery_pct, display.plugged_in),
                &display.media,
                s.notifications.revision(),
            )),
            ViewId::Notifications => RenderFingerprint::of(&(base, s.notifications.revision())),
            ViewId::Calendar => RenderFingerprint::of(&(base, s.events.revision(), s.today)),
            ViewId::AddEvent => RenderFingerprint::of(&(base, &s.form, s.selected_date)),
            ViewId::Screens => RenderFingerprint::of(&(base, &display.monitors, s.mirror)),
            ViewId::Timer => RenderFingerprint::of(&(
                base,
                s.stopwatch.whole_seconds(),
                s.stopwatch.is_running(),
            )),
            ViewId::Calculator => RenderFingerprint::of(&(base, &s.calculator)),
            ViewId::Settings => RenderFingerprint::of(&(base, &s.themes)),
        }
    }

    /// Fingerprint of the popup content, `None` when no popup is open.
    pub fn popup_fingerprint(&self) -> Option<RenderFingerprint> {
        let s = &self.state;
        let kind = self.popup?;
        let fp = match kind {
            PopupKind::CalendarMonth => RenderFingerprint::of(&(
                kind,
                s.theme,
                s.displayed_month(),
                s.selected_date,
                s.today,
                s.events.revision(),
            )),
            PopupKind::Stopwatch => RenderFingerprint::of(&(
                kind,
                s.theme,
                s.stopwatch.centiseconds(),
                s.stopwatch.is_running(),
            )),
        };
        Some(fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MonitorInfo;

    fn machine() -> ViewMachine {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        ViewMachine::new(AppState::new(vec!["Cyberpunk".into(), "Dark".into()], today))
    }

    fn click_region(m: &mut ViewMachine, name: &str) -> Option<Action> {
        let regions = m.main_regions();
        let region = regions.iter().find(|r| r.name == name).expect("region exists");
        let (x, y) = region.rect.center();
        m.dispatch_main(x, y)
    }

    #[test]
    fn test_rect_inclusive() {
        let r = PixelRect::new(10, 20, 5, 5);
        assert!(r.contains(10, 20));
        assert!(r.contains(15, 25));
        assert!(!r.contains(16, 25));
        assert!(!r.contains(9, 20));
    }

    #[test]
    fn test_view_id_round_trip() {
        for v in regions::NAV_ORDER {
            assert_eq!(ViewId::from_str(v.as_str()), Some(v));
        }
        assert_eq!(ViewId::from_str("add-event"), Some(ViewId::AddEvent));
        assert_eq!(ViewId::from_str("nope"), None);
    }

    #[test]
    fn test_first_containing_region_wins() {
        let regions = vec![
            HitRegion::new("a", PixelRect::new(0, 0, 10, 10), Action::NextTheme),
            HitRegion::new("b", PixelRect::new(5, 5, 10, 10), Action::MarkAllRead),
        ];
        assert_eq!(region_at(&regions, 7, 7).map(|r| &*r.name), Some("a"));
        assert_eq!(region_at(&regions, 12, 12).map(|r| &*r.name), Some("b"));
        assert!(region_at(&regions, 50, 50).is_none());
    }

    #[test]
    fn test_click_outside_absorbed() {
        let mut m = machine();
        assert_eq!(m.dispatch_main(2, 2), None);
        assert_eq!(m.view(), ViewId::Home);
    }

    #[test]
    fn test_nav_bar_navigates() {
        let mut m = machine();
        assert_eq!(
            click_region(&mut m, "nav.calculator"),
            Some(Action::Navigate(ViewId::Calculator))
        );
        assert_eq!(m.view(), ViewId::Calculator);
        click_region(&mut m, "back");
        assert_eq!(m.view(), ViewId::Home);
    }

    #[test]
    fn test_single_region_action_runs_once() {
        let mut m = machine();
        m.request_navigation(ViewId::Calculator);
        click_region(&mut m, "key.7");
        assert_eq!(m.state().calculator.display(), "7");
        click_region(&mut m, "key.7");
        assert_eq!(m.state().calculator.display(), "77");
    }

    #[test]
    fn test_media_buttons_queue_commands() {
        let mut m = machine();
        click_region(&mut m, "media.play-pause");
        click_region(&mut m, "media.next");
        assert_eq!(
            m.state_mut().take_media(),
            vec![MediaCommand::PlayPause, MediaCommand::Next]
        );
    }

    #[test]
    fn test_add_event_flow() {
        let mut m = machine();
        m.request_navigation(ViewId::Calendar);
        click_region(&mut m, "add-event");
        assert_eq!(m.view(), ViewId::AddEvent);
        assert!(m.main_regions().iter().all(|r| !r.name.starts_with("kbd.")));

        click_region(&mut m, "field.title");
        for name in ["kbd.G", "kbd.Y", "kbd.M"] {
            click_region(&mut m, name);
        }
        click_region(&mut m, "kbd.erase");
        click_region(&mut m, "yearly");
        assert_eq!(m.state().form.title, "GY");
        click_region(&mut m, "save");

        assert_eq!(m.view(), ViewId::Calendar);
        assert_eq!(m.state().events.len(), 1);
        assert_eq!(m.state().notifications.unread(), 1);
        let today = m.state().today;
        assert!(m.state().events.events_on(today)[0].yearly);
    }

    #[test]
    fn test_save_empty_title_adds_nothing() {
        let mut m = machine();
        m.apply(Action::BeginAddEvent);
        click_region(&mut m, "save");
        assert_eq!(m.view(), ViewId::Calendar);
        assert!(m.state().events.is_empty());
    }

    #[test]
    fn test_popup_open_and_close() {
        let mut m = machine();
        m.request_navigation(ViewId::Timer);
        click_region(&mut m, "open-stopwatch");
        assert_eq!(m.popup(), Some(PopupKind::Stopwatch));
        let close = m
            .popup_regions()
            .into_iter()
            .find(|r| r.name == "close")
            .unwrap();
        let (x, y) = close.rect.center();
        assert_eq!(m.dispatch_popup(x, y), Some(Action::ClosePopup));
        assert_eq!(m.popup(), None);
        assert!(m.popup_fingerprint().is_none());
    }

    #[test]
    fn test_update_drives_stopwatch_and_fingerprint() {
        let mut m = machine();
        m.apply(Action::OpenPopup(PopupKind::Stopwatch));
        let display = DisplayValues::default();
        let before = m.popup_fingerprint();
        m.update(Duration::from_millis(50), &display);
        assert_eq!(m.popup_fingerprint(), before);
        m.apply(Action::StopwatchToggle);
        m.update(Duration::from_millis(50), &display);
        assert_ne!(m.popup_fingerprint(), before);
    }

    #[test]
    fn test_home_fingerprint_tracks_clock_only_on_home() {
        let mut m = machine();
        let mut display = DisplayValues::default();
        display.clock = "10:00".into();
        let a = m.main_fingerprint(&display);
        display.clock = "10:01".into();
        let b = m.main_fingerprint(&display);
        assert_ne!(a, b);

        m.request_navigation(ViewId::Calculator);
        let c = m.main_fingerprint(&display);
        display.clock = "10:02".into();
        assert_eq!(m.main_fingerprint(&display), c);
    }

    #[test]
    fn test_mirror_closed_when_monitor_gone() {
        let mut m = machine();
        let mut display = DisplayValues::default();
        display.monitors = vec![MonitorInfo { width: 1920, height: 1080 }; 2];
        m.update(Duration::ZERO, &display);
        m.apply(Action::ToggleMirror(1));
        assert_eq!(m.state().mirror, Some(1));
        display.monitors.pop();
        m.update(Duration::ZERO, &display);
        assert_eq!(m.state().mirror, None);
    }
}
