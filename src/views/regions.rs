//! Hit-region layouts, in panel pixels.
//!
//! The wrist panel is 600x400 and the popup 700x550. The drawing side uses
//! the same rectangles, so what is drawn is what is clickable.

use chrono::{Datelike, NaiveDate};

use super::calculator::{CalcKey, Op};
use super::{Action, HitRegion, PixelRect, PopupKind, ViewId};
use crate::display::MediaCommand;
use crate::state::{AppState, FormField};

pub const MAIN_WIDTH: u32 = 600;

/// Navigation bar order on the home view.
pub const NAV_ORDER: [ViewId; 7] = [
    ViewId::Home,
    ViewId::Notifications,
    ViewId::Calendar,
    ViewId::Screens,
    ViewId::Timer,
    ViewId::Calculator,
    ViewId::Settings,
];

/// On-screen keyboard keys; `None` is backspace.
pub const KEYBOARD: [Option<char>; 38] = {
    let mut keys = [None; 38];
    let chars = *b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";
    let mut i = 0;
    while i < chars.len() {
        keys[i] = Some(chars[i] as char);
        i += 1;
    }
    keys
};

const KEYBOARD_COLUMNS: u32 = 10;
/// Key rows are clipped here so they never reach the form buttons.
const KEYBOARD_BOTTOM: u32 = 330;

/// Calculator keypad, row by row; `0` spans two columns.
const KEYPAD: [[Option<CalcKey>; 4]; 4] = [
    [
        Some(CalcKey::Clear),
        Some(CalcKey::Backspace),
        Some(CalcKey::Op(Op::Div)),
        Some(CalcKey::Op(Op::Mul)),
    ],
    [
        Some(CalcKey::Digit(7)),
        Some(CalcKey::Digit(8)),
        Some(CalcKey::Digit(9)),
        Some(CalcKey::Op(Op::Sub)),
    ],
    [
        Some(CalcKey::Digit(4)),
        Some(CalcKey::Digit(5)),
        Some(CalcKey::Digit(6)),
        Some(CalcKey::Op(Op::Add)),
    ],
    [
        Some(CalcKey::Digit(1)),
        Some(CalcKey::Digit(2)),
        Some(CalcKey::Digit(3)),
        Some(CalcKey::Equals),
    ],
];

fn back() -> HitRegion {
    HitRegion::new("back", PixelRect::new(460, 340, 120, 45), Action::Navigate(ViewId::Home))
}

/// Regions of the wrist panel for `view`.
pub fn view_regions(view: ViewId, state: &AppState) -> Vec<HitRegion> {
    match view {
        ViewId::Home => home(),
        ViewId::Notifications => vec![
            HitRegion::new("mark-read", PixelRect::new(20, 340, 130, 45), Action::MarkAllRead),
            HitRegion::new("clear", PixelRect::new(160, 340, 130, 45), Action::ClearNotifications),
            back(),
        ],
        ViewId::Calendar => vec![
            HitRegion::new(
                "open-month",
                PixelRect::new(30, 250, 260, 45),
                Action::OpenPopup(PopupKind::CalendarMonth),
            ),
            HitRegion::new("add-event", PixelRect::new(310, 250, 260, 45), Action::BeginAddEvent),
            back(),
        ],
        ViewId::AddEvent => add_event(state),
        ViewId::Screens => screens(state),
        ViewId::Timer => vec![
            HitRegion::new("toggle", PixelRect::new(100, 180, 180, 55), Action::StopwatchToggle),
            HitRegion::new("reset", PixelRect::new(300, 180, 180, 55), Action::StopwatchReset),
            HitRegion::new(
                "open-stopwatch",
                PixelRect::new(150, 260, 300, 50),
                Action::OpenPopup(PopupKind::Stopwatch),
            ),
            back(),
        ],
        ViewId::Calculator => calculator(),
        ViewId::Settings => settings(state),
    }
}

/// Regions of the popup panel.
pub fn popup_regions(kind: PopupKind, state: &AppState) -> Vec<HitRegion> {
    match kind {
        PopupKind::CalendarMonth => month(state),
        PopupKind::Stopwatch => vec![
            HitRegion::new("toggle", PixelRect::new(100, 270, 200, 65), Action::StopwatchToggle),
            HitRegion::new("reset", PixelRect::new(320, 270, 200, 65), Action::StopwatchReset),
            HitRegion::new("add-minute", PixelRect::new(220, 360, 200, 50), Action::StopwatchAddMinute),
            HitRegion::new("close", PixelRect::new(540, 480, 130, 50), Action::ClosePopup),
        ],
    }
}

fn home() -> Vec<HitRegion> {
    let mut regions = Vec::with_capacity(4 + NAV_ORDER.len());
    for (i, command) in [MediaCommand::Previous, MediaCommand::PlayPause, MediaCommand::Next]
        .into_iter()
        .enumerate()
    {
        let x = 55 + i as u32 * 95;
        regions.push(HitRegion::new(
            format!("media.{}", command.as_str()),
            PixelRect::new(x, 248, 80, 40),
            Action::Media(command),
        ));
    }
    regions.push(HitRegion::new(
        "notifications",
        PixelRect::bounds(430, 180, 590, 295),
        Action::Navigate(ViewId::Notifications),
    ));

    let (bw, gap) = (75, 6);
    let count = NAV_ORDER.len() as u32;
    let total = count * bw + (count - 1) * gap;
    let start = (MAIN_WIDTH - total) / 2;
    for (i, view) in NAV_ORDER.into_iter().enumerate() {
        let x = start + i as u32 * (bw + gap);
        regions.push(HitRegion::new(
            format!("nav.{}", view.as_str()),
            PixelRect::new(x, 315, bw, 65),
            Action::Navigate(view),
        ));
    }
    regions
}

fn add_event(state: &AppState) -> Vec<HitRegion> {
    let mut regions = vec![
        HitRegion::new(
            "field.title",
            PixelRect::bounds(30, 85, 570, 120),
            Action::Focus(FormField::Title),
        ),
        HitRegion::new(
            "field.time",
            PixelRect::bounds(350, 130, 450, 160),
            Action::Focus(FormField::Time),
        ),
        HitRegion::new("yearly", PixelRect::bounds(480, 130, 570, 160), Action::ToggleYearly),
    ];

    if state.form.focus.is_some() {
        for (i, key) in KEYBOARD.iter().enumerate() {
            let (row, col) = (i as u32 / KEYBOARD_COLUMNS, i as u32 % KEYBOARD_COLUMNS);
            let x = 20 + col * 56;
            let y = 175 + row * 44;
            let rect = PixelRect::bounds(x, y, x + 52, (y + 40).min(KEYBOARD_BOTTOM));
            let (name, action) = match key {
                Some(' ') => ("kbd.space".to_string(), Action::Type(' ')),
                Some(c) => (format!("kbd.{}", c), Action::Type(*c)),
                None => ("kbd.erase".to_string(), Action::Erase),
            };
            regions.push(HitRegion::new(name, rect, action));
        }
    }

    regions.push(HitRegion::new("save", PixelRect::new(30, 340, 170, 45), Action::SaveEvent));
    regions.push(HitRegion::new(
        "cancel",
        PixelRect::new(220, 340, 170, 45),
        Action::Navigate(ViewId::Calendar),
    ));
    regions.push(back());
    regions
}

fn screens(state: &AppState) -> Vec<HitRegion> {
    let mut regions: Vec<HitRegion> = (0..state.monitor_count.min(4))
        .map(|i| {
            let y = 65 + i as u32 * 60;
            HitRegion::new(
                format!("monitor.{}", i),
                PixelRect::bounds(30, y, 420, y + 52),
                Action::ToggleMirror(i),
            )
        })
        .collect();
    if state.mirror.is_some() {
        regions.push(HitRegion::new(
            "close-mirror",
            PixelRect::new(440, 65, 140, 50),
            Action::CloseMirror,
        ));
    }
    regions.push(back());
    regions
}

fn calculator() -> Vec<HitRegion> {
    let (bw, bh, gx, gy) = (125, 48, 8, 6);
    let cell = |col: u32, row: u32, span: u32| {
        let x = 35 + col * (bw + gx);
        let y = 112 + row * (bh + gy);
        PixelRect::new(x, y, bw * span + gx * (span - 1), bh)
    };

    let mut regions = Vec::with_capacity(20);
    for (row, keys) in KEYPAD.iter().enumerate() {
        for (col, key) in keys.iter().enumerate() {
            if let Some(key) = key {
                regions.push(HitRegion::new(
                    format!("key.{}", key.label()),
                    cell(col as u32, row as u32, 1),
                    Action::Calc(*key),
                ));
            }
        }
    }
    regions.push(HitRegion::new("key.0", cell(0, 4, 2), Action::Calc(CalcKey::Digit(0))));
    regions.push(HitRegion::new("key..", cell(2, 4, 1), Action::Calc(CalcKey::Point)));
    regions.push(HitRegion::new("back", cell(3, 4, 1), Action::Navigate(ViewId::Home)));
    regions
}

fn settings(state: &AppState) -> Vec<HitRegion> {
    let mut regions = vec![HitRegion::new(
        "next-theme",
        PixelRect::bounds(30, 135, 570, 185),
        Action::NextTheme,
    )];
    let (bw, bh, cols) = (125, 35, 4);
    for (i, name) in state.themes.iter().enumerate() {
        let (row, col) = (i as u32 / cols, i as u32 % cols);
        regions.push(HitRegion::new(
            format!("theme.{}", name.to_lowercase()),
            PixelRect::new(35 + col * (bw + 10), 220 + row * (bh + 8), bw, bh),
            Action::SetTheme(i),
        ));
    }
    regions.push(back());
    regions
}

/// Days of the month starting at `first`, with their (column, row) in a
/// Monday-first grid.
pub fn month_cells(first: NaiveDate) -> Vec<(NaiveDate, u32, u32)> {
    let lead = first.weekday().num_days_from_monday();
    first
        .iter_days()
        .take_while(|d| d.month() == first.month())
        .enumerate()
        .map(|(i, d)| {
            let idx = lead + i as u32;
            (d, idx % 7, idx / 7)
        })
        .collect()
}

/// Center of a day cell in popup pixels.
pub fn day_cell_center(col: u32, row: u32) -> (u32, u32) {
    (65 + col * 90, 112 + row * 55)
}

fn month(state: &AppState) -> Vec<HitRegion> {
    let mut regions = vec![
        HitRegion::new("prev-month", PixelRect::new(30, 20, 70, 50), Action::ShiftMonth(-1)),
        HitRegion::new("next-month", PixelRect::new(600, 20, 70, 50), Action::ShiftMonth(1)),
        HitRegion::new("close", PixelRect::new(560, 485, 110, 42), Action::ClosePopup),
    ];
    for (date, col, row) in month_cells(state.displayed_month()) {
        let (x, y) = day_cell_center(col, row);
        regions.push(HitRegion::new(
            format!("day.{}", date.day()),
            PixelRect::bounds(x - 35, y - 16, x + 35, y + 26),
            Action::SelectDate(date),
        ));
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::region_at;

    fn state() -> AppState {
        AppState::new(
            ["Cyberpunk", "Dark", "Light", "Neon", "Cyan", "Matrix"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        )
    }

    fn find<'a>(regions: &'a [HitRegion], name: &str) -> &'a HitRegion {
        regions.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn test_nav_bar_is_centered() {
        let regions = view_regions(ViewId::Home, &state());
        assert_eq!(find(&regions, "nav.home").rect.x0, 19);
        assert_eq!(find(&regions, "nav.settings").rect.x1, 19 + 6 * 81 + 75);
    }

    #[test]
    fn test_home_regions_disjoint() {
        let regions = view_regions(ViewId::Home, &state());
        for (i, a) in regions.iter().enumerate() {
            let (x, y) = a.rect.center();
            assert_eq!(region_at(&regions, x, y).unwrap().name, a.name, "region {}", i);
        }
    }

    #[test]
    fn test_keyboard_only_when_focused() {
        let mut s = state();
        assert_eq!(view_regions(ViewId::AddEvent, &s).len(), 6);
        s.form.focus = Some(FormField::Time);
        let regions = view_regions(ViewId::AddEvent, &s);
        assert_eq!(regions.len(), 6 + KEYBOARD.len());
        assert!(regions.iter().all(|r| !r.name.starts_with("kbd.") || r.rect.y1 <= KEYBOARD_BOTTOM));
        // Below the clipped keyboard the save button still wins.
        assert_eq!(region_at(&regions, 40, 345).unwrap().name, "save");
    }

    #[test]
    fn test_calculator_point_reachable() {
        let regions = view_regions(ViewId::Calculator, &state());
        let point = find(&regions, "key..");
        let (x, y) = point.rect.center();
        assert_eq!(region_at(&regions, x, y).unwrap().action, Action::Calc(CalcKey::Point));
        let zero = find(&regions, "key.0");
        assert_eq!(zero.rect.x1 - zero.rect.x0, 258);
        assert_eq!(regions.len(), 19);
    }

    #[test]
    fn test_screens_rows_follow_monitors() {
        let mut s = state();
        s.monitor_count = 6;
        let regions = view_regions(ViewId::Screens, &s);
        assert_eq!(regions.iter().filter(|r| r.name.starts_with("monitor.")).count(), 4);
        assert!(regions.iter().all(|r| r.name != "close-mirror"));
        s.mirror = Some(0);
        let regions = view_regions(ViewId::Screens, &s);
        assert!(regions.iter().any(|r| r.name == "close-mirror"));
    }

    #[test]
    fn test_settings_theme_grid() {
        let regions = view_regions(ViewId::Settings, &state());
        let neon = find(&regions, "theme.neon");
        assert_eq!((neon.rect.x0, neon.rect.y0), (35 + 3 * 135, 220));
        let cyan = find(&regions, "theme.cyan");
        assert_eq!((cyan.rect.x0, cyan.rect.y0), (35, 263));
    }

    #[test]
    fn test_month_cells_monday_first() {
        // 1 October 2026 is a Thursday.
        let cells = month_cells(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(cells.len(), 31);
        assert_eq!((cells[0].1, cells[0].2), (3, 0));
        assert_eq!((cells[4].1, cells[4].2), (0, 1));
    }

    #[test]
    fn test_month_popup_day_click() {
        let s = state();
        let regions = popup_regions(PopupKind::CalendarMonth, &s);
        let (x, y) = day_cell_center(0, 1);
        assert_eq!(
            region_at(&regions, x, y).unwrap().action,
            Action::SelectDate(NaiveDate::from_ymd_opt(2026, 10, 5).unwrap())
        );
    }
}
