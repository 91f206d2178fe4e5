//! Overlay configuration.
//!
//! Every tuned constant lives here with its field default, so the hit-test
//! tolerances can be re-validated per headset without code changes.

use std::time::Duration;

use crate::vr::pose::Hand;
use crate::vr::scene::{AnchorMode, Panel, PanelClass, Transform3D};

pub const MAIN_PANEL: &str = "main";
pub const POPUP_PANEL: &str = "popup";
pub const SCREEN_PANEL: &str = "screen";
pub const CURSOR_PANEL: &str = "cursor";

/// Spatial hit-test tolerances.
#[derive(Debug, Clone)]
pub struct HitTestConfig {
    /// Overshoot factor applied to the panel half extents.
    pub margin: f32,
    /// Accepted |local z| per class (meters).
    pub watch_depth: f32,
    pub popup_depth: f32,
    pub mirror_depth: f32,
    /// Distance the cursor floats in front of the panel (meters).
    pub indicator_offset: f32,
}

impl Default for HitTestConfig {
    fn default() -> Self {
        Self {
            margin: 1.1,
            watch_depth: 0.08,
            popup_depth: 0.10,
            mirror_depth: 0.15,
            indicator_offset: 0.005,
        }
    }
}

impl HitTestConfig {
    pub fn depth_tolerance(&self, class: PanelClass) -> f32 {
        match class {
            PanelClass::Watch => self.watch_depth,
            PanelClass::Popup => self.popup_depth,
            PanelClass::Mirror => self.mirror_depth,
            PanelClass::Cursor => 0.0,
        }
    }
}

/// Minimum interval between fingerprint evaluations per class.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub watch: Duration,
    pub popup: Duration,
    pub mirror: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            watch: Duration::from_millis(500),
            popup: Duration::from_millis(33),
            mirror: Duration::from_millis(66),
        }
    }
}

impl RefreshConfig {
    pub fn cadence(&self, class: PanelClass) -> Duration {
        match class {
            PanelClass::Watch => self.watch,
            PanelClass::Popup => self.popup,
            PanelClass::Mirror => self.mirror,
            PanelClass::Cursor => Duration::ZERO,
        }
    }
}

/// Auto-hide of the wrist panel when it is turned away from the head.
#[derive(Debug, Clone)]
pub struct FacingConfig {
    pub enabled: bool,
    /// Minimum dot(panel +Z, direction to head).
    pub min_dot: f32,
    pub check_interval: Duration,
}

impl Default for FacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_dot: 0.10,
            check_interval: Duration::from_millis(100),
        }
    }
}

/// Placement and size of one panel.
#[derive(Debug, Clone)]
pub struct PanelSpec {
    pub name: &'static str,
    pub class: PanelClass,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub physical_width_m: f32,
    pub anchor: AnchorMode,
    pub offset: Transform3D,
    pub sort_order: i32,
    pub initially_visible: bool,
}

impl PanelSpec {
    pub fn build(&self) -> Panel {
        let panel = Panel::new(
            self.name,
            self.class,
            self.pixel_width,
            self.pixel_height,
            self.physical_width_m,
        )
        .anchored(self.anchor, self.offset.to_mat4())
        .sorted(self.sort_order);
        if self.initially_visible {
            panel
        } else {
            panel.hidden()
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Hand wearing the watch panel; the other hand points.
    pub watch_hand: Hand,
    pub tick_hz: u32,
    pub hit: HitTestConfig,
    pub refresh: RefreshConfig,
    pub facing: FacingConfig,
    pub panels: Vec<PanelSpec>,
    /// Names of the themes the drawing collaborator knows.
    pub themes: Vec<String>,
    pub display_poll_interval: Duration,
    pub capture_interval: Duration,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self::for_watch_hand(Hand::Left)
    }
}

impl OverlayConfig {
    /// Default layout with the watch on `watch_hand`.
    pub fn for_watch_hand(watch_hand: Hand) -> Self {
        Self {
            watch_hand,
            tick_hz: 250,
            hit: HitTestConfig::default(),
            refresh: RefreshConfig::default(),
            facing: FacingConfig::default(),
            panels: default_panels(watch_hand),
            themes: ["Cyberpunk", "Dark", "Light", "Neon", "Cyan", "Matrix"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            display_poll_interval: Duration::from_millis(500),
            capture_interval: Duration::from_millis(66),
        }
    }

    pub fn pointer_hand(&self) -> Hand {
        self.watch_hand.other()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_hz.max(1) as u64)
    }

    pub fn panel_spec(&self, name: &str) -> Option<&PanelSpec> {
        self.panels.iter().find(|p| p.name == name)
    }
}

fn default_panels(watch_hand: Hand) -> Vec<PanelSpec> {
    vec![
        PanelSpec {
            name: MAIN_PANEL,
            class: PanelClass::Watch,
            pixel_width: 600,
            pixel_height: 400,
            physical_width_m: 0.20,
            anchor: AnchorMode::ControllerRelative(watch_hand),
            offset: Transform3D::at(0.0, 0.05, 0.02),
            sort_order: 1,
            initially_visible: true,
        },
        PanelSpec {
            name: POPUP_PANEL,
            class: PanelClass::Popup,
            pixel_width: 700,
            pixel_height: 550,
            physical_width_m: 0.55,
            anchor: AnchorMode::HeadRelative,
            offset: Transform3D::at(0.0, 0.0, -0.45),
            sort_order: 2,
            initially_visible: false,
        },
        PanelSpec {
            name: SCREEN_PANEL,
            class: PanelClass::Mirror,
            pixel_width: 1280,
            pixel_height: 720,
            physical_width_m: 1.2,
            anchor: AnchorMode::HeadRelative,
            offset: Transform3D::at(0.0, 0.0, -1.2),
            sort_order: 3,
            initially_visible: false,
        },
        PanelSpec {
            name: CURSOR_PANEL,
            class: PanelClass::Cursor,
            pixel_width: 64,
            pixel_height: 64,
            physical_width_m: 0.012,
            anchor: AnchorMode::WorldFixed,
            offset: Transform3D::default(),
            sort_order: 100,
            initially_visible: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let cfg = OverlayConfig::default();
        assert_eq!(cfg.panels.len(), 4);
        assert_eq!(cfg.pointer_hand(), Hand::Right);
        let main = cfg.panel_spec(MAIN_PANEL).unwrap();
        assert_eq!(main.anchor, AnchorMode::ControllerRelative(Hand::Left));
        assert_eq!((main.pixel_width, main.pixel_height), (600, 400));
    }

    #[test]
    fn test_left_handed_swaps_roles() {
        let cfg = OverlayConfig::for_watch_hand(Hand::Right);
        assert_eq!(cfg.pointer_hand(), Hand::Left);
        assert_eq!(
            cfg.panel_spec(MAIN_PANEL).unwrap().anchor,
            AnchorMode::ControllerRelative(Hand::Right)
        );
    }

    #[test]
    fn test_depth_tolerance_per_class() {
        let hit = HitTestConfig::default();
        assert!((hit.depth_tolerance(PanelClass::Watch) - 0.08).abs() < 1e-6);
        assert!((hit.depth_tolerance(PanelClass::Popup) - 0.10).abs() < 1e-6);
        assert!((hit.depth_tolerance(PanelClass::Mirror) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_tick_interval() {
        let cfg = OverlayConfig::default();
        assert_eq!(cfg.tick_interval(), Duration::from_millis(4));
    }

    #[test]
    fn test_spec_builds_hidden_panel() {
        let cfg = OverlayConfig::default();
        let popup = cfg.panel_spec(POPUP_PANEL).unwrap().build();
        assert!(!popup.visible);
        assert_eq!(popup.sort_order, 2);
    }
}
