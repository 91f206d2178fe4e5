//! The overlay tick.
//!
//! `Overlay` owns the panel registry, the view machine and the render cache
//! and runs one strictly ordered pipeline per tick:
//!
//! 1. sample poses and resolve every panel's world transform
//! 2. hit-test the pointer, place the cursor, apply grip drags
//! 3. detect the click edge and dispatch it to the hit panel's view
//! 4. run time-driven view updates and sync panel visibility to state
//! 5. publish visibility and transforms for every live panel
//! 6. re-rasterize the panels whose fingerprint changed
//!
//! Every per-tick error is logged and contained; the next tick retries.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{OverlayConfig, CURSOR_PANEL, MAIN_PANEL, POPUP_PANEL, SCREEN_PANEL};
use crate::display::{DisplayValues, MediaCommand};
use crate::error::{OverlayError, Result};
use crate::input_source::PoseSource;
use crate::snapshot::Snapshot;
use crate::state::AppState;
use crate::views::{Action, ViewId, ViewMachine};
use crate::vr::click::ClickEdgeDetector;
use crate::vr::hit_test::{self, HitResult, HoverState, PointerRay};
use crate::vr::pose::PoseSet;
use crate::vr::raster::{PanelContent, Rasterizer};
use crate::vr::render_cache::{CacheStats, RenderCache, RenderDecision, RenderFingerprint};
use crate::vr::scene::{PanelClass, PanelRegistry};
use crate::vr::texture::TextureSink;
use crate::workers::{CapturedFrame, Worker};

// ── Wiring ───────────────────────────────────────────────────

/// Handoffs shared with the background workers. Without workers attached
/// they simply keep their last published value.
#[derive(Clone)]
pub struct Feeds {
    pub display: Snapshot<DisplayValues>,
    pub capture_request: Snapshot<Option<usize>>,
    pub frames: Snapshot<Option<CapturedFrame>>,
    pub media: Option<mpsc::Sender<MediaCommand>>,
}

impl Feeds {
    pub fn new(display: DisplayValues) -> Self {
        Self {
            display: Snapshot::new(display),
            capture_request: Snapshot::new(None),
            frames: Snapshot::new(None),
            media: None,
        }
    }
}

/// Collaborators the overlay drives.
pub struct OverlayParts {
    pub poses: Box<dyn PoseSource>,
    pub rasterizer: Box<dyn Rasterizer>,
    pub clock: Arc<dyn Clock>,
    pub feeds: Feeds,
}

/// What one tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub hit: Option<HitResult>,
    pub clicked: bool,
    /// Action run by this tick's click, if it landed in a region.
    pub action: Option<Action>,
    pub rendered: Vec<Arc<str>>,
    pub failed: Vec<Arc<str>>,
}

impl TickReport {
    pub fn rendered(&self, panel: &str) -> bool {
        self.rendered.iter().any(|p| &**p == panel)
    }
}

// ── Overlay ──────────────────────────────────────────────────

pub struct Overlay {
    config: OverlayConfig,
    registry: PanelRegistry,
    machine: ViewMachine,
    cache: RenderCache,
    clicks: ClickEdgeDetector,
    hover: HoverState,
    poses: Box<dyn PoseSource>,
    rasterizer: Box<dyn Rasterizer>,
    sink: Box<dyn TextureSink>,
    clock: Arc<dyn Clock>,
    feeds: Feeds,
    workers: Vec<Worker>,
    /// Visibility last accepted by the sink.
    shown: HashMap<Arc<str>, bool>,
    watch_tracked: bool,
    last_tick: Option<Instant>,
    last_facing_check: Option<Instant>,
    requested_capture: Option<usize>,
    ticks: u64,
    shut_down: bool,
}

impl Overlay {
    /// Build the overlay. Failing to create the sink is the only fatal
    /// error and is always reported as `SinkCreation`.
    pub fn new<F>(config: OverlayConfig, parts: OverlayParts, create_sink: F) -> Result<Self>
    where
        F: FnOnce(&OverlayConfig) -> Result<Box<dyn TextureSink>>,
    {
        let sink = create_sink(&config).map_err(|e| match e {
            OverlayError::SinkCreation(_) => e,
            other => OverlayError::SinkCreation(other.to_string()),
        })?;

        let mut registry = PanelRegistry::new();
        for spec in &config.panels {
            registry.add(spec.build());
        }
        let shown = registry.iter().map(|p| (Arc::clone(&p.name), false)).collect();

        let today = parts.clock.local_date().unwrap_or_default();
        let mut state = AppState::new(config.themes.clone(), today);
        state.now = parts.clock.local_now().unwrap_or_default();
        state.notifications.post(state.now, "👋", "Welcome", "Wrist overlay ready");

        info!(
            "overlay: {} panel(s), watch on {} hand, {} Hz tick",
            registry.len(),
            config.watch_hand.as_str(),
            config.tick_hz
        );

        Ok(Self {
            config,
            registry,
            machine: ViewMachine::new(state),
            cache: RenderCache::new(),
            clicks: ClickEdgeDetector::new(),
            hover: HoverState::default(),
            poses: parts.poses,
            rasterizer: parts.rasterizer,
            sink,
            clock: parts.clock,
            feeds: parts.feeds,
            workers: Vec::new(),
            shown,
            watch_tracked: false,
            last_tick: None,
            last_facing_check: None,
            requested_capture: None,
            ticks: 0,
            shut_down: false,
        })
    }

    /// Hand a background worker to the overlay; it is stopped at shutdown.
    pub fn attach_worker(&mut self, worker: Worker) {
        debug!("overlay: attached worker {}", worker.name());
        self.workers.push(worker);
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn registry(&self) -> &PanelRegistry {
        &self.registry
    }

    pub fn machine(&self) -> &ViewMachine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut ViewMachine {
        &mut self.machine
    }

    pub fn navigate(&mut self, view: ViewId) {
        self.machine.request_navigation(view);
        self.cache.expedite(MAIN_PANEL);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn click_count(&self) -> u64 {
        self.clicks.click_count()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Run one tick. After `shutdown` this does nothing.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if self.shut_down {
            return report;
        }
        let now = self.clock.now();
        let dt = self
            .last_tick
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);
        self.ticks += 1;
        if let Some(wall) = self.clock.local_now() {
            self.machine.state_mut().now = wall;
        }

        // Poses and placement.
        let poses = self.poses.sample();
        self.registry.resolve_all(&poses);
        self.track_watch_hand(&poses);
        self.check_facing(&poses, now);

        // Pointer.
        let pointer = *poses.controller(self.config.pointer_hand());
        let ray = PointerRay::from_pose(&pointer.pose);
        let hit = hit_test::hit_test(&ray, &self.registry, &self.config.hit);
        self.hover.update(hit.as_ref());
        if let (Some(h), true) = (&hit, pointer.grip) {
            self.drag(h, &poses);
        }
        self.place_cursor(hit.as_ref(), &poses);

        // Click.
        let clicked = match &hit {
            Some(_) => self.clicks.update(pointer.trigger),
            None => {
                self.clicks.reset();
                false
            }
        };
        if let (true, Some(h)) = (clicked, &hit) {
            report.action = self.dispatch_click(h);
        }
        report.clicked = clicked;

        // State.
        let display = self.feeds.display.latest();
        self.machine.update(dt, &display);
        self.flush_media();
        self.sync_panels_to_state();
        self.request_capture();

        // Placement output, then pixels.
        self.publish_visibility();
        self.publish_transforms();
        self.render(now, &display, &mut report);

        report.hit = hit;
        report
    }

    /// Stop the workers and release the sink. No rasterization happens
    /// afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        for worker in &mut self.workers {
            worker.stop();
        }
        self.sink.release();
        let stats = self.cache.stats();
        info!(
            "overlay: shut down after {} tick(s): {} render(s), {} skip(s), {} failure(s)",
            self.ticks, stats.renders, stats.skips, stats.failures
        );
    }

    // ── Tick stages ──────────────────────────────────────────

    fn track_watch_hand(&mut self, poses: &PoseSet) {
        let hand = self.config.watch_hand;
        let tracked = poses.controller(hand).pose.valid;
        if tracked && !self.watch_tracked {
            info!("overlay: {} hand tracked, repainting {}", hand.as_str(), MAIN_PANEL);
            self.cache.invalidate(MAIN_PANEL);
        } else if !tracked && self.watch_tracked {
            let err = OverlayError::TrackingUnavailable(format!("{} controller", hand.as_str()));
            debug!("overlay: {}", err);
        }
        self.watch_tracked = tracked;
    }

    /// Hide the wrist panel while it is turned away from the head.
    fn check_facing(&mut self, poses: &PoseSet, now: Instant) {
        let facing = &self.config.facing;
        if !facing.enabled {
            return;
        }
        if let Some(last) = self.last_facing_check {
            if now.saturating_duration_since(last) < facing.check_interval {
                return;
            }
        }
        self.last_facing_check = Some(now);

        let Some(head) = poses.head.valid_matrix() else {
            return;
        };
        let Some(world) = self.registry.get(MAIN_PANEL).and_then(|p| p.world_transform()) else {
            return;
        };
        let visible = hit_test::is_facing(&world, &head.position(), facing.min_dot);
        if self.registry.set_visible(MAIN_PANEL, visible) {
            debug!("overlay: {} {}", MAIN_PANEL, if visible { "facing" } else { "turned away" });
        }
    }

    /// Grip held over a panel: the panel follows the pointer controller.
    fn drag(&mut self, hit: &HitResult, poses: &PoseSet) {
        let Some(controller) = poses.controller(self.config.pointer_hand()).pose.valid_matrix() else {
            return;
        };
        let Some(panel) = self.registry.get_mut(&hit.panel_name) else {
            return;
        };
        let Some(anchor) = panel.anchor_pose(poses) else {
            return;
        };
        if let Some(offset) = hit_test::grip_offset(&anchor, &controller) {
            panel.local_offset = offset;
            panel.resolve(poses);
        }
    }

    fn place_cursor(&mut self, hit: Option<&HitResult>, poses: &PoseSet) {
        let offset = self.config.hit.indicator_offset;
        let placement = hit.and_then(|h| {
            let world = self.registry.get(&h.panel_name)?.world_transform()?;
            Some(hit_test::indicator_transform(&world, &h.local, offset))
        });
        match placement {
            Some(transform) => {
                if let Some(cursor) = self.registry.get_mut(CURSOR_PANEL) {
                    cursor.local_offset = transform;
                    cursor.resolve(poses);
                }
                self.registry.set_visible(CURSOR_PANEL, true);
            }
            None => {
                self.registry.set_visible(CURSOR_PANEL, false);
            }
        }
    }

    fn dispatch_click(&mut self, hit: &HitResult) -> Option<Action> {
        let (x, y) = hit.pixel();
        let action = match hit.panel_class {
            PanelClass::Watch => self.machine.dispatch_main(x, y),
            PanelClass::Popup => self.machine.dispatch_popup(x, y),
            PanelClass::Mirror | PanelClass::Cursor => {
                debug!("overlay: click on '{}' absorbed", hit.panel_name);
                None
            }
        };
        if let Some(action) = &action {
            debug!("overlay: click ({}, {}) on '{}' -> {:?}", x, y, hit.panel_name, action);
            self.cache.expedite(MAIN_PANEL);
            self.cache.expedite(POPUP_PANEL);
        }
        action
    }

    fn flush_media(&mut self) {
        for command in self.machine.state_mut().take_media() {
            match &self.feeds.media {
                Some(tx) => {
                    if tx.send(command).is_err() {
                        warn!("overlay: media worker gone, dropped {}", command.as_str());
                    }
                }
                None => debug!("overlay: no media worker, dropped {}", command.as_str()),
            }
        }
    }

    fn sync_panels_to_state(&mut self) {
        let popup = self.machine.popup().is_some();
        let mirror = self.machine.state().mirror.is_some();
        self.registry.set_visible(POPUP_PANEL, popup);
        self.registry.set_visible(SCREEN_PANEL, mirror);
    }

    fn request_capture(&mut self) {
        let wanted = self.machine.state().mirror;
        if wanted != self.requested_capture {
            match wanted {
                Some(m) => info!("overlay: mirroring monitor {}", m),
                None => info!("overlay: mirror closed"),
            }
            self.feeds.capture_request.publish(wanted);
            self.requested_capture = wanted;
        }
    }

    /// Send visibility changes to the sink. A panel that becomes shown is
    /// invalidated so it never reappears with stale pixels.
    fn publish_visibility(&mut self) {
        for panel in self.registry.iter() {
            let live = panel.is_live();
            let shown = self.shown.get(&panel.name).copied().unwrap_or(false);
            if live == shown {
                continue;
            }
            if panel.visible && !live {
                let err = OverlayError::PanelUnresolvable(panel.name.to_string());
                debug!("overlay: {}", err);
            }
            match self.sink.set_visible(&panel.name, live) {
                Ok(()) => {
                    self.shown.insert(Arc::clone(&panel.name), live);
                    if live {
                        self.cache.invalidate(&panel.name);
                    }
                }
                Err(e) => warn!("overlay: {}", e),
            }
        }
    }

    fn publish_transforms(&mut self) {
        for panel in self.registry.iter() {
            if !panel.is_live() {
                continue;
            }
            let Some(world) = panel.world_transform() else {
                continue;
            };
            if let Err(e) = self.sink.publish_transform(&panel.name, &world) {
                debug!("overlay: {}", e);
            }
        }
    }

    fn render(&mut self, now: Instant, display: &DisplayValues, report: &mut TickReport) {
        let frame = self.feeds.frames.latest();
        let machine = &self.machine;

        for panel in self.registry.iter() {
            if !panel.is_live() {
                continue;
            }
            let cadence = self.config.refresh.cadence(panel.class);
            if !self.cache.is_due(&panel.name, now, cadence) {
                continue;
            }

            let (fingerprint, content) = match panel.class {
                PanelClass::Watch => (
                    machine.main_fingerprint(display),
                    PanelContent::View { machine, display },
                ),
                PanelClass::Popup => match machine.popup_fingerprint() {
                    Some(fp) => (fp, PanelContent::Popup { machine }),
                    None => continue,
                },
                PanelClass::Mirror => {
                    let Some(monitor) = machine.state().mirror else {
                        continue;
                    };
                    let captured = frame.as_ref().filter(|f| f.monitor == monitor);
                    (
                        RenderFingerprint::of(&(monitor, captured.map(|f| f.sequence))),
                        PanelContent::Mirror {
                            monitor,
                            frame: captured.map(|f| f.buffer.as_ref()),
                        },
                    )
                }
                PanelClass::Cursor => (RenderFingerprint::of(CURSOR_PANEL), PanelContent::Cursor),
            };

            let RenderDecision::Render(fp) = self.cache.decide(&panel.name, fingerprint, now) else {
                continue;
            };

            let result = self
                .rasterizer
                .rasterize(panel, &content)
                .and_then(|buffer| self.sink.publish_texture(&panel.name, &buffer));
            match result {
                Ok(()) => {
                    debug!("overlay: rendered '{}' ({})", panel.name, content.kind());
                    self.cache.commit(&panel.name, fp);
                    report.rendered.push(Arc::clone(&panel.name));
                }
                Err(e) => {
                    warn!("overlay: {}", e);
                    self.cache.fail(&panel.name);
                    report.failed.push(Arc::clone(&panel.name));
                }
            }
        }
    }
}

impl Drop for Overlay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::input_source::ScriptedPoseSource;
    use crate::vr::pose::{ControllerSample, Hand, Pose};
    use crate::vr::raster::{FlatRasterizer, RecordingRasterizer};
    use crate::vr::scene::Mat4;
    use crate::vr::texture::MemorySink;

    const WRIST: (f32, f32, f32) = (-0.15, 1.2, -0.35);

    fn poses(pointer: Option<(f32, f32, f32)>, trigger: bool) -> PoseSet {
        let (wx, wy, wz) = WRIST;
        let mut set = PoseSet::new(Pose::at(0.0, 1.6, 0.0))
            .with_controller(Hand::Left, ControllerSample::tracked(Mat4::translation(wx, wy, wz)));
        if let Some((x, y, z)) = pointer {
            set = set.with_controller(
                Hand::Right,
                ControllerSample::tracked(Mat4::translation(x, y, z)).with_trigger(trigger),
            );
        }
        set
    }

    /// Pointer origin at main-panel pixel (px, py).
    fn at_pixel(px: f32, py: f32) -> (f32, f32, f32) {
        let (wx, wy, wz) = WRIST;
        let x = (px / 600.0 - 0.5) * 0.20;
        let y = (0.5 - py / 400.0) * (0.20 * 400.0 / 600.0);
        (wx + x, wy + 0.05 + y, wz + 0.02)
    }

    fn overlay(
        frames: Vec<PoseSet>,
    ) -> (Overlay, MemorySink, RecordingRasterizer<FlatRasterizer>, Arc<TestClock>) {
        let sink = MemorySink::new();
        let raster = RecordingRasterizer::new(FlatRasterizer);
        let clock = Arc::new(TestClock::at_unix_millis(1_792_411_200_000));
        let parts = OverlayParts {
            poses: Box::new(ScriptedPoseSource::new(frames)),
            rasterizer: Box::new(raster.clone()),
            clock: clock.clone(),
            feeds: Feeds::new(DisplayValues::default()),
        };
        let shared = sink.clone();
        let overlay = Overlay::new(OverlayConfig::default(), parts, move |_| {
            Ok(Box::new(shared) as Box<dyn TextureSink>)
        })
        .unwrap();
        (overlay, sink, raster, clock)
    }

    #[test]
    fn test_sink_failure_is_fatal_at_startup() {
        let parts = OverlayParts {
            poses: Box::new(ScriptedPoseSource::new(vec![])),
            rasterizer: Box::new(FlatRasterizer),
            clock: Arc::new(TestClock::new()),
            feeds: Feeds::new(DisplayValues::default()),
        };
        let result = Overlay::new(OverlayConfig::default(), parts, |_| {
            Err(OverlayError::sink("main", "no compositor"))
        });
        assert!(matches!(result, Err(OverlayError::SinkCreation(_))));
    }

    #[test]
    fn test_notifications_stamped_from_clock() {
        let (mut ov, _sink, _raster, clock) = overlay(vec![poses(None, false)]);
        let welcome = ov.machine().state().notifications.recent(1).next().unwrap().posted_at;
        assert_eq!(welcome.timestamp_millis(), 1_792_411_200_000);

        clock.advance(Duration::from_secs(90));
        ov.tick();
        ov.machine_mut().state_mut().form.title = "Dentist".into();
        ov.machine_mut().apply(Action::SaveEvent);
        let saved = ov.machine().state().notifications.recent(1).next().unwrap();
        assert_eq!(saved.title, "Event created");
        assert_eq!(saved.posted_at.timestamp_millis(), 1_792_411_290_000);
    }

    #[test]
    fn test_first_tick_shows_and_renders_main() {
        let (mut ov, sink, raster, _clock) = overlay(vec![poses(None, false)]);
        let report = ov.tick();
        assert!(report.hit.is_none());
        assert!(report.rendered(MAIN_PANEL));
        assert_eq!(raster.log().count(MAIN_PANEL), 1);
        let log = sink.log();
        assert!(log.is_visible(MAIN_PANEL));
        assert!(!log.is_visible(POPUP_PANEL));
        assert!(log.transforms.contains_key(MAIN_PANEL));
    }

    #[test]
    fn test_pointer_hit_places_cursor() {
        let (mut ov, sink, _raster, _clock) = overlay(vec![poses(Some(at_pixel(300.0, 200.0)), false)]);
        let report = ov.tick();
        let hit = report.hit.as_ref().unwrap();
        assert_eq!(&*hit.panel_name, MAIN_PANEL);
        let (px, py) = hit.pixel();
        assert!(px.abs_diff(300) <= 1 && py.abs_diff(200) <= 1, "px={} py={}", px, py);
        assert!(sink.log().is_visible(CURSOR_PANEL));
        assert!(report.rendered(CURSOR_PANEL));
    }

    #[test]
    fn test_release_on_nav_button_navigates() {
        // Calendar is the third nav button.
        let target = at_pixel(218.0, 347.0);
        let (mut ov, _sink, _raster, _clock) = overlay(vec![
            poses(Some(target), false),
            poses(Some(target), true),
            poses(Some(target), false),
        ]);
        assert!(!ov.tick().clicked);
        assert!(!ov.tick().clicked);
        let report = ov.tick();
        assert!(report.clicked);
        assert_eq!(report.action, Some(Action::Navigate(ViewId::Calendar)));
        assert_eq!(ov.machine().view(), ViewId::Calendar);
        assert!(report.rendered(MAIN_PANEL));
    }

    #[test]
    fn test_release_off_panel_does_not_click() {
        let on = at_pixel(218.0, 347.0);
        let (mut ov, _sink, _raster, _clock) = overlay(vec![
            poses(Some(on), true),
            poses(Some((2.0, 2.0, 2.0)), false),
            poses(Some(on), false),
        ]);
        for _ in 0..3 {
            assert!(!ov.tick().clicked);
        }
        assert_eq!(ov.click_count(), 0);
    }

    #[test]
    fn test_shutdown_releases_and_stops_rendering() {
        let (mut ov, sink, raster, _clock) = overlay(vec![poses(None, false)]);
        ov.tick();
        ov.shutdown();
        assert!(sink.log().released);
        let before = raster.log().total();
        let report = ov.tick();
        assert!(report.rendered.is_empty());
        assert_eq!(raster.log().total(), before);
        assert!(ov.is_shut_down());
    }
}
