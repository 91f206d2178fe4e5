//! Headless backend: runs the overlay tick on a calloop event loop with
//! simulated tracking, an in-memory sink and the flat rasterizer.
//!
//! Handles SIGTERM/SIGINT gracefully, can exit after a fixed time for CI,
//! and logs a periodic status line.

use crate::clock::{Clock, SystemClock};
use crate::config::OverlayConfig;
use crate::display::{DisplayValues, MonitorInfo, SystemDisplayValues};
use crate::input_source::{SimulatedPoseSource, SnapshotPoseSource};
use crate::runtime::{Feeds, Overlay, OverlayParts};
use crate::snapshot::Snapshot;
use crate::views::ViewId;
use crate::vr::pose::PoseSet;
use crate::vr::raster::FlatRasterizer;
use crate::vr::texture::{MemorySink, TextureSink};
use crate::workers::{
    spawn_capture_worker, spawn_display_poller, spawn_pose_driver, LoggingMediaKeys, MediaWorker,
    SyntheticCapture,
};
use calloop::{
    signals::{Signal, Signals},
    timer::{TimeoutAction, Timer},
    EventLoop,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Exit after N seconds (CI).
    pub exit_after: Option<u64>,
    pub status_interval: Duration,
    /// Virtual monitors offered to the screen mirror.
    pub monitors: Vec<MonitorInfo>,
    /// View shown at startup instead of home.
    pub start_view: Option<ViewId>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            exit_after: None,
            status_interval: Duration::from_secs(60),
            monitors: vec![MonitorInfo {
                width: 1920,
                height: 1080,
            }],
            start_view: None,
        }
    }
}

impl HeadlessConfig {
    /// Parse a "WxH" resolution string. Returns (width, height) or None.
    pub fn parse_resolution(s: &str) -> Option<(u32, u32)> {
        let (w, h) = s.trim().split_once('x')?;
        let w = w.parse::<u32>().ok()?;
        let h = h.parse::<u32>().ok()?;
        if w > 0 && h > 0 {
            Some((w, h))
        } else {
            None
        }
    }

    /// Parse a comma-separated monitor list, e.g. "1920x1080,2560x1440".
    /// At most four monitors are kept.
    pub fn parse_monitors(s: &str) -> Option<Vec<MonitorInfo>> {
        let monitors = s
            .split(',')
            .map(|part| {
                Self::parse_resolution(part).map(|(width, height)| MonitorInfo { width, height })
            })
            .collect::<Option<Vec<_>>>()?;
        if monitors.is_empty() {
            return None;
        }
        Some(monitors.into_iter().take(4).collect())
    }
}

/// Event loop data.
struct LoopState {
    overlay: Overlay,
    running: bool,
}

/// Run the overlay headless until a signal or the exit timer stops it.
pub fn run(config: OverlayConfig, options: HeadlessConfig) -> anyhow::Result<()> {
    let mut event_loop = EventLoop::<LoopState>::try_new()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let media = MediaWorker::spawn(Box::new(LoggingMediaKeys))?;
    let mut feeds = Feeds::new(DisplayValues::now());
    feeds.media = Some(media.sender());
    let poses = Snapshot::new(PoseSet::untracked());

    let parts = OverlayParts {
        poses: Box::new(SnapshotPoseSource::new(poses.clone())),
        rasterizer: Box::new(FlatRasterizer),
        clock,
        feeds: feeds.clone(),
    };
    let mut overlay = Overlay::new(config.clone(), parts, |_| {
        Ok(Box::new(MemorySink::new()) as Box<dyn TextureSink>)
    })?;

    // Background producers
    overlay.attach_worker(spawn_pose_driver(
        Box::new(SimulatedPoseSource::new(config.watch_hand, config.tick_hz)),
        poses,
        config.tick_interval(),
    )?);
    overlay.attach_worker(spawn_display_poller(
        Box::new(SystemDisplayValues {
            monitors: options.monitors.clone(),
        }),
        feeds.display.clone(),
        config.display_poll_interval,
    )?);
    overlay.attach_worker(spawn_capture_worker(
        Box::new(SyntheticCapture::new(options.monitors.clone())),
        feeds.capture_request.clone(),
        feeds.frames.clone(),
        config.capture_interval,
    )?);
    overlay.attach_worker(media.into_worker());
    info!("Headless overlay: {} virtual monitor(s)", options.monitors.len());

    if let Some(view) = options.start_view {
        overlay.navigate(view);
    }

    let mut state = LoopState {
        overlay,
        running: true,
    };

    // Overlay tick
    let tick_interval = config.tick_interval();
    event_loop
        .handle()
        .insert_source(Timer::from_duration(tick_interval), move |_, _, state: &mut LoopState| {
            let report = state.overlay.tick();
            if let Some(action) = report.action {
                info!("Headless click: {:?} -> {:?}", report.hit.map(|h| h.pixel()), action);
            }
            TimeoutAction::ToDuration(tick_interval)
        })
        .map_err(|e| anyhow::anyhow!("failed to register tick timer: {}", e.error))?;

    // Signal handling: SIGTERM and SIGINT for graceful shutdown
    let signals = Signals::new(&[Signal::SIGTERM, Signal::SIGINT])
        .map_err(|e| anyhow::anyhow!("failed to create signal source: {}", e))?;
    event_loop
        .handle()
        .insert_source(signals, |event, _, state: &mut LoopState| {
            info!("Received signal {:?}, initiating graceful shutdown", event.signal());
            SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
            state.running = false;
        })
        .map_err(|e| anyhow::anyhow!("failed to register signal handler: {}", e.error))?;

    // Exit timer for CI
    if let Some(seconds) = options.exit_after {
        info!("Will exit after {} seconds", seconds);
        event_loop
            .handle()
            .insert_source(
                Timer::from_duration(Duration::from_secs(seconds)),
                |_, _, state: &mut LoopState| {
                    info!("Headless exit timer fired");
                    state.running = false;
                    TimeoutAction::Drop
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to register exit timer: {}", e.error))?;
    }

    // Periodic status logging
    let status_interval = options.status_interval;
    event_loop
        .handle()
        .insert_source(
            Timer::from_duration(status_interval),
            move |_, _, state: &mut LoopState| {
                let overlay = &state.overlay;
                let stats = overlay.cache_stats();
                info!(
                    "Headless status: {} tick(s), view {}, {} click(s), {} render(s), {} skip(s), {} failure(s)",
                    overlay.ticks(),
                    overlay.machine().view().as_str(),
                    overlay.click_count(),
                    stats.renders,
                    stats.skips,
                    stats.failures
                );
                TimeoutAction::ToDuration(status_interval)
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to register status timer: {}", e.error))?;

    info!(
        "Headless backend initialized (tick interval: {}us), entering event loop",
        tick_interval.as_micros()
    );

    while state.running {
        // Check global shutdown flag (set by signal handler)
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            state.running = false;
            break;
        }
        event_loop.dispatch(Some(tick_interval), &mut state)?;
    }

    state.overlay.shutdown();
    info!("Headless backend shut down after {} tick(s)", state.overlay.ticks());
    Ok(())
}
