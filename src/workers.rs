//! Background producers.
//!
//! Slow or blocking work (display polling, frame capture, media key
//! presses, tracking hardware) runs on worker threads and reaches the tick
//! only through `Snapshot`s or a channel, so the tick never blocks on I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::display::{DisplayValues, DisplayValuesSource, MediaCommand, MonitorInfo};
use crate::input_source::PoseSource;
use crate::snapshot::Snapshot;
use crate::vr::pose::PoseSet;
use crate::vr::texture::PixelBuffer;

/// Longest a worker sleeps before re-checking its stop flag.
const STOP_POLL: Duration = Duration::from_millis(20);

// ── Worker handle ────────────────────────────────────────────

/// A named thread with a stop flag. Stopped and joined on drop.
pub struct Worker {
    name: &'static str,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Run `step` every `interval` until stopped.
    pub fn periodic<F>(name: &'static str, interval: Duration, mut step: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(format!("overlay-{}", name))
            .spawn(move || {
                info!("worker {}: started ({}ms)", name, interval.as_millis());
                while !flag.load(Ordering::Relaxed) {
                    let started = Instant::now();
                    step();
                    sleep_until_stopped(&flag, interval.saturating_sub(started.elapsed()));
                }
                debug!("worker {}: exiting", name);
            })?;
        Ok(Self {
            name,
            stop,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("worker {}: panicked", self.name);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sleep_until_stopped(flag: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while !flag.load(Ordering::Relaxed) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        thread::sleep(left.min(STOP_POLL));
    }
}

// ── Display poller ───────────────────────────────────────────

pub fn spawn_display_poller(
    mut source: Box<dyn DisplayValuesSource>,
    out: Snapshot<DisplayValues>,
    interval: Duration,
) -> std::io::Result<Worker> {
    Worker::periodic("display", interval, move || out.publish(source.poll()))
}

// ── Screen capture ───────────────────────────────────────────

/// Grabs one frame of a monitor, or `None` if it is gone.
pub trait FrameCapture: Send {
    fn capture(&mut self, monitor: usize) -> Option<PixelBuffer>;
}

/// One captured frame. `sequence` increases per capture.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub monitor: usize,
    pub sequence: u64,
    pub buffer: Arc<PixelBuffer>,
}

/// Captures whichever monitor `request` names, publishing into `frames`.
pub fn spawn_capture_worker(
    mut capture: Box<dyn FrameCapture>,
    request: Snapshot<Option<usize>>,
    frames: Snapshot<Option<CapturedFrame>>,
    interval: Duration,
) -> std::io::Result<Worker> {
    let mut sequence = 0u64;
    Worker::periodic("capture", interval, move || {
        let Some(monitor) = request.latest() else {
            return;
        };
        match capture.capture(monitor) {
            Some(buffer) => {
                sequence += 1;
                frames.publish(Some(CapturedFrame {
                    monitor,
                    sequence,
                    buffer: Arc::new(buffer),
                }));
            }
            None => debug!("worker capture: monitor {} returned no frame", monitor),
        }
    })
}

/// Generated frames for headless runs: a flat color that shifts with
/// every capture.
#[derive(Debug, Clone)]
pub struct SyntheticCapture {
    monitors: Vec<MonitorInfo>,
    width: u32,
    height: u32,
    counter: u8,
}

impl SyntheticCapture {
    pub fn new(monitors: Vec<MonitorInfo>) -> Self {
        Self {
            monitors,
            width: 320,
            height: 180,
            counter: 0,
        }
    }
}

impl FrameCapture for SyntheticCapture {
    fn capture(&mut self, monitor: usize) -> Option<PixelBuffer> {
        if monitor >= self.monitors.len() {
            return None;
        }
        self.counter = self.counter.wrapping_add(1);
        let shade = (monitor as u8).wrapping_mul(60);
        Some(PixelBuffer::filled(
            self.width,
            self.height,
            [shade, self.counter, 128, 255],
        ))
    }
}

// ── Media keys ───────────────────────────────────────────────

/// Sends playback keys to the system media session.
pub trait MediaKeys: Send {
    fn press(&mut self, command: MediaCommand) -> anyhow::Result<()>;
}

/// Logs key presses. Used when no media session is reachable.
#[derive(Debug, Default)]
pub struct LoggingMediaKeys;

impl MediaKeys for LoggingMediaKeys {
    fn press(&mut self, command: MediaCommand) -> anyhow::Result<()> {
        info!("media: {}", command.as_str());
        Ok(())
    }
}

/// Owns the media thread and the sending half of its queue.
pub struct MediaWorker {
    sender: mpsc::Sender<MediaCommand>,
    worker: Worker,
}

impl MediaWorker {
    pub fn spawn(mut keys: Box<dyn MediaKeys>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<MediaCommand>();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("overlay-media".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    match receiver.recv_timeout(STOP_POLL * 5) {
                        Ok(command) => {
                            if let Err(e) = keys.press(command) {
                                warn!("media: {} failed: {}", command.as_str(), e);
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        Ok(Self {
            sender,
            worker: Worker {
                name: "media",
                stop,
                handle: Some(handle),
            },
        })
    }

    pub fn sender(&self) -> mpsc::Sender<MediaCommand> {
        self.sender.clone()
    }

    pub fn into_worker(self) -> Worker {
        self.worker
    }
}

// ── Pose driver ──────────────────────────────────────────────

/// Samples a (possibly slow) tracking source off the tick.
pub fn spawn_pose_driver(
    mut source: Box<dyn PoseSource>,
    out: Snapshot<PoseSet>,
    interval: Duration,
) -> std::io::Result<Worker> {
    Worker::periodic("poses", interval, move || out.publish(source.sample()))
}
