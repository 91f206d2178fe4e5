//! Rasterizer seam: turns panel content into a pixel buffer.
//!
//! The real drawing (fonts, icons, calendar grid) belongs to a drawing
//! collaborator. `FlatRasterizer` paints themed flat blocks for each hit
//! region, enough for headless runs and for checking that content and
//! regions line up.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::scene::Panel;
use super::texture::PixelBuffer;
use crate::display::DisplayValues;
use crate::error::{OverlayError, Result};
use crate::views::ViewMachine;

/// What a panel should show this tick.
pub enum PanelContent<'a> {
    /// The active wrist view.
    View {
        machine: &'a ViewMachine,
        display: &'a DisplayValues,
    },
    /// The open popup.
    Popup { machine: &'a ViewMachine },
    /// Latest captured frame of the mirrored monitor, if any arrived yet.
    Mirror {
        monitor: usize,
        frame: Option<&'a PixelBuffer>,
    },
    Cursor,
}

impl PanelContent<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::View { .. } => "view",
            Self::Popup { .. } => "popup",
            Self::Mirror { .. } => "mirror",
            Self::Cursor => "cursor",
        }
    }
}

pub trait Rasterizer: Send {
    fn rasterize(&mut self, panel: &Panel, content: &PanelContent<'_>) -> Result<PixelBuffer>;
}

// ── Flat rasterizer ──────────────────────────────────────────

/// (background, button) per theme, in theme order.
const PALETTES: [([u8; 4], [u8; 4]); 6] = [
    ([10, 0, 20, 220], [30, 0, 50, 255]),
    ([20, 20, 20, 230], [45, 45, 45, 255]),
    ([240, 240, 245, 235], [200, 200, 210, 255]),
    ([10, 0, 20, 220], [30, 0, 50, 255]),
    ([0, 30, 40, 235], [0, 50, 60, 255]),
    ([0, 10, 0, 240], [0, 30, 0, 255]),
];

#[derive(Debug, Default)]
pub struct FlatRasterizer;

impl FlatRasterizer {
    fn palette(theme: usize) -> ([u8; 4], [u8; 4]) {
        PALETTES[theme % PALETTES.len()]
    }

    fn blocks(panel: &Panel, theme: usize, regions: &[crate::views::HitRegion]) -> PixelBuffer {
        let (bg, button) = Self::palette(theme);
        let mut buf = PixelBuffer::filled(panel.pixel_width, panel.pixel_height, bg);
        for region in regions {
            let r = region.rect;
            buf.fill_rect(r.x0, r.y0, r.x1, r.y1, button);
        }
        buf
    }

    /// Nearest-neighbour resample of `frame` to the panel size.
    fn scaled(panel: &Panel, frame: &PixelBuffer) -> PixelBuffer {
        let (w, h) = (panel.pixel_width, panel.pixel_height);
        let mut out = PixelBuffer::filled(w, h, [0, 0, 0, 255]);
        if frame.width == 0 || frame.height == 0 {
            return out;
        }
        for y in 0..h {
            let sy = (y as u64 * frame.height as u64 / h as u64) as u32;
            for x in 0..w {
                let sx = (x as u64 * frame.width as u64 / w as u64) as u32;
                if let Some(px) = frame.pixel(sx, sy) {
                    out.fill_rect(x, y, x, y, px);
                }
            }
        }
        out
    }
}

impl Rasterizer for FlatRasterizer {
    fn rasterize(&mut self, panel: &Panel, content: &PanelContent<'_>) -> Result<PixelBuffer> {
        let buf = match content {
            PanelContent::View { machine, .. } => {
                Self::blocks(panel, machine.state().theme, &machine.main_regions())
            }
            PanelContent::Popup { machine } => {
                Self::blocks(panel, machine.state().theme, &machine.popup_regions())
            }
            PanelContent::Mirror { frame: Some(frame), .. } => {
                if !frame.is_well_formed() {
                    return Err(OverlayError::raster(&panel.name, "captured frame is truncated"));
                }
                Self::scaled(panel, frame)
            }
            PanelContent::Mirror { frame: None, .. } => {
                PixelBuffer::filled(panel.pixel_width, panel.pixel_height, [0, 0, 0, 255])
            }
            PanelContent::Cursor => {
                let mut buf = PixelBuffer::filled(panel.pixel_width, panel.pixel_height, [0, 0, 0, 0]);
                let (w, h) = (panel.pixel_width, panel.pixel_height);
                buf.fill_rect(w / 4, h / 4, w * 3 / 4, h * 3 / 4, [255, 255, 255, 255]);
                buf
            }
        };
        Ok(buf)
    }
}

// ── Recording wrapper ────────────────────────────────────────

/// Rasterizer calls seen by a `RecordingRasterizer`.
#[derive(Debug, Default)]
pub struct RasterLog {
    pub calls: HashMap<String, usize>,
    failing: HashSet<String>,
}

impl RasterLog {
    pub fn count(&self, panel: &str) -> usize {
        self.calls.get(panel).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.calls.values().sum()
    }
}

/// Counts calls per panel and can be told to fail for a panel. Clones
/// share the same log.
pub struct RecordingRasterizer<R> {
    inner: Arc<Mutex<R>>,
    log: Arc<Mutex<RasterLog>>,
}

impl<R> Clone for RecordingRasterizer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            log: Arc::clone(&self.log),
        }
    }
}

impl<R: Rasterizer> RecordingRasterizer<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
            log: Arc::new(Mutex::new(RasterLog::default())),
        }
    }

    pub fn log(&self) -> MutexGuard<'_, RasterLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_failing(&self, panel: &str, failing: bool) {
        let mut log = self.log();
        if failing {
            log.failing.insert(panel.to_string());
        } else {
            log.failing.remove(panel);
        }
    }
}

impl<R: Rasterizer> Rasterizer for RecordingRasterizer<R> {
    fn rasterize(&mut self, panel: &Panel, content: &PanelContent<'_>) -> Result<PixelBuffer> {
        {
            let mut log = self.log();
            *log.calls.entry(panel.name.to_string()).or_default() += 1;
            if log.failing.contains(&*panel.name) {
                return Err(OverlayError::raster(&panel.name, "injected failure"));
            }
        }
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .rasterize(panel, content)
    }
}
