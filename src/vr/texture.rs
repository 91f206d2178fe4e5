//! Texture/transform sink for panel content.
//!
//! Pipeline: rasterizer -> `PixelBuffer` -> `TextureSink::publish_texture`
//! -> host runtime overlay. Transforms go through the same sink every tick.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use super::scene::Mat4;
use crate::error::{OverlayError, Result};

/// Pixel layout of a buffer handed to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        4
    }
}

/// A rasterized image plus its logical size.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// A buffer filled with one RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            format: TextureFormat::Rgba8,
            data,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// RGBA at (x, y), or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.data.get(i..i + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Fill an inclusive pixel rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgba: [u8; 4]) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let x1 = x1.min(self.width - 1);
        let y1 = y1.min(self.height - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let i = (y as usize * self.width as usize + x as usize) * 4;
                if let Some(p) = self.data.get_mut(i..i + 4) {
                    p.copy_from_slice(&rgba);
                }
            }
        }
    }
}

/// Host-side overlay surface: receives transforms, textures and visibility.
pub trait TextureSink: Send {
    fn publish_transform(&mut self, panel: &str, world: &Mat4) -> Result<()>;
    fn publish_texture(&mut self, panel: &str, buffer: &PixelBuffer) -> Result<()>;
    fn set_visible(&mut self, panel: &str, visible: bool) -> Result<()>;
    /// Release every overlay handle. Called once at shutdown.
    fn release(&mut self);
}

// ── In-memory sink ───────────────────────────────────────────

/// Everything a `MemorySink` has received.
#[derive(Debug, Default)]
pub struct SinkLog {
    pub transforms: HashMap<String, Mat4>,
    pub transform_count: usize,
    /// Uploads per panel.
    pub texture_counts: HashMap<String, usize>,
    /// Size of the latest upload per panel.
    pub texture_sizes: HashMap<String, (u32, u32)>,
    pub visibility: HashMap<String, bool>,
    pub released: bool,
    failing: HashSet<String>,
}

impl SinkLog {
    pub fn texture_count(&self, panel: &str) -> usize {
        self.texture_counts.get(panel).copied().unwrap_or(0)
    }

    pub fn texture_size(&self, panel: &str) -> Option<(u32, u32)> {
        self.texture_sizes.get(panel).copied()
    }

    pub fn total_textures(&self) -> usize {
        self.texture_counts.values().sum()
    }

    pub fn is_visible(&self, panel: &str) -> bool {
        self.visibility.get(panel).copied().unwrap_or(false)
    }
}

/// Sink that keeps state in memory. Used by the headless runtime and tests;
/// clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        info!("texture sink: in-memory sink created");
        Self::default()
    }

    /// Inspect the received calls.
    pub fn log(&self) -> MutexGuard<'_, SinkLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make texture uploads for `panel` fail until cleared.
    pub fn set_failing(&self, panel: &str, failing: bool) {
        let mut log = self.log();
        if failing {
            log.failing.insert(panel.to_string());
        } else {
            log.failing.remove(panel);
        }
    }
}

impl TextureSink for MemorySink {
    fn publish_transform(&mut self, panel: &str, world: &Mat4) -> Result<()> {
        let mut log = self.log();
        log.transforms.insert(panel.to_string(), *world);
        log.transform_count += 1;
        Ok(())
    }

    fn publish_texture(&mut self, panel: &str, buffer: &PixelBuffer) -> Result<()> {
        let mut log = self.log();
        if log.failing.contains(panel) {
            return Err(OverlayError::sink(panel, "upload rejected"));
        }
        if !buffer.is_well_formed() {
            return Err(OverlayError::sink(panel, "buffer size does not match dimensions"));
        }
        *log.texture_counts.entry(panel.to_string()).or_default() += 1;
        log.texture_sizes
            .insert(panel.to_string(), (buffer.width, buffer.height));
        debug!("texture sink: '{}' {}x{}", panel, buffer.width, buffer.height);
        Ok(())
    }

    fn set_visible(&mut self, panel: &str, visible: bool) -> Result<()> {
        self.log().visibility.insert(panel.to_string(), visible);
        Ok(())
    }

    fn release(&mut self) {
        let mut log = self.log();
        if !log.released {
            info!("texture sink: released {} overlay(s)", log.visibility.len());
        }
        log.released = true;
    }
}
