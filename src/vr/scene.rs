//! Panel scene: rigid-transform math and the panel registry.
//!
//! Core types:
//! - `Vec3`, `Quat`, `Mat4`: minimal math for rigid transforms
//! - `Transform3D`: position + rotation, convertible to `Mat4`
//! - `Panel`: a flat surface with a pixel grid and a 3D placement
//! - `PanelRegistry`: all panels, kept in hit-test priority order

use std::sync::Arc;
use tracing::{debug, info};

use super::pose::{Hand, PoseSet};

// ── Math types ───────────────────────────────────────────────

/// 3D vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }

    pub fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, o: Self) -> f32 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn normalize(self) -> Self {
        let len = self.length();
        if len < 1e-10 {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }
}

/// Quaternion for rotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Create quaternion from Euler angles (yaw, pitch, roll) in radians.
    pub fn from_euler(yaw: f32, pitch: f32, roll: f32) -> Self {
        let (sy, cy) = (yaw * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sr, cr) = (roll * 0.5).sin_cos();

        Self {
            x: cr * sp * cy + sr * cp * sy,
            y: cr * cp * sy - sr * sp * cy,
            z: sr * cp * cy - cr * sp * sy,
            w: cr * cp * cy + sr * sp * sy,
        }
    }
}

/// 4x4 matrix (column-major, OpenGL convention). Only rigid transforms
/// (rotation + translation) are produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub data: [f32; 16],
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Create translation matrix.
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.data[12] = x;
        m.data[13] = y;
        m.data[14] = z;
        m
    }

    /// Create rotation matrix from quaternion.
    pub fn from_quat(q: &Quat) -> Self {
        let (x, y, z, w) = (q.x, q.y, q.z, q.w);
        let x2 = x + x;
        let y2 = y + y;
        let z2 = z + z;
        let xx = x * x2;
        let xy = x * y2;
        let xz = x * z2;
        let yy = y * y2;
        let yz = y * z2;
        let zz = z * z2;
        let wx = w * x2;
        let wy = w * y2;
        let wz = w * z2;

        Self {
            data: [
                1.0 - (yy + zz),
                xy + wz,
                xz - wy,
                0.0,
                xy - wz,
                1.0 - (xx + zz),
                yz + wx,
                0.0,
                xz + wy,
                yz - wx,
                1.0 - (xx + yy),
                0.0,
                0.0,
                0.0,
                0.0,
                1.0,
            ],
        }
    }

    /// Compose: `self · other` (apply `other` first).
    pub fn mul(&self, other: &Self) -> Self {
        let mut out = [0.0f32; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.data[k * 4 + row] * other.data[col * 4 + k];
                }
                out[col * 4 + row] = sum;
            }
        }
        Self { data: out }
    }

    /// Inverse of a rigid transform: transposed rotation, rotated and
    /// negated translation. Returns `None` for non-finite input.
    pub fn inverse(&self) -> Option<Self> {
        if self.data.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let mut inv = [0.0f32; 16];

        inv[0] = self.data[0];
        inv[1] = self.data[4];
        inv[2] = self.data[8];
        inv[4] = self.data[1];
        inv[5] = self.data[5];
        inv[6] = self.data[9];
        inv[8] = self.data[2];
        inv[9] = self.data[6];
        inv[10] = self.data[10];

        let tx = self.data[12];
        let ty = self.data[13];
        let tz = self.data[14];
        inv[12] = -(inv[0] * tx + inv[4] * ty + inv[8] * tz);
        inv[13] = -(inv[1] * tx + inv[5] * ty + inv[9] * tz);
        inv[14] = -(inv[2] * tx + inv[6] * ty + inv[10] * tz);
        inv[15] = 1.0;

        Some(Self { data: inv })
    }

    /// Transform a point (w = 1).
    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        let d = &self.data;
        Vec3::new(
            d[0] * p.x + d[4] * p.y + d[8] * p.z + d[12],
            d[1] * p.x + d[5] * p.y + d[9] * p.z + d[13],
            d[2] * p.x + d[6] * p.y + d[10] * p.z + d[14],
        )
    }

    /// Transform a direction (w = 0).
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        let d = &self.data;
        Vec3::new(
            d[0] * v.x + d[4] * v.y + d[8] * v.z,
            d[1] * v.x + d[5] * v.y + d[9] * v.z,
            d[2] * v.x + d[6] * v.y + d[10] * v.z,
        )
    }

    /// Local basis axis `i` (0 = X, 1 = Y, 2 = Z) in world space.
    pub fn axis(&self, i: usize) -> Vec3 {
        let c = i * 4;
        Vec3::new(self.data[c], self.data[c + 1], self.data[c + 2])
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.data[12], self.data[13], self.data[14])
    }

    /// Copy of `self` with its translation replaced.
    pub fn with_position(mut self, p: Vec3) -> Self {
        self.data[12] = p.x;
        self.data[13] = p.y;
        self.data[14] = p.z;
        self
    }

    /// Build a matrix from a `Transform3D`.
    pub fn from_transform(t: &Transform3D) -> Self {
        let trans = Self::translation(t.position.x, t.position.y, t.position.z);
        trans.mul(&Self::from_quat(&t.rotation))
    }
}

// ── Transform ────────────────────────────────────────────────

/// Rigid transform: position + rotation.
#[derive(Debug, Clone, Copy)]
pub struct Transform3D {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform3D {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn rotated(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_transform(self)
    }
}

// ── Panels ───────────────────────────────────────────────────

/// What a panel's placement is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// Follows a hand controller.
    ControllerRelative(Hand),
    /// Fixed in tracking space.
    WorldFixed,
    /// Follows the head pose.
    HeadRelative,
}

/// Panel class: selects depth tolerance and refresh cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelClass {
    /// Wrist control panel.
    Watch,
    /// Large head-relative popup.
    Popup,
    /// Live screen mirror.
    Mirror,
    /// Pointer indicator. Never a hit target.
    Cursor,
}

impl PanelClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Popup => "popup",
            Self::Mirror => "mirror",
            Self::Cursor => "cursor",
        }
    }
}

/// A flat virtual surface with a pixel grid and a 3D placement.
#[derive(Debug, Clone)]
pub struct Panel {
    pub name: Arc<str>,
    pub class: PanelClass,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub physical_width_m: f32,
    pub anchor: AnchorMode,
    pub local_offset: Mat4,
    pub visible: bool,
    pub sort_order: i32,
    /// `anchor × local_offset` for the current tick, `None` when the
    /// anchor device is not tracked.
    world: Option<Mat4>,
}

impl Panel {
    pub fn new(
        name: &str,
        class: PanelClass,
        pixel_width: u32,
        pixel_height: u32,
        physical_width_m: f32,
    ) -> Self {
        Self {
            name: Arc::from(name),
            class,
            pixel_width: pixel_width.max(1),
            pixel_height: pixel_height.max(1),
            physical_width_m,
            anchor: AnchorMode::WorldFixed,
            local_offset: Mat4::IDENTITY,
            visible: true,
            sort_order: 0,
            world: None,
        }
    }

    pub fn anchored(mut self, anchor: AnchorMode, offset: Mat4) -> Self {
        self.anchor = anchor;
        self.local_offset = offset;
        self
    }

    pub fn sorted(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Height derived from width and pixel aspect.
    pub fn physical_height_m(&self) -> f32 {
        self.physical_width_m * self.pixel_height as f32 / self.pixel_width as f32
    }

    /// Half width and half height in meters.
    pub fn half_extents(&self) -> (f32, f32) {
        let hw = self.physical_width_m * 0.5;
        (hw, hw * self.pixel_height as f32 / self.pixel_width as f32)
    }

    pub fn world_transform(&self) -> Option<Mat4> {
        self.world
    }

    pub fn is_hit_target(&self) -> bool {
        self.class != PanelClass::Cursor
    }

    /// Visible and resolvable this tick.
    pub fn is_live(&self) -> bool {
        self.visible && self.world.is_some()
    }

    /// The anchor pose this panel composes with, if tracked.
    pub fn anchor_pose(&self, poses: &PoseSet) -> Option<Mat4> {
        match self.anchor {
            AnchorMode::ControllerRelative(hand) => poses.controller(hand).pose.valid_matrix(),
            AnchorMode::HeadRelative => poses.head.valid_matrix(),
            AnchorMode::WorldFixed => Some(Mat4::IDENTITY),
        }
    }

    /// Recompute the world transform from this tick's poses.
    pub fn resolve(&mut self, poses: &PoseSet) -> Option<Mat4> {
        self.world = self.anchor_pose(poses).map(|a| a.mul(&self.local_offset));
        self.world
    }
}

/// All panels, ordered by descending `sort_order` (hit-test priority).
#[derive(Debug, Default)]
pub struct PanelRegistry {
    panels: Vec<Panel>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a panel. A panel with the same name is replaced.
    pub fn add(&mut self, panel: Panel) {
        self.panels.retain(|p| p.name != panel.name);
        info!(
            "panel registry: added '{}' ({}x{} px, {:.3} m, sort {})",
            panel.name, panel.pixel_width, panel.pixel_height, panel.physical_width_m, panel.sort_order
        );
        self.panels.push(panel);
        // Stable: equal sort orders keep insertion order.
        self.panels.sort_by(|a, b| b.sort_order.cmp(&a.sort_order));
    }

    pub fn get(&self, name: &str) -> Option<&Panel> {
        self.panels.iter().find(|p| &*p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|p| &*p.name == name)
    }

    /// Panels in priority order (highest `sort_order` first).
    pub fn iter(&self) -> impl Iterator<Item = &Panel> {
        self.panels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Panel> {
        self.panels.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Recompute every panel's world transform for this tick.
    pub fn resolve_all(&mut self, poses: &PoseSet) {
        for panel in &mut self.panels {
            if panel.resolve(poses).is_none() && panel.visible {
                debug!("panel registry: '{}' unresolvable this tick", panel.name);
            }
        }
    }

    /// Set a panel's visibility. Returns true when the value changed.
    pub fn set_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.get_mut(name) {
            Some(panel) if panel.visible != visible => {
                panel.visible = visible;
                debug!("panel registry: '{}' visible={}", name, visible);
                true
            }
            _ => false,
        }
    }

    /// Replace a panel's local offset (grip repositioning).
    pub fn set_local_offset(&mut self, name: &str, offset: Mat4) {
        if let Some(panel) = self.get_mut(name) {
            panel.local_offset = offset;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
