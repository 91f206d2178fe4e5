//! Tracked-device poses sampled once per tick.

use super::scene::{Mat4, Vec3};

/// Logical controller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Rigid device-to-world transform plus a validity flag.
#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub matrix: Mat4,
    pub valid: bool,
}

impl Pose {
    /// Marker returned when a device is not tracked.
    pub const INVALID: Self = Self {
        matrix: Mat4::IDENTITY,
        valid: false,
    };

    pub fn tracked(matrix: Mat4) -> Self {
        Self {
            matrix,
            valid: true,
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self::tracked(Mat4::translation(x, y, z))
    }

    pub fn position(&self) -> Vec3 {
        self.matrix.position()
    }

    /// The matrix, if the pose is valid.
    pub fn valid_matrix(&self) -> Option<Mat4> {
        self.valid.then_some(self.matrix)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Per-controller sample: pose plus the buttons the core reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerSample {
    pub pose: Pose,
    /// Primary (trigger) button held.
    pub trigger: bool,
    /// Grip button held.
    pub grip: bool,
}

impl ControllerSample {
    pub fn tracked(pose: Mat4) -> Self {
        Self {
            pose: Pose::tracked(pose),
            trigger: false,
            grip: false,
        }
    }

    pub fn with_trigger(mut self, held: bool) -> Self {
        self.trigger = held;
        self
    }

    pub fn with_grip(mut self, held: bool) -> Self {
        self.grip = held;
        self
    }
}

/// Everything the tracking source reports for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseSet {
    pub head: Pose,
    controllers: [ControllerSample; 2],
}

impl PoseSet {
    pub fn new(head: Pose) -> Self {
        Self {
            head,
            controllers: [ControllerSample::default(); 2],
        }
    }

    /// A pose set where nothing is tracked.
    pub fn untracked() -> Self {
        Self::default()
    }

    pub fn with_controller(mut self, hand: Hand, sample: ControllerSample) -> Self {
        self.controllers[hand.index()] = sample;
        self
    }

    pub fn controller(&self, hand: Hand) -> &ControllerSample {
        &self.controllers[hand.index()]
    }

    pub fn controller_mut(&mut self, hand: Hand) -> &mut ControllerSample {
        &mut self.controllers[hand.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pose_set_untracked() {
        let set = PoseSet::untracked();
        assert!(!set.head.valid);
        assert!(!set.controller(Hand::Left).pose.valid);
        assert!(!set.controller(Hand::Right).pose.valid);
    }

    #[test]
    fn test_with_controller_sets_role() {
        let set = PoseSet::new(Pose::at(0.0, 1.6, 0.0)).with_controller(
            Hand::Right,
            ControllerSample::tracked(Mat4::translation(0.2, 1.0, -0.3)).with_trigger(true),
        );
        assert!(set.controller(Hand::Right).trigger);
        assert!(set.controller(Hand::Right).pose.valid);
        assert!(!set.controller(Hand::Left).pose.valid);
        assert!((set.controller(Hand::Right).pose.position().x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_valid_matrix() {
        assert!(Pose::INVALID.valid_matrix().is_none());
        assert!(Pose::at(1.0, 0.0, 0.0).valid_matrix().is_some());
    }

    #[test]
    fn test_hand_other() {
        assert_eq!(Hand::Left.other(), Hand::Right);
        assert_eq!(Hand::Right.as_str(), "right");
    }
}
