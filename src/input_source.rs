//! Pose sources.
//!
//! `PoseSource` is what the tick samples once per iteration. The headless
//! binary reads a `SnapshotPoseSource` fed by the pose-driver worker; tests
//! drive the tick through `ScriptedPoseSource` and inspect what was
//! sampled through `RecordingPoseSource`.

use std::collections::VecDeque;

use crate::snapshot::Snapshot;
use crate::vr::pose::{ControllerSample, Hand, Pose, PoseSet};
use crate::vr::scene::Mat4;

/// Supplies this tick's poses. Must return promptly; an unavailable
/// device is reported as an invalid pose, never as an error.
pub trait PoseSource: Send {
    fn sample(&mut self) -> PoseSet;
}

/// Delivers a pre-defined sequence of pose sets. Once exhausted it keeps
/// returning the last one (or an untracked set if the script was empty).
pub struct ScriptedPoseSource {
    frames: VecDeque<PoseSet>,
    last: PoseSet,
}

impl ScriptedPoseSource {
    pub fn new(frames: Vec<PoseSet>) -> Self {
        Self {
            frames: VecDeque::from(frames),
            last: PoseSet::untracked(),
        }
    }

    /// Append frames to the end of the script.
    pub fn push(&mut self, frame: PoseSet) {
        self.frames.push_back(frame);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl PoseSource for ScriptedPoseSource {
    fn sample(&mut self) -> PoseSet {
        if let Some(next) = self.frames.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Keeps the most recent `capacity` samples from an inner source.
pub struct RecordingPoseSource<P: PoseSource> {
    inner: P,
    recorded: VecDeque<PoseSet>,
    capacity: usize,
    total: u64,
}

impl<P: PoseSource> RecordingPoseSource<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self {
            inner,
            recorded: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    /// Retained samples, oldest first.
    pub fn recorded(&self) -> impl Iterator<Item = &PoseSet> {
        self.recorded.iter()
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    /// Samples taken, including ones no longer retained.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn into_recorded(self) -> Vec<PoseSet> {
        self.recorded.into()
    }
}

impl<P: PoseSource> PoseSource for RecordingPoseSource<P> {
    fn sample(&mut self) -> PoseSet {
        let set = self.inner.sample();
        self.total += 1;
        if self.capacity > 0 {
            if self.recorded.len() == self.capacity {
                self.recorded.pop_front();
            }
            self.recorded.push_back(set);
        }
        set
    }
}

/// Reads the latest pose set published by a background driver.
pub struct SnapshotPoseSource {
    snapshot: Snapshot<PoseSet>,
}

impl SnapshotPoseSource {
    pub fn new(snapshot: Snapshot<PoseSet>) -> Self {
        Self { snapshot }
    }
}

impl PoseSource for SnapshotPoseSource {
    fn sample(&mut self) -> PoseSet {
        self.snapshot.latest()
    }
}

/// Synthetic tracking for headless runs: a standing user holding the
/// watch hand up, while the pointer hand sweeps across the panel and
/// clicks every few seconds.
pub struct SimulatedPoseSource {
    watch_hand: Hand,
    frame: u64,
    frames_per_cycle: u64,
}

impl SimulatedPoseSource {
    pub fn new(watch_hand: Hand, rate_hz: u32) -> Self {
        Self {
            watch_hand,
            frame: 0,
            frames_per_cycle: u64::from(rate_hz.max(1)) * 4,
        }
    }
}

impl PoseSource for SimulatedPoseSource {
    fn sample(&mut self) -> PoseSet {
        self.frame += 1;
        let side = match self.watch_hand {
            Hand::Left => -1.0,
            Hand::Right => 1.0,
        };
        let wrist = Mat4::translation(0.15 * side, 1.2, -0.35);

        // Sweep along the navigation bar row of the panel face.
        let phase = (self.frame % self.frames_per_cycle) as f32 / self.frames_per_cycle as f32;
        let sweep = (phase * std::f32::consts::TAU).sin() * 0.08;
        let pointer = Mat4::translation(0.15 * side + sweep, 1.2, -0.32);
        let held = phase > 0.45 && phase < 0.55;

        PoseSet::new(Pose::at(0.0, 1.6, 0.0))
            .with_controller(self.watch_hand, ControllerSample::tracked(wrist))
            .with_controller(
                self.watch_hand.other(),
                ControllerSample::tracked(pointer).with_trigger(held),
            )
    }
}
