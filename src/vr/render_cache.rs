//! Render-state cache: decides per panel whether content must be
//! re-rasterized this tick.
//!
//! A fingerprint is only committed after the sink accepted the texture, so
//! a failed raster or upload is retried on the next evaluation. Transforms
//! are not tracked here; they are republished every tick.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};
use tracing::debug;

/// Opaque summary of every input that affects a panel's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderFingerprint(u64);

impl RenderFingerprint {
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Outcome of a cache check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderDecision {
    /// Cadence not elapsed or content unchanged.
    Skip,
    /// Rasterize and publish, then `commit` the fingerprint.
    Render(RenderFingerprint),
}

#[derive(Debug, Default)]
struct CacheEntry {
    committed: Option<RenderFingerprint>,
    last_check: Option<Instant>,
    forced: bool,
}

/// Cache statistics, logged by the status timer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub renders: u64,
    pub skips: u64,
    pub failures: u64,
}

/// Per-panel fingerprints and evaluation times.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the panel should be evaluated at `now` given its cadence.
    pub fn is_due(&self, panel: &str, now: Instant, cadence: Duration) -> bool {
        match self.entries.get(panel) {
            None => true,
            Some(entry) if entry.forced => true,
            Some(entry) => match entry.last_check {
                None => true,
                Some(last) => now.saturating_duration_since(last) >= cadence,
            },
        }
    }

    /// Compare `fingerprint` against the committed one.
    pub fn decide(&mut self, panel: &str, fingerprint: RenderFingerprint, now: Instant) -> RenderDecision {
        let entry = self.entries.entry(panel.to_string()).or_default();
        entry.last_check = Some(now);
        if entry.forced || entry.committed != Some(fingerprint) {
            RenderDecision::Render(fingerprint)
        } else {
            self.stats.skips += 1;
            RenderDecision::Skip
        }
    }

    /// Record a successful publish.
    pub fn commit(&mut self, panel: &str, fingerprint: RenderFingerprint) {
        let entry = self.entries.entry(panel.to_string()).or_default();
        entry.committed = Some(fingerprint);
        entry.forced = false;
        self.stats.renders += 1;
    }

    /// Record a failed raster or upload: the old fingerprint stays and the
    /// next evaluation ignores the cadence.
    pub fn fail(&mut self, panel: &str) {
        let entry = self.entries.entry(panel.to_string()).or_default();
        entry.forced = true;
        self.stats.failures += 1;
    }

    /// Force a mismatch on the next evaluation (visibility toggle, click,
    /// tracking resume).
    pub fn invalidate(&mut self, panel: &str) {
        debug!("render cache: '{}' invalidated", panel);
        self.entries.entry(panel.to_string()).or_default().forced = true;
    }

    /// Evaluate on the next step regardless of cadence. Unlike `invalidate`
    /// an unchanged fingerprint still skips.
    pub fn expedite(&mut self, panel: &str) {
        if let Some(entry) = self.entries.get_mut(panel) {
            entry.last_check = None;
        }
    }

    pub fn committed(&self, panel: &str) -> Option<RenderFingerprint> {
        self.entries.get(panel).and_then(|e| e.committed)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(cache: &mut RenderCache, fp: RenderFingerprint, now: Instant, cadence: Duration) -> bool {
        if !cache.is_due("main", now, cadence) {
            return false;
        }
        match cache.decide("main", fp, now) {
            RenderDecision::Render(fp) => {
                cache.commit("main", fp);
                true
            }
            RenderDecision::Skip => false,
        }
    }

    #[test]
    fn test_identical_inputs_render_once() {
        let mut cache = RenderCache::new();
        let t0 = Instant::now();
        let fp = RenderFingerprint::of(&("home", 42u32));
        assert!(step(&mut cache, fp, t0, Duration::ZERO));
        assert!(!step(&mut cache, fp, t0 + Duration::from_millis(4), Duration::ZERO));
        assert_eq!(cache.stats().renders, 1);
    }

    #[test]
    fn test_changed_input_renders_once_more() {
        let mut cache = RenderCache::new();
        let t0 = Instant::now();
        let a = RenderFingerprint::of(&("home", 42u32));
        let b = RenderFingerprint::of(&("home", 43u32));
        assert_ne!(a, b);
        assert!(step(&mut cache, a, t0, Duration::ZERO));
        assert!(step(&mut cache, b, t0 + Duration::from_millis(4), Duration::ZERO));
        assert!(!step(&mut cache, b, t0 + Duration::from_millis(8), Duration::ZERO));
        assert_eq!(cache.stats().renders, 2);
    }

    #[test]
    fn test_cadence_caps_evaluation() {
        let mut cache = RenderCache::new();
        let t0 = Instant::now();
        let cadence = Duration::from_millis(500);
        let a = RenderFingerprint::of(&1u8);
        let b = RenderFingerprint::of(&2u8);
        assert!(step(&mut cache, a, t0, cadence));
        assert!(!step(&mut cache, b, t0 + Duration::from_millis(100), cadence));
        assert!(step(&mut cache, b, t0 + Duration::from_millis(500), cadence));
    }

    #[test]
    fn test_invalidate_bypasses_cadence_and_fingerprint() {
        let mut cache = RenderCache::new();
        let t0 = Instant::now();
        let cadence = Duration::from_secs(10);
        let fp = RenderFingerprint::of(&1u8);
        assert!(step(&mut cache, fp, t0, cadence));
        cache.invalidate("main");
        assert!(step(&mut cache, fp, t0 + Duration::from_millis(1), cadence));
        assert!(!step(&mut cache, fp, t0 + Duration::from_millis(2), cadence));
    }

    #[test]
    fn test_expedite_bypasses_cadence_only() {
        let mut cache = RenderCache::new();
        let t0 = Instant::now();
        let cadence = Duration::from_secs(10);
        let a = RenderFingerprint::of(&1u8);
        let b = RenderFingerprint::of(&2u8);
        assert!(step(&mut cache, a, t0, cadence));
        cache.expedite("main");
        assert!(!step(&mut cache, a, t0 + Duration::from_millis(1), cadence));
        cache.expedite("main");
        assert!(step(&mut cache, b, t0 + Duration::from_millis(2), cadence));
    }

    #[test]
    fn test_failure_keeps_old_fingerprint_and_retries() {
        let mut cache = RenderCache::new();
        let t0 = Instant::now();
        let cadence = Duration::from_secs(10);
        let a = RenderFingerprint::of(&1u8);
        let b = RenderFingerprint::of(&2u8);
        assert!(step(&mut cache, a, t0, cadence));

        cache.invalidate("main");
        assert_eq!(cache.decide("main", b, t0), RenderDecision::Render(b));
        cache.fail("main");
        assert_eq!(cache.committed("main"), Some(a));

        assert!(cache.is_due("main", t0 + Duration::from_millis(1), cadence));
        assert!(step(&mut cache, b, t0 + Duration::from_millis(1), cadence));
        assert_eq!(cache.committed("main"), Some(b));
        assert_eq!(cache.stats().failures, 1);
    }
}
