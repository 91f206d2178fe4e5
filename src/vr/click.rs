//! Click-edge detection on a polled trigger signal.
//!
//! A click fires on the falling edge (release). The previous sample is
//! cleared whenever the pointer is lost, so a trigger held across a
//! tracking gap never produces a click.

/// Falling-edge detector for the pointer trigger.
#[derive(Debug, Default, Clone)]
pub struct ClickEdgeDetector {
    previous_held: bool,
    clicks: u64,
}

impl ClickEdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this tick's sample. Returns true when a click fires.
    pub fn update(&mut self, held: bool) -> bool {
        let clicked = self.previous_held && !held;
        self.previous_held = held;
        if clicked {
            self.clicks += 1;
        }
        clicked
    }

    /// Forget the previous sample (pointer pose invalid or off-panel).
    pub fn reset(&mut self) {
        self.previous_held = false;
    }

    pub fn previous_held(&self) -> bool {
        self.previous_held
    }

    /// Clicks fired since creation.
    pub fn click_count(&self) -> u64 {
        self.clicks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(samples: &[bool]) -> Vec<bool> {
        let mut det = ClickEdgeDetector::new();
        samples.iter().map(|&h| det.update(h)).collect()
    }

    #[test]
    fn test_press_release_single_click() {
        assert_eq!(run(&[false, true, true, false]), vec![false, false, false, true]);
    }

    #[test]
    fn test_always_held_never_clicks() {
        assert_eq!(run(&[true, true, true]), vec![false, false, false]);
    }

    #[test]
    fn test_held_at_start_then_release_clicks_once() {
        // The detector starts released; an initial held sample is a press.
        assert_eq!(run(&[true, false, false]), vec![false, true, false]);
    }

    #[test]
    fn test_reset_suppresses_release() {
        let mut det = ClickEdgeDetector::new();
        det.update(true);
        det.reset();
        assert!(!det.previous_held());
        assert!(!det.update(false));
        assert_eq!(det.click_count(), 0);
    }

    #[test]
    fn test_multiple_clicks_counted() {
        let mut det = ClickEdgeDetector::new();
        for h in [true, false, true, false, false] {
            det.update(h);
        }
        assert_eq!(det.click_count(), 2);
    }
}
