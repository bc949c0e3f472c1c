//! Stuck target detection

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::StuckParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Watches the target from cycle to cycle for signs that the agent has
/// stopped making progress.
#[derive(Debug, Clone, Default)]
pub struct StuckDetector {
    params: StuckParams,

    /// The target from the previous cycle
    last_target_m: Option<Vector2<f64>>,

    /// Number of consecutive stuck cycles
    stuck_count: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StuckDetector {
    pub fn new(params: StuckParams) -> Self {
        Self {
            params,
            last_target_m: None,
            stuck_count: 0,
        }
    }

    /// Forget all history, for use when starting a new path.
    pub fn reset(&mut self) {
        self.last_target_m = None;
        self.stuck_count = 0;
    }

    pub fn stuck_count(&self) -> u32 {
        self.stuck_count
    }

    pub fn params(&self) -> &StuckParams {
        &self.params
    }

    /// Check the new target against the last one.
    ///
    /// Returns true if the agent has been stuck for longer than the limit and
    /// should escape, in which case the count is reset. Nothing is checked on
    /// the first cycle of a path, as there is no previous target.
    pub fn update(
        &mut self,
        target_m: &Vector2<f64>,
        position_m: &Vector2<f64>,
        lookahead_m: f64,
    ) -> bool {
        let last_target_m = match self.last_target_m {
            Some(t) => t,
            None => return false,
        };

        let target_motion_m = (target_m - last_target_m).norm();
        let dist_to_target_m = (target_m - position_m).norm();

        if target_motion_m < self.params.target_motion_m
            && dist_to_target_m < self.params.radius_ratio * lookahead_m
        {
            self.stuck_count += 1;

            if self.stuck_count > self.params.tick_limit {
                self.stuck_count = 0;
                return true;
            }
        } else {
            self.stuck_count = 0;
        }

        false
    }

    /// Record the target actually used this cycle.
    pub fn remember(&mut self, target_m: Vector2<f64>) {
        self.last_target_m = Some(target_m);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stuck_detection() {
        let mut det = StuckDetector::new(StuckParams::default());
        let target = Vector2::new(1.0, 0.0);
        let pos = Vector2::new(0.9, 0.0);

        // No history on the first cycle
        assert!(!det.update(&target, &pos, 0.5));
        assert_eq!(det.stuck_count(), 0);
        det.remember(target);

        for i in 1..=5 {
            assert!(!det.update(&target, &pos, 0.5));
            assert_eq!(det.stuck_count(), i);
            det.remember(target);
        }

        assert!(det.update(&target, &pos, 0.5));
        assert_eq!(det.stuck_count(), 0);
    }

    #[test]
    fn test_progress_resets_count() {
        let mut det = StuckDetector::new(StuckParams::default());
        let pos = Vector2::new(0.9, 0.0);

        det.remember(Vector2::new(1.0, 0.0));
        det.update(&Vector2::new(1.0, 0.0), &pos, 0.5);
        assert_eq!(det.stuck_count(), 1);

        // Target moving on
        det.update(&Vector2::new(1.1, 0.0), &pos, 0.5);
        assert_eq!(det.stuck_count(), 0);

        // Stationary target but agent far from it
        det.remember(Vector2::new(1.0, 0.0));
        det.update(&Vector2::new(1.0, 0.0), &pos, 0.5);
        det.update(&Vector2::new(1.0, 0.0), &Vector2::new(0.0, 0.0), 0.5);
        assert_eq!(det.stuck_count(), 0);

        det.update(&Vector2::new(1.0, 0.0), &pos, 0.5);
        det.reset();
        assert_eq!(det.stuck_count(), 0);
        assert!(!det.update(&Vector2::new(1.0, 0.0), &pos, 0.5));
    }
}
