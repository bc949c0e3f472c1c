//! Pursuit controller state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

// External
use log::{debug, info, trace, warn};
use nalgebra::Vector2;

// Internal
use super::Params;
use crate::path::Path;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of points behind the current progress searched for the nearest
/// point.
pub const NEAREST_BACKWARD_WINDOW: usize = 5;

/// Number of points from the current progress onwards searched for the
/// nearest point.
pub const NEAREST_FORWARD_WINDOW: usize = 20;

/// Half width of the window over which the path direction is smoothed when
/// applying an offset.
pub const SMOOTHING_WINDOW: usize = 3;

/// The largest allowed offset as a multiple of the lookahead distance.
pub const MAX_OFFSET_RATIO: f64 = 1.5;

/// Extra lookahead per meter of offset, as a fraction of the lookahead.
const OFFSET_LOOKAHEAD_GAIN: f64 = 0.5;

/// Offset targets nearer to the agent than this multiple of the lookahead
/// are discarded.
const MIN_OFFSET_TARGET_RATIO: f64 = 0.3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pursuit controller
pub struct PursuitCtrl {
    params: Params,

    /// The path being followed
    path: Option<Arc<Path>>,

    /// Index of the path point nearest the agent at the last query. Bounds
    /// the nearest point search.
    progress_index: usize,

    /// Number of times the progress has wrapped around a closed path
    laps_completed: u32,
}

/// A target point produced by the controller.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Target {
    /// Position of the target in the world frame
    pub position_m: Vector2<f64>,

    /// The progress index the target was computed from
    pub progress_index: usize,

    /// True if the lateral offset was applied, false if the target lies on
    /// the centreline.
    pub offset_applied: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur in the pursuit controller.
#[derive(Debug, thiserror::Error)]
pub enum PursuitError {
    /// No path has been set, so there is nothing to pursue.
    #[error("No path has been set")]
    NotReady,

    #[error("The lookahead distance must be positive and finite, found {0}")]
    InvalidLookahead(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PursuitCtrl {
    fn default() -> Self {
        Self {
            params: Params::default(),
            path: None,
            progress_index: 0,
            laps_completed: 0,
        }
    }
}

impl PursuitCtrl {
    /// Create a new controller with no path.
    ///
    /// The offset in `params` is clamped into the allowed range.
    pub fn new(params: Params) -> Result<Self, PursuitError> {
        if !(params.lookahead_m > 0.0 && params.lookahead_m.is_finite()) {
            return Err(PursuitError::InvalidLookahead(params.lookahead_m));
        }

        let mut params = params;
        params.offset_m = clamp_offset(params.offset_m, params.lookahead_m);

        Ok(Self {
            params,
            path: None,
            progress_index: 0,
            laps_completed: 0,
        })
    }

    /// Start pursuing a new path from its first point.
    pub fn set_path(&mut self, path: Arc<Path>) {
        debug!(
            "Pursuing path \"{}\" ({} points, {})",
            path.name(),
            path.get_num_points(),
            if path.is_closed() { "closed" } else { "open" }
        );

        self.path = Some(path);
        self.progress_index = 0;
        self.laps_completed = 0;
    }

    /// Remove the current path.
    pub fn clear_path(&mut self) {
        self.path = None;
        self.progress_index = 0;
    }

    /// The path currently being pursued
    pub fn path(&self) -> Option<&Arc<Path>> {
        self.path.as_ref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The lateral offset in use, after clamping.
    pub fn offset_m(&self) -> f64 {
        self.params.offset_m
    }

    /// Change the lateral offset, which is clamped into the allowed range.
    pub fn set_offset(&mut self, offset_m: f64) {
        self.params.offset_m = clamp_offset(offset_m, self.params.lookahead_m);
    }

    pub fn progress_index(&self) -> usize {
        self.progress_index
    }

    /// Number of laps completed on a closed path.
    pub fn laps_completed(&self) -> u32 {
        self.laps_completed
    }

    /// Compute the target point for an agent at `position`.
    ///
    /// The progress index is updated to the path point nearest the agent,
    /// searched for around the previous progress. On a closed path the
    /// progress wraps to the start once it reaches the final point.
    pub fn compute_target(&mut self, position: &Vector2<f64>) -> Result<Target, PursuitError> {
        let path = match self.path {
            Some(ref p) => p.clone(),
            None => return Err(PursuitError::NotReady),
        };

        if path.is_closed() && self.progress_index >= path.last_index() {
            self.progress_index = 0;
            self.laps_completed += 1;
            info!(
                "Completed lap {} of \"{}\"",
                self.laps_completed,
                path.name()
            );
        }

        let (closest, dist_m) = path.nearest_index(
            position,
            self.progress_index,
            NEAREST_BACKWARD_WINDOW,
            NEAREST_FORWARD_WINDOW,
        );

        trace!("Nearest point {} at {:.3} m", closest, dist_m);

        self.progress_index = closest;

        Ok(self.target_along(&path, position))
    }

    /// Compute the target from the current progress index, without searching
    /// for the nearest point first.
    ///
    /// Used after the progress has been moved on explicitly, where a search
    /// would pull it straight back to the agent.
    pub fn target_from_progress(&self, position: &Vector2<f64>) -> Result<Target, PursuitError> {
        match self.path {
            Some(ref p) => Ok(self.target_along(p, position)),
            None => Err(PursuitError::NotReady),
        }
    }

    /// Move the progress index forward by `count` points, stopping at the
    /// final point. Returns the new progress index.
    pub fn advance_progress(&mut self, count: usize) -> Result<usize, PursuitError> {
        let last_index = match self.path {
            Some(ref p) => p.last_index(),
            None => return Err(PursuitError::NotReady),
        };

        self.progress_index = self.progress_index.saturating_add(count).min(last_index);

        Ok(self.progress_index)
    }

    /// Whether an agent at `position` has finished the path.
    ///
    /// Closed paths are never complete.
    pub fn is_complete(&self, position: &Vector2<f64>) -> Result<bool, PursuitError> {
        let path = match self.path {
            Some(ref p) => p,
            None => return Err(PursuitError::NotReady),
        };

        if path.is_closed() {
            return Ok(false);
        }

        Ok((path.last().position() - position).norm() < self.params.position_tolerance_m)
    }

    /// Walk the lookahead distance along the path from the progress index and
    /// apply the offset.
    fn target_along(&self, path: &Path, position: &Vector2<f64>) -> Target {
        let lookahead_m = self.params.lookahead_m;
        let offset_m = self.params.offset_m;

        // Offset paths cut inside or swing wide of corners, so look further
        // ahead to keep the target clear of the agent.
        let effective_lookahead_m = if offset_m != 0.0 {
            lookahead_m * (1.0 + OFFSET_LOOKAHEAD_GAIN * offset_m.abs())
        } else {
            lookahead_m
        };

        let along = path.point_along(self.progress_index, effective_lookahead_m);

        let mut target = Target {
            position_m: along.position_m,
            progress_index: self.progress_index,
            offset_applied: false,
        };

        if offset_m != 0.0 {
            let tangent = path.smoothed_direction(along.segment_index, SMOOTHING_WINDOW);

            // Right hand normal, so positive offsets go right
            let normal = Vector2::new(tangent.y, -tangent.x);
            let candidate_m = along.position_m + normal * offset_m;
            let to_candidate_m = candidate_m - position;

            if to_candidate_m.dot(&tangent) > 0.0
                && to_candidate_m.norm() > MIN_OFFSET_TARGET_RATIO * lookahead_m
            {
                target.position_m = candidate_m;
                target.offset_applied = true;
            } else {
                trace!("Offset target rejected, using centreline");
            }
        }

        target
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn clamp_offset(offset_m: f64, lookahead_m: f64) -> f64 {
    let max_offset_m = MAX_OFFSET_RATIO * lookahead_m;
    let clamped_m = clamp(&offset_m, &-max_offset_m, &max_offset_m);

    if clamped_m != offset_m {
        warn!(
            "Offset {:.2} m exceeds the maximum of {:.2} m, clamping to {:.2} m",
            offset_m, max_offset_m, clamped_m
        );
    }

    clamped_m
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::gen;

    fn ctrl(lookahead_m: f64, offset_m: f64) -> PursuitCtrl {
        PursuitCtrl::new(Params {
            lookahead_m,
            offset_m,
            position_tolerance_m: 0.1,
        })
        .unwrap()
    }

    fn line() -> Arc<Path> {
        Arc::new(gen::straight_line(5.0, 20, 0.5, 0.0).unwrap())
    }

    fn assert_near(a: Vector2<f64>, b: Vector2<f64>) {
        assert!((a - b).norm() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_invalid_lookahead() {
        for l in [0.0, -0.5, std::f64::NAN, std::f64::INFINITY].iter() {
            match PursuitCtrl::new(Params {
                lookahead_m: *l,
                ..Params::default()
            }) {
                Err(PursuitError::InvalidLookahead(_)) => (),
                Err(e) => panic!("Expected InvalidLookahead, got {:?}", e),
                Ok(_) => panic!("Lookahead of {} accepted", l),
            }
        }
    }

    #[test]
    fn test_not_ready() {
        let mut c = ctrl(0.5, 0.0);
        let pos = Vector2::zeros();

        assert!(matches!(c.compute_target(&pos), Err(PursuitError::NotReady)));
        assert!(matches!(c.target_from_progress(&pos), Err(PursuitError::NotReady)));
        assert!(matches!(c.is_complete(&pos), Err(PursuitError::NotReady)));
        assert!(matches!(c.advance_progress(1), Err(PursuitError::NotReady)));
        assert!(c.path().is_none());

        c.set_path(line());
        assert!(c.compute_target(&pos).is_ok());
        assert_eq!(c.path().map(|p| p.name()), Some("Straight-Line"));
        assert_eq!(c.params().lookahead_m, 0.5);

        c.clear_path();
        assert!(c.path().is_none());
        assert!(matches!(c.compute_target(&pos), Err(PursuitError::NotReady)));
    }

    #[test]
    fn test_straight_line_target() {
        let mut c = ctrl(2.5, 0.0);
        c.set_path(line());

        let target = c.compute_target(&Vector2::zeros()).unwrap();
        assert_near(target.position_m, Vector2::new(2.5, 0.0));
        assert_eq!(target.progress_index, 0);
        assert!(!target.offset_applied);
    }

    #[test]
    fn test_target_is_idempotent() {
        let mut c = ctrl(0.7, 0.3);
        c.set_path(Arc::new(gen::figure_eight(1.5, 100, 0.4).unwrap()));

        let pos = Vector2::new(0.2, 0.15);
        let first = c.compute_target(&pos).unwrap();
        let second = c.compute_target(&pos).unwrap();

        assert_eq!(first, second);
        assert_eq!(c.progress_index(), first.progress_index);
    }

    #[test]
    fn test_offset_clamping() {
        let mut c = ctrl(0.5, 2.0);
        assert_eq!(c.offset_m(), 0.75);

        c.set_offset(-5.0);
        assert_eq!(c.offset_m(), -0.75);

        c.set_offset(0.25);
        assert_eq!(c.offset_m(), 0.25);
    }

    #[test]
    fn test_offset_applied_to_right() {
        let mut c = ctrl(1.0, 0.5);
        c.set_path(line());

        // Lookahead is stretched to 1.25 m by the offset
        let target = c.compute_target(&Vector2::zeros()).unwrap();
        assert!(target.offset_applied);
        assert_near(target.position_m, Vector2::new(1.25, -0.5));

        c.set_offset(-0.5);
        let target = c.compute_target(&Vector2::zeros()).unwrap();
        assert_near(target.position_m, Vector2::new(1.25, 0.5));
    }

    #[test]
    fn test_offset_rejected_behind_agent() {
        let mut c = ctrl(1.0, 0.5);
        c.set_path(line());

        // Past the end of the line the offset target would be behind the agent
        let target = c.compute_target(&Vector2::new(5.2, 0.0)).unwrap();
        assert!(!target.offset_applied);
        assert_near(target.position_m, Vector2::new(5.0, 0.0));
    }

    #[test]
    fn test_square_corner_target() {
        let mut c = ctrl(0.5, 0.0);
        c.set_path(Arc::new(gen::square(2.0, 10, 0.5).unwrap()));

        let target = c.compute_target(&Vector2::new(-1.0, -1.0)).unwrap();
        assert_near(target.position_m, Vector2::new(-0.5, -1.0));
        assert_eq!(target.progress_index, 0);
    }

    #[test]
    fn test_open_path_completion() {
        let mut c = ctrl(0.5, 0.0);
        c.set_path(line());

        assert!(!c.is_complete(&Vector2::zeros()).unwrap());
        assert!(!c.is_complete(&Vector2::new(4.5, 0.0)).unwrap());
        assert!(c.is_complete(&Vector2::new(4.95, 0.0)).unwrap());
        assert!(c.is_complete(&Vector2::new(5.0, 0.05)).unwrap());
    }

    #[test]
    fn test_closed_path_loops() {
        let mut c = ctrl(0.5, 0.0);
        let path = Arc::new(gen::circle(2.0, 50, 0.5, Vector2::zeros()).unwrap());
        c.set_path(path.clone());

        let start = Vector2::new(2.0, 0.0);

        assert_eq!(c.advance_progress(1000).unwrap(), path.last_index());
        assert!(!c.is_complete(&start).unwrap());

        let target = c.compute_target(&start).unwrap();
        assert_eq!(target.progress_index, 0);
        assert_eq!(c.laps_completed(), 1);

        // Target is half a meter round the circle from the start
        assert!(target.position_m.y > 0.0);
        assert!(((target.position_m - start).norm() - 0.5).abs() < 0.01);

        assert!(!c.is_complete(&start).unwrap());
        assert!(!c.is_complete(&target.position_m).unwrap());
    }

    #[test]
    fn test_advance_progress() {
        let mut c = ctrl(0.5, 0.0);
        c.set_path(line());

        assert_eq!(c.advance_progress(3).unwrap(), 3);
        assert_eq!(c.advance_progress(100).unwrap(), 20);
        assert_eq!(c.progress_index(), 20);

        // A new path starts from the beginning
        c.set_path(line());
        assert_eq!(c.progress_index(), 0);
    }

    #[test]
    fn test_target_from_progress() {
        let mut c = ctrl(0.5, 0.0);
        c.set_path(line());
        c.advance_progress(8).unwrap();

        let target = c.target_from_progress(&Vector2::zeros()).unwrap();
        assert_eq!(target.progress_index, 8);
        assert_near(target.position_m, Vector2::new(2.5, 0.0));

        // A full computation searches back towards the agent
        let target = c.compute_target(&Vector2::zeros()).unwrap();
        assert_eq!(target.progress_index, 3);
    }
}
