//! Follow controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::pursuit;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the follow controller
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Params {
    /// Pursuit controller parameters
    pub pursuit: pursuit::Params,

    /// Stuck detection parameters
    #[serde(default)]
    pub stuck: StuckParams,
}

/// Parameters for detecting and escaping from a stuck target.
///
/// The agent is stuck when the target stops moving while the agent sits
/// close to it. This happens at tight corners, where the nearest point search
/// can hold the progress in place.
#[derive(Deserialize, Serialize, Debug, Copy, Clone)]
#[serde(default)]
pub struct StuckParams {
    /// The target counts as stationary if it moved less than this since the
    /// previous cycle.
    pub target_motion_m: f64,

    /// The agent counts as close to the target if it is within this multiple
    /// of the lookahead distance.
    pub radius_ratio: f64,

    /// Number of consecutive stuck cycles tolerated before escaping.
    pub tick_limit: u32,

    /// Number of path points the progress is moved on by when escaping.
    pub index_jump: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for StuckParams {
    fn default() -> Self {
        Self {
            target_motion_m: 0.05,
            radius_ratio: 0.4,
            tick_limit: 5,
            index_jump: 3,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_param_file() {
        let p: Params = util::params::from_str(include_str!("../../../params/follow.toml")).unwrap();

        assert_eq!(p.pursuit.lookahead_m, 0.5);
        assert_eq!(p.stuck.tick_limit, 5);
        assert_eq!(p.stuck.index_jump, 3);
    }

    #[test]
    fn test_stuck_defaults() {
        let p: Params = util::params::from_str("[pursuit]\nlookahead_m = 0.8").unwrap();

        assert_eq!(p.pursuit.offset_m, 0.0);
        assert_eq!(p.pursuit.position_tolerance_m, 0.1);
        assert_eq!(p.stuck.target_motion_m, 0.05);
        assert_eq!(p.stuck.radius_ratio, 0.4);
    }
}
