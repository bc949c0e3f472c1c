//! Pursuit controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pursuit controller
#[derive(Deserialize, Serialize, Debug, Copy, Clone)]
pub struct Params {
    /// Distance along the path from the nearest point to the target point.
    ///
    /// Must be positive.
    pub lookahead_m: f64,

    /// Lateral offset of the target from the path centreline. Positive
    /// offsets are to the right of the direction of travel.
    ///
    /// Clamped to +/- 1.5 times the lookahead distance.
    #[serde(default)]
    pub offset_m: f64,

    /// An open path is complete once the agent is within this distance of
    /// its final point.
    #[serde(default = "default_position_tolerance_m")]
    pub position_tolerance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            lookahead_m: 0.5,
            offset_m: 0.0,
            position_tolerance_m: default_position_tolerance_m(),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn default_position_tolerance_m() -> f64 {
    0.1
}
