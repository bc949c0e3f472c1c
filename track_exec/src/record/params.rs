//! Track recorder parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the track recorder
#[derive(Deserialize, Serialize, Debug, Copy, Clone)]
#[serde(default)]
pub struct Params {
    /// Maximum rate at which the position is sampled
    pub sample_rate_hz: f64,

    /// A sample closer than this to the previously recorded point is dropped
    pub min_distance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10.0,
            min_distance_m: 0.05,
        }
    }
}
