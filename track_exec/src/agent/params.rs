//! Simulated agent parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated agent
#[derive(Deserialize, Serialize, Debug, Copy, Clone)]
#[serde(default)]
pub struct SimAgentParams {
    /// Maximum linear speed
    pub max_speed_ms: f64,

    /// The goal is reached once the agent is within this distance of it
    pub pos_tolerance_m: f64,

    /// Proportional gain from distance to goal to speed demand
    pub kp_lin: f64,

    /// If true the agent can move in any direction (mecanum wheels). If false
    /// it drives like a differential drive robot, turning on the spot to face
    /// the goal before driving forwards.
    pub holonomic: bool,

    /// If true displacement commands are given in the agent's own frame
    /// rather than the world frame.
    pub local_frame: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimAgentParams {
    fn default() -> Self {
        Self {
            max_speed_ms: 0.5,
            pos_tolerance_m: 0.03,
            kp_lin: 0.9,
            holonomic: true,
            local_frame: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_param_file() {
        let p: SimAgentParams =
            util::params::from_str(include_str!("../../../params/sim_agent.toml")).unwrap();

        assert_eq!(p.max_speed_ms, 0.5);
        assert!(p.holonomic);
        assert!(!p.local_frame);
    }
}
