//! # Track Executable Parameters
//!
//! This module provides parameters for the track executable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::path::PathSpec;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrackExecParams {
    /// The path to follow when no path file is given on the command line
    pub path: PathSpec,

    /// Target period of one control cycle
    pub cycle_period_s: f64,

    /// Number of simulation steps the agent takes per control cycle
    pub sim_steps_per_cycle: u32,

    /// The run is stopped after this many seconds of simulated time, even if
    /// the path is not complete. Closed paths are never complete so always
    /// run to this limit.
    pub max_run_time_s: f64,

    /// If true each cycle sleeps until the cycle period has elapsed, so the
    /// run happens in real time. Otherwise the simulation runs as fast as
    /// possible.
    pub realtime: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let p: TrackExecParams = util::params::from_str(
            r#"
            cycle_period_s = 0.1
            sim_steps_per_cycle = 5
            max_run_time_s = 120.0
            realtime = false

            [path]
            type = "circle"
            radius_m = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(p.sim_steps_per_cycle, 5);
        match p.path {
            PathSpec::Circle(c) => {
                assert_eq!(c.radius_m, 1.0);
                assert_eq!(c.num_points, 50);
            }
            s => panic!("Expected a circle, got {:?}", s),
        }
    }

    #[test]
    fn test_default_param_file() {
        let p: TrackExecParams =
            util::params::from_str(include_str!("../../params/track_exec.toml")).unwrap();

        assert!(p.cycle_period_s > 0.0);
        assert!(matches!(p.path, PathSpec::FigureEight(_)));
    }
}
