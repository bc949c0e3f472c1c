//! # Simulated agent
//!
//! A point robot which moves towards the goal set by the last movement
//! command under proportional control. The simulation is stepped explicitly
//! by the caller, so it runs as fast as the control loop allows and is fully
//! deterministic.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Rotation2, Vector2};

// Internal
use super::{ActuationSink, MoveCmd, PositionSource, SimAgentParams};
use crate::loc::Pose;
use crate::path::GEOM_EPSILON;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A differential drive agent turns on the spot until it is within this
/// angle of facing the goal.
const DIFF_HEADING_THRESHOLD_RAD: f64 = 0.1;

/// Turn rate per radian of heading error for a differential drive agent.
const DIFF_TURN_GAIN: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Simulated agent
#[derive(Debug, Clone)]
pub struct SimAgent {
    params: SimAgentParams,

    pose: Pose,

    /// The position the agent is moving towards, if any
    goal_m: Option<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimAgentError {
    #[error("Move command contains a non-finite displacement ({0}, {1})")]
    NonFiniteCommand(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimAgent {
    /// Create a new stationary agent at the given pose.
    pub fn new(params: SimAgentParams, initial_pose: Pose) -> Self {
        Self {
            params,
            pose: initial_pose,
            goal_m: None,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// The current goal, if the agent is moving
    pub fn goal(&self) -> Option<Vector2<f64>> {
        self.goal_m
    }

    pub fn is_moving(&self) -> bool {
        self.goal_m.is_some()
    }

    /// Advance the simulation by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        let goal_m = match self.goal_m {
            Some(g) => g,
            None => return,
        };

        let to_goal_m = goal_m - self.pose.position_m;
        let dist_m = to_goal_m.norm();

        if dist_m <= self.params.pos_tolerance_m {
            trace!("SimAgent reached goal ({:.3}, {:.3})", goal_m.x, goal_m.y);
            self.goal_m = None;
            return;
        }

        let speed_ms = (self.params.kp_lin * dist_m).min(self.params.max_speed_ms);

        if self.params.holonomic {
            if dist_m > GEOM_EPSILON {
                self.pose.position_m += to_goal_m / dist_m * speed_ms * dt_s;
            }
        } else {
            let goal_heading_rad = wrap_pi(to_goal_m.y.atan2(to_goal_m.x));
            let heading_err_rad = wrap_pi(goal_heading_rad - self.pose.heading_rad);

            if heading_err_rad.abs() > DIFF_HEADING_THRESHOLD_RAD {
                self.pose.heading_rad =
                    wrap_pi(self.pose.heading_rad + DIFF_TURN_GAIN * heading_err_rad * dt_s);
            } else {
                self.pose.position_m += self.pose.forward() * speed_ms * dt_s;
                self.pose.heading_rad = goal_heading_rad;
            }
        }
    }
}

impl PositionSource for SimAgent {
    fn get_pose(&self) -> Option<Pose> {
        Some(self.pose)
    }
}

impl ActuationSink for SimAgent {
    type Error = SimAgentError;

    fn execute(&mut self, cmd: MoveCmd) -> Result<(), Self::Error> {
        match cmd {
            MoveCmd::Move { dx_m, dy_m } => {
                if !(dx_m.is_finite() && dy_m.is_finite()) {
                    return Err(SimAgentError::NonFiniteCommand(dx_m, dy_m));
                }

                let mut disp_m = Vector2::new(dx_m, dy_m);

                if self.params.local_frame {
                    disp_m = Rotation2::new(self.pose.heading_rad) * disp_m;
                }

                self.goal_m = Some(self.pose.position_m + disp_m);
            }
            MoveCmd::Stop => self.goal_m = None,
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run(agent: &mut SimAgent, steps: usize, dt_s: f64) {
        for _ in 0..steps {
            agent.step(dt_s);
        }
    }

    #[test]
    fn test_holonomic_reaches_goal() {
        let mut agent = SimAgent::new(SimAgentParams::default(), Pose::new(0.0, 0.0, 0.3));

        agent
            .execute(MoveCmd::Move {
                dx_m: 1.0,
                dy_m: -0.5,
            })
            .unwrap();
        assert!(agent.is_moving());

        run(&mut agent, 1000, 0.02);

        let pose = agent.get_pose().unwrap();
        assert!((pose.position_m - Vector2::new(1.0, -0.5)).norm() <= 0.03);
        assert!(!agent.is_moving());

        // Holonomic agents don't turn
        assert_eq!(pose.heading_rad, 0.3);
    }

    #[test]
    fn test_speed_control() {
        let mut agent = SimAgent::new(SimAgentParams::default(), Pose::default());

        // Far away the speed saturates
        agent
            .execute(MoveCmd::Move {
                dx_m: 10.0,
                dy_m: 0.0,
            })
            .unwrap();
        agent.step(0.1);
        assert!((agent.pose().position_m.x - 0.05).abs() < 1e-12);

        // Close in the speed is proportional to the distance
        let mut agent = SimAgent::new(SimAgentParams::default(), Pose::default());
        agent
            .execute(MoveCmd::Move {
                dx_m: 0.0,
                dy_m: 0.2,
            })
            .unwrap();
        agent.step(0.1);
        assert!((agent.pose().position_m.y - 0.018).abs() < 1e-12);
    }

    #[test]
    fn test_stop() {
        let mut agent = SimAgent::new(SimAgentParams::default(), Pose::default());

        agent
            .execute(MoveCmd::Move {
                dx_m: 1.0,
                dy_m: 1.0,
            })
            .unwrap();
        agent.step(0.1);
        let stopped_at = agent.pose();

        agent.execute(MoveCmd::Stop).unwrap();
        run(&mut agent, 10, 0.1);

        assert_eq!(agent.pose(), stopped_at);
        assert_eq!(agent.goal(), None);
    }

    #[test]
    fn test_local_frame() {
        let params = SimAgentParams {
            local_frame: true,
            ..SimAgentParams::default()
        };
        let mut agent = SimAgent::new(params, Pose::new(1.0, 1.0, std::f64::consts::FRAC_PI_2));

        // Forwards in the agent frame is +y in the world
        agent
            .execute(MoveCmd::Move {
                dx_m: 1.0,
                dy_m: 0.0,
            })
            .unwrap();

        let goal = agent.goal().unwrap();
        assert!((goal - Vector2::new(1.0, 2.0)).norm() < 1e-12);
    }

    #[test]
    fn test_differential_drive() {
        let params = SimAgentParams {
            holonomic: false,
            ..SimAgentParams::default()
        };
        let mut agent = SimAgent::new(params, Pose::default());

        agent
            .execute(MoveCmd::Move {
                dx_m: 0.0,
                dy_m: 1.0,
            })
            .unwrap();

        // First the agent turns on the spot
        agent.step(0.1);
        assert_eq!(agent.pose().position_m, Vector2::zeros());
        assert!(agent.pose().heading_rad > 0.0);

        run(&mut agent, 4000, 0.05);

        let pose = agent.pose();
        assert!((pose.position_m - Vector2::new(0.0, 1.0)).norm() <= 0.03 + 1e-9);
        assert!((pose.heading_rad - std::f64::consts::FRAC_PI_2).abs() < 0.1);
    }

    #[test]
    fn test_non_finite_command() {
        let mut agent = SimAgent::new(SimAgentParams::default(), Pose::default());

        match agent.execute(MoveCmd::Move {
            dx_m: std::f64::NAN,
            dy_m: 0.0,
        }) {
            Err(SimAgentError::NonFiniteCommand(_, _)) => (),
            r => panic!("Expected NonFiniteCommand, got {:?}", r),
        }

        assert!(!agent.is_moving());
    }
}
