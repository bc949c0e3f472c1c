//! # Agent interfaces
//!
//! The follower doesn't drive anything itself. It reads the agent's pose
//! from a [`PositionSource`] and hands displacement commands to an
//! [`ActuationSink`]. Real robots, network clients and the simulated agent
//! in [`sim`] all sit behind these two traits.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod sim;

pub use params::SimAgentParams;
pub use sim::{SimAgent, SimAgentError};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::loc::Pose;

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// A movement command for the agent.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum MoveCmd {
    /// Move by the given displacement in the world frame.
    Move { dx_m: f64, dy_m: f64 },

    /// Stop where you are.
    Stop,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can report the agent's pose.
pub trait PositionSource {
    /// Get the latest pose, or `None` if it is not yet known.
    fn get_pose(&self) -> Option<Pose>;
}

/// Something which can carry out movement commands.
pub trait ActuationSink {
    type Error;

    /// Execute the command. Commands don't block, a new command replaces any
    /// that is still in progress.
    fn execute(&mut self, cmd: MoveCmd) -> Result<(), Self::Error>;
}
