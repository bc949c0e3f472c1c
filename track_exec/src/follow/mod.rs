//! # Follow controller
//!
//! The follow controller runs once per control cycle and turns the agent's
//! pose into a movement command. It wraps the pursuit controller, adding the
//! things a complete path following run needs:
//!
//! - detecting when an open path has been completed, and stopping the agent
//! - detecting when the target has stalled next to the agent, and forcing
//!   the progress along the path to escape
//! - not sending tiny commands when the agent is already at the target,
//!   which would otherwise make it dither in place
//!
//! Commands are displacements from the agent's current position to the
//! target, in the world frame.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;
pub mod stuck;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::{Params, StuckParams};
pub use state::*;
pub use stuck::StuckDetector;
