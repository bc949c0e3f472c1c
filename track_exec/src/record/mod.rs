//! # Track recorder
//!
//! Builds a path from the positions an agent actually passes through. The
//! recorder samples a [`PositionSource`](crate::agent::PositionSource) at a
//! limited rate and keeps a sample only once the agent has moved far enough
//! from the previous one, so a stationary agent doesn't fill the path with
//! duplicate points.
//!
//! Timestamps are relative to the start of the recording, so the recorded
//! path replays at the speed it was driven.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::Params;
pub use state::*;
