//! # Track library.
//!
//! This library allows the executable and benchmarks to access the path
//! following modules defined inside the track crate.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Agent interfaces - where poses come from and where commands go, plus a simulated agent
pub mod agent;

/// Follow control module - runs path following once per control cycle
pub mod follow;

/// Localisation - the agent's pose
pub mod loc;

/// Track executable parameters
pub mod params;

/// Path - timestamped waypoints and the geometry used to follow them
pub mod path;

/// Pursuit controller - picks the target point on the path
pub mod pursuit;

/// Track recorder - builds a path from where the agent actually went
pub mod record;
