//! # Pursuit controller
//!
//! The pursuit controller picks the point on the path the agent should head
//! for next. Each cycle it finds the path point nearest the agent, searching
//! only a small window around its progress along the path, and then walks
//! the lookahead distance forward along the path from there. The point
//! reached is the target.
//!
//! The target may be shifted sideways from the centreline by a lateral
//! offset, which lets several agents run the same path side by side. The
//! offset is measured perpendicular to the smoothed path direction so that
//! it doesn't swing wildly at sharp corners. An offset target which would
//! lie behind the agent, or right on top of it, is discarded in favour of
//! the centreline target.
//!
//! Closed paths (those whose ends meet) are followed indefinitely, the
//! progress wrapping back to the start of the path each lap. Open paths are
//! complete once the agent reaches the final point.

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
