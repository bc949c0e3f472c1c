//! Cyclic module interface
//!
//! Controllers driven once per cycle by an executable implement [`State`].
//! The executable initialises each module once with data from the session,
//! then calls [`State::proc`] every cycle with that cycle's inputs.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::session::Session;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A module processed once per control cycle.
pub trait State {
    /// Passed to `init`, usually the name of the module's parameter file.
    type InitData;
    type InitError;

    /// Read by `proc` each cycle.
    type InputData;
    /// Produced by `proc` each cycle, for example a command to execute.
    type OutputData;
    /// Summary of the cycle, returned alongside the output.
    type StatusReport;
    type ProcError;

    /// Load parameters and open any archives inside the session.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one cycle.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
