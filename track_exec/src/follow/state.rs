//! Follow controller module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{Params, StuckDetector};
use crate::{
    agent::MoveCmd,
    loc::Pose,
    path::Path,
    pursuit::{PursuitCtrl, PursuitError},
};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Commands shorter than this fraction of the position tolerance are not
/// sent.
const MIN_COMMAND_TOLERANCE_RATIO: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Follow controller
#[derive(Default)]
pub struct FollowCtrl {
    /// Executing mode
    mode: FollowMode,

    pursuit: PursuitCtrl,

    stuck: StuckDetector,

    /// Number of calls to `proc`
    tick: u64,

    output_cmd: Option<MoveCmd>,

    report: StatusReport,

    arch_report: Option<Archiver>,
}

/// The status report containing the state of the controller after each
/// cycle.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Cycle number
    pub tick: u64,

    /// Mode at the end of the cycle
    pub mode: FollowMode,

    /// Agent position used this cycle
    pub position_x_m: f64,
    pub position_y_m: f64,

    /// Index of the path point nearest the agent
    pub progress_index: usize,

    /// The target point, if one was computed
    pub target_x_m: f64,
    pub target_y_m: f64,

    /// Distance from the agent to the target
    pub dist_to_target_m: f64,

    /// True if the target was offset from the centreline
    pub offset_applied: bool,

    /// Number of consecutive stuck cycles
    pub stuck_count: u32,

    /// True if the progress was forced forward this cycle
    pub stuck_escape: bool,

    /// Number of completed laps of a closed path
    pub laps_completed: u32,

    /// True if the path has been completed
    pub complete: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("Could not create the status report archive: {0}")]
    ArchiveInitError(ArchiveError),

    /// A path is already being followed. Call `abort` before starting a new
    /// one.
    #[error("Attempted to begin a path while one is being followed")]
    PathAlreadyLoaded,

    /// The previous path was aborted and its stop has not been sent yet. Call
    /// `proc` once before starting a new path.
    #[error("Attempted to begin a path before the previous abort has stopped the agent")]
    StopPending,

    #[error("Pursuit error: {0}")]
    PursuitError(#[from] PursuitError),
}

/// The possible modes of execution of FollowCtrl. Each mode is handled by a
/// `mode_xyz` function.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum FollowMode {
    /// Doing nothing
    Off,

    /// Following a path
    Following,

    /// The path was aborted, a stop is issued on the next cycle.
    Aborted,

    /// An open path has been completed.
    Complete,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for FollowMode {
    fn default() -> Self {
        FollowMode::Off
    }
}

impl State for FollowCtrl {
    type InitData = &'static str;
    type InitError = FollowError;

    type InputData = Pose;
    type OutputData = Option<MoveCmd>;
    type StatusReport = StatusReport;
    type ProcError = FollowError;

    /// Initialise the FollowCtrl module.
    ///
    /// Expected init data is the path to the parameter file. The status
    /// report is archived in the session.
    fn init(&mut self, init_data: Self::InitData, session: &Session) -> Result<(), FollowError> {
        let params: Params = params::load(init_data).map_err(FollowError::ParamLoadError)?;

        *self = Self::new(params)?;

        self.arch_report = Some(
            Archiver::from_path(session, "follow/status_report.csv")
                .map_err(FollowError::ArchiveInitError)?,
        );

        Ok(())
    }

    /// Process follow control.
    ///
    /// Returns the command to send to the agent, if any, along with the
    /// status report.
    fn proc(&mut self, pose: &Pose) -> Result<(Option<MoveCmd>, StatusReport), FollowError> {
        // Setup cycle data
        self.tick += 1;
        self.output_cmd = None;
        self.report = StatusReport {
            tick: self.tick,
            position_x_m: pose.position_m.x,
            position_y_m: pose.position_m.y,
            ..StatusReport::default()
        };

        // Mode execution
        match self.mode {
            FollowMode::Off => self.mode_off(),
            FollowMode::Following => self.mode_following(pose),
            FollowMode::Aborted => self.mode_aborted(),
            FollowMode::Complete => self.mode_complete(),
        }?;

        self.report.mode = self.mode;
        self.report.progress_index = self.pursuit.progress_index();
        self.report.stuck_count = self.stuck.stuck_count();
        self.report.laps_completed = self.pursuit.laps_completed();
        self.report.complete = self.is_complete();

        Ok((self.output_cmd, self.report))
    }
}

impl Archived for FollowCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        if let Some(ref mut arch) = self.arch_report {
            arch.serialise(&self.report)?;
        }

        Ok(())
    }
}

impl FollowCtrl {
    /// Create a new controller without archiving.
    pub fn new(params: Params) -> Result<Self, FollowError> {
        let pursuit = PursuitCtrl::new(params.pursuit)?;
        let stuck = StuckDetector::new(params.stuck);

        Ok(Self {
            pursuit,
            stuck,
            ..Self::default()
        })
    }

    /// Begin following a path.
    ///
    /// Execution begins on the next call to `proc`. A path that is being
    /// followed must be aborted with `abort` before a new one is started, and
    /// the stop issued by the abort must have been sent.
    pub fn begin_path(&mut self, path: Arc<Path>) -> Result<(), FollowError> {
        match self.mode {
            FollowMode::Following => return Err(FollowError::PathAlreadyLoaded),
            FollowMode::Aborted => return Err(FollowError::StopPending),
            FollowMode::Off | FollowMode::Complete => (),
        }

        info!(
            "Following \"{}\" with lookahead {:.2} m and offset {:.2} m",
            path.name(),
            self.pursuit.params().lookahead_m,
            self.pursuit.offset_m()
        );

        self.pursuit.set_path(path);
        self.stuck.reset();
        self.mode = FollowMode::Following;

        Ok(())
    }

    /// Abort the current path.
    ///
    /// A stop command is issued on the next call to `proc`, after which the
    /// controller is off.
    pub fn abort(&mut self) {
        if self.mode != FollowMode::Off {
            info!("Aborting path");
            self.mode = FollowMode::Aborted;
        }
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// True once an open path has been completed.
    pub fn is_complete(&self) -> bool {
        self.mode == FollowMode::Complete
    }

    /// Change the lateral offset, see [`PursuitCtrl::set_offset`].
    pub fn set_offset(&mut self, offset_m: f64) {
        self.pursuit.set_offset(offset_m);
    }

    pub fn progress_index(&self) -> usize {
        self.pursuit.progress_index()
    }

    pub fn stuck_count(&self) -> u32 {
        self.stuck.stuck_count()
    }

    pub fn laps_completed(&self) -> u32 {
        self.pursuit.laps_completed()
    }

    /// Mode off.
    ///
    /// No actions are taken in this mode.
    fn mode_off(&mut self) -> Result<(), FollowError> {
        Ok(())
    }

    /// Mode following.
    ///
    /// Computes the target and commands the agent towards it.
    fn mode_following(&mut self, pose: &Pose) -> Result<(), FollowError> {
        let position_m = pose.position_m;

        // ---- COMPLETION ----

        if self.pursuit.is_complete(&position_m)? {
            info!(
                "Path \"{}\" complete after {} cycles",
                self.pursuit.path().map(|p| p.name()).unwrap_or_default(),
                self.tick
            );
            self.output_cmd = Some(MoveCmd::Stop);
            self.mode = FollowMode::Complete;
            return Ok(());
        }

        // ---- TARGET ----

        let mut target = self.pursuit.compute_target(&position_m)?;

        if self.stuck.update(
            &target.position_m,
            &position_m,
            self.pursuit.params().lookahead_m,
        ) {
            let progress_index = self
                .pursuit
                .advance_progress(self.stuck.params().index_jump)?;

            warn!(
                "Target stuck at ({:.3}, {:.3}), jumping progress from {} to {}",
                target.position_m.x, target.position_m.y, target.progress_index, progress_index
            );

            target = self.pursuit.target_from_progress(&position_m)?;
            self.report.stuck_escape = true;
        }

        self.stuck.remember(target.position_m);

        // ---- COMMAND ----

        let disp_m = target.position_m - position_m;
        let dist_m = disp_m.norm();

        self.report.target_x_m = target.position_m.x;
        self.report.target_y_m = target.position_m.y;
        self.report.dist_to_target_m = dist_m;
        self.report.offset_applied = target.offset_applied;

        if dist_m > MIN_COMMAND_TOLERANCE_RATIO * self.pursuit.params().position_tolerance_m {
            self.output_cmd = Some(MoveCmd::Move {
                dx_m: disp_m.x,
                dy_m: disp_m.y,
            });
        } else {
            debug!("Target within {:.3} m, no command sent", dist_m);
        }

        Ok(())
    }

    /// Mode aborted.
    ///
    /// Stops the agent, clears the path and switches off.
    fn mode_aborted(&mut self) -> Result<(), FollowError> {
        self.output_cmd = Some(MoveCmd::Stop);

        self.pursuit.clear_path();
        self.stuck.reset();

        self.mode = FollowMode::Off;

        Ok(())
    }

    /// Mode complete.
    ///
    /// The stop command was sent when the path was completed, so there is
    /// nothing more to do.
    fn mode_complete(&mut self) -> Result<(), FollowError> {
        Ok(())
    }
}
