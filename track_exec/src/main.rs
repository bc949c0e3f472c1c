//! Main track following executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Generate or load the path
//!     - Initialise all modules
//!     - Main loop:
//!         - Pose acquisition from the agent
//!         - Follow control processing
//!         - Command execution by the agent
//!         - Archive writing
//!         - Trajectory recording
//!         - Agent simulation
//!
//! # Modules
//!
//! All modules (e.g. `follow`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use track_lib::{
    agent::{ActuationSink, PositionSource, SimAgent, SimAgentParams},
    follow::FollowCtrl,
    loc::Pose,
    params::TrackExecParams,
    path::Path,
    record::{self, TrackRecorder},
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options
#[derive(Debug, StructOpt)]
#[structopt(name = "track_exec", about = "Follow a path with a simulated agent")]
struct Opt {
    /// Load the path from this JSON file instead of generating the one given
    /// in the parameters
    #[structopt(long, parse(from_os_str))]
    path_file: Option<PathBuf>,

    /// Save a copy of the path to this JSON file
    #[structopt(long, parse(from_os_str))]
    save_path: Option<PathBuf>,

    /// Lateral offset from the path in meters, positive to the right
    #[structopt(long, allow_hyphen_values = true)]
    offset: Option<f64>,

    /// Save the trajectory the agent actually drove, as a path, to this JSON
    /// file
    #[structopt(long, parse(from_os_str))]
    record_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("track_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(
        LevelFilter::Trace,
        &[
            ("track_lib::pursuit", LevelFilter::Debug),
            ("track_lib::agent", LevelFilter::Debug),
        ],
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Track Following Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let exec_params: TrackExecParams =
        util::params::load("track_exec.toml").wrap_err("Could not load exec params")?;

    let sim_params: SimAgentParams =
        util::params::load("sim_agent.toml").wrap_err("Could not load sim agent params")?;

    let record_params: record::Params =
        util::params::load("record.toml").wrap_err("Could not load record params")?;

    if !(exec_params.cycle_period_s > 0.0) || exec_params.sim_steps_per_cycle == 0 {
        return Err(eyre!(
            "Expected a positive cycle period and at least one simulation step per cycle"
        ));
    }

    info!("Exec parameters loaded");

    // ---- LOAD PATH ----

    let path = match opt.path_file {
        Some(ref file_path) => {
            info!("Loading path from {:?}", file_path);
            Path::load(file_path).wrap_err("Failed to load the path")?
        }
        None => {
            info!("Generating path from {:?}", exec_params.path);
            Path::from_path_spec(&exec_params.path).wrap_err("Failed to generate the path")?
        }
    };

    info!(
        "Path \"{}\" has {} points, is {:.2} m long and lasts {:.2} s ({})\n",
        path.name(),
        path.get_num_points(),
        path.get_length(),
        path.total_duration(),
        if path.is_closed() { "closed" } else { "open" }
    );

    session.save("path.json", path.clone());

    if let Some(ref save_path) = opt.save_path {
        path.save(save_path)
            .wrap_err_with(|| format!("Failed to save the path to {:?}", save_path))?;
        info!("Path saved to {:?}", save_path);
    }

    let path = Arc::new(path);

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut follow_ctrl = FollowCtrl::default();
    follow_ctrl
        .init("follow.toml", &session)
        .wrap_err("Failed to initialise FollowCtrl")?;
    if let Some(offset_m) = opt.offset {
        follow_ctrl.set_offset(offset_m);
    }
    info!("FollowCtrl init complete");

    // Start the agent on the first point, facing along the path
    let start_dir = path.smoothed_direction(0, 0);
    let mut agent = SimAgent::new(
        sim_params,
        Pose::new(path.first().x, path.first().y, start_dir.y.atan2(start_dir.x)),
    );
    info!("SimAgent init complete");

    let mut recorder = TrackRecorder::new(record_params).wrap_err("Failed to create the recorder")?;
    recorder
        .start(&agent, 0.0)
        .wrap_err("Failed to start recording")?;
    info!("TrackRecorder init complete");

    info!("Module initialisation complete\n");

    follow_ctrl
        .begin_path(path.clone())
        .wrap_err("Failed to begin following the path")?;

    // ---- MAIN LOOP ----

    let max_cycles = (exec_params.max_run_time_s / exec_params.cycle_period_s).ceil() as u64;
    let sim_dt_s = exec_params.cycle_period_s / exec_params.sim_steps_per_cycle as f64;
    let mut num_cycles: u64 = 0;

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // ---- DATA INPUT ----

        let pose = match agent.get_pose() {
            Some(p) => p,
            None => return Err(eyre!("The agent's pose is not available")),
        };

        // ---- CONTROL ALGORITHM PROCESSING ----

        match follow_ctrl.proc(&pose) {
            Ok((Some(cmd), _)) => agent
                .execute(cmd)
                .wrap_err("The agent could not execute the command")?,
            Ok((None, _)) => (),
            Err(e) => warn!("Error during FollowCtrl processing: {}", e),
        };

        // ---- WRITE ARCHIVES ----

        if let Err(e) = follow_ctrl.write() {
            warn!("Could not write the FollowCtrl archive: {}", e);
        }

        // ---- RECORDING ----

        if let Err(e) = recorder.update(&agent, num_cycles as f64 * exec_params.cycle_period_s) {
            warn!("Could not record the agent's position: {}", e);
        }

        if follow_ctrl.is_complete() {
            break;
        }

        // ---- SIMULATION ----

        for _ in 0..exec_params.sim_steps_per_cycle {
            agent.step(sim_dt_s);
        }

        // ---- CYCLE MANAGEMENT ----

        num_cycles += 1;

        if num_cycles >= max_cycles {
            info!(
                "Maximum run time of {:.1} s reached",
                exec_params.max_run_time_s
            );
            break;
        }

        if exec_params.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            match Duration::from_secs_f64(exec_params.cycle_period_s).checked_sub(cycle_dur) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - exec_params.cycle_period_s
                ),
            }
        }
    }

    // ---- SHUTDOWN ----

    let final_pose = agent.pose();
    info!(
        "Stopped at ({:.3}, {:.3}) after {} cycles ({:.1} s), {} laps completed",
        final_pose.position_m.x,
        final_pose.position_m.y,
        num_cycles,
        num_cycles as f64 * exec_params.cycle_period_s,
        follow_ctrl.laps_completed()
    );

    recorder.stop();
    let stats = recorder.stats();
    info!(
        "Recorded {} points over {:.2} m in {:.2} s (average {:.3} m/s)",
        stats.num_points, stats.distance_m, stats.duration_s, stats.avg_speed_ms
    );

    match recorder.create_path("Recorded Track") {
        Ok(recorded) => {
            if let Some(ref record_file) = opt.record_file {
                recorded
                    .save(record_file)
                    .wrap_err_with(|| format!("Failed to save the recording to {:?}", record_file))?;
                info!("Recording saved to {:?}", record_file);
            }
            session.save("recorded_path.json", recorded);
        }
        Err(e) => warn!("Could not create a path from the recording: {}", e),
    }

    session.exit();

    info!("End of execution");

    Ok(())
}
