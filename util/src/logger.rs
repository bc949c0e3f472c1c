//! Logger setup
//!
//! Log records go to two places: stdout, with coloured level tags, and the
//! session's log file, with plain tags. Both are prefixed with the number of
//! seconds since the session epoch.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::Colorize;
use log::{info, Level, Record};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Error opening the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("The logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` applies to every target not listed in `module_levels`, and
/// must let at least `INFO` records through. `module_levels` overrides the
/// level for individual module paths, for example to quieten a chatty
/// controller.
///
/// Must only be called once per process.
pub fn logger_init(
    min_level: LevelFilter,
    module_levels: &[(&'static str, LevelFilter)],
    session: &Session,
) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let stdout = fern::Dispatch::new()
        .format(|out, message, record| {
            let tag = match record.level() {
                Level::Trace => "TRC".dimmed().italic(),
                Level::Debug => "DBG".dimmed(),
                Level::Info => "INF".normal(),
                Level::Warn => "WRN".yellow(),
                Level::Error => "ERR".red().bold(),
            };
            out.finish(format_args!("{}", format_record(tag, message, record)))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            let tag = match record.level() {
                Level::Trace => "TRC",
                Level::Debug => "DBG",
                Level::Info => "INF",
                Level::Warn => "WRN",
                Level::Error => "ERR",
            };
            out.finish(format_args!("{}", format_record(tag, message, record)))
        })
        .chain(log_file);

    module_levels
        .iter()
        .fold(fern::Dispatch::new().level(min_level), |d, &(module, level)| {
            d.level_for(module, level)
        })
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    for (module, level) in module_levels {
        info!("    Log level for {}: {:?}", module, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the formatted line for a record. Debug and trace records include
/// their target.
fn format_record<T: fmt::Display>(tag: T, message: &fmt::Arguments, record: &Record) -> String {
    if record.level() > Level::Info {
        format!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            tag,
            record.target(),
            message
        )
    } else {
        format!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            tag,
            message
        )
    }
}
