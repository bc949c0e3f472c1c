//! Session management
//!
//! A session is a single run of an executable. Each session gets its own
//! timestamped directory holding the log file, CSV archives and any data
//! saved during the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use erased_serde::Serialize;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Requests handled by the save thread.
enum SaveRequest {
    /// Write the data as JSON to the session-relative path
    Json(PathBuf, Box<dyn Serialize + Send>),

    /// Finish the queued requests and exit
    Exit,
}

/// A struct storing information about the current session
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    save_sender: Sender<SaveRequest>,

    save_handle: Option<JoinHandle<usize>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (TRACK_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the\
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

/// Errors raised while saving data in the background.
#[derive(Error, Debug)]
enum SaveError {
    #[error("only .json files can be saved")]
    UnsupportedExtension,

    #[error("cannot create the file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot serialise the data: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    /// inside `$TRACK_SW_ROOT/{sessions_dir}`. Only one session can be created
    /// per process.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_track_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        let timestamp = SESSION_EPOCH
            .get()
            .ok_or(SessionError::CannotGetEpoch)?
            .format(TIMESTAMP_FORMAT);

        let session_root = root
            .join(sessions_dir)
            .join(format!("{}_{}", exec_name, timestamp));
        let arch_root = session_root.join("arch");

        // Creating the archive directory creates the session root too
        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        let (save_sender, receiver) = channel();
        let thread_root = session_root.clone();
        let save_handle = thread::spawn(move || save_thread(thread_root, receiver));

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root,
            save_sender,
            save_handle: Some(save_handle),
        })
    }

    /// Exit the session, waiting for the save thread to write any data still
    /// queued.
    pub fn exit(mut self) {
        info!("Stopping save thread");

        if self.save_sender.send(SaveRequest::Exit).is_err() {
            warn!("Save thread has already stopped");
        }

        match self.save_handle.take().map(JoinHandle::join) {
            Some(Ok(num_saved)) => info!("Save thread exited after saving {} files", num_saved),
            Some(Err(_)) => warn!("Save thread panicked"),
            None => (),
        }
    }

    /// Saves the given data as JSON to the given session-relative path in a
    /// background thread.
    ///
    /// Failures are logged rather than returned, since the caller has moved
    /// on by the time the data is written.
    pub fn save<P: AsRef<Path>, T: Serialize + Send + 'static>(&self, path: P, data: T) {
        let request = SaveRequest::Json(path.as_ref().to_path_buf(), Box::new(data));

        if self.save_sender.send(request).is_err() {
            warn!(
                "Could not queue {:?} for saving, the save thread has stopped",
                path.as_ref()
            );
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_elapsed_seconds() -> f64 {
    time::duration_to_seconds(Utc::now() - *get_epoch()).unwrap_or(std::f64::NAN)
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Handle save requests until told to exit or the session is dropped.
///
/// Returns the number of files saved.
fn save_thread(session_root: PathBuf, receiver: Receiver<SaveRequest>) -> usize {
    let mut num_saved = 0;

    while let Ok(SaveRequest::Json(path, data)) = receiver.recv() {
        let full_path = session_root.join(path);

        match write_json(&full_path, data.as_ref()) {
            Ok(()) => {
                debug!("Saved {:?}", full_path);
                num_saved += 1;
            }
            Err(e) => warn!("Could not save {:?}: {}", full_path, e),
        }
    }

    num_saved
}

fn write_json(full_path: &Path, data: &(dyn Serialize + Send)) -> Result<(), SaveError> {
    if full_path.extension().and_then(|s| s.to_str()) != Some("json") {
        return Err(SaveError::UnsupportedExtension);
    }

    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(full_path)?;
    serde_json::to_writer_pretty(file, data)?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_session_save() {
        let root = std::env::temp_dir().join("track_util_session_test");
        std::env::set_var(crate::host::SW_ROOT_ENV_VAR, &root);

        let session = Session::new("test_exec", "sessions").unwrap();
        assert!(session.arch_root.is_dir());
        assert!(session.session_root.starts_with(root.join("sessions")));
        assert!(get_elapsed_seconds() >= 0.0);

        session.save("data/values.json", vec![1.5, 2.5]);
        session.save("values.txt", vec![1.5, 2.5]);

        let session_root = session.session_root.clone();
        session.exit();

        let saved = fs::read_to_string(session_root.join("data/values.json")).unwrap();
        let values: Vec<f64> = serde_json::from_str(&saved).unwrap();
        assert_eq!(values, vec![1.5, 2.5]);
        assert!(!session_root.join("values.txt").exists());

        // Only one session per process
        assert!(matches!(
            Session::new("test_exec", "sessions"),
            Err(SessionError::CannotInitEpoch(_))
        ));

        fs::remove_dir_all(session_root).unwrap();
    }
}
