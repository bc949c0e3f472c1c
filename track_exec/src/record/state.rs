//! Track recorder state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::Params;
use crate::{
    agent::PositionSource,
    path::{Path, PathError, Waypoint},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Records the positions reported by a position source into a path.
#[derive(Debug, Clone)]
pub struct TrackRecorder {
    params: Params,

    recording: bool,

    /// Time the recording started, recorded timestamps are relative to this.
    start_time_s: f64,

    /// Time the position was last sampled, whether or not it was kept.
    last_sample_time_s: f64,

    points: Vec<Waypoint>,
}

/// Summary of a recording.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize)]
pub struct RecordStats {
    pub num_points: usize,

    /// Time between the first and last recorded points
    pub duration_s: f64,

    /// Distance along the recorded points
    pub distance_m: f64,

    /// Zero if the duration is zero
    pub avg_speed_ms: f64,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Expected a positive sample rate and a non-negative minimum distance")]
    InvalidParams,

    #[error("The agent's pose is not available")]
    PoseUnavailable,

    #[error("The agent's pose contains a non-finite value")]
    NonFinitePose,

    #[error("Need at least 2 recorded points to create a path, found {0}")]
    TooFewPoints(usize),

    #[error("The recorded points do not form a valid path: {0}")]
    PathError(#[from] PathError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrackRecorder {
    pub fn new(params: Params) -> Result<Self, RecordError> {
        if !(params.sample_rate_hz > 0.0 && params.sample_rate_hz.is_finite())
            || !(params.min_distance_m >= 0.0)
        {
            return Err(RecordError::InvalidParams);
        }

        Ok(Self {
            params,
            recording: false,
            start_time_s: 0.0,
            last_sample_time_s: 0.0,
            points: Vec::new(),
        })
    }

    /// Start a new recording at `time_s`, discarding any previous one.
    ///
    /// The source's current position becomes the first point.
    pub fn start<S: PositionSource>(&mut self, source: &S, time_s: f64) -> Result<(), RecordError> {
        let position_m = sample(source)?;

        self.points.clear();
        self.points
            .push(Waypoint::new(position_m.x, position_m.y, 0.0));
        self.start_time_s = time_s;
        self.last_sample_time_s = time_s;
        self.recording = true;

        info!(
            "Recording started at ({:.3}, {:.3})",
            position_m.x, position_m.y
        );

        Ok(())
    }

    pub fn stop(&mut self) {
        if self.recording {
            self.recording = false;
            info!("Recording stopped with {} points", self.points.len());
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Sample the source at `time_s` if the sample period has elapsed.
    ///
    /// The position is kept if it is at least the minimum distance from the
    /// last recorded point. Returns false if not recording.
    pub fn update<S: PositionSource>(
        &mut self,
        source: &S,
        time_s: f64,
    ) -> Result<bool, RecordError> {
        if !self.recording {
            return Ok(false);
        }

        if time_s - self.last_sample_time_s < 1.0 / self.params.sample_rate_hz {
            return Ok(true);
        }

        let position_m = sample(source)?;
        self.last_sample_time_s = time_s;

        let last_m = match self.points.last() {
            Some(p) => p.position(),
            None => return Ok(true),
        };

        if (position_m - last_m).norm() < self.params.min_distance_m {
            return Ok(true);
        }

        let t = time_s - self.start_time_s;
        debug!(
            "Recorded ({:.3}, {:.3}) at {:.2} s",
            position_m.x, position_m.y, t
        );
        self.points.push(Waypoint::new(position_m.x, position_m.y, t));

        Ok(true)
    }

    /// The points recorded so far
    pub fn points(&self) -> &[Waypoint] {
        &self.points
    }

    /// Create a path from the recorded points.
    pub fn create_path<S: Into<String>>(&self, name: S) -> Result<Path, RecordError> {
        if self.points.len() < 2 {
            return Err(RecordError::TooFewPoints(self.points.len()));
        }

        Ok(Path::new(name, self.points.clone())?)
    }

    /// Get statistics on the recording so far.
    pub fn stats(&self) -> RecordStats {
        if self.points.len() < 2 {
            return RecordStats {
                num_points: self.points.len(),
                ..RecordStats::default()
            };
        }

        let duration_s = self.points[self.points.len() - 1].t - self.points[0].t;
        let distance_m: f64 = self
            .points
            .windows(2)
            .map(|w| (w[1].position() - w[0].position()).norm())
            .sum();

        RecordStats {
            num_points: self.points.len(),
            duration_s,
            distance_m,
            avg_speed_ms: if duration_s > 0.0 {
                distance_m / duration_s
            } else {
                0.0
            },
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn sample<S: PositionSource>(source: &S) -> Result<Vector2<f64>, RecordError> {
    let pose = source.get_pose().ok_or(RecordError::PoseUnavailable)?;

    if pose.position_m.iter().all(|v| v.is_finite()) {
        Ok(pose.position_m)
    } else {
        Err(RecordError::NonFinitePose)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::{ActuationSink, MoveCmd, SimAgent, SimAgentParams};
    use crate::loc::Pose;

    /// A source whose pose is set directly by the test.
    struct FixedSource(Option<Pose>);

    impl PositionSource for FixedSource {
        fn get_pose(&self) -> Option<Pose> {
            self.0
        }
    }

    fn at(x: f64, y: f64) -> FixedSource {
        FixedSource(Some(Pose::new(x, y, 0.0)))
    }

    #[test]
    fn test_invalid_params() {
        let bad = [
            Params {
                sample_rate_hz: 0.0,
                min_distance_m: 0.05,
            },
            Params {
                sample_rate_hz: std::f64::INFINITY,
                min_distance_m: 0.05,
            },
            Params {
                sample_rate_hz: 10.0,
                min_distance_m: -1.0,
            },
        ];

        for p in bad.iter() {
            assert!(matches!(
                TrackRecorder::new(*p),
                Err(RecordError::InvalidParams)
            ));
        }
    }

    #[test]
    fn test_not_recording() {
        let mut rec = TrackRecorder::new(Params::default()).unwrap();

        assert!(!rec.is_recording());
        assert!(!rec.update(&at(1.0, 1.0), 1.0).unwrap());
        assert!(rec.points().is_empty());
        assert_eq!(rec.stats(), RecordStats::default());
    }

    #[test]
    fn test_start() {
        let mut rec = TrackRecorder::new(Params::default()).unwrap();

        match rec.start(&FixedSource(None), 0.0) {
            Err(RecordError::PoseUnavailable) => (),
            r => panic!("Expected PoseUnavailable, got {:?}", r),
        }
        assert!(!rec.is_recording());

        rec.start(&at(1.0, 2.0), 5.0).unwrap();
        assert!(rec.is_recording());
        assert_eq!(rec.points(), &[Waypoint::new(1.0, 2.0, 0.0)]);

        // A single point isn't a path
        match rec.create_path("one") {
            Err(RecordError::TooFewPoints(1)) => (),
            r => panic!("Expected TooFewPoints, got {:?}", r),
        }

        let stats = rec.stats();
        assert_eq!(stats.num_points, 1);
        assert_eq!(stats.distance_m, 0.0);
    }

    #[test]
    fn test_sample_rate_and_distance() {
        let mut rec = TrackRecorder::new(Params {
            sample_rate_hz: 10.0,
            min_distance_m: 0.05,
        })
        .unwrap();

        rec.start(&at(0.0, 0.0), 0.0).unwrap();

        // Too soon after the start
        assert!(rec.update(&at(1.0, 0.0), 0.05).unwrap());
        assert_eq!(rec.points().len(), 1);

        rec.update(&at(1.0, 0.0), 0.1).unwrap();
        assert_eq!(rec.points().len(), 2);
        assert_eq!(rec.points()[1], Waypoint::new(1.0, 0.0, 0.1));

        // Too close to the last point, but still counts as a sample
        rec.update(&at(1.01, 0.0), 0.3).unwrap();
        assert_eq!(rec.points().len(), 2);
        rec.update(&at(2.0, 0.0), 0.35).unwrap();
        assert_eq!(rec.points().len(), 2);

        rec.update(&at(2.0, 0.0), 0.45).unwrap();
        assert_eq!(rec.points().len(), 3);

        // Non-finite positions are refused
        match rec.update(&at(std::f64::NAN, 0.0), 1.0) {
            Err(RecordError::NonFinitePose) => (),
            r => panic!("Expected NonFinitePose, got {:?}", r),
        }

        rec.stop();
        assert!(!rec.is_recording());
        assert!(!rec.update(&at(5.0, 0.0), 2.0).unwrap());
        assert_eq!(rec.points().len(), 3);

        let stats = rec.stats();
        assert_eq!(stats.num_points, 3);
        assert!((stats.duration_s - 0.45).abs() < 1e-12);
        assert!((stats.distance_m - 2.0).abs() < 1e-12);
        assert!((stats.avg_speed_ms - 2.0 / 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_record_sim_agent() {
        let mut agent = SimAgent::new(SimAgentParams::default(), Pose::default());
        let mut rec = TrackRecorder::new(Params::default()).unwrap();

        rec.start(&agent, 0.0).unwrap();
        agent
            .execute(MoveCmd::Move {
                dx_m: 1.0,
                dy_m: 0.0,
            })
            .unwrap();

        // Step at 50 Hz for 8 seconds, offering every step to the recorder
        for i in 1..=400 {
            agent.step(0.02);
            rec.update(&agent, i as f64 * 0.02).unwrap();
        }
        rec.stop();

        let path = rec.create_path("Recorded Track").unwrap();
        assert_eq!(path.name(), "Recorded Track");
        assert_eq!(path.first(), &Waypoint::new(0.0, 0.0, 0.0));
        assert!((path.last().position() - Vector2::new(1.0, 0.0)).norm() < 0.1);
        assert!(!path.is_closed());

        for w in path.points().windows(2) {
            assert!((w[1].position() - w[0].position()).norm() >= 0.05);
        }

        let stats = rec.stats();
        assert_eq!(stats.num_points, path.get_num_points());
        assert!((stats.distance_m - path.get_length()).abs() < 1e-9);
        assert!((stats.duration_s - path.total_duration()).abs() < 1e-9);

        // Never faster than the agent can go
        assert!(stats.avg_speed_ms > 0.0 && stats.avg_speed_ms <= 0.5);
    }
}
