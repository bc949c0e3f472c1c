//! # Path
//!
//! This module defines the timestamped reference path followed by the pursuit
//! controller, along with the geometric queries the controller makes on it.
//!
//! A path is an ordered list of waypoints in the world frame. Each waypoint
//! carries the time (relative to the start of the path) at which the agent
//! should reach it. Segment `i` of a path is the straight line joining points
//! `i` and `i + 1`.
//!
//! Paths are validated on construction and are read-only afterwards, so any
//! `Path` value is guaranteed to have at least two points, strictly
//! increasing timestamps and finite coordinates.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod gen;

pub use gen::PathSpec;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::TryFrom;
use std::fs;

// External
use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Segments and directions shorter than this are treated as degenerate.
pub const GEOM_EPSILON: f64 = 1e-6;

/// A path whose first and last points are closer than this forms a closed
/// loop.
pub const CLOSED_PATH_THRESHOLD_M: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single timestamped point on a path.
///
/// Serialised as a `[x, y, t]` array.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Waypoint {
    /// Position along the world X axis in meters
    pub x: f64,

    /// Position along the world Y axis in meters
    pub y: f64,

    /// Time at which the agent should reach this point, in seconds since the
    /// start of the path
    pub t: f64,
}

/// A path defining the desired trajectory of the agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PathFile", into = "PathFile")]
pub struct Path {
    name: String,
    points: Vec<Waypoint>,
}

/// The on-disk layout of a path, `{"name": ..., "points": [[x, y, t], ...]}`.
#[derive(Serialize, Deserialize)]
struct PathFile {
    name: String,
    points: Vec<Waypoint>,
}

/// A point found by walking forward along the path.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointAlong {
    /// The position of the point
    pub position_m: Vector2<f64>,

    /// The index of the segment the point lies on, `len - 2` if the path ran
    /// out before the requested distance was covered.
    pub segment_index: usize,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The reason a sequence of waypoints does not form a valid path.
#[derive(Debug, Copy, Clone, PartialEq, thiserror::Error)]
pub enum InvalidPath {
    #[error("expected at least 2 points, found {0}")]
    TooFewPoints(usize),

    #[error("the timestamp of point {0} is not greater than that of the previous point")]
    NonIncreasingTimestamp(usize),

    #[error("point {0} contains a non-finite value")]
    NonFinite(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Invalid path: {0}")]
    InvalidPath(#[from] InvalidPath),

    #[error("Cannot access the path file: {0}")]
    FileError(std::io::Error),

    #[error("Cannot parse the path file: {0}")]
    ParseError(serde_json::Error),

    #[error("Cannot serialise the path: {0}")]
    SerialiseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(x: f64, y: f64, t: f64) -> Self {
        Self { x, y, t }
    }

    /// The position of the waypoint as a vector.
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<[f64; 3]> for Waypoint {
    fn from(p: [f64; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<Waypoint> for [f64; 3] {
    fn from(p: Waypoint) -> Self {
        [p.x, p.y, p.t]
    }
}

impl Path {
    /// Create a new path from a sequence of waypoints.
    ///
    /// Fails with [`PathError::InvalidPath`] if there are fewer than two
    /// points, the timestamps are not strictly increasing, or any value is
    /// not finite.
    pub fn new<S: Into<String>>(name: S, points: Vec<Waypoint>) -> Result<Self, PathError> {
        validate(&points)?;

        Ok(Self {
            name: name.into(),
            points,
        })
    }

    /// Load a path from a JSON path file.
    pub fn load<P: AsRef<std::path::Path>>(file_path: P) -> Result<Self, PathError> {
        let path_str = fs::read_to_string(file_path.as_ref()).map_err(PathError::FileError)?;

        let path = Self::from_json(&path_str)?;

        debug!(
            "Loaded path \"{}\" ({} points) from {:?}",
            path.name,
            path.points.len(),
            file_path.as_ref()
        );

        Ok(path)
    }

    /// Save the path into a JSON path file, overwriting any existing file.
    pub fn save<P: AsRef<std::path::Path>>(&self, file_path: P) -> Result<(), PathError> {
        fs::write(file_path, self.to_json()?).map_err(PathError::FileError)
    }

    /// Parse a path from its JSON representation.
    ///
    /// A well formed document describing an invalid path is reported as
    /// [`PathError::InvalidPath`] rather than as a parse error.
    pub fn from_json(json: &str) -> Result<Self, PathError> {
        let file: PathFile = serde_json::from_str(json).map_err(PathError::ParseError)?;

        Ok(Self::try_from(file)?)
    }

    /// Get the JSON representation of the path.
    pub fn to_json(&self) -> Result<String, PathError> {
        serde_json::to_string_pretty(self).map_err(PathError::SerialiseError)
    }

    /// The display name of the path
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The waypoints making up the path
    pub fn points(&self) -> &[Waypoint] {
        &self.points
    }

    /// Get the number of points in the path
    pub fn get_num_points(&self) -> usize {
        self.points.len()
    }

    /// Index of the final waypoint
    pub fn last_index(&self) -> usize {
        self.points.len() - 1
    }

    pub fn first(&self) -> &Waypoint {
        &self.points[0]
    }

    pub fn last(&self) -> &Waypoint {
        &self.points[self.points.len() - 1]
    }

    /// Time between the first and last waypoints in seconds.
    pub fn total_duration(&self) -> f64 {
        self.last().t - self.first().t
    }

    /// Return the length of the path in meters.
    pub fn get_length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].position() - w[0].position()).norm())
            .sum()
    }

    /// Whether the path forms a closed loop, i.e. its first and last points
    /// coincide.
    pub fn is_closed(&self) -> bool {
        (self.last().position() - self.first().position()).norm() < CLOSED_PATH_THRESHOLD_M
    }

    /// Find the point nearest to `position` within a window around
    /// `start_from`.
    ///
    /// The points searched are those with indices in
    /// `[start_from - backward_window, start_from + forward_window)`, clamped
    /// to the path. The window always contains `start_from` itself, which is
    /// first clamped to the last index. Restricting the search stops the
    /// match snapping onto a distant part of the path which happens to pass
    /// nearby, such as the crossing of a figure-eight or a previous lap.
    ///
    /// Returns the index of the nearest point and the distance to it. Ties
    /// resolve to the lowest index.
    pub fn nearest_index(
        &self,
        position: &Vector2<f64>,
        start_from: usize,
        backward_window: usize,
        forward_window: usize,
    ) -> (usize, f64) {
        let start_from = start_from.min(self.last_index());

        let search_start = start_from.saturating_sub(backward_window);
        let search_end = start_from
            .saturating_add(forward_window.max(1))
            .min(self.points.len());

        let mut nearest = (start_from, std::f64::INFINITY);

        for i in search_start..search_end {
            let dist_m = (self.points[i].position() - position).norm();
            if dist_m < nearest.1 {
                nearest = (i, dist_m);
            }
        }

        nearest
    }

    /// Get the direction of the path around the given point, averaged over
    /// the segments within `window` of `index`.
    ///
    /// Each segment's unit direction is weighted by `1 / (1 + |i - index|)`
    /// so nearer segments dominate. This smooths the direction out through
    /// sharp corners. Degenerate segments are ignored.
    ///
    /// If no segment in the window has a usable direction the segment
    /// starting at `index` is used, and if that is degenerate too, or the
    /// averaged directions cancel out, `(1, 0)` is returned.
    pub fn smoothed_direction(&self, index: usize, window: usize) -> Vector2<f64> {
        let last_segment = self.points.len() - 2;
        let start = index.saturating_sub(window);
        let end = index.saturating_add(window).min(last_segment);

        let mut sum = Vector2::zeros();
        let mut total_weight = 0f64;

        for i in start..=end {
            if let Some(dir) = self.segment_direction(i) {
                let weight = 1.0 / (1.0 + (i as f64 - index as f64).abs());
                sum += dir * weight;
                total_weight += weight;
            }
        }

        if total_weight <= 0.0 {
            return self
                .segment_direction(index)
                .unwrap_or_else(|| Vector2::new(1.0, 0.0));
        }

        let avg = sum / total_weight;
        let norm = avg.norm();

        if norm > GEOM_EPSILON {
            avg / norm
        } else {
            Vector2::new(1.0, 0.0)
        }
    }

    /// Walk forward along the path from the point at `from_index` by
    /// `distance_m` of arc length.
    ///
    /// The returned point is linearly interpolated on the segment where the
    /// accumulated length reaches `distance_m`. If the path ends first the
    /// final waypoint is returned.
    pub fn point_along(&self, from_index: usize, distance_m: f64) -> PointAlong {
        let mut accumulated_m = 0f64;

        for i in from_index.min(self.last_index())..self.last_index() {
            let start = self.points[i].position();
            let seg = self.points[i + 1].position() - start;
            let seg_length_m = seg.norm();

            if accumulated_m + seg_length_m >= distance_m {
                let frac = if seg_length_m > GEOM_EPSILON {
                    ((distance_m - accumulated_m) / seg_length_m).max(0.0).min(1.0)
                } else {
                    0.0
                };

                return PointAlong {
                    position_m: start + seg * frac,
                    segment_index: i,
                };
            }

            accumulated_m += seg_length_m;
        }

        PointAlong {
            position_m: self.last().position(),
            segment_index: self.points.len() - 2,
        }
    }

    /// Unit direction of the segment starting at `index`, or `None` if there
    /// is no such segment or it is degenerate.
    fn segment_direction(&self, index: usize) -> Option<Vector2<f64>> {
        if index + 1 >= self.points.len() {
            return None;
        }

        let seg = self.points[index + 1].position() - self.points[index].position();
        let length_m = seg.norm();

        if length_m > GEOM_EPSILON {
            Some(seg / length_m)
        } else {
            None
        }
    }
}

impl TryFrom<PathFile> for Path {
    type Error = InvalidPath;

    fn try_from(file: PathFile) -> Result<Self, Self::Error> {
        validate(&file.points)?;

        Ok(Self {
            name: file.name,
            points: file.points,
        })
    }
}

impl From<Path> for PathFile {
    fn from(path: Path) -> Self {
        Self {
            name: path.name,
            points: path.points,
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn validate(points: &[Waypoint]) -> Result<(), InvalidPath> {
    if points.len() < 2 {
        return Err(InvalidPath::TooFewPoints(points.len()));
    }

    for (i, p) in points.iter().enumerate() {
        if !(p.x.is_finite() && p.y.is_finite() && p.t.is_finite()) {
            return Err(InvalidPath::NonFinite(i));
        }

        if i > 0 && p.t <= points[i - 1].t {
            return Err(InvalidPath::NonIncreasingTimestamp(i));
        }
    }

    Ok(())
}
