//! # Path generation
//!
//! Canonical closed and open paths used for testing the follower. Each
//! generator assigns timestamps so that an agent moving at the given speed
//! along the path arrives at each point on time. The figure-eight is the
//! exception: its points are spaced uniformly in the curve parameter rather
//! than in arc length, so its speed is only approximate.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;
use std::path::PathBuf;

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use super::{InvalidPath, Path, PathError, Waypoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of a circular path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleParams {
    pub radius_m: f64,
    pub num_points: usize,
    pub speed_ms: f64,
    pub centre_m: [f64; 2],
}

/// Parameters of a figure-eight path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureEightParams {
    pub radius_m: f64,
    pub num_points: usize,
    pub speed_ms: f64,
}

/// Parameters of a square path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SquareParams {
    pub side_length_m: f64,
    pub points_per_side: usize,
    pub speed_ms: f64,
}

/// Parameters of a straight line path.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineParams {
    pub length_m: f64,
    pub num_points: usize,
    pub speed_ms: f64,
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// A description of a path to follow, either generated or loaded from a
/// file.
///
/// In TOML the kind of path is given by the `type` key, for example
///
/// ```toml
/// [path]
/// type = "square"
/// side_length_m = 4.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathSpec {
    Circle(CircleParams),
    FigureEight(FigureEightParams),
    Square(SquareParams),
    Line(LineParams),
    File { file_path: PathBuf },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CircleParams {
    fn default() -> Self {
        Self {
            radius_m: 2.0,
            num_points: 50,
            speed_ms: 0.5,
            centre_m: [0.0, 0.0],
        }
    }
}

impl Default for FigureEightParams {
    fn default() -> Self {
        Self {
            radius_m: 1.5,
            num_points: 100,
            speed_ms: 0.4,
        }
    }
}

impl Default for SquareParams {
    fn default() -> Self {
        Self {
            side_length_m: 3.0,
            points_per_side: 10,
            speed_ms: 0.5,
        }
    }
}

impl Default for LineParams {
    fn default() -> Self {
        Self {
            length_m: 5.0,
            num_points: 20,
            speed_ms: 0.5,
            heading_rad: 0.0,
        }
    }
}

impl Path {
    /// Build the path described by a [`PathSpec`].
    pub fn from_path_spec(spec: &PathSpec) -> Result<Self, PathError> {
        match spec {
            PathSpec::Circle(p) => circle(
                p.radius_m,
                p.num_points,
                p.speed_ms,
                Vector2::new(p.centre_m[0], p.centre_m[1]),
            ),
            PathSpec::FigureEight(p) => figure_eight(p.radius_m, p.num_points, p.speed_ms),
            PathSpec::Square(p) => square(p.side_length_m, p.points_per_side, p.speed_ms),
            PathSpec::Line(p) => straight_line(p.length_m, p.num_points, p.speed_ms, p.heading_rad),
            PathSpec::File { file_path } => Path::load(file_path),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Generate a circle around `centre_m`, starting on the +x side and running
/// anticlockwise.
///
/// There are `num_points` evenly spaced points plus a final point closing
/// the loop back onto the first.
pub fn circle(
    radius_m: f64,
    num_points: usize,
    speed_ms: f64,
    centre_m: Vector2<f64>,
) -> Result<Path, PathError> {
    require_points(num_points)?;

    let circumference_m = 2.0 * PI * radius_m;
    let total_time_s = circumference_m / speed_ms;
    let n = num_points as f64;

    let mut points: Vec<Waypoint> = (0..num_points)
        .map(|i| {
            let angle_rad = 2.0 * PI * i as f64 / n;
            Waypoint::new(
                centre_m.x + radius_m * angle_rad.cos(),
                centre_m.y + radius_m * angle_rad.sin(),
                total_time_s * i as f64 / n,
            )
        })
        .collect();

    points.push(Waypoint::new(centre_m.x + radius_m, centre_m.y, total_time_s));

    Path::new("Circle", points)
}

/// Generate a figure-eight (lemniscate) centred on the origin.
///
/// Uses `x = r sin(s)`, `y = r sin(s) cos(s)` for `num_points + 1` uniform
/// steps of `s` over a full turn. The timing assumes the path is as long as
/// two circles of radius `r`, which is an approximation.
pub fn figure_eight(radius_m: f64, num_points: usize, speed_ms: f64) -> Result<Path, PathError> {
    require_points(num_points)?;

    let path_length_m = 2.0 * (2.0 * PI * radius_m);
    let total_time_s = path_length_m / speed_ms;
    let n = num_points as f64;

    let points = (0..=num_points)
        .map(|i| {
            let s = 2.0 * PI * i as f64 / n;
            Waypoint::new(
                radius_m * s.sin(),
                radius_m * s.sin() * s.cos(),
                total_time_s * i as f64 / n,
            )
        })
        .collect();

    Path::new("Figure-Eight", points)
}

/// Generate a square centred on the origin.
///
/// The path starts at the `(-h, -h)` corner and runs anticlockwise, so the
/// first edge runs along +x. Each edge has `points_per_side` points, and a
/// final point closes the loop.
pub fn square(side_length_m: f64, points_per_side: usize, speed_ms: f64) -> Result<Path, PathError> {
    require_points(points_per_side)?;

    let half_m = side_length_m / 2.0;
    let corners = [
        Vector2::new(-half_m, -half_m),
        Vector2::new(half_m, -half_m),
        Vector2::new(half_m, half_m),
        Vector2::new(-half_m, half_m),
        Vector2::new(-half_m, -half_m),
    ];

    let total_time_s = (4.0 * side_length_m) / speed_ms;
    let total_points = (4 * points_per_side) as f64;

    let mut points = Vec::with_capacity(4 * points_per_side + 1);

    for edge in corners.windows(2) {
        for j in 0..points_per_side {
            let frac = j as f64 / points_per_side as f64;
            let pos = edge[0] + frac * (edge[1] - edge[0]);
            let t = total_time_s * points.len() as f64 / total_points;
            points.push(Waypoint::new(pos.x, pos.y, t));
        }
    }

    points.push(Waypoint::new(corners[4].x, corners[4].y, total_time_s));

    Path::new("Square", points)
}

/// Generate an open straight line from the origin along `heading_rad`.
///
/// The line is split into `num_points` equal segments.
pub fn straight_line(
    length_m: f64,
    num_points: usize,
    speed_ms: f64,
    heading_rad: f64,
) -> Result<Path, PathError> {
    require_points(num_points)?;

    let total_time_s = length_m / speed_ms;

    let points = (0..=num_points)
        .map(|i| {
            let frac = i as f64 / num_points as f64;
            Waypoint::new(
                frac * length_m * heading_rad.cos(),
                frac * length_m * heading_rad.sin(),
                frac * total_time_s,
            )
        })
        .collect();

    Path::new("Straight-Line", points)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Every generator adds one closing or end point, so zero points would leave
/// a single waypoint.
fn require_points(num_points: usize) -> Result<(), PathError> {
    if num_points == 0 {
        Err(InvalidPath::TooFewPoints(1).into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_circle() {
        let path = circle(2.0, 50, 0.5, Vector2::new(1.0, -1.0)).unwrap();

        assert_eq!(path.name(), "Circle");
        assert_eq!(path.get_num_points(), 51);
        assert!(path.is_closed());
        assert_close(path.total_duration(), 2.0 * PI * 2.0 / 0.5);

        for p in path.points() {
            assert_close((p.position() - Vector2::new(1.0, -1.0)).norm(), 2.0);
        }

        // Anticlockwise from +x
        assert_eq!(path.first().position(), Vector2::new(3.0, -1.0));
        assert!(path.points()[1].y > -1.0);
    }

    #[test]
    fn test_figure_eight() {
        let path = figure_eight(1.5, 100, 0.4).unwrap();

        assert_eq!(path.name(), "Figure-Eight");
        assert_eq!(path.get_num_points(), 101);
        assert!(path.is_closed());
        assert_close(path.total_duration(), 4.0 * PI * 1.5 / 0.4);

        // Lobes reach +-r along x
        let max_x = path.points().iter().map(|p| p.x).fold(0.0, f64::max);
        assert_close(max_x, 1.5);
    }

    #[test]
    fn test_square() {
        let path = square(2.0, 10, 0.5).unwrap();

        assert_eq!(path.name(), "Square");
        assert_eq!(path.get_num_points(), 41);
        assert!(path.is_closed());
        assert_close(path.total_duration(), 16.0);
        assert_close(path.get_length(), 8.0);

        assert_eq!(path.first().position(), Vector2::new(-1.0, -1.0));
        assert_eq!(path.points()[10].position(), Vector2::new(1.0, -1.0));
        assert_eq!(path.points()[20].position(), Vector2::new(1.0, 1.0));
        assert_eq!(path.points()[30].position(), Vector2::new(-1.0, 1.0));

        // Uniform timing around the loop
        assert_close(path.points()[1].t, 0.4);
        assert_close(path.points()[39].t, 15.6);
    }

    #[test]
    fn test_straight_line() {
        let path = straight_line(5.0, 20, 0.5, PI / 2.0).unwrap();

        assert_eq!(path.name(), "Straight-Line");
        assert_eq!(path.get_num_points(), 21);
        assert!(!path.is_closed());
        assert_close(path.total_duration(), 10.0);
        assert_close(path.last().x, 0.0);
        assert_close(path.last().y, 5.0);
        assert_close(path.get_length(), 5.0);
    }

    #[test]
    fn test_invalid_generation() {
        match straight_line(5.0, 0, 0.5, 0.0) {
            Err(PathError::InvalidPath(InvalidPath::TooFewPoints(1))) => (),
            r => panic!("Expected TooFewPoints, got {:?}", r),
        }

        // A stationary agent can't follow a path
        assert!(circle(2.0, 50, 0.0, Vector2::zeros()).is_err());
        assert!(square(2.0, 10, -1.0).is_err());
    }

    #[test]
    fn test_path_spec_from_toml() {
        let spec: PathSpec = util::params::from_str(
            r#"
            type = "square"
            side_length_m = 2.0
            "#,
        )
        .unwrap();

        let path = Path::from_path_spec(&spec).unwrap();
        assert_eq!(path.name(), "Square");
        assert_eq!(path.get_num_points(), 41);
        assert_close(path.total_duration(), 16.0);

        let spec: PathSpec = util::params::from_str("type = \"figure_eight\"").unwrap();
        let path = Path::from_path_spec(&spec).unwrap();
        assert_eq!(path.get_num_points(), 101);

        let spec: PathSpec = util::params::from_str(
            r#"
            type = "line"
            length_m = 3.0
            num_points = 6
            "#,
        )
        .unwrap();
        let path = Path::from_path_spec(&spec).unwrap();
        assert!(!path.is_closed());
        assert_close(path.get_length(), 3.0);
    }
}
