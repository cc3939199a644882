//! Slope and aspect derivation from an elevation grid.
//!
//! Uses the Horn (1981) finite-difference estimator over a 3x3
//! neighborhood. The grid is padded by one cell of edge replication so
//! boundary cells get a full window instead of a spurious gradient.

use std::fmt;

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

/// Aspect sentinel for cells whose slope is numerically zero.
pub const FLAT_ASPECT: f32 = -1.0;

/// Slope below this many degrees counts as flat; aspect is undefined there.
const FLAT_SLOPE_EPSILON: f64 = 1e-6;

/// Slope and aspect grids derived from one elevation grid. Both share the
/// source's shape and its `NaN` cells.
#[derive(Debug, Clone)]
pub struct TerrainGrids {
    /// Slope angle in degrees, [0, 90], `NaN` where the source was nodata.
    pub slope_deg: Array2<f32>,
    /// Compass-facing angle in degrees, [0, 360), with 0 = north.
    /// [`FLAT_ASPECT`] where the slope is zero, `NaN` where the source was
    /// nodata.
    pub aspect_deg: Array2<f32>,
}

/// Derive slope and aspect from an elevation grid.
///
/// `pixel_width` and `pixel_height` are the cell spacing in the same linear
/// unit as the elevation values (typically meters).
///
/// A `NaN` elevation propagates through the 3x3 window arithmetic, so cells
/// adjacent to nodata come out `NaN` as well; source nodata cells are
/// always `NaN` in both outputs.
pub fn slope_aspect(dem: &Array2<f32>, pixel_width: f64, pixel_height: f64) -> TerrainGrids {
    let (rows, cols) = dem.dim();
    if rows == 0 || cols == 0 {
        return TerrainGrids {
            slope_deg: Array2::zeros((rows, cols)),
            aspect_deg: Array2::zeros((rows, cols)),
        };
    }

    let padded = pad_edge(dem);
    let eight_dx = 8.0 * pixel_width;
    let eight_dy = 8.0 * pixel_height;

    let per_row: Vec<(Vec<f32>, Vec<f32>)> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut slope_row = vec![f32::NAN; cols];
            let mut aspect_row = vec![f32::NAN; cols];

            for col in 0..cols {
                // Center of the window sits at (row + 1, col + 1) in the
                // padded grid.
                let r = row + 1;
                let c = col + 1;

                let tl = f64::from(padded[[r - 1, c - 1]]);
                let top = f64::from(padded[[r - 1, c]]);
                let tr = f64::from(padded[[r - 1, c + 1]]);
                let left = f64::from(padded[[r, c - 1]]);
                let right = f64::from(padded[[r, c + 1]]);
                let bl = f64::from(padded[[r + 1, c - 1]]);
                let bot = f64::from(padded[[r + 1, c]]);
                let br = f64::from(padded[[r + 1, c + 1]]);

                let dz_dx = ((tr + 2.0 * right + br) - (tl + 2.0 * left + bl)) / eight_dx;
                let dz_dy = ((bl + 2.0 * bot + br) - (tl + 2.0 * top + tr)) / eight_dy;

                let slope_deg = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt().atan().to_degrees();

                let mut aspect_deg = compass_bearing(dz_dx, dz_dy);
                if slope_deg < FLAT_SLOPE_EPSILON {
                    aspect_deg = f64::from(FLAT_ASPECT);
                }

                slope_row[col] = slope_deg as f32;
                aspect_row[col] = aspect_deg as f32;
            }

            (slope_row, aspect_row)
        })
        .collect();

    let mut slope = Array2::<f32>::zeros((rows, cols));
    let mut aspect = Array2::<f32>::zeros((rows, cols));
    for (row, (slope_row, aspect_row)) in per_row.into_iter().enumerate() {
        for col in 0..cols {
            slope[[row, col]] = slope_row[col];
            aspect[[row, col]] = aspect_row[col];
        }
    }

    // Source nodata always wins, including over the flat sentinel.
    for ((row, col), &value) in dem.indexed_iter() {
        if value.is_nan() {
            slope[[row, col]] = f32::NAN;
            aspect[[row, col]] = f32::NAN;
        }
    }

    TerrainGrids {
        slope_deg: slope,
        aspect_deg: aspect,
    }
}

/// Compass bearing of the gradient in degrees, [0, 360), 0 = north.
fn compass_bearing(dz_dx: f64, dz_dy: f64) -> f64 {
    let mut bearing = dz_dx.atan2(dz_dy).to_degrees();
    if bearing < 0.0 {
        bearing += 360.0;
    }
    // A bearing a hair below zero can round to exactly 360 after the wrap;
    // fold it back so the range stays half-open.
    if bearing >= 360.0 {
        bearing -= 360.0;
    }
    bearing
}

/// Pad by one cell on each side, replicating edge values.
fn pad_edge(dem: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = dem.dim();
    let mut padded = Array2::<f32>::zeros((rows + 2, cols + 2));
    for r in 0..rows + 2 {
        let src_r = r.saturating_sub(1).min(rows - 1);
        for c in 0..cols + 2 {
            let src_c = c.saturating_sub(1).min(cols - 1);
            padded[[r, c]] = dem[[src_r, src_c]];
        }
    }
    padded
}

/// Eight-way compass classification of an aspect angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AspectDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    /// Slope is zero; facing is undefined.
    Flat,
    /// The source cell had no measurement.
    NoData,
}

impl AspectDirection {
    /// Map an aspect angle (degrees, 0 = north) to a compass label using
    /// 45-degree bins centered on the cardinal and diagonal directions.
    pub fn from_degrees(aspect_deg: f32) -> Self {
        if aspect_deg.is_nan() {
            return Self::NoData;
        }
        if aspect_deg < 0.0 {
            return Self::Flat;
        }
        let deg = aspect_deg % 360.0;
        if !(22.5..337.5).contains(&deg) {
            Self::North
        } else if deg < 67.5 {
            Self::NorthEast
        } else if deg < 112.5 {
            Self::East
        } else if deg < 157.5 {
            Self::SouthEast
        } else if deg < 202.5 {
            Self::South
        } else if deg < 247.5 {
            Self::SouthWest
        } else if deg < 292.5 {
            Self::West
        } else {
            Self::NorthWest
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
            Self::Flat => "Flat",
            Self::NoData => "NoData",
        }
    }
}

impl fmt::Display for AspectDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
