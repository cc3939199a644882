use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Single-band elevation raster with its georeferencing metadata.
///
/// Nodata cells are normalised to `NaN` when the raster is read, so the
/// grids derived from it only ever have to deal with one sentinel.
#[derive(Debug, Clone)]
pub struct RasterData {
    pub data: Array2<f32>,
    pub transform: [f64; 6],
    pub projection: String,
    pub no_data_value: Option<f32>,
}

/// Rectangular ground plot the panels are packed into, in meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlotSpec {
    pub width_m: f64,
    pub height_m: f64,
}

impl PlotSpec {
    pub fn new(width_m: f64, height_m: f64) -> Result<Self, SolError> {
        if width_m <= 0.0 {
            return Err(SolError::InvalidInput(format!(
                "plot width must be positive, got {width_m}"
            )));
        }
        if height_m <= 0.0 {
            return Err(SolError::InvalidInput(format!(
                "plot height must be positive, got {height_m}"
            )));
        }
        Ok(Self { width_m, height_m })
    }
}

/// Dimensions of a single panel, in meters. Panels are packed in a fixed
/// orientation; no rotation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PanelSpec {
    pub width_m: f64,
    pub height_m: f64,
}

impl PanelSpec {
    pub fn new(width_m: f64, height_m: f64) -> Result<Self, SolError> {
        if width_m <= 0.0 {
            return Err(SolError::InvalidInput(format!(
                "panel width must be positive, got {width_m}"
            )));
        }
        if height_m <= 0.0 {
            return Err(SolError::InvalidInput(format!(
                "panel height must be positive, got {height_m}"
            )));
        }
        Ok(Self { width_m, height_m })
    }

    pub fn area_m2(&self) -> f64 {
        self.width_m * self.height_m
    }
}

/// Electrical parameters for the energy estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnergyParams {
    /// Panel efficiency as a fraction in (0, 1].
    pub efficiency: f64,
    /// System performance ratio as a fraction in (0, 1].
    pub performance_ratio: f64,
}

impl EnergyParams {
    pub fn new(efficiency: f64, performance_ratio: f64) -> Result<Self, SolError> {
        if !(efficiency > 0.0 && efficiency <= 1.0) {
            return Err(SolError::InvalidInput(format!(
                "panel efficiency must be in (0, 1], got {efficiency}"
            )));
        }
        if !(performance_ratio > 0.0 && performance_ratio <= 1.0) {
            return Err(SolError::InvalidInput(format!(
                "performance ratio must be in (0, 1], got {performance_ratio}"
            )));
        }
        Ok(Self {
            efficiency,
            performance_ratio,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("data quality error: {0}")]
    DataQuality(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
