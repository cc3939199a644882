//! Analysis session: the loaded DEM, its derived grids, and the marker.
//!
//! Everything the orchestrator needs lives in one explicit context object
//! instead of scattered globals. The two engines stay pure; the session
//! only wires data between them.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use geo_types::Point;
use ndarray::Array2;
use tracing::{info, warn};

use crate::energy::annual_energy_kwh;
use crate::irradiance::IrradianceSource;
use crate::packing::{next_fit_shelf, PlacedPanel};
use crate::raster_io::RasterIO;
use crate::terrain::{self, AspectDirection};
use crate::types::{EnergyParams, PanelSpec, PlotSpec, SolError};

/// A loaded DEM with its derived slope/aspect grids. Immutable once built.
#[derive(Debug, Clone)]
pub struct DemDataset {
    pub path: PathBuf,
    pub elevation: Array2<f32>,
    pub slope_deg: Array2<f32>,
    pub aspect_deg: Array2<f32>,
    pub transform: [f64; 6],
    pub projection: String,
    pub pixel_width_m: f64,
    pub pixel_height_m: f64,
}

/// Marker anchoring the plot, with its geographic location.
#[derive(Debug, Clone, Copy)]
pub struct Marker {
    pub col: usize,
    pub row: usize,
    /// Longitude/latitude (or native/pixel coordinates when the raster has
    /// no usable CRS).
    pub location: Point<f64>,
}

/// Terrain values sampled at one cell.
#[derive(Debug, Clone, Copy)]
pub struct TerrainSample {
    pub slope_deg: f32,
    pub aspect_deg: f32,
    pub direction: AspectDirection,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub location: Point<f64>,
    pub sample: TerrainSample,
    pub panels: Vec<PlacedPanel>,
    pub requested_count: Option<usize>,
    /// `None` when the irradiance lookup failed; packing and terrain
    /// results stay valid regardless.
    pub annual_kwh: Option<f64>,
    pub iteration_cap_hit: bool,
}

impl AnalysisReport {
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }
}

#[derive(Debug, Default)]
pub struct DemSession {
    dataset: Option<DemDataset>,
    marker: Option<Marker>,
}

impl DemSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self) -> Option<&DemDataset> {
        self.dataset.as_ref()
    }

    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    /// Load a DEM and derive its slope/aspect grids.
    ///
    /// The new dataset replaces the old one only after every step has
    /// succeeded, so a failed load leaves previously loaded data intact.
    /// The marker is cleared because it referenced the old grid.
    pub fn load_dem(&mut self, path: &Path) -> Result<&DemDataset, SolError> {
        let raster = RasterIO::read_dem(path)?;
        let (pixel_width_m, pixel_height_m) = RasterIO::pixel_size(&raster.transform);

        let grids = terrain::slope_aspect(&raster.data, pixel_width_m, pixel_height_m);
        let (rows, cols) = raster.data.dim();
        info!(
            path = %path.display(),
            rows, cols, pixel_width_m, pixel_height_m,
            "DEM loaded, slope/aspect derived"
        );

        let dataset = DemDataset {
            path: path.to_path_buf(),
            elevation: raster.data,
            slope_deg: grids.slope_deg,
            aspect_deg: grids.aspect_deg,
            transform: raster.transform,
            projection: raster.projection,
            pixel_width_m,
            pixel_height_m,
        };

        self.marker = None;
        Ok(self.dataset.insert(dataset))
    }

    /// Place the marker at a pixel and resolve its geographic location.
    ///
    /// A coordinate conversion failure clears the marker and surfaces the
    /// error; the loaded dataset stays usable.
    pub fn place_marker(&mut self, col: usize, row: usize) -> Result<&Marker, SolError> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| SolError::InvalidInput("no DEM loaded".to_string()))?;

        let (rows, cols) = dataset.elevation.dim();
        if row >= rows || col >= cols {
            return Err(SolError::InvalidInput(format!(
                "marker pixel ({col}, {row}) outside raster bounds {cols}x{rows}"
            )));
        }

        let (x, y) = RasterIO::pixel_to_world(col, row, &dataset.transform);
        match RasterIO::native_to_lonlat(x, y, &dataset.projection) {
            Ok((lon, lat)) => {
                let marker = Marker {
                    col,
                    row,
                    location: Point::new(lon, lat),
                };
                Ok(self.marker.insert(marker))
            }
            Err(e) => {
                self.marker = None;
                warn!(error = %e, "coordinate conversion failed; marker cleared");
                Err(e)
            }
        }
    }

    /// Slope, aspect and compass direction at the marker cell.
    pub fn sample_at_marker(&self) -> Result<TerrainSample, SolError> {
        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| SolError::InvalidInput("no DEM loaded".to_string()))?;
        let marker = self
            .marker
            .ok_or_else(|| SolError::InvalidInput("no marker placed".to_string()))?;

        let slope_deg = dataset.slope_deg[[marker.row, marker.col]];
        let aspect_deg = dataset.aspect_deg[[marker.row, marker.col]];
        Ok(TerrainSample {
            slope_deg,
            aspect_deg,
            direction: AspectDirection::from_degrees(aspect_deg),
        })
    }

    /// Pack the plot anchored at the marker and estimate annual energy.
    ///
    /// Irradiance or data-quality failures leave `annual_kwh` unset instead
    /// of failing the run: the packing and terrain results are still good.
    pub fn analyze(
        &self,
        plot: &PlotSpec,
        panel: &PanelSpec,
        max_count: Option<usize>,
        energy: &EnergyParams,
        source: &mut IrradianceSource,
    ) -> Result<AnalysisReport, SolError> {
        if max_count == Some(0) {
            return Err(SolError::InvalidInput(
                "requested panel count must be positive".to_string(),
            ));
        }

        let sample = self.sample_at_marker()?;
        let marker = self
            .marker
            .ok_or_else(|| SolError::InvalidInput("no marker placed".to_string()))?;

        let pack = next_fit_shelf(
            plot.width_m,
            plot.height_m,
            panel.width_m,
            panel.height_m,
            max_count,
        );
        let count = pack.panels.len();

        let annual_kwh = if count == 0 {
            Some(0.0)
        } else {
            match source.annual_irradiance(marker.location.x(), marker.location.y()) {
                Ok(irradiance) => Some(annual_energy_kwh(
                    irradiance,
                    panel.area_m2(),
                    energy.efficiency,
                    energy.performance_ratio,
                    count,
                )),
                Err(e) => {
                    warn!(error = %e, "irradiance lookup failed; energy estimate unavailable");
                    None
                }
            }
        };

        Ok(AnalysisReport {
            location: marker.location,
            sample,
            panels: pack.panels,
            requested_count: max_count,
            annual_kwh,
            iteration_cap_hit: pack.iteration_cap_hit,
        })
    }

    /// Write one analysis row as CSV.
    ///
    /// Header is fixed; timestamp is UTC ISO-8601 at seconds precision.
    /// No-data slope is written as `NoData`, an unavailable energy estimate
    /// as `0`.
    pub fn export_csv(path: &Path, report: &AnalysisReport) -> Result<(), SolError> {
        let mut file = File::create(path)?;

        writeln!(
            file,
            "Lon,Lat,Slope_deg,Aspect_direction,Panels,Annual_kWh,Timestamp"
        )?;

        let slope_text = if report.sample.slope_deg.is_nan() {
            "NoData".to_string()
        } else {
            format!("{:.2}", report.sample.slope_deg)
        };
        let energy_text = match report.annual_kwh {
            Some(kwh) => format!("{:.2}", kwh),
            None => "0".to_string(),
        };
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

        writeln!(
            file,
            "{:.6},{:.6},{},{},{},{},{}",
            report.location.x(),
            report.location.y(),
            slope_text,
            report.sample.direction,
            report.panel_count(),
            energy_text,
            timestamp,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report(slope_deg: f32, annual_kwh: Option<f64>) -> AnalysisReport {
        AnalysisReport {
            location: Point::new(151.2093, -33.8688),
            sample: TerrainSample {
                slope_deg,
                aspect_deg: 180.0,
                direction: AspectDirection::from_degrees(180.0),
            },
            panels: vec![PlacedPanel {
                x: 0.0,
                y: 0.0,
                width: 1.65,
                height: 1.0,
            }],
            requested_count: None,
            annual_kwh,
            iteration_cap_hit: false,
        }
    }

    #[test]
    fn csv_export_writes_the_fixed_header_and_one_row() {
        let path = std::env::temp_dir().join("solsense_csv_export_test.csv");
        let report = sample_report(12.34, Some(433.62));

        DemSession::export_csv(&path, &report).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Lon,Lat,Slope_deg,Aspect_direction,Panels,Annual_kWh,Timestamp"
        );

        let row: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(row.len(), 7);
        assert_eq!(row[0], "151.209300");
        assert_eq!(row[1], "-33.868800");
        assert_eq!(row[2], "12.34");
        assert_eq!(row[3], "S");
        assert_eq!(row[4], "1");
        assert_eq!(row[5], "433.62");
        // 2026-08-23T10:15:42Z
        assert!(row[6].ends_with('Z') && row[6].contains('T'));
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_export_maps_sentinels() {
        let path = std::env::temp_dir().join("solsense_csv_sentinel_test.csv");
        let report = sample_report(f32::NAN, None);

        DemSession::export_csv(&path, &report).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let row: Vec<&str> = contents.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(row[2], "NoData");
        assert_eq!(row[5], "0");
    }

    #[test]
    fn analyze_requires_a_marker() {
        let session = DemSession::new();
        let plot = PlotSpec::new(100.0, 50.0).unwrap();
        let panel = PanelSpec::new(1.65, 1.0).unwrap();
        let energy = EnergyParams::new(0.18, 0.8).unwrap();
        let mut source = IrradianceSource::Fixed(5.0);

        let err = session
            .analyze(&plot, &panel, None, &energy, &mut source)
            .unwrap_err();
        assert!(err.to_string().contains("no DEM loaded"));
    }

    #[test]
    fn analyze_rejects_a_zero_panel_request() {
        let session = DemSession::new();
        let plot = PlotSpec::new(100.0, 50.0).unwrap();
        let panel = PanelSpec::new(1.65, 1.0).unwrap();
        let energy = EnergyParams::new(0.18, 0.8).unwrap();
        let mut source = IrradianceSource::Fixed(5.0);

        let err = session
            .analyze(&plot, &panel, Some(0), &energy, &mut source)
            .unwrap_err();
        assert!(err.to_string().contains("count must be positive"));
    }

    #[test]
    fn place_marker_requires_a_dataset() {
        let mut session = DemSession::new();
        assert!(session.place_marker(0, 0).is_err());
    }
}
