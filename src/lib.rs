//! SolSense: DEM slope/aspect analysis and solar panel yield estimation.
//!
//! Loads a GeoTIFF elevation model, derives per-cell slope and aspect,
//! packs fixed-size panels into a plot anchored at a marker, and estimates
//! annual energy yield from NASA POWER climatology data.

pub mod energy;
pub mod irradiance;
pub mod packing;
pub mod raster_io;
pub mod session;
pub mod terrain;
pub mod types;

pub use irradiance::{IrradianceSource, PowerClient};
pub use packing::{next_fit_shelf, PackResult, PlacedPanel};
pub use session::{AnalysisReport, DemDataset, DemSession, Marker, TerrainSample};
pub use terrain::{slope_aspect, AspectDirection, TerrainGrids, FLAT_ASPECT};
pub use types::{EnergyParams, PanelSpec, PlotSpec, RasterData, SolError};
