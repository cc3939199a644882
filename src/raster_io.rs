use std::path::Path;

use gdal::raster::ResampleAlg;
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use gdal::Dataset;
use ndarray::Array2;
use tracing::warn;

use crate::types::{RasterData, SolError};

pub struct RasterIO;

impl RasterIO {
    /// Read band 1 of a GeoTIFF as an elevation grid.
    ///
    /// A missing or malformed geotransform aborts the load. A missing CRS
    /// only warns; coordinates then stay in pixel space. Nodata cells are
    /// rewritten to `NaN`.
    pub fn read_dem(path: &Path) -> Result<RasterData, SolError> {
        let dataset = Dataset::open(path)?;
        let transform = dataset.geo_transform()?;
        let projection = dataset.projection();

        let band = dataset.rasterband(1)?;
        let no_data_value = band.no_data_value().map(|v| v as f32);
        let (width, height) = band.size();

        let mut data = vec![0f32; width * height];
        band.read_into_slice(
            (0, 0),
            (width, height),
            (width, height),
            &mut data,
            Some(ResampleAlg::NearestNeighbour),
        )?;

        let mut array = Array2::from_shape_vec((height, width), data)
            .map_err(|e| SolError::Config(format!("Failed to create array: {}", e)))?;

        if let Some(nodata) = no_data_value {
            array.mapv_inplace(|v| if v == nodata { f32::NAN } else { v });
        }

        if projection.is_empty() {
            warn!(
                path = %path.display(),
                "GeoTIFF has no CRS; coordinates will be interpreted in pixel space"
            );
        }

        Ok(RasterData {
            data: array,
            transform,
            projection,
            no_data_value,
        })
    }

    /// Pixel-center `(col, row)` to native CRS coordinates.
    pub fn pixel_to_world(col: usize, row: usize, transform: &[f64; 6]) -> (f64, f64) {
        let cf = col as f64 + 0.5;
        let rf = row as f64 + 0.5;
        let x = transform[0] + cf * transform[1] + rf * transform[2];
        let y = transform[3] + cf * transform[4] + rf * transform[5];
        (x, y)
    }

    /// Native CRS coordinates to geographic longitude/latitude.
    ///
    /// Identity when the source CRS is already geographic or absent (the
    /// pixel-space fallback). Conversion failure is recoverable; the caller
    /// decides whether to keep going.
    pub fn native_to_lonlat(x: f64, y: f64, projection_wkt: &str) -> Result<(f64, f64), SolError> {
        if projection_wkt.is_empty() {
            return Ok((x, y));
        }

        let src = SpatialRef::from_wkt(projection_wkt)?;
        if src.is_geographic() {
            return Ok((x, y));
        }

        let dst = SpatialRef::from_epsg(4326)?;
        // Lon/lat ordering regardless of the authority's axis definition.
        src.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);
        dst.set_axis_mapping_strategy(gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER);

        let ct = CoordTransform::new(&src, &dst)?;
        let mut xs = [x];
        let mut ys = [y];
        let mut zs = [0.0];
        ct.transform_coords(&mut xs, &mut ys, &mut zs)?;

        Ok((xs[0], ys[0]))
    }

    /// Absolute pixel size `(width, height)` from a geotransform.
    pub fn pixel_size(transform: &[f64; 6]) -> (f64, f64) {
        (transform[1].abs(), transform[5].abs())
    }
}
