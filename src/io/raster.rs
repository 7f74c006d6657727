use crate::types::{GeoTransform, InsarError, InsarResult, ScalarField};
use gdal::{Dataset, DriverManager};
use std::path::Path;

/// Conventional integer pre-scale carried by ISCE coherence rasters
pub const DEFAULT_COHERENCE_SCALE: f32 = 1000.0;

/// A raster read from disk: samples plus georeferencing.
#[derive(Debug, Clone)]
pub struct RasterData {
    pub field: ScalarField,
    pub geo_transform: GeoTransform,
    pub projection: String,
}

/// Read a raster as float32, reducing multi-band inputs to band 1.
pub fn read_raster<P: AsRef<Path>>(path: P) -> InsarResult<RasterData> {
    let path = path.as_ref();
    log::info!("Reading raster: {}", path.display());

    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    if dataset.raster_count() > 1 {
        log::debug!(
            "Raster has {} bands; using band 1",
            dataset.raster_count()
        );
    }

    let rasterband = dataset.rasterband(1)?;
    let buffer = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;
    let field = ScalarField::from_shape_vec((height, width), buffer.data).map_err(|e| {
        InsarError::Processing(format!("raster buffer shape mismatch: {}", e))
    })?;

    let geo_transform = GeoTransform::from_gdal(dataset.geo_transform()?);
    let projection = dataset.projection();
    log::info!("Raster size: {} x {} (rows x cols)", height, width);

    Ok(RasterData {
        field,
        geo_transform,
        projection,
    })
}

/// Rescale raw coherence samples to a 0..1 quality score.
///
/// ISCE coherence products carry an integer pre-scale (typically 1000). If
/// meaningful coherence still exceeds 2.0 after dividing by the configured
/// scale the input evidently carried a larger factor; another factor of
/// 1000 is applied rather than silently returning wrong scores. Returns the
/// rescaled field and the scale actually applied.
pub fn rescale_coherence(raw: &ScalarField, scale: f32) -> (ScalarField, f32) {
    let mut applied = if scale > 0.0 { scale } else { 1.0 };
    let max_finite = |f: &ScalarField| {
        f.iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f32::NEG_INFINITY, f32::max)
    };

    let mut coherence = raw.mapv(|v| v / applied);
    let mut attempts = 0;
    while max_finite(&coherence) > 2.0 && attempts < 3 {
        applied *= DEFAULT_COHERENCE_SCALE;
        log::warn!(
            "Coherence still exceeds 2.0 after rescale; retrying with scale {}",
            applied
        );
        coherence = raw.mapv(|v| v / applied);
        attempts += 1;
    }

    (coherence, applied)
}

/// Read a coherence raster and rescale it to 0..1.
pub fn read_coherence<P: AsRef<Path>>(path: P, scale: f32) -> InsarResult<RasterData> {
    let mut raster = read_raster(path)?;
    let (coherence, applied) = rescale_coherence(&raster.field, scale);
    log::info!("Coherence rescaled by {}", applied);
    raster.field = coherence;
    Ok(raster)
}

/// Write a single-band float32 GeoTIFF with NaN as the no-data sentinel.
pub fn write_geotiff<P: AsRef<Path>>(
    path: P,
    field: &ScalarField,
    geo_transform: &GeoTransform,
    projection: &str,
) -> InsarResult<()> {
    let path = path.as_ref();
    log::info!("Writing GeoTIFF: {}", path.display());

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let (height, width) = field.dim();

    let mut dataset =
        driver.create_with_band_type::<f32, _>(path, width as isize, height as isize, 1)?;
    dataset.set_geo_transform(&geo_transform.to_gdal())?;
    if !projection.is_empty() {
        dataset.set_projection(projection)?;
    }

    let mut rasterband = dataset.rasterband(1)?;
    let flat_data: Vec<f32> = field.iter().cloned().collect();
    let buffer = gdal::raster::Buffer::new((width, height), flat_data);
    rasterband.write((0, 0), (width, height), &buffer)?;
    rasterband.set_no_data_value(Some(f64::NAN))?;

    log::info!("GeoTIFF saved: {} x {}", height, width);
    Ok(())
}
