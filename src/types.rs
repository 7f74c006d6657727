use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued raster sample (phase in radians, coherence, displacement in mm)
pub type RasterSample = f32;

/// 2D scalar raster (azimuth rows x range columns), NaN marks invalid samples
pub type ScalarField = Array2<RasterSample>;

/// Geospatial transformation parameters (GDAL affine convention)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }
}

/// Error types for interferogram post-processing
#[derive(Debug, thiserror::Error)]
pub enum InsarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Insufficient valid pixels for fit: need at least {required}, found {actual}")]
    InsufficientValidPixels { required: usize, actual: usize },

    #[error("Unsupported polynomial degree {0} (must be 1 or 2)")]
    UnsupportedDegree(usize),

    #[error("Invalid ROI: {0}")]
    InvalidRoi(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for post-processing operations
pub type InsarResult<T> = Result<T, InsarError>;

/// Check that two fields entering the same stage share dimensions.
pub fn check_same_shape(a: &ScalarField, b: &ScalarField) -> InsarResult<()> {
    if a.dim() != b.dim() {
        return Err(InsarError::ShapeMismatch {
            expected: a.dim(),
            actual: b.dim(),
        });
    }
    Ok(())
}
