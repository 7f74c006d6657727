//! InSARpost: A Fast, Modular InSAR Displacement Post-Processor
//!
//! This library turns co-registered unwrapped-phase and coherence rasters
//! from an interferometric processing chain (e.g. ISCE) into calibrated
//! line-of-sight displacement products, and removes large-scale polynomial
//! trends ("ramps") left in the phase by residual orbital or atmospheric
//! error.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{GeoTransform, InsarError, InsarResult, RasterSample, ScalarField};

pub use core::{
    DisplacementParams, DisplacementPipeline, DisplacementProduct, FieldStats,
    PhaseToDisplacement, RampEstimator, RampParams, RampPipeline, RampPipelineParams, Roi,
    ValidityMask, SENTINEL1_WAVELENGTH_M,
};

pub use io::{read_coherence, read_raster, write_geotiff, RasterData};
