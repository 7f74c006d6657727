//! I/O collaborators for reading and writing displacement rasters

pub mod raster;

pub use raster::{
    read_coherence, read_raster, rescale_coherence, write_geotiff, RasterData,
    DEFAULT_COHERENCE_SCALE,
};
