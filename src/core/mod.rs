//! Core interferogram post-processing modules

pub mod displacement;
pub mod mask;
pub mod pipeline;
pub mod ramp;
pub mod stats;

// Re-export main types
pub use displacement::{PhaseToDisplacement, SENTINEL1_WAVELENGTH_M};
pub use mask::{coherence_mask, CoherenceMask, ValidityMask};
pub use pipeline::{
    DisplacementParams, DisplacementPipeline, DisplacementProduct, DisplacementReport,
    RampPipeline, RampPipelineParams, RampProduct, RampReport,
};
pub use ramp::{RampEstimator, RampFit, RampFitReport, RampParams, MIN_PIXELS_FOR_FIT};
pub use stats::{FieldStats, Roi};
