use crate::core::displacement::{PhaseToDisplacement, SENTINEL1_WAVELENGTH_M};
use crate::core::mask::{coherence_mask, ValidityMask};
use crate::core::ramp::{RampEstimator, RampFitReport, RampParams};
use crate::core::stats::{FieldStats, Roi};
use crate::types::{check_same_shape, InsarResult, ScalarField};
use serde::Serialize;

/// Displacement pipeline configuration
#[derive(Debug, Clone)]
pub struct DisplacementParams {
    /// Radar wavelength in meters
    pub wavelength_m: f64,
    /// Coherence threshold for quality masking; 0 applies only the swath mask
    pub coherence_threshold: f32,
    /// Maximum |phase| (radians) considered physically plausible
    pub phase_clip_rad: f32,
    /// Optional reporting region of interest
    pub roi: Option<Roi>,
}

impl Default for DisplacementParams {
    fn default() -> Self {
        Self {
            wavelength_m: SENTINEL1_WAVELENGTH_M,
            coherence_threshold: 0.0,
            phase_clip_rad: 50.0,
            roi: None,
        }
    }
}

/// Diagnostic record of one displacement run, for an external reporting sink.
#[derive(Debug, Clone, Serialize)]
pub struct DisplacementReport {
    /// Pixels with finite phase within the clip bound
    pub phase_valid_count: usize,
    /// Pixels inside the swath (coherence > 0)
    pub swath_count: usize,
    /// Pixels passing the coherence threshold, when one was applied
    pub threshold_count: Option<usize>,
    /// The threshold would have emptied the mask; swath-only mask was used
    pub threshold_fallback: bool,
    pub coherence_stats: Option<FieldStats>,
    pub phase_stats: Option<FieldStats>,
    /// Displacement statistics before coherence masking
    pub displacement_stats: Option<FieldStats>,
    /// Displacement statistics after all masking; None means no valid pixels
    pub final_stats: Option<FieldStats>,
    pub roi_stats: Option<FieldStats>,
    /// An ROI was requested but yielded no valid pixels, either because it
    /// clamped to an empty rectangle or because every sample in it is masked
    pub roi_empty: bool,
}

/// Cleaned displacement raster plus its diagnostic record.
#[derive(Debug, Clone)]
pub struct DisplacementProduct {
    /// LOS displacement in mm, NaN where masked out
    pub displacement_mm: ScalarField,
    pub report: DisplacementReport,
}

/// Orchestrates phase + coherence into a cleaned LOS displacement raster.
///
/// Stage order is fixed: phase validity mask (finiteness + clip), unit
/// conversion, swath mask, optional quality mask. Each stage narrows
/// validity monotonically and produces a new field; the raw inputs are
/// never mutated.
#[derive(Debug, Clone)]
pub struct DisplacementPipeline {
    params: DisplacementParams,
}

impl DisplacementPipeline {
    pub fn new(params: DisplacementParams) -> Self {
        Self { params }
    }

    /// Run the pipeline on co-registered phase (radians) and coherence
    /// (already rescaled to 0..1 by the raster collaborator).
    pub fn run(
        &self,
        phase_rad: &ScalarField,
        coherence: &ScalarField,
    ) -> InsarResult<DisplacementProduct> {
        check_same_shape(phase_rad, coherence)?;
        let (rows, cols) = phase_rad.dim();
        log::info!("Displacement pipeline on {}x{} grid", rows, cols);

        let coherence_stats = FieldStats::from_field(coherence);
        match &coherence_stats {
            Some(s) => s.log("Coherence"),
            None => log::warn!("Coherence: no valid pixels"),
        }

        // Stage 1: phase validity (finite, |phi| <= clip)
        let phase_mask = ValidityMask::phase_within(phase_rad, self.params.phase_clip_rad);
        let phase_valid_count = phase_mask.count_valid();
        log::info!(
            "Pixels with plausible phase (|phi| <= {} rad): {}",
            self.params.phase_clip_rad,
            phase_valid_count
        );
        let phase_stats = FieldStats::from_field(phase_rad);
        let clipped_phase = phase_mask.apply(phase_rad)?;

        // Stage 2: unit conversion on the clipped phase
        let converter = PhaseToDisplacement::new(self.params.wavelength_m);
        let los_mm = converter.convert(&clipped_phase);
        let displacement_stats = FieldStats::from_field(&los_mm);
        match &displacement_stats {
            Some(s) => s.log("LOS displacement (pre-mask, mm)"),
            None => log::warn!("LOS displacement: no valid pixels before masking"),
        }

        // Stage 3: swath coverage, then the optional quality threshold
        let coh = coherence_mask(coherence, self.params.coherence_threshold);
        let displacement_mm = coh.mask.apply(&los_mm)?;

        let final_stats = FieldStats::from_field(&displacement_mm);
        match &final_stats {
            Some(s) => s.log("LOS displacement (final, mm)"),
            None => log::warn!("LOS displacement: no valid pixels after masking"),
        }

        let (roi_stats, roi_empty) = report_roi(self.params.roi.as_ref(), &displacement_mm);

        Ok(DisplacementProduct {
            displacement_mm,
            report: DisplacementReport {
                phase_valid_count,
                swath_count: coh.swath_count,
                threshold_count: coh.threshold_count,
                threshold_fallback: coh.fell_back_to_swath,
                coherence_stats,
                phase_stats,
                displacement_stats,
                final_stats,
                roi_stats,
                roi_empty,
            },
        })
    }
}

/// Ramp-removal pipeline configuration
#[derive(Debug, Clone)]
pub struct RampPipelineParams {
    /// Polynomial degree of the trend surface (1 or 2)
    pub degree: usize,
    /// Optional reporting region of interest
    pub roi: Option<Roi>,
}

impl Default for RampPipelineParams {
    fn default() -> Self {
        Self {
            degree: 2,
            roi: None,
        }
    }
}

/// Diagnostic record of one ramp-removal run.
#[derive(Debug, Clone, Serialize)]
pub struct RampReport {
    pub fit: RampFitReport,
    pub phase_stats: Option<FieldStats>,
    pub ramp_stats: Option<FieldStats>,
    pub corrected_stats: Option<FieldStats>,
    pub roi_stats: Option<FieldStats>,
    /// An ROI was requested but yielded no valid pixels, either because it
    /// clamped to an empty rectangle or because every sample in it is masked
    pub roi_empty: bool,
}

/// Trend-corrected phase raster plus its diagnostic record.
#[derive(Debug, Clone)]
pub struct RampProduct {
    /// Phase with the fitted ramp subtracted (radians)
    pub corrected_phase: ScalarField,
    /// The fitted ramp itself (radians)
    pub ramp: ScalarField,
    pub report: RampReport,
}

/// Orchestrates removal of the large-scale trend from unwrapped phase.
///
/// The fit mask is finiteness only: the ramp is a whole-image property, so
/// estimation deliberately uses every finite phase pixel rather than a
/// coherence-filtered subset, and the coherence-threshold fallback rule of
/// the displacement pipeline does not apply here.
#[derive(Debug, Clone)]
pub struct RampPipeline {
    params: RampPipelineParams,
}

impl RampPipeline {
    pub fn new(params: RampPipelineParams) -> Self {
        Self { params }
    }

    pub fn run(&self, phase_rad: &ScalarField) -> InsarResult<RampProduct> {
        let (rows, cols) = phase_rad.dim();
        log::info!(
            "Ramp-removal pipeline on {}x{} grid, degree {}",
            rows,
            cols,
            self.params.degree
        );

        let mask = ValidityMask::finite(phase_rad);
        let estimator = RampEstimator::new(RampParams {
            degree: self.params.degree,
        });
        let fit = estimator.fit(phase_rad, &mask)?;

        let phase_stats = FieldStats::from_field(phase_rad);
        let ramp_stats = FieldStats::from_field(&fit.ramp);
        let corrected_stats = FieldStats::from_field(&fit.corrected);
        if let Some(s) = &phase_stats {
            s.log("Phase before ramp removal (rad)");
        }
        if let Some(s) = &ramp_stats {
            s.log("Fitted ramp (rad)");
        }
        if let Some(s) = &corrected_stats {
            s.log("Phase after ramp removal (rad)");
        }

        let (roi_stats, roi_empty) = report_roi(self.params.roi.as_ref(), &fit.corrected);

        let report = RampReport {
            fit: fit.report(self.params.degree),
            phase_stats,
            ramp_stats,
            corrected_stats,
            roi_stats,
            roi_empty,
        };

        Ok(RampProduct {
            corrected_phase: fit.corrected,
            ramp: fit.ramp,
            report,
        })
    }
}

/// ROI statistics for reporting; the flag marks an ROI with no valid
/// pixels, whether clamped to empty or fully masked.
fn report_roi(roi: Option<&Roi>, field: &ScalarField) -> (Option<FieldStats>, bool) {
    match roi {
        None => (None, false),
        Some(roi) => match roi.stats(field) {
            Some(stats) => {
                stats.log("ROI");
                (Some(stats), false)
            }
            None => {
                log::warn!("ROI {:?}: no valid pixels", roi);
                (None, true)
            }
        },
    }
}
