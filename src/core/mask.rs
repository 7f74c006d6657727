use crate::types::{InsarError, InsarResult, ScalarField};
use ndarray::Array2;

/// Per-pixel validity classifier for raster fields.
///
/// Wraps a boolean grid and exposes the combinators the pipelines need:
/// strict AND composition, valid-pixel counting, and NaN fill of everything
/// a mask rejects. Composition only ever narrows validity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityMask {
    mask: Array2<bool>,
}

impl ValidityMask {
    /// Mask from an arbitrary per-pixel predicate.
    pub fn from_fn<F>(field: &ScalarField, predicate: F) -> Self
    where
        F: Fn(f32) -> bool,
    {
        Self {
            mask: field.mapv(predicate),
        }
    }

    /// Pixels carrying a finite sample (excludes the NaN sentinel).
    pub fn finite(field: &ScalarField) -> Self {
        Self::from_fn(field, |v| v.is_finite())
    }

    /// Finite phase within the unwrapping-failure clip bound: |phi| <= clip.
    ///
    /// Values beyond the bound indicate unwrapping blunders rather than
    /// genuine deformation and are excluded.
    pub fn phase_within(phase: &ScalarField, clip_rad: f32) -> Self {
        Self::from_fn(phase, move |v| v.is_finite() && v.abs() <= clip_rad)
    }

    /// Pixels inside the imaged swath: coherence finite and strictly > 0.
    ///
    /// Coherence exactly 0 marks no-data outside coverage and is excluded
    /// regardless of any quality threshold.
    pub fn swath_coverage(coherence: &ScalarField) -> Self {
        Self::from_fn(coherence, |v| v.is_finite() && v > 0.0)
    }

    /// Quality criterion: coherence >= threshold.
    pub fn quality(coherence: &ScalarField, threshold: f32) -> Self {
        Self::from_fn(coherence, move |v| v.is_finite() && v >= threshold)
    }

    /// All-valid mask of the given dimensions.
    pub fn all_valid(dim: (usize, usize)) -> Self {
        Self {
            mask: Array2::from_elem(dim, true),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// Pixelwise AND composition. Never widens either input's valid set.
    pub fn and(&self, other: &ValidityMask) -> InsarResult<ValidityMask> {
        if self.dim() != other.dim() {
            return Err(InsarError::ShapeMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }
        let mut combined = self.mask.clone();
        combined.zip_mut_with(&other.mask, |a, &b| *a = *a && b);
        Ok(ValidityMask { mask: combined })
    }

    /// Number of valid pixels.
    pub fn count_valid(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask[[row, col]]
    }

    /// New field equal to `field` where valid, NaN where invalid.
    ///
    /// The source is never mutated; every masking stage produces a fresh
    /// field so intermediates stay independently testable.
    pub fn apply(&self, field: &ScalarField) -> InsarResult<ScalarField> {
        if self.dim() != field.dim() {
            return Err(InsarError::ShapeMismatch {
                expected: self.dim(),
                actual: field.dim(),
            });
        }
        let mut out = field.clone();
        out.zip_mut_with(&self.mask, |v, &ok| {
            if !ok {
                *v = f32::NAN;
            }
        });
        Ok(out)
    }

    /// Iterate (row, col) indices of valid pixels.
    pub fn valid_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.mask
            .indexed_iter()
            .filter(|(_, &v)| v)
            .map(|(idx, _)| idx)
    }
}

/// Outcome of the coherence masking stage of the displacement pipeline.
#[derive(Debug, Clone)]
pub struct CoherenceMask {
    /// Final mask (swath coverage, optionally narrowed by the threshold)
    pub mask: ValidityMask,
    /// Pixels inside the swath (coherence > 0)
    pub swath_count: usize,
    /// Pixels passing the quality threshold, when one was applied
    pub threshold_count: Option<usize>,
    /// True when the threshold would have emptied the mask and the
    /// coverage-only mask was used instead
    pub fell_back_to_swath: bool,
}

/// Build the coherence mask for the displacement pipeline.
///
/// A threshold of 0 applies only the swath-coverage rule; this is deliberate
/// so a zero threshold never masks everything. A positive threshold that
/// would leave no pixels falls back to the coverage-only mask with a logged
/// warning rather than returning an all-invalid mask.
pub fn coherence_mask(coherence: &ScalarField, threshold: f32) -> CoherenceMask {
    let swath = ValidityMask::swath_coverage(coherence);
    let swath_count = swath.count_valid();
    log::info!("Pixels inside swath (coherence > 0): {}", swath_count);

    if threshold <= 0.0 {
        log::info!("Coherence threshold is 0; applying swath mask only");
        return CoherenceMask {
            mask: swath,
            swath_count,
            threshold_count: None,
            fell_back_to_swath: false,
        };
    }

    // Both criteria evaluate the same field, so their AND composition can
    // be built in a single pass.
    let combined = ValidityMask::from_fn(coherence, move |v| {
        v.is_finite() && v > 0.0 && v >= threshold
    });
    let threshold_count = combined.count_valid();
    log::info!(
        "Pixels passing coherence threshold {}: {}",
        threshold,
        threshold_count
    );

    if threshold_count == 0 {
        log::warn!(
            "No pixels pass coherence threshold {}; falling back to swath-only mask",
            threshold
        );
        return CoherenceMask {
            mask: swath,
            swath_count,
            threshold_count: Some(0),
            fell_back_to_swath: true,
        };
    }

    CoherenceMask {
        mask: combined,
        swath_count,
        threshold_count: Some(threshold_count),
        fell_back_to_swath: false,
    }
}
