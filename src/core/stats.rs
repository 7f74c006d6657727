use crate::types::{InsarError, InsarResult, ScalarField};
use ndarray::s;
use serde::Serialize;

/// Summary statistics over the finite samples of a field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldStats {
    pub count: usize,
    pub min: f32,
    pub mean: f32,
    pub max: f32,
    pub p5: f32,
    pub p50: f32,
    pub p95: f32,
}

impl FieldStats {
    /// Compute statistics over finite samples; `None` when every sample is
    /// the NaN sentinel (the caller reports "no valid pixels" explicitly
    /// instead of computing on an empty set).
    pub fn from_field(field: &ScalarField) -> Option<FieldStats> {
        let mut values: Vec<f32> = field.iter().copied().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let sum: f64 = values.iter().map(|&v| v as f64).sum();
        Some(FieldStats {
            count,
            min: values[0],
            mean: (sum / count as f64) as f32,
            max: values[count - 1],
            p5: percentile_sorted(&values, 5.0),
            p50: percentile_sorted(&values, 50.0),
            p95: percentile_sorted(&values, 95.0),
        })
    }

    pub fn log(&self, name: &str) {
        log::info!(
            "{}: min/mean/max = {:.3} / {:.3} / {:.3}, P5/P50/P95 = {:.3} / {:.3} / {:.3}, valid pixels = {}",
            name, self.min, self.mean, self.max, self.p5, self.p50, self.p95, self.count
        );
    }
}

/// Linearly interpolated percentile of an already-sorted slice.
fn percentile_sorted(sorted: &[f32], q: f64) -> f32 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q / 100.0 * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = (pos - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Axis-aligned pixel rectangle restricting statistics reporting.
///
/// Bounds follow the CLI convention `x1,x2,y1,y2` (columns x1..x2, rows
/// y1..y2, end-exclusive). The ROI never alters masking or fitting, only
/// the reporting scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Roi {
    pub x1: usize,
    pub x2: usize,
    pub y1: usize,
    pub y2: usize,
}

impl Roi {
    /// Parse the `x1,x2,y1,y2` form used on the command line.
    pub fn parse(s: &str) -> InsarResult<Roi> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(InsarError::InvalidRoi(format!(
                "expected x1,x2,y1,y2, got '{}'",
                s
            )));
        }
        let mut vals = [0usize; 4];
        for (v, p) in vals.iter_mut().zip(parts.iter()) {
            *v = p
                .parse()
                .map_err(|_| InsarError::InvalidRoi(format!("'{}' is not a pixel index", p)))?;
        }
        Ok(Roi {
            x1: vals[0],
            x2: vals[1],
            y1: vals[2],
            y2: vals[3],
        })
    }

    /// Clamp bounds into [0, width] x [0, height].
    pub fn clamped(&self, width: usize, height: usize) -> Roi {
        Roi {
            x1: self.x1.min(width),
            x2: self.x2.min(width),
            y1: self.y1.min(height),
            y2: self.y2.min(height),
        }
    }

    /// True when the clamped rectangle contains no pixels.
    pub fn is_empty(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    /// Statistics over the ROI sub-grid of `field`.
    ///
    /// Degenerate or out-of-bounds rectangles clamp first; an empty result
    /// is an explicit `None`, never a panic or a statistic over nothing.
    pub fn stats(&self, field: &ScalarField) -> Option<FieldStats> {
        let (rows, cols) = field.dim();
        let clamped = self.clamped(cols, rows);
        if clamped.is_empty() {
            log::warn!("ROI {:?} is empty after clamping to {}x{}", self, cols, rows);
            return None;
        }
        let view = field.slice(s![clamped.y1..clamped.y2, clamped.x1..clamped.x2]);
        FieldStats::from_field(&view.to_owned())
    }
}
