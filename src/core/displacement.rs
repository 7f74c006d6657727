use crate::types::ScalarField;

/// Sentinel-1 C-band radar wavelength in meters
pub const SENTINEL1_WAVELENGTH_M: f64 = 0.055465;

/// Converts unwrapped phase (radians) to line-of-sight displacement (mm).
///
/// The relation is `mm = rad * (wavelength / (4 * pi)) * 1000`. The
/// wavelength is a per-run configuration value, not a process-wide constant,
/// so products from different sensors can be processed side by side.
#[derive(Debug, Clone)]
pub struct PhaseToDisplacement {
    wavelength_m: f64,
}

impl Default for PhaseToDisplacement {
    fn default() -> Self {
        Self {
            wavelength_m: SENTINEL1_WAVELENGTH_M,
        }
    }
}

impl PhaseToDisplacement {
    /// Converter for an arbitrary radar wavelength (meters).
    pub fn new(wavelength_m: f64) -> Self {
        Self { wavelength_m }
    }

    pub fn wavelength_m(&self) -> f64 {
        self.wavelength_m
    }

    /// Phase-to-millimeter scale factor.
    pub fn scale_mm_per_rad(&self) -> f64 {
        self.wavelength_m / (4.0 * std::f64::consts::PI) * 1000.0
    }

    /// Elementwise conversion of a phase field to LOS displacement (mm).
    ///
    /// Non-finite (masked-out) samples propagate unchanged; nothing is
    /// unmasked or clamped here.
    pub fn convert(&self, phase_rad: &ScalarField) -> ScalarField {
        let scale = self.scale_mm_per_rad() as f32;
        log::debug!(
            "Converting phase to LOS displacement, {:.6} mm/rad (wavelength {} m)",
            scale,
            self.wavelength_m
        );
        phase_rad.mapv(|p| p * scale)
    }
}
