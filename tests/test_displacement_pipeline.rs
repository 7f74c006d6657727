use approx::assert_relative_eq;
use insarpost::{
    DisplacementParams, DisplacementPipeline, Roi, ScalarField, SENTINEL1_WAVELENGTH_M,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn uniform(rows: usize, cols: usize, value: f32) -> ScalarField {
    ScalarField::from_elem((rows, cols), value)
}

#[test]
fn test_uniform_scene_end_to_end() {
    init_logging();
    // 4x4 phase of 2.0 rad, coherence 0.5, clip 50, threshold 0:
    // all 16 pixels survive with the exact converted value.
    let phase = uniform(4, 4, 2.0);
    let coherence = uniform(4, 4, 0.5);

    let pipeline = DisplacementPipeline::new(DisplacementParams::default());
    let product = pipeline.run(&phase, &coherence).unwrap();

    let expected = (2.0 * SENTINEL1_WAVELENGTH_M / (4.0 * std::f64::consts::PI) * 1000.0) as f32;
    let stats = product.report.final_stats.unwrap();
    assert_eq!(stats.count, 16);
    assert_relative_eq!(stats.min, expected, max_relative = 1e-5);
    assert_relative_eq!(stats.max, expected, max_relative = 1e-5);
    assert!(!product.report.threshold_fallback);
}

#[test]
fn test_coverage_rule_overrides_threshold() {
    init_logging();
    // first row outside the swath (coherence 0): excluded no matter the
    // threshold, leaving 12 valid pixels.
    let phase = uniform(4, 4, 2.0);
    let mut coherence = uniform(4, 4, 0.5);
    for c in 0..4 {
        coherence[[0, c]] = 0.0;
    }

    for threshold in [0.0f32, 0.1, 0.4] {
        let pipeline = DisplacementPipeline::new(DisplacementParams {
            coherence_threshold: threshold,
            ..Default::default()
        });
        let product = pipeline.run(&phase, &coherence).unwrap();
        assert_eq!(product.report.swath_count, 12);
        assert_eq!(product.report.final_stats.as_ref().unwrap().count, 12);
    }
}

#[test]
fn test_quality_threshold_narrows_mask() {
    init_logging();
    let phase = uniform(2, 2, 1.0);
    let mut coherence = uniform(2, 2, 0.8);
    coherence[[0, 0]] = 0.1;

    let pipeline = DisplacementPipeline::new(DisplacementParams {
        coherence_threshold: 0.5,
        ..Default::default()
    });
    let product = pipeline.run(&phase, &coherence).unwrap();
    assert_eq!(product.report.threshold_count, Some(3));
    assert!(product.displacement_mm[[0, 0]].is_nan());
    assert!(product.displacement_mm[[1, 1]].is_finite());
}

#[test]
fn test_threshold_fallback_keeps_swath_mask() {
    init_logging();
    // threshold rejects everything; the pipeline must fall back to the
    // swath mask instead of returning an all-NaN product.
    let phase = uniform(3, 3, 1.0);
    let coherence = uniform(3, 3, 0.2);

    let pipeline = DisplacementPipeline::new(DisplacementParams {
        coherence_threshold: 0.99,
        ..Default::default()
    });
    let product = pipeline.run(&phase, &coherence).unwrap();
    assert!(product.report.threshold_fallback);
    assert_eq!(product.report.final_stats.unwrap().count, 9);
}

#[test]
fn test_roi_restricts_reporting_only() {
    init_logging();
    let mut phase = uniform(4, 4, 1.0);
    phase[[3, 3]] = 3.0;
    let coherence = uniform(4, 4, 0.5);

    let pipeline = DisplacementPipeline::new(DisplacementParams {
        roi: Some(Roi {
            x1: 0,
            x2: 2,
            y1: 0,
            y2: 2,
        }),
        ..Default::default()
    });
    let product = pipeline.run(&phase, &coherence).unwrap();

    // the raster itself is unaffected by the ROI
    assert_eq!(product.report.final_stats.as_ref().unwrap().count, 16);
    let roi_stats = product.report.roi_stats.unwrap();
    assert_eq!(roi_stats.count, 4);
    // the outlier at (3,3) is outside the ROI
    assert_relative_eq!(roi_stats.min, roi_stats.max, max_relative = 1e-6);
}

#[test]
fn test_degenerate_roi_is_diagnostic_not_crash() {
    init_logging();
    let phase = uniform(4, 4, 1.0);
    let coherence = uniform(4, 4, 0.5);

    let pipeline = DisplacementPipeline::new(DisplacementParams {
        roi: Some(Roi {
            x1: 3,
            x2: 3,
            y1: 1,
            y2: 2,
        }),
        ..Default::default()
    });
    let product = pipeline.run(&phase, &coherence).unwrap();
    assert!(product.report.roi_empty);
    assert!(product.report.roi_stats.is_none());
}

#[test]
fn test_all_masked_is_warning_not_error() {
    init_logging();
    // every phase sample beyond the clip: the run succeeds with an
    // explicit "no valid pixels" outcome.
    let phase = uniform(4, 4, 99.0);
    let coherence = uniform(4, 4, 0.5);

    let pipeline = DisplacementPipeline::new(DisplacementParams::default());
    let product = pipeline.run(&phase, &coherence).unwrap();
    assert!(product.report.final_stats.is_none());
    assert!(product.displacement_mm.iter().all(|v| v.is_nan()));
}
