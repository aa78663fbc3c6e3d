//! Integration test: PDP / ICE end-to-end

use kolosal_effects::prelude::*;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn x_dataset() -> Dataset {
    Dataset::builder()
        .numeric("x", vec![1.0, 2.0, 2.0, 3.0])
        .numeric("noise", vec![0.3, -1.2, 4.4, 0.0])
        .build()
        .unwrap()
}

fn numeric(rows: &Dataset, name: &str) -> Vec<f64> {
    rows.column(name)
        .unwrap()
        .numeric_values()
        .unwrap()
        .into_owned()
}

/// predict(rows) = x + 10
fn plus_ten(rows: &Dataset) -> Result<Vec<f64>> {
    Ok(numeric(rows, "x").into_iter().map(|x| x + 10.0).collect())
}

/// predict(rows) = x * noise, so curves differ per row
fn x_times_noise(rows: &Dataset) -> Result<Vec<f64>> {
    let x = numeric(rows, "x");
    let noise = numeric(rows, "noise");
    Ok(x.iter().zip(noise.iter()).map(|(a, b)| a * b).collect())
}

struct CountingModel {
    calls: AtomicUsize,
}

impl CountingModel {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelAdapter for CountingModel {
    fn predict(&self, rows: &Dataset) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        plus_ten(rows)
    }
}

#[test]
fn test_pdp_worked_example() {
    let pdp = EffectEngine::new()
        .compute_pdp(&x_dataset(), &plus_ten, &["x"])
        .unwrap();

    let points = pdp.points().unwrap();
    assert_eq!(
        points,
        vec![
            (FeatureValue::Numeric(1.0), 11.0),
            (FeatureValue::Numeric(2.0), 12.0),
            (FeatureValue::Numeric(3.0), 13.0),
        ]
    );
    assert!(pdp.std.iter().all(|&s| s == 0.0));
}

#[test]
fn test_ice_worked_example_centered() {
    let center = FeatureValue::Numeric(1.0);
    let ice = EffectEngine::new()
        .compute_ice(&x_dataset(), &plus_ten, "x", Some(&center))
        .unwrap();

    assert_eq!(ice.raw().row(0).to_vec(), vec![11.0, 12.0, 13.0]);
    for r in 0..4 {
        assert_eq!(ice.curve(r).to_vec(), vec![0.0, 1.0, 2.0]);
    }
}

#[test]
fn test_pdp_grid_matches_grid_builder() {
    let ds = x_dataset();
    for builder in [
        GridBuilder::new(),
        GridBuilder::new().with_resolution(2),
        GridBuilder::new().with_percentile_range(2, 10.0, 90.0),
    ] {
        let expected = builder.build(&ds, "noise").unwrap();
        let pdp = EffectEngine::new()
            .with_grid_builder(builder)
            .compute_pdp(&ds, &x_times_noise, &["noise"])
            .unwrap();
        assert_eq!(pdp.grid, GridSpec::Single(expected));
        assert_eq!(pdp.len(), pdp.grid.len());
    }
}

#[test]
fn test_constant_column_single_point() {
    let ds = Dataset::builder()
        .numeric("x", vec![1.0, 2.0, 3.0])
        .numeric("c", vec![5.0, 5.0, 5.0])
        .build()
        .unwrap();
    let model = |rows: &Dataset| -> Result<Vec<f64>> {
        let x = numeric(rows, "x");
        let c = numeric(rows, "c");
        Ok(x.iter().zip(c.iter()).map(|(a, b)| a * b).collect())
    };

    let pdp = EffectEngine::new().compute_pdp(&ds, &model, &["c"]).unwrap();
    assert_eq!(pdp.len(), 1);

    let direct = model(&ds).unwrap();
    let mean = direct.iter().sum::<f64>() / direct.len() as f64;
    assert_eq!(pdp.values[0], mean);
}

#[test]
fn test_ice_shape() {
    let ds = x_dataset();
    let ice = EffectEngine::new()
        .compute_ice(&ds, &x_times_noise, "x", None)
        .unwrap();
    assert_eq!(ice.n_rows(), ds.row_count());
    assert_eq!(ice.n_grid_points(), ice.grid().len());
    assert_eq!(ice.curves().shape(), &[4, 3]);
    assert_eq!(ice.anchor(), None);
}

#[test]
fn test_centering_law_for_every_anchor() {
    let ds = x_dataset();
    let engine = EffectEngine::new();
    let grid = engine.grid_builder().build(&ds, "x").unwrap();

    for (a, value) in grid.values().iter().enumerate() {
        let ice = engine
            .compute_ice(&ds, &x_times_noise, "x", Some(value))
            .unwrap();
        let curves = ice.curves();
        for r in 0..ice.n_rows() {
            assert_eq!(curves[[r, a]], 0.0);
        }
    }
}

#[test]
fn test_pdp_idempotent() {
    let ds = x_dataset();
    let engine = EffectEngine::new().with_grid_builder(GridBuilder::new().with_resolution(3));
    let first = engine.compute_pdp(&ds, &x_times_noise, &["x", "noise"]).unwrap();
    let second = engine.compute_pdp(&ds, &x_times_noise, &["x", "noise"]).unwrap();

    let bits = |c: &EffectCurve| c.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
    assert_eq!(first.grid, second.grid);
}

#[test]
fn test_thread_count_does_not_change_results() {
    let ds = x_dataset();
    let default = EffectEngine::new()
        .compute_ice(&ds, &x_times_noise, "noise", None)
        .unwrap();
    let pinned = EffectEngine::new()
        .with_parallel(ParallelConfig::new().with_threads(2))
        .unwrap()
        .compute_ice(&ds, &x_times_noise, "noise", None)
        .unwrap();
    assert_eq!(default, pinned);
}

#[test]
fn test_wrong_length_is_contract_violation() {
    let short = |rows: &Dataset| -> Result<Vec<f64>> { Ok(vec![0.0; rows.row_count() - 1]) };
    let err = EffectEngine::new()
        .compute_pdp(&x_dataset(), &short, &["x"])
        .unwrap_err();
    assert!(matches!(
        err,
        EffectError::ContractViolation(Violation::LengthMismatch { expected: 4, actual: 3 })
    ));

    let err = EffectEngine::new()
        .compute_ice(&x_dataset(), &short, "x", None)
        .unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_non_finite_is_contract_violation() {
    let nan_on_three = |rows: &Dataset| -> Result<Vec<f64>> {
        Ok(numeric(rows, "x")
            .into_iter()
            .map(|x| if x == 3.0 { f64::NAN } else { x })
            .collect())
    };
    let err = EffectEngine::new()
        .compute_pdp(&x_dataset(), &nan_on_three, &["x"])
        .unwrap_err();
    assert!(matches!(
        err,
        EffectError::ContractViolation(Violation::NonFinite { row: 0, .. })
    ));
}

#[test]
fn test_unknown_feature_fails_before_prediction() {
    let model = CountingModel::new();
    let engine = EffectEngine::new();

    let err = engine
        .compute_pdp(&x_dataset(), &model, &["x", "missing"])
        .unwrap_err();
    assert!(matches!(err, EffectError::FeatureNotFound(name) if name == "missing"));

    let err = engine
        .compute_ice(&x_dataset(), &model, "missing", None)
        .unwrap_err();
    assert!(matches!(err, EffectError::FeatureNotFound(_)));

    let err = engine
        .compute_pdp_batch(&x_dataset(), &model, &["x", "missing"])
        .unwrap_err();
    assert!(matches!(err, EffectError::FeatureNotFound(_)));

    assert_eq!(model.calls(), 0);
}

#[test]
fn test_invalid_center_fails_before_prediction() {
    let model = CountingModel::new();
    let center = FeatureValue::Numeric(1.5);
    let err = EffectEngine::new()
        .compute_ice(&x_dataset(), &model, "x", Some(&center))
        .unwrap_err();
    assert!(matches!(err, EffectError::InvalidCenter { feature, value } if feature == "x" && value == "1.5"));
    assert_eq!(model.calls(), 0);
}

#[test]
fn test_center_snaps_within_tolerance() {
    let center = FeatureValue::Numeric(1.05);
    let ice = EffectEngine::new()
        .with_center_tolerance(0.1)
        .compute_ice(&x_dataset(), &plus_ten, "x", Some(&center))
        .unwrap();
    assert_eq!(ice.anchor(), Some(0));
    assert_eq!(ice.anchor_value(), Some(&FeatureValue::Numeric(1.0)));
}

#[test]
fn test_cancelled_run_returns_no_result() {
    let model = CountingModel::new();
    let token = CancellationToken::new();
    token.cancel();

    let err = EffectEngine::new()
        .with_cancellation(token)
        .compute_pdp(&x_dataset(), &model, &["x"])
        .unwrap_err();
    assert!(matches!(err, EffectError::Cancelled));
    assert_eq!(model.calls(), 0);
}

#[test]
fn test_one_model_call_per_grid_point() {
    let model = CountingModel::new();
    let engine = EffectEngine::new();
    engine.compute_pdp(&x_dataset(), &model, &["x"]).unwrap();
    assert_eq!(model.calls(), 3);

    engine.compute_pdp(&x_dataset(), &model, &["x", "noise"]).unwrap();
    assert_eq!(model.calls(), 3 + 3 * 4);
}

#[test]
fn test_reused_grid_matches_direct_computation() {
    let ds = x_dataset();
    let engine = EffectEngine::new();
    let grid = engine.grid_builder().build(&ds, "x").unwrap();

    let direct = engine.compute_pdp(&ds, &x_times_noise, &["x"]).unwrap();
    let reused = engine
        .compute_pdp_on_grid(&ds, &x_times_noise, GridSpec::Single(grid.clone()))
        .unwrap();
    assert_eq!(reused, direct);

    let center = FeatureValue::Numeric(2.0);
    let ice = engine
        .compute_ice_on_grid(&ds, &x_times_noise, grid, Some(&center))
        .unwrap();
    assert_eq!(ice, engine.compute_ice(&ds, &x_times_noise, "x", Some(&center)).unwrap());
}

#[test]
fn test_grid_from_another_dataset() {
    // Grid fixed on the full data, evaluated on a subset
    let full = x_dataset();
    let subset = Dataset::builder()
        .numeric("x", vec![2.0])
        .numeric("noise", vec![0.5])
        .build()
        .unwrap();
    let grid = GridBuilder::new().build(&full, "x").unwrap();

    let pdp = EffectEngine::new()
        .compute_pdp_on_grid(&subset, &plus_ten, GridSpec::Single(grid))
        .unwrap();
    assert_eq!(pdp.values, vec![11.0, 12.0, 13.0]);
}

#[test]
fn test_supplied_grid_validated_before_prediction() {
    let ds = x_dataset();
    let model = CountingModel::new();
    let engine = EffectEngine::new()
        .with_parallel(ParallelConfig::new().with_threads(1))
        .unwrap();
    let parse = |json: &str| -> FeatureGrid { serde_json::from_str(json).unwrap() };

    let empty = parse(r#"{"feature": "x", "kind": "continuous", "values": []}"#);
    let err = engine
        .compute_pdp_on_grid(&ds, &model, GridSpec::Single(empty.clone()))
        .unwrap_err();
    assert!(matches!(err, EffectError::InsufficientData { .. }));
    let err = engine.compute_ice_on_grid(&ds, &model, empty, None).unwrap_err();
    assert!(matches!(err, EffectError::InsufficientData { .. }));

    let mixed = parse(r#"{"feature": "x", "kind": "continuous", "values": [1.0, 2.0, "oops"]}"#);
    let err = engine
        .compute_pdp_on_grid(&ds, &model, GridSpec::Single(mixed.clone()))
        .unwrap_err();
    assert!(matches!(err, EffectError::TypeMismatch { .. }));
    let err = engine.compute_ice_on_grid(&ds, &model, mixed, None).unwrap_err();
    assert!(matches!(err, EffectError::TypeMismatch { .. }));

    let wrong_kind = parse(r#"{"feature": "x", "kind": "categorical", "values": ["low"]}"#);
    let err = engine
        .compute_pdp_on_grid(&ds, &model, GridSpec::Single(wrong_kind.clone()))
        .unwrap_err();
    assert!(matches!(err, EffectError::TypeMismatch { feature, .. } if feature == "x"));
    let err = engine.compute_ice_on_grid(&ds, &model, wrong_kind, None).unwrap_err();
    assert!(matches!(err, EffectError::TypeMismatch { .. }));

    let unknown = parse(r#"{"feature": "z", "kind": "continuous", "values": [1.0]}"#);
    let err = engine.compute_ice_on_grid(&ds, &model, unknown, None).unwrap_err();
    assert!(matches!(err, EffectError::FeatureNotFound(_)));

    assert_eq!(model.calls(), 0);
}

#[test]
fn test_pdp_and_ice_share_grid() {
    let ds = x_dataset();
    let engine = EffectEngine::new();
    let (pdp, ice) = engine
        .compute_pdp_and_ice(&ds, &x_times_noise, "x", None)
        .unwrap();
    assert_eq!(pdp.grid, GridSpec::Single(ice.grid().clone()));

    let standalone = engine.compute_pdp(&ds, &x_times_noise, &["x"]).unwrap();
    assert_eq!(pdp.values, standalone.values);
    assert_eq!(pdp.std, standalone.std);
}

#[test]
fn test_pair_pdp_surface() {
    let ds = Dataset::builder()
        .numeric("a", vec![1.0, 2.0])
        .numeric("b", vec![10.0, 20.0])
        .build()
        .unwrap();
    let product = |rows: &Dataset| -> Result<Vec<f64>> {
        let a = numeric(rows, "a");
        let b = numeric(rows, "b");
        Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
    };

    let pdp = EffectEngine::new().compute_pdp(&ds, &product, &["a", "b"]).unwrap();
    assert_eq!(pdp.len(), 4);
    let m = pdp.as_matrix().unwrap();
    assert_eq!(m.shape(), &[2, 2]);
    assert_eq!(m[[0, 0]], 10.0);
    assert_eq!(m[[1, 1]], 40.0);
}

#[test]
fn test_interaction_strength() {
    let ds = Dataset::builder()
        .numeric("a", vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0])
        .numeric("b", vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0])
        .build()
        .unwrap();
    let additive = |rows: &Dataset| -> Result<Vec<f64>> {
        let a = numeric(rows, "a");
        let b = numeric(rows, "b");
        Ok(a.iter().zip(b.iter()).map(|(x, y)| 3.0 * x - y).collect())
    };
    let product = |rows: &Dataset| -> Result<Vec<f64>> {
        let a = numeric(rows, "a");
        let b = numeric(rows, "b");
        Ok(a.iter().zip(b.iter()).map(|(x, y)| (x - 1.0) * (y - 0.5)).collect())
    };

    let engine = EffectEngine::new();
    let h_add = engine.interaction_strength(&ds, &additive, "a", "b").unwrap();
    let h_mul = engine.interaction_strength(&ds, &product, "a", "b").unwrap();
    assert!(h_add < 1e-12);
    assert!((h_mul - 1.0).abs() < 1e-12);
}

#[test]
fn test_matrix_model_linear() {
    // y = x0 + 2 * x1
    let model = MatrixModel::new(|x: &Array2<f64>| -> Result<Array1<f64>> {
        Ok(x.rows().into_iter().map(|row| row[0] + 2.0 * row[1]).collect())
    });
    let ds = Dataset::builder()
        .numeric("x0", vec![0.0, 1.0, 2.0, 3.0])
        .numeric("x1", vec![0.0, 0.5, 1.0, 1.5])
        .build()
        .unwrap();

    let pdp = EffectEngine::new().compute_pdp(&ds, &model, &["x0"]).unwrap();
    // mean(2 * x1) = 1.5
    assert_eq!(pdp.values, vec![1.5, 2.5, 3.5, 4.5]);
}

#[test]
fn test_categorical_feature_with_frame_model() {
    let df = df!(
        "temp" => &[0.2, 0.4, 0.6, 0.8],
        "season" => &["spring", "summer", "spring", "fall"]
    )
    .unwrap();
    let ds = Dataset::from_dataframe(&df).unwrap();

    let model = FrameModel::new(|df: &DataFrame| -> Result<Vec<f64>> {
        let temp = df.column("temp")?.f64()?;
        let season = df.column("season")?.str()?;
        Ok(temp
            .into_no_null_iter()
            .zip(season.into_no_null_iter())
            .map(|(t, s)| match s {
                "summer" => t + 100.0,
                "fall" => t + 50.0,
                _ => t,
            })
            .collect())
    });

    let pdp = EffectEngine::new().compute_pdp(&ds, &model, &["season"]).unwrap();
    let points = pdp.points().unwrap();
    let labels: Vec<String> = points.iter().map(|(v, _)| v.to_string()).collect();
    assert_eq!(labels, vec!["spring", "summer", "fall"]);
    assert!((points[0].1 - 0.5).abs() < 1e-12);
    assert!((points[1].1 - 100.5).abs() < 1e-12);
    assert!((points[2].1 - 50.5).abs() < 1e-12);
}

#[test]
fn test_run_from_config() {
    let ds = x_dataset();
    let config = EffectConfig::from_json(r#"{"features": ["x"], "center_at": 1.0}"#).unwrap();
    let report = EffectEngine::from_config(&config)
        .unwrap()
        .run(&ds, &plus_ten, &config)
        .unwrap();

    assert_eq!(report.pdp.values, vec![11.0, 12.0, 13.0]);
    let ice = report.ice.unwrap();
    assert_eq!(ice.curve(3).to_vec(), vec![0.0, 1.0, 2.0]);

    let pair = EffectConfig::new(["x", "noise"]).with_grid_resolution(2);
    let report = EffectEngine::from_config(&pair)
        .unwrap()
        .run(&ds, &plus_ten, &pair)
        .unwrap();
    assert!(report.ice.is_none());
    assert_eq!(report.pdp.len(), 2 * 2);
}

#[test]
fn test_report_serializes() {
    let ds = x_dataset();
    let config = EffectConfig::new(["x"]);
    let report = EffectEngine::new().run(&ds, &plus_ten, &config).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    let back: EffectReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}
