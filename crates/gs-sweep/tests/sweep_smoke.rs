use gs_sim::UpdateRule;
use gs_store::DatasetStore;
use gs_sweep::*;

fn scratch_path(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("gs_sweep_test");
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn small_config(name: &str, workers: usize) -> SweepConfig {
    let mut config = SweepConfig::new(0.0, 1.0, scratch_path(name));
    config.p_range.points = 2;
    config.a_range.points = 2;
    config.dt = Some(1.0);
    config.horizon = 2.0;
    config.workers = workers;
    config.spatial_extent = 16;
    config.initial_state = vec![1.0; 16];
    config.x_min = 0.0;
    config.x_max = 100.0;
    config
}

#[test]
fn sample_scenario_2x2() {
    // Full-size spatial state: u comes out with shape (2, 2, 2, 1024)
    let mut config = SweepConfig::new(0.0, 1.0, scratch_path("sample.json"));
    config.p_range.points = 2;
    config.a_range.points = 2;
    config.dt = Some(1.0);
    config.horizon = 2.0;
    config.workers = 4;

    let report = run_sweep(&config).unwrap();

    assert_eq!(report.cells_total, 4);
    assert_eq!(report.cells_written, 4);
    assert!(report.skipped.is_empty());
    assert!(report.workers >= 1);

    let ds = DatasetStore::open(&config.output).unwrap().read().unwrap();
    assert_eq!(ds.dims.p, 2);
    assert_eq!(ds.dims.a, 2);
    assert_eq!(ds.dims.time, 2);
    assert_eq!(ds.dims.x, 1024);

    // Coordinate arrays equal the requested linearly spaced ranges
    assert_eq!(ds.p.value(0), Some(0.0));
    assert_eq!(ds.p.value(1), Some(1.0));
    assert_eq!(ds.a.value(0), Some(0.0));
    assert_eq!(ds.a.value(1), Some(1.0));
    assert_eq!(ds.time.value(0), Some(0.0));
    assert_eq!(ds.time.value(1), Some(1.0));

    // The t = 0 slice of every cell is the shared initial condition
    for i in 0..2 {
        for j in 0..2 {
            assert!(ds.cell_complete(i, j));
            assert_eq!(ds.slice(i, j, 0), Some(&config.initial_state[..]));
        }
    }
}

#[test]
fn final_contents_independent_of_worker_count() {
    let serial = small_config("serial.json", 1);
    let parallel = small_config("parallel.json", 4);
    run_sweep(&serial).unwrap();
    run_sweep(&parallel).unwrap();

    let ds_serial = DatasetStore::open(&serial.output).unwrap().read().unwrap();
    let ds_parallel = DatasetStore::open(&parallel.output)
        .unwrap()
        .read()
        .unwrap();

    // Everything except the provenance line must match exactly
    assert_eq!(ds_serial.dims, ds_parallel.dims);
    assert_eq!(ds_serial.p, ds_parallel.p);
    assert_eq!(ds_serial.a, ds_parallel.a);
    assert_eq!(ds_serial.time, ds_parallel.time);
    assert_eq!(ds_serial.x, ds_parallel.x);
    assert_eq!(ds_serial.u, ds_parallel.u);
}

#[test]
fn config_error_raised_before_any_file_is_created() {
    let mut config = small_config("never_created.json", 2);
    config.p_range.points = 0;

    let err = run_sweep(&config).unwrap_err();
    assert!(matches!(err, SweepError::Config { .. }));
    assert!(!config.output.exists());

    let mut config = small_config("never_created_dt.json", 2);
    config.dt = Some(0.0);
    assert!(run_sweep(&config).is_err());
    assert!(!config.output.exists());
}

#[test]
fn existing_output_fails_without_overwrite() {
    let config = small_config("twice.json", 2);
    run_sweep(&config).unwrap();

    let err = run_sweep(&config).unwrap_err();
    assert!(matches!(
        err,
        SweepError::Store(gs_store::StoreError::AlreadyExists { .. })
    ));

    let mut config = config;
    config.overwrite = true;
    run_sweep(&config).unwrap();
}

/// Produces NaN for every cell with p above the threshold.
struct PoisonAbove {
    threshold: f64,
}

impl UpdateRule for PoisonAbove {
    fn step(&self, t: f64, p: f64, a: f64, prev: &[f64]) -> Vec<f64> {
        if p > self.threshold {
            vec![f64::NAN; prev.len()]
        } else {
            let factor = t.cos() * a.sin() * p.sin();
            prev.iter().map(|u| u * factor).collect()
        }
    }
}

#[test]
fn skip_policy_leaves_failed_cells_unset() {
    let config = small_config("skip.json", 2);
    let rule = PoisonAbove { threshold: 0.5 };
    let report = run_sweep_with_rule(&config, &rule).unwrap();

    // Cells at p = 1 fail, cells at p = 0 complete
    assert_eq!(report.cells_total, 4);
    assert_eq!(report.cells_written, 2);
    assert_eq!(report.skipped.len(), 2);
    for cell in &report.skipped {
        assert_eq!(cell.p_index, 1);
    }

    let ds = DatasetStore::open(&config.output).unwrap().read().unwrap();
    for j in 0..2 {
        assert!(ds.cell_complete(0, j));
        assert!(ds.cell_unset(1, j));
    }
}

#[test]
fn fail_fast_surfaces_the_error_and_never_leaves_partial_cells() {
    let mut config = small_config("failfast.json", 2);
    config.failure_policy = FailurePolicy::FailFast;
    let rule = PoisonAbove { threshold: 0.5 };

    let err = run_sweep_with_rule(&config, &rule).unwrap_err();
    assert!(matches!(err, SweepError::CellFailed { p_index: 1, .. }));

    // Whatever landed before cancellation must be whole cells
    let ds = DatasetStore::open(&config.output).unwrap().read().unwrap();
    for i in 0..ds.dims.p {
        for j in 0..ds.dims.a {
            assert!(ds.cell_complete(i, j) || ds.cell_unset(i, j));
        }
    }
}

#[test]
fn cancelled_sweep_drains_without_writing() {
    let config = small_config("cancelled.json", 2);
    let cancel = CancelFlag::new();
    cancel.cancel();

    let report = run_sweep_with_cancel(&config, &gs_sim::TrigRule, &cancel).unwrap();
    assert_eq!(report.cells_written, 0);
    assert_eq!(report.cells_cancelled, report.cells_total);

    // The store was created but holds no cells
    let ds = DatasetStore::open(&config.output).unwrap().read().unwrap();
    assert_eq!(ds.dims.p, 0);
    assert_eq!(ds.dims.a, 0);
    assert_eq!(ds.dims.time, 0);
}

#[test]
fn single_sample_default_when_dt_unset() {
    let mut config = small_config("single_sample.json", 2);
    config.dt = None;

    run_sweep(&config).unwrap();
    let ds = DatasetStore::open(&config.output).unwrap().read().unwrap();
    assert_eq!(ds.dims.time, 1);
    assert_eq!(ds.time.value(0), Some(0.0));
    assert_eq!(ds.slice(0, 0, 0), Some(&config.initial_state[..]));
}

#[test]
fn coordinates_match_requested_ranges_on_larger_grid() {
    let mut config = small_config("larger.json", 4);
    config.p_range = gs_core::ParamRange {
        min: -2.0,
        max: 2.0,
        points: 5,
    };
    config.a_range = gs_core::ParamRange {
        min: 0.0,
        max: 1.0,
        points: 3,
    };

    let report = run_sweep(&config).unwrap();
    assert_eq!(report.cells_written, 15);

    let ds = DatasetStore::open(&config.output).unwrap().read().unwrap();
    let p_expected = config.p_range.values();
    let a_expected = config.a_range.values();
    for (i, expected) in p_expected.iter().enumerate() {
        assert_eq!(ds.p.value(i), Some(*expected));
    }
    for (j, expected) in a_expected.iter().enumerate() {
        assert_eq!(ds.a.value(j), Some(*expected));
    }
}
