//! End-to-end synthesis tests: calibrate to a parameter file, then
//! generate ensembles from it.

use anofox_downscale::calibration::{CalibrationConfig, Calibrator};
use anofox_downscale::core::{Calendar, Granularity, OccurrenceMode, SeedMode, Settings, SimDate};
use anofox_downscale::io::{ParameterFile, SynthesisManifest};
use anofox_downscale::synthesis::{SynthesisConfig, WeatherGenerator};
use anofox_downscale::transform::{TransformKind, TransformState};
use anofox_downscale::DownscaleError;
use approx::assert_relative_eq;
use std::fs;
use std::path::{Path, PathBuf};

fn date(d: u32, m: u32, y: i32) -> SimDate {
    SimDate::new(y, m, d, Calendar::Gregorian).unwrap()
}

fn write_series(dir: &Path, name: &str, values: &[f64]) -> PathBuf {
    let path = dir.join(name);
    let text: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    fs::write(&path, text.join("\n")).unwrap();
    path
}

fn noise(i: usize) -> f64 {
    ((i * 7919 + 13) % 97) as f64 / 97.0 - 0.5
}

fn temperature(n: usize) -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.0172).sin() * 5.0 + noise(i * 7)).collect();
    let y: Vec<f64> = (0..n).map(|i| 12.0 + 1.8 * x[i] + noise(i)).collect();
    (y, x)
}

fn rainfall(n: usize) -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin() + 0.2 * noise(i)).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| {
            if x[i] > 0.0 {
                0.5 + 8.0 * x[i] + 3.0 * (noise(i * 3) + 0.5)
            } else {
                0.0
            }
        })
        .collect();
    (y, x)
}

/// Calibrate and return the parameter file path and predictor path.
fn calibrate(dir: &Path, y: &[f64], x: &[f64], config: CalibrationConfig) -> (PathBuf, PathBuf) {
    let predictand = write_series(dir, "y.dat", y);
    let predictor = write_series(dir, "x.dat", x);
    let par = dir.join("model.par");
    let config = config.with_files(predictand, vec![predictor.clone()], date(1, 1, 1961));
    Calibrator::new(Settings::default())
        .calibrate_files(&config, &par)
        .unwrap();
    (par, predictor)
}

// ==================== determinism ====================

#[test]
fn fixed_seed_output_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = rainfall(1000);
    let (par, _) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new()
            .with_granularity(Granularity::Seasonal)
            .with_conditional(true)
            .with_transform(TransformKind::FourthRoot)
            .with_autoregression(true),
    );
    let settings = Settings::default().with_seed_mode(SeedMode::Fixed(2024));
    let generator = WeatherGenerator::from_file(settings, &par).unwrap();

    let run = |name: &str| {
        let output = dir.path().join(name);
        let config = SynthesisConfig::new(&par, &output)
            .with_window(date(1, 1, 1961), 365)
            .with_ensemble_size(5);
        let summary = generator.run(&config).unwrap();
        assert_eq!(summary.days, 365);
        fs::read(output).unwrap()
    };
    let first = run("a.out");
    let second = run("b.out");
    assert_eq!(first, second);

    let text = String::from_utf8(first).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 365);
    for row in rows {
        let values: Vec<f64> = row.split('\t').map(|v| v.parse().unwrap()).collect();
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|&v| v == 0.0 || v > 0.0));
    }
}

#[test]
fn entropy_seeded_runs_differ() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = temperature(730);
    let (par, _) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new().with_granularity(Granularity::Annual),
    );
    let settings = Settings::default()
        .with_seed_mode(SeedMode::Entropy)
        .with_variance_inflation(12);
    let generator = WeatherGenerator::from_file(settings, &par).unwrap();

    let run = |name: &str| {
        let output = dir.path().join(name);
        let config = SynthesisConfig::new(&par, &output)
            .with_window(date(1, 1, 1961), 60)
            .with_ensemble_size(3);
        generator.run(&config).unwrap();
        fs::read_to_string(output).unwrap()
    };
    let first = run("a.out");
    let second = run("b.out");
    assert_eq!(first.lines().count(), 60);
    assert_ne!(first, second);
}

#[test]
fn zero_inflation_reproduces_the_deterministic_response() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = temperature(730);
    let (par, _) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new().with_granularity(Granularity::Monthly),
    );
    let params = ParameterFile::load(&par).unwrap();
    let settings = Settings::default()
        .with_variance_inflation(0)
        .with_seed(1);
    let generator = WeatherGenerator::new(settings, params.clone()).unwrap();
    let output = dir.path().join("t.out");
    generator
        .run(&SynthesisConfig::new(&par, &output).with_ensemble_size(3))
        .unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let mut date = date(1, 1, 1961);
    for (day, row) in text.lines().enumerate() {
        let period = params.granularity.period_of(date);
        let model = params.unconditional_rows[period.index()].as_ref().unwrap();
        let expected = model.response(&[x[day]], None);
        for value in row.split('\t') {
            assert_relative_eq!(value.parse::<f64>().unwrap(), expected, epsilon = 6e-4);
        }
        date = date.succ(Calendar::Gregorian);
    }
}

#[test]
fn manifest_records_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = temperature(400);
    let (par, predictor) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new().with_granularity(Granularity::Annual),
    );
    let mut profile = [1.0; 12];
    profile[0] = 0.8;
    let settings = Settings::default()
        .with_seed(3)
        .with_variance_inflation(6)
        .with_monthly_profile(profile);
    let output = dir.path().join("t.out");
    let manifest_path = dir.path().join("t.sim");
    WeatherGenerator::from_file(settings, &par)
        .unwrap()
        .run(
            &SynthesisConfig::new(&par, &output)
                .with_window(date(1, 2, 1961), 30)
                .with_ensemble_size(2)
                .with_manifest(&manifest_path),
        )
        .unwrap();

    let manifest = SynthesisManifest::load(&manifest_path).unwrap();
    assert_eq!(manifest.start, date(1, 2, 1961));
    assert_eq!(manifest.length, 30);
    assert_eq!(manifest.ensemble_size, 2);
    assert_eq!(manifest.variance_inflation, 6);
    assert_eq!(manifest.granularity, Granularity::Annual);
    assert_eq!(manifest.predictor_files, vec![predictor.display().to_string()]);
    assert_relative_eq!(manifest.monthly_profile[0], 0.8);
}

// ==================== predictor streams ====================

#[test]
fn synthesis_start_skips_earlier_lines() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = temperature(800);
    let (par, predictor) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new().with_granularity(Granularity::Annual),
    );
    let params = ParameterFile::load(&par).unwrap();
    let model = params.unconditional_rows[0].clone().unwrap();
    let settings = Settings::default().with_variance_inflation(0).with_seed(1);

    // Predictor file starts 1961-01-01; synthesis starts one year later.
    let output = dir.path().join("late.out");
    WeatherGenerator::new(settings, params)
        .unwrap()
        .run(
            &SynthesisConfig::new(&par, &output)
                .with_predictors(vec![predictor])
                .with_stream_start(date(1, 1, 1961))
                .with_window(date(1, 1, 1962), 5)
                .with_ensemble_size(1),
        )
        .unwrap();
    let text = fs::read_to_string(&output).unwrap();
    for (day, line) in text.lines().enumerate() {
        let expected = model.response(&[x[365 + day]], None);
        assert_relative_eq!(line.parse::<f64>().unwrap(), expected, epsilon = 6e-4);
    }
}

#[test]
fn missing_predictor_days_are_written_as_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = temperature(400);
    let (par, _) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new().with_granularity(Granularity::Annual),
    );
    let mut gappy = x.clone();
    gappy[3] = -999.0;
    let gappy_path = write_series(dir.path(), "gappy.dat", &gappy);
    let output = dir.path().join("g.out");
    let summary = WeatherGenerator::from_file(Settings::default().with_seed(9), &par)
        .unwrap()
        .run(
            &SynthesisConfig::new(&par, &output)
                .with_predictors(vec![gappy_path])
                .with_window(date(1, 1, 1961), 10)
                .with_ensemble_size(4),
        )
        .unwrap();
    assert_eq!(summary.missing_predictor_days, 1);
    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(text.lines().nth(3), Some("-999\t-999\t-999\t-999"));
    assert!(!text.lines().nth(4).unwrap().contains("-999"));
}

#[test]
fn exhausted_predictor_file_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = temperature(400);
    let (par, _) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new().with_granularity(Granularity::Annual),
    );
    let output = dir.path().join("e.out");
    let result = WeatherGenerator::from_file(Settings::default().with_seed(9), &par)
        .unwrap()
        .run(
            &SynthesisConfig::new(&par, &output)
                .with_window(date(1, 1, 1961), 500)
                .with_ensemble_size(1),
        );
    match result {
        Err(DownscaleError::EndOfPredictors { day, path }) => {
            assert_eq!(day, 400);
            assert!(path.ends_with("x.dat"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

// ==================== stored file names ====================

#[test]
fn relative_inputs_resolve_from_a_separate_output_directory() {
    let root = tempfile::tempdir_in(".").unwrap();
    assert!(root.path().is_relative());
    let data = root.path().join("data");
    let out = root.path().join("out");
    fs::create_dir_all(&data).unwrap();
    fs::create_dir_all(&out).unwrap();

    let (y, x) = temperature(400);
    let predictand = write_series(&data, "y.dat", &y);
    let predictor = write_series(&data, "x.dat", &x);
    let par = out.join("model.par");
    let config = CalibrationConfig::new()
        .with_granularity(Granularity::Annual)
        .with_files(predictand, vec![predictor], date(1, 1, 1961));
    Calibrator::new(Settings::default())
        .calibrate_files(&config, &par)
        .unwrap();

    let params = ParameterFile::load(&par).unwrap();
    assert_eq!(PathBuf::from(&params.predictor_files[0]), Path::new("..").join("data").join("x.dat"));
    assert_eq!(PathBuf::from(&params.predictand_file), Path::new("..").join("data").join("y.dat"));

    let output = out.join("syn.out");
    let generator = WeatherGenerator::from_file(Settings::default().with_seed(3), &par).unwrap();
    let summary = generator
        .run(&SynthesisConfig::new(&par, &output).with_ensemble_size(2))
        .unwrap();
    assert_eq!(summary.days, 400);
    assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 400);
}

// ==================== older parameter files ====================

#[test]
fn rank_tables_are_rebuilt_for_files_without_transform_rows() {
    let dir = tempfile::tempdir().unwrap();
    let (y, x) = rainfall(800);
    let (par, _) = calibrate(
        dir.path(),
        &y,
        &x,
        CalibrationConfig::new()
            .with_granularity(Granularity::Annual)
            .with_conditional(true)
            .with_transform(TransformKind::InverseNormal),
    );
    let text = fs::read_to_string(&par).unwrap();
    let stripped: Vec<&str> = text.lines().filter(|l| !l.starts_with("RANKS")).collect();
    let old = dir.path().join("old.par");
    fs::write(&old, stripped.join("\n")).unwrap();

    let settings = Settings::default()
        .with_seed(4)
        .with_occurrence_mode(OccurrenceMode::Fixed);
    let generator = WeatherGenerator::from_file(settings, &old).unwrap();
    match &generator.parameters().transform_states.as_ref().unwrap()[0] {
        TransformState::InverseNormal(table) => {
            let wet = y.iter().filter(|&&v| v > 0.0).count();
            assert_eq!(table.sorted().len(), wet);
        }
        other => panic!("unexpected {other:?}"),
    }
    let output = dir.path().join("old.out");
    let summary = generator
        .run(
            &SynthesisConfig::new(&old, &output)
                .with_window(date(1, 1, 1961), 100)
                .with_ensemble_size(2),
        )
        .unwrap();
    assert_eq!(summary.days, 100);
}
