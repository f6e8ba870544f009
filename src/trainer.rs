//! Offline training of the logistic-regression artifact.
//!
//! Training data is a CSV with one column per entry of [`FEATURE_NAMES`]
//! plus a `Performance` label column holding `0`/`1` or a class label.

use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{Reader, StringRecord};
use linfa::prelude::*;
use linfa_logistic::LogisticRegression;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::error::TrainError;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::model::{ModelArtifact, PerformanceClass};

pub type Result<T> = std::result::Result<T, TrainError>;

/// Header of the label column.
pub const LABEL_COLUMN: &str = "Performance";

/// Minimum rows of each class needed to fit.
pub const MIN_ROWS_PER_CLASS: usize = 2;

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    /// Fraction of rows held out to measure accuracy.
    pub holdout: f64,
    pub seed: u64,
    pub max_iterations: u64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            holdout: 0.2,
            seed: 42,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingData {
    pub features: Array2<f64>,
    /// `true` for "High Performance".
    pub targets: Array1<bool>,
}

impl TrainingData {
    pub fn class_counts(&self) -> (usize, usize) {
        let high = self.targets.iter().filter(|&&t| t).count();
        (self.targets.len() - high, high)
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| TrainError::MissingColumn(name.to_string()))
}

fn parse_label(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "1.0" => Some(true),
        "0" | "0.0" => Some(false),
        other => PerformanceClass::from_label(other).map(|c| c == PerformanceClass::High),
    }
}

pub fn load_data_from_reader<R: Read>(reader: R) -> Result<TrainingData> {
    let mut rdr = Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let feature_columns = FEATURE_NAMES
        .iter()
        .map(|name| column_index(&headers, name))
        .collect::<Result<Vec<_>>>()?;
    let label_column = column_index(&headers, LABEL_COLUMN)?;

    let mut data = Vec::new();
    let mut targets = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let invalid = |column: &str, value: &str| TrainError::InvalidValue {
            row: row + 1,
            column: column.to_string(),
            value: value.to_string(),
        };
        for (&index, name) in feature_columns.iter().zip(FEATURE_NAMES.iter()) {
            let raw = record.get(index).unwrap_or("");
            let value: f64 = raw.trim().parse().map_err(|_| invalid(*name, raw))?;
            data.push(value);
        }
        let raw = record.get(label_column).unwrap_or("");
        targets.push(parse_label(raw).ok_or_else(|| invalid(LABEL_COLUMN, raw))?);
    }

    let num_rows = targets.len();
    Ok(TrainingData {
        features: Array2::from_shape_vec((num_rows, FEATURE_COUNT), data)?,
        targets: Array1::from_vec(targets),
    })
}

pub fn load_data<P: AsRef<Path>>(path: P) -> Result<TrainingData> {
    let file = fs::File::open(path)?;
    load_data_from_reader(file)
}

pub fn calculate_accuracy(predictions: &Array1<bool>, targets: &Array1<bool>) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(targets.iter())
        .filter(|(&pred, &actual)| pred == actual)
        .count() as f64
        / targets.len() as f64
}

/// Seeded shuffle split into (train, holdout) row indices.
fn split_indices(rows: usize, holdout: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let test_rows = ((rows as f64) * holdout.clamp(0.0, 0.5)).round() as usize;
    let test = indices.split_off(rows - test_rows);
    (indices, test)
}

/// Fits a logistic regression and packages it as a [`ModelArtifact`].
pub fn train(data: &TrainingData, options: &TrainingOptions) -> Result<ModelArtifact> {
    let (low, high) = data.class_counts();
    if low < MIN_ROWS_PER_CLASS || high < MIN_ROWS_PER_CLASS {
        return Err(TrainError::NotEnoughData {
            needed: MIN_ROWS_PER_CLASS,
            low,
            high,
        });
    }
    info!(rows = data.targets.len(), low, high, "class distribution");

    let (train_idx, test_idx) = split_indices(data.targets.len(), options.holdout, options.seed);
    let train_x = data.features.select(Axis(0), &train_idx);
    let train_y = data.targets.select(Axis(0), &train_idx);

    let dataset = Dataset::new(train_x.clone(), train_y.clone());
    let fitted = LogisticRegression::default()
        .max_iterations(options.max_iterations)
        .fit(&dataset)
        .map_err(|e| TrainError::Fit(e.to_string()))?;

    // linfa picks its own positive label; orient the weights so that a
    // positive score always means "High Performance".
    let mut coefficients = fitted.params().to_vec();
    let mut intercept = fitted.intercept();
    let predicted = fitted.predict(&train_x);
    let scores = train_x.dot(fitted.params()) + intercept;
    let disagreements = scores
        .iter()
        .zip(predicted.iter())
        .filter(|(&score, &pred)| (score > 0.0) != pred)
        .count();
    if disagreements * 2 > predicted.len() {
        coefficients.iter_mut().for_each(|c| *c = -*c);
        intercept = -intercept;
    }

    let (eval_x, eval_y) = if test_idx.is_empty() {
        (train_x, train_y)
    } else {
        (
            data.features.select(Axis(0), &test_idx),
            data.targets.select(Axis(0), &test_idx),
        )
    };
    let eval_predictions = fitted.predict(&eval_x);
    let accuracy = calculate_accuracy(&eval_predictions, &eval_y);
    info!(accuracy, holdout_rows = test_idx.len(), "model trained");

    Ok(ModelArtifact::logistic(intercept, coefficients, Some(accuracy)))
}

pub fn write_artifact<P: AsRef<Path>>(artifact: &ModelArtifact, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(artifact)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    use crate::features::{StudentFeatures, StudentInput};
    use crate::model::ModelGateway;

    fn csv_header() -> String {
        let mut header: Vec<String> = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
        header.push(LABEL_COLUMN.to_string());
        header.join(",")
    }

    /// Students whose attendance and final score drive the label, with noise.
    fn synthetic_csv(rows: usize) -> String {
        let mut rng = StdRng::seed_from_u64(7);
        let mut out = csv_header();
        for _ in 0..rows {
            let input = StudentInput {
                attendance: rng.gen_range(20..=100),
                final_score: rng.gen_range(10..=100),
                age: rng.gen_range(15..=30),
                outstanding_balance: 0,
                ..StudentInput::default()
            };
            let strength = input.attendance + input.final_score + rng.gen_range(-20..=20);
            let label = if strength > 120 { "1" } else { "0" };
            let values = StudentFeatures::from(&input)
                .to_vector()
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&format!("\n{values},{label}"));
        }
        out
    }

    #[test]
    fn loads_labels_in_either_form() {
        let zeros = vec!["0"; FEATURE_COUNT].join(",");
        let csv = format!(
            "{}\n{zeros},1\n{zeros},Low Performance\n{zeros},High Performance",
            csv_header()
        );
        let data = load_data_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(data.features.dim(), (3, FEATURE_COUNT));
        assert_eq!(data.targets.to_vec(), vec![true, false, true]);
    }

    #[test]
    fn missing_column_is_reported() {
        let err = load_data_from_reader("Age,Performance\n20,1".as_bytes()).unwrap_err();
        assert!(matches!(err, TrainError::MissingColumn(c) if c == "Year_of_Study"));
    }

    #[test]
    fn invalid_value_names_row_and_column() {
        let mut values = vec!["0"; FEATURE_COUNT];
        values[2] = "lots";
        let csv = format!("{}\n{},1", csv_header(), values.join(","));
        let err = load_data_from_reader(csv.as_bytes()).unwrap_err();
        match err {
            TrainError::InvalidValue { row, column, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "Attendance");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn refuses_single_class_data() {
        let zeros = vec!["0"; FEATURE_COUNT].join(",");
        let csv = format!("{}\n{zeros},1\n{zeros},1\n{zeros},1", csv_header());
        let data = load_data_from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(
            train(&data, &TrainingOptions::default()),
            Err(TrainError::NotEnoughData { low: 0, high: 3, .. })
        ));
    }

    #[test]
    fn split_is_deterministic_and_disjoint() {
        let (train_a, test_a) = split_indices(50, 0.2, 1);
        let (train_b, test_b) = split_indices(50, 0.2, 1);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 10);
        assert!(test_a.iter().all(|i| !train_a.contains(i)));
    }

    #[test]
    fn accuracy_counts_matches() {
        let predictions = Array1::from_vec(vec![true, true, false, true]);
        let targets = Array1::from_vec(vec![true, false, false, true]);
        assert!((calculate_accuracy(&predictions, &targets) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn trained_artifact_loads_into_gateway() {
        let data = load_data_from_reader(synthetic_csv(200).as_bytes()).unwrap();
        let artifact = train(&data, &TrainingOptions::default()).unwrap();
        assert_eq!(artifact.coefficients.len(), FEATURE_COUNT);
        assert!(artifact.accuracy.is_some());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");
        write_artifact(&artifact, &path).unwrap();
        let gateway = ModelGateway::load(&path).unwrap();

        let strong = StudentFeatures::from(&StudentInput {
            attendance: 100,
            final_score: 100,
            ..StudentInput::default()
        });
        let weak = StudentFeatures::from(&StudentInput {
            attendance: 20,
            final_score: 10,
            ..StudentInput::default()
        });
        let strong_p = gateway.predict(&strong.to_vector()).probabilities[1];
        let weak_p = gateway.predict(&weak.to_vector()).probabilities[1];
        assert!(strong_p > weak_p);
    }
}
