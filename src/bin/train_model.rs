//! Fits the performance classifier from a CSV of labelled students and
//! writes the JSON artifact the server loads.
//!
//! Usage: `train_model [data.csv] [output.json]`

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use student_performance::trainer::{self, TrainingOptions};
use student_performance::AppConfig;

fn main() -> anyhow::Result<()> {
    student_performance::init_tracing()?;

    let config = AppConfig::load().context("loading configuration")?;
    let mut args = std::env::args().skip(1);
    let data_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/students.csv"));
    let output = args.next().map(PathBuf::from).unwrap_or(config.model.path);

    info!(path = %data_path.display(), "loading student data");
    let data = trainer::load_data(&data_path)
        .with_context(|| format!("reading {}", data_path.display()))?;
    info!(rows = data.targets.len(), "loaded student records");

    let artifact = trainer::train(&data, &TrainingOptions::default())?;
    trainer::write_artifact(&artifact, &output)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        path = %output.display(),
        accuracy = artifact.accuracy.unwrap_or_default() * 100.0,
        "model artifact written"
    );
    Ok(())
}
