use std::fs;
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};

pub type Result<T> = std::result::Result<T, ModelError>;

/// Artifact kind written by the trainer.
pub const LOGISTIC_KIND: &str = "logistic_regression";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceClass {
    #[serde(rename = "Low Performance")]
    Low,
    #[serde(rename = "High Performance")]
    High,
}

impl PerformanceClass {
    /// Classes in the order of the classifier's probability vector.
    pub const ALL: [PerformanceClass; 2] = [PerformanceClass::Low, PerformanceClass::High];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Performance",
            Self::High => "High Performance",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.label() == label)
    }
}

/// Serialized classifier as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: String,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Holdout accuracy measured by the trainer.
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl ModelArtifact {
    pub fn logistic(intercept: f64, coefficients: Vec<f64>, accuracy: Option<f64>) -> Self {
        Self {
            kind: LOGISTIC_KIND.to_string(),
            feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            classes: PerformanceClass::ALL
                .iter()
                .map(|class| class.label().to_string())
                .collect(),
            intercept,
            coefficients,
            accuracy,
        }
    }

    /// Rejects artifacts that were not trained on the encoder's layout.
    pub fn check_schema(&self) -> Result<()> {
        if self.kind != LOGISTIC_KIND {
            return Err(ModelError::Schema(format!(
                "unsupported model kind '{}'",
                self.kind
            )));
        }
        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES.iter())
                .any(|(got, want)| got != want)
        {
            return Err(ModelError::Schema(format!(
                "feature names {:?} do not match expected {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.coefficients.len() != FEATURE_COUNT {
            return Err(ModelError::Schema(format!(
                "expected {} coefficients, found {}",
                FEATURE_COUNT,
                self.coefficients.len()
            )));
        }
        let expected: Vec<&str> = PerformanceClass::ALL.iter().map(|c| c.label()).collect();
        if self.classes.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Err(ModelError::Schema(format!(
                "classes {:?} do not match expected {:?}",
                self.classes, expected
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Schema("non-finite model parameters".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub class_index: usize,
    /// One probability per entry of [`PerformanceClass::ALL`].
    pub probabilities: Vec<f64>,
}

impl Prediction {
    pub fn class(&self) -> PerformanceClass {
        PerformanceClass::from_index(self.class_index).unwrap_or(PerformanceClass::Low)
    }

    pub fn confidence(&self) -> f64 {
        self.probabilities.iter().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub kind: String,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub accuracy: Option<f64>,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Immutable classifier, loaded once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct ModelGateway {
    artifact: ModelArtifact,
    weights: Array1<f64>,
}

impl ModelGateway {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.check_schema()?;
        let weights = Array1::from_vec(artifact.coefficients.clone());
        Ok(Self { artifact, weights })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ModelArtifact =
            serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let gateway = Self::from_artifact(artifact)?;
        tracing::info!(
            path = %path.display(),
            accuracy = ?gateway.artifact.accuracy,
            "model artifact loaded"
        );
        Ok(gateway)
    }

    /// Signed distance from the decision boundary; positive means "High".
    pub fn decision_score(&self, features: &Array1<f64>) -> f64 {
        self.weights.dot(features) + self.artifact.intercept
    }

    pub fn predict(&self, features: &Array1<f64>) -> Prediction {
        let score = self.decision_score(features);
        let high = sigmoid(score);
        let class_index = if score > 0.0 {
            PerformanceClass::High.index()
        } else {
            PerformanceClass::Low.index()
        };
        Prediction {
            class_index,
            probabilities: vec![1.0 - high, high],
        }
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            kind: self.artifact.kind.clone(),
            feature_names: self.artifact.feature_names.clone(),
            classes: self.artifact.classes.clone(),
            accuracy: self.artifact.accuracy,
        }
    }
}
