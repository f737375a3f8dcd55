use serde::{Deserialize, Serialize};

use crate::artifact::FEATURE_COUNT;
use crate::error::{ArtifactError, PredictionError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let (offset, scale, offset_name) = match self {
            Scaler::Standard { mean, scale } => (mean, scale, "mean"),
            Scaler::MinMax { min, scale } => (min, scale, "min"),
        };

        for (name, values) in [(offset_name, offset), ("scale", scale)] {
            if values.len() != FEATURE_COUNT {
                return Err(ArtifactError::Invalid(format!(
                    "scaler {} has {} entries, expected {}",
                    name,
                    values.len(),
                    FEATURE_COUNT
                )));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(ArtifactError::Invalid(format!(
                    "scaler {} contains a non-finite value",
                    name
                )));
            }
        }

        if let Scaler::Standard { scale, .. } = self {
            if scale.iter().any(|s| *s == 0.0) {
                return Err(ArtifactError::Invalid(
                    "standard scaler has a zero scale".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if features.len() != FEATURE_COUNT {
            return Err(PredictionError::Inference(format!(
                "scaler expects {} features, got {}",
                FEATURE_COUNT,
                features.len()
            )));
        }

        let scaled = match self {
            Scaler::Standard { mean, scale } => features
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            Scaler::MinMax { min, scale } => features
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };

        Ok(scaled)
    }
}
