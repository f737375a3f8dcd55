use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tract_onnx::prelude::*;

use crate::artifact::FEATURE_COUNT;
use crate::error::{ArtifactError, PredictionError};

/// Maps a scaled feature vector to one score per crop class.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, PredictionError>;

    fn input_len(&self) -> usize;

    /// Width of the score vector, when it is known before running the model.
    fn output_len(&self) -> Option<usize>;
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Dense(DenseNetwork),
    Onnx { path: PathBuf },
}

impl ModelSpec {
    // Chemins ONNX relatifs résolus depuis `base_dir`
    pub fn build(self, base_dir: &Path) -> Result<Box<dyn Classifier>, ArtifactError> {
        match self {
            ModelSpec::Dense(network) => {
                network.validate()?;
                Ok(Box::new(network))
            }
            ModelSpec::Onnx { path } => {
                let path = if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                };
                Ok(Box::new(OnnxClassifier::load(&path)?))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    fn apply(self, values: &mut [f32]) {
        match self {
            Activation::Linear => {}
            Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Sigmoid => values
                .iter_mut()
                .for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::Softmax => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                values.iter_mut().for_each(|v| *v = (*v - max).exp());
                let sum: f32 = values.iter().sum();
                if sum > 0.0 {
                    values.iter_mut().for_each(|v| *v /= sum);
                }
            }
        }
    }
}

// Une ligne de `weights` par unité de sortie
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default = "default_activation")]
    pub activation: Activation,
}

fn default_activation() -> Activation {
    Activation::Linear
}

impl DenseLayer {
    fn input_len(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn output_len(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();
        self.activation.apply(&mut out);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DenseNetwork {
    pub layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.layers.is_empty() {
            return Err(ArtifactError::Invalid("dense model has no layers".to_string()));
        }

        let mut width = FEATURE_COUNT;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.output_len() == 0 {
                return Err(ArtifactError::Invalid(format!("layer {} has no units", i)));
            }
            if layer.bias.len() != layer.output_len() {
                return Err(ArtifactError::Invalid(format!(
                    "layer {} has {} units but {} biases",
                    i,
                    layer.output_len(),
                    layer.bias.len()
                )));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
                return Err(ArtifactError::Invalid(format!(
                    "layer {} expects {} inputs, found a weight row of {}",
                    i,
                    width,
                    row.len()
                )));
            }
            let finite = layer
                .weights
                .iter()
                .flatten()
                .chain(&layer.bias)
                .all(|v| v.is_finite());
            if !finite {
                return Err(ArtifactError::Invalid(format!(
                    "layer {} contains a non-finite parameter",
                    i
                )));
            }
            width = layer.output_len();
        }

        Ok(())
    }
}

impl Classifier for DenseNetwork {
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, PredictionError> {
        if features.len() != self.input_len() {
            return Err(PredictionError::Inference(format!(
                "dense model expects {} features, got {}",
                self.input_len(),
                features.len()
            )));
        }

        let mut activations = features.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        Ok(activations)
    }

    fn input_len(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_len)
    }

    fn output_len(&self) -> Option<usize> {
        self.layers.last().map(DenseLayer::output_len)
    }
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX graph run through tract, fed a `[1, FEATURE_COUNT]` f32 tensor.
pub struct OnnxClassifier {
    path: PathBuf,
    plan: OnnxPlan,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.is_file() {
            return Err(ArtifactError::Onnx(format!("fichier modèle {:?} introuvable", path)));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ArtifactError::Onnx(format!("{:?}: {}", path, e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            plan,
        })
    }
}

impl fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<Vec<f32>, PredictionError> {
        let inference = |e: anyhow::Error| PredictionError::Inference(e.to_string());

        let input = Tensor::from_shape(&[1, FEATURE_COUNT], features).map_err(inference)?;
        let outputs = self.plan.run(tvec!(input.into())).map_err(inference)?;
        let scores = outputs
            .first()
            .ok_or_else(|| PredictionError::Inference("Aucune sortie du modèle".to_string()))?
            .to_array_view::<f32>()
            .map_err(inference)?
            .iter()
            .copied()
            .collect();

        Ok(scores)
    }

    fn input_len(&self) -> usize {
        FEATURE_COUNT
    }

    fn output_len(&self) -> Option<usize> {
        None
    }
}
