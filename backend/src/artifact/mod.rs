//! Trained artifact bundle: three label encoders, a feature scaler and a
//! classifier, loaded together from one JSON document.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "label_encoder_soil":  {"classes": ["Clay", "Loamy"]},
//!   "label_encoder_month": {"classes": ["April", "June"]},
//!   "label_encoder_crop":  {"classes": ["Banana", "Rice"]},
//!   "scaler": {"kind": "standard", "mean": [..6], "scale": [..6]},
//!   "model":  {"kind": "dense", "layers": [..]}
//! }
//! ```
//!
//! `model` may also be `{"kind": "onnx", "path": "model.onnx"}`, with the
//! path resolved against the bundle file's directory.

pub mod classifier;
pub mod encoder;
pub mod scaler;

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use classifier::{Activation, Classifier, DenseLayer, DenseNetwork, ModelSpec, OnnxClassifier};
pub use encoder::LabelEncoder;
pub use scaler::Scaler;

use crate::error::ArtifactError;

pub const FORMAT_VERSION: u64 = 1;

// Ordre des features à l'entraînement (scaler + modèle)
pub const FEATURE_NAMES: [&str; 6] = [
    "latitude",
    "longitude",
    "soil_type",
    "temperature",
    "humidity",
    "month",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

pub const SOIL_ENCODER: &str = "label_encoder_soil";
pub const MONTH_ENCODER: &str = "label_encoder_month";
pub const CROP_ENCODER: &str = "label_encoder_crop";
pub const SCALER: &str = "scaler";
pub const MODEL: &str = "model";

// Immuable après chargement, partagé en lecture seule entre les workers
#[derive(Debug)]
pub struct ArtifactBundle {
    format_version: u64,
    soil_encoder: LabelEncoder,
    month_encoder: LabelEncoder,
    crop_encoder: LabelEncoder,
    scaler: Scaler,
    model: Box<dyn Classifier>,
}

impl ArtifactBundle {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        info!("📦 Chargement du bundle: {:?}", path);

        let json = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        Self::from_json_str(&json, base_dir)
    }

    pub fn from_json_str(json: &str, base_dir: &Path) -> Result<Self, ArtifactError> {
        let mut members: Map<String, Value> = serde_json::from_str(json)?;

        let format_version = match members.remove("format_version") {
            None => FORMAT_VERSION,
            Some(value) => value.as_u64().ok_or_else(|| {
                ArtifactError::Invalid(format!("format_version doit être un entier (valeur: {})", value))
            })?,
        };
        if format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(format_version));
        }

        let soil_encoder: LabelEncoder = take_member(&mut members, SOIL_ENCODER)?;
        let month_encoder: LabelEncoder = take_member(&mut members, MONTH_ENCODER)?;
        let crop_encoder: LabelEncoder = take_member(&mut members, CROP_ENCODER)?;
        let scaler: Scaler = take_member(&mut members, SCALER)?;
        let model_spec: ModelSpec = take_member(&mut members, MODEL)?;

        for unknown in members.keys() {
            debug!("Membre inconnu ignoré: `{}`", unknown);
        }

        scaler.validate()?;
        let model = model_spec.build(base_dir)?;

        if model.input_len() != FEATURE_COUNT {
            return Err(ArtifactError::Invalid(format!(
                "le modèle prend {} features, {} attendues",
                model.input_len(),
                FEATURE_COUNT
            )));
        }
        if let Some(width) = model.output_len() {
            if width != crop_encoder.len() {
                return Err(ArtifactError::Invalid(format!(
                    "le modèle produit {} classes mais l'encodeur de cultures en connaît {}",
                    width,
                    crop_encoder.len()
                )));
            }
        }

        info!(
            "✅ Bundle prêt: {} types de sol, {} mois, {} cultures",
            soil_encoder.len(),
            month_encoder.len(),
            crop_encoder.len()
        );

        Ok(Self {
            format_version,
            soil_encoder,
            month_encoder,
            crop_encoder,
            scaler,
            model,
        })
    }

    pub fn format_version(&self) -> u64 {
        self.format_version
    }

    pub fn soil_encoder(&self) -> &LabelEncoder {
        &self.soil_encoder
    }

    pub fn month_encoder(&self) -> &LabelEncoder {
        &self.month_encoder
    }

    pub fn crop_encoder(&self) -> &LabelEncoder {
        &self.crop_encoder
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }
}

fn take_member<T: DeserializeOwned>(
    members: &mut Map<String, Value>,
    name: &'static str,
) -> Result<T, ArtifactError> {
    let value = members
        .remove(name)
        .filter(|value| !value.is_null())
        .ok_or(ArtifactError::MissingMember(name))?;

    serde_json::from_value(value)
        .map_err(|e| ArtifactError::Invalid(format!("membre `{}`: {}", name, e)))
}
