use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// Bidirectional mapping between known category strings and dense codes.
///
/// The code of a category is its position in `classes`, so a bundle
/// exported from a fitted label encoder keeps the exact codes used at
/// training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderRepr", into = "EncoderRepr")]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, usize>,
}

/// On-disk shape of an encoder.
#[derive(Serialize, Deserialize)]
struct EncoderRepr {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactError> {
        if classes.is_empty() {
            return Err(ArtifactError::Invalid(
                "label encoder has no classes".to_string(),
            ));
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), code).is_some() {
                return Err(ArtifactError::Invalid(format!(
                    "label encoder lists class {:?} twice",
                    class
                )));
            }
        }

        Ok(Self { classes, codes })
    }

    pub fn transform(&self, category: &str) -> Option<usize> {
        self.codes.get(category).copied()
    }

    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl TryFrom<EncoderRepr> for LabelEncoder {
    type Error = ArtifactError;

    fn try_from(raw: EncoderRepr) -> Result<Self, Self::Error> {
        LabelEncoder::new(raw.classes)
    }
}

impl From<LabelEncoder> for EncoderRepr {
    fn from(encoder: LabelEncoder) -> Self {
        EncoderRepr {
            classes: encoder.classes,
        }
    }
}
