use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw prediction request. Fields stay untyped until the pipeline
/// validates them, so a missing field and a malformed one can be told apart.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PredictionRequest {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub soil_type: Option<Value>,
    pub temperature: Option<Value>,
    pub humidity: Option<Value>,
    pub month: Option<Value>,
}

impl PredictionRequest {
    /// True when any of the six fields is absent or JSON `null`.
    pub fn has_missing_fields(&self) -> bool {
        [
            &self.latitude,
            &self.longitude,
            &self.soil_type,
            &self.temperature,
            &self.humidity,
            &self.month,
        ]
        .iter()
        .any(|field| matches!(field, None | Some(Value::Null)))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionResponse {
    pub predicted_crop: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WelcomeMessage {
    pub message: String,
}

impl WelcomeMessage {
    pub const TEXT: &'static str = "Welcome to the crop recommendation API!";

    pub fn new() -> Self {
        WelcomeMessage {
            message: Self::TEXT.to_string(),
        }
    }
}

impl Default for WelcomeMessage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorBody {
            error: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelInfo {
    pub format_version: u64,
    pub features: Vec<String>,
    pub soil_types: Vec<String>,
    pub months: Vec<String>,
    pub crops: Vec<String>,
}
