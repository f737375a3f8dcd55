use log::debug;
use serde_json::Value;

use crate::artifact::{ArtifactBundle, LabelEncoder, FEATURE_NAMES};
use crate::error::PredictionError;
use crate::models::{ModelInfo, PredictionRequest};

/// Runs the encode, scale, classify and decode pipeline over a loaded bundle.
#[derive(Debug)]
pub struct CropRecommender {
    bundle: ArtifactBundle,
}

impl CropRecommender {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn recommend(&self, request: &PredictionRequest) -> Result<String, PredictionError> {
        if request.has_missing_fields() {
            return Err(PredictionError::MissingInput);
        }

        let soil_code = encode(self.bundle.soil_encoder(), request.soil_type.as_ref())?;
        let month_code = encode(self.bundle.month_encoder(), request.month.as_ref())?;

        let features = [
            numeric("latitude", request.latitude.as_ref())?,
            numeric("longitude", request.longitude.as_ref())?,
            soil_code as f64,
            numeric("temperature", request.temperature.as_ref())?,
            numeric("humidity", request.humidity.as_ref())?,
            month_code as f64,
        ];

        let scaled = narrow(&self.bundle.scaler().transform(&features)?)?;

        let scores = self.bundle.model().predict(&scaled)?;
        let class_index = argmax(&scores)
            .ok_or_else(|| PredictionError::Inference("aucun score exploitable en sortie du modèle".to_string()))?;

        let crop = self
            .bundle
            .crop_encoder()
            .inverse_transform(class_index)
            .ok_or_else(|| {
                PredictionError::Inference(format!(
                    "index de classe {} sans culture associée ({} connues)",
                    class_index,
                    self.bundle.crop_encoder().len()
                ))
            })?;

        debug!("Scores {:?} -> {} ({})", scores, class_index, crop);
        Ok(crop.to_string())
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            format_version: self.bundle.format_version(),
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            soil_types: self.bundle.soil_encoder().classes().to_vec(),
            months: self.bundle.month_encoder().classes().to_vec(),
            crops: self.bundle.crop_encoder().classes().to_vec(),
        }
    }
}

fn encode(
    encoder: &LabelEncoder,
    value: Option<&Value>,
) -> Result<usize, PredictionError> {
    value
        .and_then(Value::as_str)
        .and_then(|category| encoder.transform(category))
        .ok_or(PredictionError::InvalidCategory)
}

/// Accepts JSON numbers and numeric strings; the result must be finite.
fn numeric(field: &'static str, value: Option<&Value>) -> Result<f64, PredictionError> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or(PredictionError::InvalidNumericField(field))
}

// Le modèle travaille en f32 : une valeur trop grande devient `inf` après conversion.
fn narrow(scaled: &[f64]) -> Result<Vec<f32>, PredictionError> {
    scaled
        .iter()
        .zip(FEATURE_NAMES)
        .map(|(&value, field)| {
            let narrowed = value as f32;
            if narrowed.is_finite() {
                Ok(narrowed)
            } else {
                Err(PredictionError::InvalidNumericField(field))
            }
        })
        .collect()
}

/// Index of the highest score. The first maximum wins ties; NaN is skipped.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    /// Humidity drives the decision: dry inputs pick Maize, wet ones Rice.
    fn recommender() -> CropRecommender {
        let json = json!({
            "label_encoder_soil": {"classes": ["Clay", "Loamy", "Sandy"]},
            "label_encoder_month": {"classes": ["January", "June"]},
            "label_encoder_crop": {"classes": ["Maize", "Rice"]},
            "scaler": {"kind": "standard", "mean": [0, 0, 0, 0, 50, 0], "scale": [1, 1, 1, 1, 10, 1]},
            "model": {"kind": "dense", "layers": [
                {"weights": [[0, 0, 0, 0, -1, 0], [0, 0, 0, 0, 1, 0]], "bias": [0, 0], "activation": "softmax"}
            ]}
        });
        let bundle = ArtifactBundle::from_json_str(&json.to_string(), Path::new(".")).unwrap();
        CropRecommender::new(bundle)
    }

    fn request(value: Value) -> PredictionRequest {
        serde_json::from_value(value).unwrap()
    }

    fn scenario_a() -> Value {
        json!({
            "latitude": 10.5,
            "longitude": 76.2,
            "soil_type": "Loamy",
            "temperature": 28.0,
            "humidity": 80.0,
            "month": "June"
        })
    }

    #[test]
    fn valid_request_yields_known_crop() {
        let rec = recommender();
        let crop = rec.recommend(&request(scenario_a())).unwrap();
        assert_eq!(crop, "Rice");
        assert!(rec.bundle().crop_encoder().classes().contains(&crop));
    }

    #[test]
    fn low_humidity_switches_class() {
        let mut body = scenario_a();
        body["humidity"] = json!(20.0);
        assert_eq!(recommender().recommend(&request(body)).unwrap(), "Maize");
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let rec = recommender();
        let req = request(scenario_a());
        let first = rec.recommend(&req).unwrap();
        for _ in 0..10 {
            assert_eq!(rec.recommend(&req).unwrap(), first);
        }
    }

    #[test]
    fn missing_field_is_reported_first() {
        let mut body = scenario_a();
        body.as_object_mut().unwrap().remove("humidity");
        body["soil_type"] = json!("Unobtainium");
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::MissingInput)
        );
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut body = scenario_a();
        body["soil_type"] = json!("Unobtainium");
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidCategory)
        );

        let mut body = scenario_a();
        body["month"] = json!("Smarch");
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidCategory)
        );
    }

    #[test]
    fn non_string_category_is_rejected() {
        let mut body = scenario_a();
        body["month"] = json!(6);
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidCategory)
        );
    }

    #[test]
    fn category_check_precedes_numeric_check() {
        let mut body = scenario_a();
        body["soil_type"] = json!("Unobtainium");
        body["latitude"] = json!("north");
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidCategory)
        );
    }

    #[test]
    fn malformed_number_is_rejected() {
        let mut body = scenario_a();
        body["temperature"] = json!("warm");
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidNumericField("temperature"))
        );

        let mut body = scenario_a();
        body["latitude"] = json!([10.5]);
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidNumericField("latitude"))
        );

        let mut body = scenario_a();
        body["humidity"] = json!("NaN");
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidNumericField("humidity"))
        );
    }

    #[test]
    fn value_overflowing_f32_is_rejected() {
        for huge in [1e40, 1e300, -1e300] {
            let mut body = scenario_a();
            body["latitude"] = json!(huge);
            assert_eq!(
                recommender().recommend(&request(body)),
                Err(PredictionError::InvalidNumericField("latitude"))
            );
        }

        let mut body = scenario_a();
        body["humidity"] = json!("1e300");
        assert_eq!(
            recommender().recommend(&request(body)),
            Err(PredictionError::InvalidNumericField("humidity"))
        );
    }

    #[test]
    fn large_but_representable_value_still_predicts() {
        let mut body = scenario_a();
        body["longitude"] = json!(1e30);
        assert_eq!(recommender().recommend(&request(body)).unwrap(), "Rice");
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let mut body = scenario_a();
        body["humidity"] = json!(" 80 ");
        assert_eq!(recommender().recommend(&request(body)).unwrap(), "Rice");
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[0.5]), Some(0));
        assert_eq!(argmax(&[f32::NAN, 0.1, f32::NAN, 0.3]), Some(3));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn model_info_lists_known_categories() {
        let info = recommender().model_info();
        assert_eq!(info.crops, vec!["Maize", "Rice"]);
        assert_eq!(info.soil_types.len(), 3);
        assert_eq!(info.features[2], "soil_type");
    }
}
