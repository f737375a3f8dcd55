use std::sync::Arc;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use log::{error, info, warn};

use crate::error::PredictionError;
use crate::inference::CropRecommender;
use crate::models::{ErrorBody, PredictionRequest, PredictionResponse, WelcomeMessage};

pub type SharedRecommender = web::Data<Arc<CropRecommender>>;

#[get("/")]
pub async fn home() -> impl Responder {
    HttpResponse::Ok().json(WelcomeMessage::new())
}

#[get("/model-info")]
pub async fn model_info(recommender: SharedRecommender) -> impl Responder {
    HttpResponse::Ok().json(recommender.model_info())
}

#[post("/predict")]
pub async fn predict(
    recommender: SharedRecommender,
    input: web::Json<PredictionRequest>,
) -> Result<HttpResponse, PredictionError> {
    let request = input.into_inner();
    let recommender = Arc::clone(recommender.get_ref());

    let outcome = web::block(move || recommender.recommend(&request))
        .await
        .map_err(|e| {
            error!("Erreur d'exécution bloquante: {}", e);
            PredictionError::Inference(e.to_string())
        })?;

    match outcome {
        Ok(crop) => {
            info!("Prédiction réussie: {}", crop);
            Ok(HttpResponse::Ok().json(PredictionResponse {
                predicted_crop: crop,
            }))
        }
        Err(PredictionError::Inference(detail)) => {
            error!("Erreur de prédiction: {}", detail);
            Err(PredictionError::Inference(detail))
        }
        Err(e) => {
            warn!("Requête de prédiction rejetée: {}", e);
            Err(e)
        }
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorBody::new("Not found"))
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Corps de requête invalide: {}", err);
    let response = HttpResponse::BadRequest().json(ErrorBody::new("Invalid JSON body"));
    InternalError::from_response(err, response).into()
}

// Routes + configuration JSON, partagées par main et les tests
pub fn configure(cfg: &mut web::ServiceConfig, json_limit_bytes: usize) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(json_limit_bytes)
            .error_handler(json_error),
    )
    .service(home)
    .service(model_info)
    .service(predict)
    .default_service(web::route().to(not_found));
}
