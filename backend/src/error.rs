//! Error types for artifact loading and request handling.

use std::path::PathBuf;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorBody;

/// Failure while loading the artifact bundle. Always fatal at startup.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("lecture impossible du fichier d'artefacts {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fichier d'artefacts JSON invalide: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("membre manquant dans le bundle: `{0}`")]
    MissingMember(&'static str),

    #[error("version de format non supportée: {0}")]
    UnsupportedVersion(u64),

    #[error("artefact invalide: {0}")]
    Invalid(String),

    #[error("chargement du modèle ONNX impossible: {0}")]
    Onnx(String),
}

/// Failure while serving a single prediction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Missing input data")]
    MissingInput,

    #[error("Invalid soil_type or month")]
    InvalidCategory,

    #[error("Invalid numeric value for {0}")]
    InvalidNumericField(&'static str),

    // Le détail reste dans les logs, le client ne voit qu'un message générique
    #[error("Prediction failed")]
    Inference(String),
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::MissingInput
            | PredictionError::InvalidCategory
            | PredictionError::InvalidNumericField(_) => StatusCode::BAD_REQUEST,
            PredictionError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}
