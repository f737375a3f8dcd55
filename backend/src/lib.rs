//! Crop recommendation API: loads a trained artifact bundle once and serves
//! crop predictions over HTTP.

pub mod artifact;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod routes;

pub use artifact::ArtifactBundle;
pub use config::ServerConfig;
pub use error::{ArtifactError, PredictionError};
pub use inference::CropRecommender;
