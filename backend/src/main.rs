use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::{error, info};

use crop_api::{routes, ArtifactBundle, CropRecommender, ServerConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Configuration du logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Démarrage de l'API de recommandation de cultures v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();

    // Jamais de trafic avec un bundle partiel
    let bundle = ArtifactBundle::load(&config.artifact_path)
        .with_context(|| format!("impossible de charger le bundle {:?}", config.artifact_path))
        .map_err(|e| {
            error!("❌ {:#}", e);
            e
        })?;
    info!("✅ Bundle d'artefacts chargé avec succès");
    let recommender = web::Data::new(Arc::new(CropRecommender::new(bundle)));

    let bind_address = config.bind_address();
    info!("🌐 Serveur démarré sur: http://{}", bind_address);
    info!("👷 Workers: {}", config.workers);
    info!("🔧 Endpoints API:");
    info!("   GET  /            - Message d'accueil");
    info!("   GET  /model-info  - Catégories connues");
    info!("   POST /predict     - Prédiction de culture");

    let json_limit = config.json_limit_bytes;
    let cors_origins = config.cors_origins.clone();

    HttpServer::new(move || {
        // Configuration CORS
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(cors)
            .app_data(recommender.clone())
            .configure(|cfg| routes::configure(cfg, json_limit))
    })
    .workers(config.workers)
    .bind(&bind_address)
    .with_context(|| format!("impossible d'écouter sur {}", bind_address))?
    .run()
    .await?;

    Ok(())
}
