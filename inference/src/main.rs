mod config;
mod model;
mod routes;

use actix_web::{App, HttpServer, web};
use config::InferenceConfig;
use model::{ClassifierEngine, ModelProducer};
use routes::configure_routes;
use std::io::{Error, ErrorKind};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = InferenceConfig::load().map_err(|e| {
        log::error!("Invalid inference configuration: {}", e);
        Error::new(ErrorKind::InvalidInput, e)
    })?;

    // Nothing is served unless the whole model directory loads.
    let engine = ClassifierEngine::load(&config.model_dir).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        Error::new(ErrorKind::Other, format!("Model loading failed: {}", e))
    })?;
    let producer = web::Data::new(ModelProducer::new(
        engine,
        config.algorithm.clone(),
        config.timeout(),
    ));

    match &config.server.allowed_origin {
        Some(origin) => log::info!("CORS restricted to {}", origin),
        None => log::warn!("CORS allows any origin; set ALLOWED_ORIGIN in production"),
    }

    let policy = web::Data::new(config.server.upload_policy());
    let server_config = config.server.clone();
    let bind_address = config.bind_address();

    log::info!(
        "Starting inference service on {} (timeout {:?})",
        bind_address,
        config.timeout()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(server_config.cors())
            .app_data(producer.clone())
            .app_data(policy.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
