mod config;
mod producer;
mod routes;

use actix_web::{App, HttpServer, web};
use config::GatewayConfig;
use producer::GatewayProducer;
use routes::configure_routes;
use std::io::{Error, ErrorKind};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = GatewayConfig::load().map_err(|e| {
        log::error!("Invalid gateway configuration: {}", e);
        Error::new(ErrorKind::InvalidInput, e)
    })?;

    let producer = GatewayProducer::from_config(&config).map_err(|e| {
        log::error!("Failed to build verdict producer: {}", e);
        Error::new(ErrorKind::Other, e)
    })?;
    log::info!("Verdict producer: {}", producer.describe());

    match &config.server.allowed_origin {
        Some(origin) => log::info!("CORS restricted to {}", origin),
        None => log::warn!("CORS allows any origin; set ALLOWED_ORIGIN in production"),
    }

    let producer = web::Data::new(producer);
    let policy = web::Data::new(config.server.upload_policy());
    let server_config = config.server.clone();
    let bind_address = config.bind_address();

    log::info!("Starting gateway on {}", bind_address);

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
