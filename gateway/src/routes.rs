use actix_web::{HttpResponse, web};
use shared::ServiceStatus;
use shared::pipeline::predict;

use crate::producer::GatewayProducer;

pub const READY_MESSAGE: &str = "API Gateway lista. Esperando conexión con Nodo de IA.";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/predict").route(web::post().to(predict::<GatewayProducer>)));
}

async fn home() -> HttpResponse {
    HttpResponse::Ok().json(ServiceStatus {
        estado: READY_MESSAGE.to_string(),
    })
}
