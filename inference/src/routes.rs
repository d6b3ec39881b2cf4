use actix_web::web;
use shared::pipeline::predict;

use crate::model::ModelProducer;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(predict::<ModelProducer>)));
}
