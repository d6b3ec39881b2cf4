use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::ErrorDetail;

pub const NOT_AN_IMAGE: &str = "El archivo debe ser una imagen";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    ClientInput(String),
    #[error("El archivo supera el límite de {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("No se pudo decodificar la imagen: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Inference timed out after {0:?}")]
    InferenceTimeout(Duration),
    #[error("Inference service unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl PipelineError {
    pub fn not_an_image() -> Self {
        PipelineError::ClientInput(NOT_AN_IMAGE.to_string())
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl From<actix_web::error::BlockingError> for PipelineError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        PipelineError::Inference(err.to_string())
    }
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::ClientInput(_) | PipelineError::Decode(_) => StatusCode::BAD_REQUEST,
            PipelineError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PipelineError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::InferenceTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorDetail {
            detail: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(PipelineError::not_an_image().status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PipelineError::PayloadTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            PipelineError::UpstreamUnavailable("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PipelineError::InferenceTimeout(Duration::from_secs(1)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert!(!PipelineError::Inference("boom".into()).is_client_error());
    }
}
