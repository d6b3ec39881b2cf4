use std::future::Future;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use log::{error, info, warn};

use crate::error::PipelineError;
use crate::upload::{DecodedImage, UploadPolicy, read_upload};
use crate::VerdictResult;

/// Anything that can turn a decoded upload into a verdict.
pub trait VerdictProducer {
    fn produce(
        &self,
        image: DecodedImage,
    ) -> impl Future<Output = Result<VerdictResult, PipelineError>>;
}

/// `POST /predict` for any producer: validate, decode, produce.
pub async fn predict<P: VerdictProducer + 'static>(
    producer: web::Data<P>,
    policy: web::Data<UploadPolicy>,
    payload: Multipart,
) -> Result<HttpResponse, PipelineError> {
    let result = run(producer.get_ref(), policy.get_ref(), payload).await;
    match &result {
        Ok(_) => {}
        Err(e) if e.is_client_error() => warn!("Rejected prediction request: {}", e),
        Err(e) => error!("Prediction failed: {}", e),
    }
    result.map(|verdict| HttpResponse::Ok().json(verdict))
}

async fn run<P: VerdictProducer>(
    producer: &P,
    policy: &UploadPolicy,
    payload: Multipart,
) -> Result<VerdictResult, PipelineError> {
    let upload = read_upload(payload, policy).await?;
    let id = upload.id;
    info!(
        "Image received: {} [{}] ({}, {} bytes, sha256 {})",
        upload.display_name(),
        id,
        upload.content_type,
        upload.bytes.len(),
        upload.fingerprint()
    );

    let image = web::block(move || DecodedImage::decode(upload)).await??;
    let verdict = producer.produce(image).await?;
    info!(
        "Verdict for [{}]: {} ({:.2}) via {}",
        id, verdict.verdict, verdict.confidence, verdict.algorithm
    );
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use actix_web::{App, test};
    use serde_json::Value;

    use super::*;
    use crate::testing::{multipart_request, png_1x1};

    #[derive(Default)]
    struct CountingProducer {
        calls: AtomicUsize,
    }

    impl VerdictProducer for CountingProducer {
        async fn produce(&self, image: DecodedImage) -> Result<VerdictResult, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (w, h) = image.pixels.dimensions();
            Ok(VerdictResult::new("Real", 0.75, format!("counting {}x{}", w, h)))
        }
    }

    macro_rules! predict_app {
        ($producer:expr, $max_bytes:expr) => {
            test::init_service(
                App::new()
                    .app_data($producer)
                    .app_data(web::Data::new(UploadPolicy { max_bytes: $max_bytes }))
                    .route("/predict", web::post().to(predict::<CountingProducer>)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn image_upload_yields_three_field_verdict() {
        let producer = web::Data::new(CountingProducer::default());
        let app = predict_app!(producer.clone(), 1024 * 1024);

        let req = multipart_request("/predict", "file", "pixel.png", "image/png", &png_1x1());
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: Value = test::read_body_json(resp).await;
        let fields = body.as_object().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(body["veredicto"], "Real");
        assert_eq!(body["algoritmo"], "counting 1x1");
        let confidence = body["confianza"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert_eq!(producer.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn text_upload_is_rejected_without_producing() {
        let producer = web::Data::new(CountingProducer::default());
        let app = predict_app!(producer.clone(), 1024 * 1024);

        let req = multipart_request("/predict", "file", "notes.txt", "text/plain", b"hola");
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], crate::error::NOT_AN_IMAGE);
        assert_eq!(producer.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn undecodable_image_is_a_client_error() {
        let producer = web::Data::new(CountingProducer::default());
        let app = predict_app!(producer.clone(), 1024 * 1024);

        let req = multipart_request("/predict", "file", "broken.png", "image/png", b"\x89PNG garbage");
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        assert_eq!(producer.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn missing_file_field_is_rejected() {
        let producer = web::Data::new(CountingProducer::default());
        let app = predict_app!(producer.clone(), 1024 * 1024);

        let req = multipart_request("/predict", "picture", "pixel.png", "image/png", &png_1x1());
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        assert_eq!(producer.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected() {
        let producer = web::Data::new(CountingProducer::default());
        let app = predict_app!(producer.clone(), 16);

        let req = multipart_request("/predict", "file", "pixel.png", "image/png", &png_1x1());
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 413);
        assert_eq!(producer.calls.load(Ordering::SeqCst), 0);
    }
}
