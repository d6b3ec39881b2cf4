use log::{error, info, warn};
use reqwest::Client as HttpClient;
use reqwest::multipart::{Form, Part};
use shared::upload::FILE_FIELD;
use shared::{DecodedImage, ErrorDetail, PipelineError, UploadedImage, VerdictProducer, VerdictResult};

use crate::config::BridgeConfig;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Upstream rejected the image: {0}")]
    Rejected(String),
    #[error("Upstream returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("Upstream verdict out of contract: {0:?}")]
    InvalidVerdict(VerdictResult),
}

impl BridgeError {
    /// Timeouts and connect failures are retried. A prediction depends only
    /// on the uploaded bytes, so sending the same image twice is harmless even
    /// if the first attempt reached the model.
    fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl From<BridgeError> for PipelineError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Rejected(detail) => PipelineError::ClientInput(detail),
            other => PipelineError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Forwards uploads to the inference service's `/predict`.
#[derive(Clone)]
pub struct BridgeProducer {
    http_client: HttpClient,
    predict_url: String,
    retries: u32,
}

impl BridgeProducer {
    pub fn new(config: &BridgeConfig) -> Result<Self, reqwest::Error> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            http_client,
            predict_url: format!("{}/predict", config.inference_url.trim_end_matches('/')),
            retries: config.retries,
        })
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    pub async fn forward(&self, upload: &UploadedImage) -> Result<VerdictResult, BridgeError> {
        let mut attempt = 0;
        loop {
            match self.send(upload).await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(
                        "Inference call for [{}] failed ({}), retry {}/{}",
                        upload.id, e, attempt, self.retries
                    );
                }
                result => return result,
            }
        }
    }

    async fn send(&self, upload: &UploadedImage) -> Result<VerdictResult, BridgeError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.display_name().to_string())
            .mime_str(&upload.content_type)?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .http_client
            .post(&self.predict_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let detail = match response.json::<ErrorDetail>().await {
                Ok(body) => body.detail,
                Err(_) => status.to_string(),
            };
            return Err(BridgeError::Rejected(detail));
        }
        if !status.is_success() {
            return Err(BridgeError::Status(status));
        }

        let verdict: VerdictResult = response.json().await?;
        if !verdict.is_well_formed() {
            return Err(BridgeError::InvalidVerdict(verdict));
        }
        Ok(verdict)
    }
}

impl VerdictProducer for BridgeProducer {
    async fn produce(&self, image: DecodedImage) -> Result<VerdictResult, PipelineError> {
        info!("Forwarding [{}] to {}", image.upload.id, self.predict_url);
        self.forward(&image.upload).await.map_err(|e| {
            error!("Inference bridge failed for [{}]: {}", image.upload.id, e);
            PipelineError::from(e)
        })
    }
}
