use std::time::Duration;

use rand::Rng;
use shared::{DecodedImage, PipelineError, VerdictProducer, VerdictResult};
use strum::{AsRefStr, Display};

pub const MOCK_ALGORITHM: &str = "Gateway-Simulado (Esperando GPU Externa)";

pub const MIN_CONFIDENCE: f64 = 0.70;
pub const MAX_CONFIDENCE: f64 = 0.99;
/// Scores strictly above this are reported as fakes.
pub const FAKE_THRESHOLD: f64 = 0.80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum MockVerdict {
    Fake,
    Real,
}

pub fn label_for(confidence: f64) -> MockVerdict {
    if confidence > FAKE_THRESHOLD {
        MockVerdict::Fake
    } else {
        MockVerdict::Real
    }
}

/// Uniform in `[MIN_CONFIDENCE, MAX_CONFIDENCE]`, rounded to two decimals.
pub fn draw_confidence<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let score: f64 = rng.random_range(MIN_CONFIDENCE..=MAX_CONFIDENCE);
    ((score * 100.0).round() / 100.0).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Stand-in verdicts while no inference node is attached.
#[derive(Debug, Clone)]
pub struct MockProducer {
    delay: Duration,
}

impl MockProducer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn verdict<R: Rng + ?Sized>(rng: &mut R) -> VerdictResult {
        let confidence = draw_confidence(rng);
        VerdictResult::new(label_for(confidence).as_ref(), confidence, MOCK_ALGORITHM)
    }
}

impl VerdictProducer for MockProducer {
    async fn produce(&self, _image: DecodedImage) -> Result<VerdictResult, PipelineError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Self::verdict(&mut rand::rng()))
    }
}
