pub mod config;
pub mod error;
pub mod pipeline;
pub mod upload;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

use serde::{Deserialize, Serialize};

pub use error::PipelineError;
pub use pipeline::VerdictProducer;
pub use upload::{DecodedImage, UploadPolicy, UploadedImage};

/// Response body of every `/predict` endpoint. The gateway and the inference
/// service must emit exactly these field names.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VerdictResult {
    #[serde(rename = "veredicto")]
    pub verdict: String,
    #[serde(rename = "confianza")]
    pub confidence: f64,
    #[serde(rename = "algoritmo")]
    pub algorithm: String,
}

impl VerdictResult {
    /// Confidence is clamped to `[0, 1]`.
    pub fn new(verdict: impl Into<String>, confidence: f64, algorithm: impl Into<String>) -> Self {
        Self {
            verdict: verdict.into(),
            confidence: confidence.clamp(0.0, 1.0),
            algorithm: algorithm.into(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.confidence) && !self.verdict.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ServiceStatus {
    pub estado: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorDetail {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_serializes_with_wire_names() {
        let verdict = VerdictResult::new("Fake", 0.87, "test");
        let value = serde_json::to_value(&verdict).unwrap();
        let fields = value.as_object().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(value["veredicto"], json!("Fake"));
        assert_eq!(value["algoritmo"], json!("test"));
        assert!((value["confianza"].as_f64().unwrap() - 0.87).abs() < 1e-6);
    }

    #[test]
    fn confidence_keeps_double_precision() {
        let body = r#"{"veredicto":"Fake","confianza":0.9731234567891234,"algoritmo":"x"}"#;
        let verdict: VerdictResult = serde_json::from_str(body).unwrap();
        assert_eq!(verdict.confidence, 0.9731234567891234);
        let again: VerdictResult = serde_json::from_str(&serde_json::to_string(&verdict).unwrap()).unwrap();
        assert_eq!(again.confidence.to_bits(), verdict.confidence.to_bits());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(VerdictResult::new("Real", 1.7, "x").confidence, 1.0);
        assert_eq!(VerdictResult::new("Real", -0.2, "x").confidence, 0.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let body = r#"{"veredicto":"Fake","confianza":0.9,"algoritmo":"x","extra":1}"#;
        assert!(serde_json::from_str::<VerdictResult>(body).is_err());
    }

    #[test]
    fn out_of_range_confidence_is_not_well_formed() {
        let verdict: VerdictResult =
            serde_json::from_str(r#"{"veredicto":"Fake","confianza":1.5,"algoritmo":"x"}"#)
                .unwrap();
        assert!(!verdict.is_well_formed());
    }
}
