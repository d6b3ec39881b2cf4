pub mod bridge;
pub mod mock;

use std::time::Duration;

use shared::{DecodedImage, PipelineError, VerdictProducer, VerdictResult};

use crate::config::{GatewayConfig, ProducerMode};
use bridge::BridgeProducer;
use mock::MockProducer;

/// The producer a gateway process was configured with.
#[derive(Clone)]
pub enum GatewayProducer {
    Mock(MockProducer),
    Bridge(BridgeProducer),
}

impl GatewayProducer {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        Ok(match config.producer {
            ProducerMode::Mock => {
                GatewayProducer::Mock(MockProducer::new(Duration::from_millis(config.mock.delay_ms)))
            }
            ProducerMode::Bridge => GatewayProducer::Bridge(BridgeProducer::new(&config.bridge)?),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            GatewayProducer::Mock(_) => "mock verdicts".to_string(),
            GatewayProducer::Bridge(bridge) => format!("inference bridge -> {}", bridge.predict_url()),
        }
    }
}

impl VerdictProducer for GatewayProducer {
    async fn produce(&self, image: DecodedImage) -> Result<VerdictResult, PipelineError> {
        match self {
            GatewayProducer::Mock(mock) => mock.produce(image).await,
            GatewayProducer::Bridge(bridge) => bridge.produce(image).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_selects_variant() {
        let mut config = GatewayConfig::default();
        assert!(matches!(
            GatewayProducer::from_config(&config).unwrap(),
            GatewayProducer::Mock(_)
        ));

        config.producer = ProducerMode::Bridge;
        config.bridge.inference_url = "http://gpu-node:8000/".into();
        let producer = GatewayProducer::from_config(&config).unwrap();
        assert_eq!(producer.describe(), "inference bridge -> http://gpu-node:8000/predict");
    }
}
