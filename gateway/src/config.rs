use std::time::Duration;

use serde::Deserialize;
use shared::config::{ConfigError, ServerConfig, env_parse, env_string, load_yaml};
use strum::{Display, EnumString};

pub const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProducerMode {
    /// Randomized verdicts, no inference node required.
    Mock,
    /// Forward every upload to the inference service.
    Bridge,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub inference_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Extra attempts after a timeout or connection failure.
    pub retries: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            inference_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 5,
            retries: 1,
        }
    }
}

impl BridgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub producer: ProducerMode,
    pub mock: MockConfig,
    pub bridge: BridgeConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            producer: ProducerMode::Mock,
            mock: MockConfig::default(),
            bridge: BridgeConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// YAML from `GATEWAY_CONFIG` (optional), then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config: GatewayConfig = load_yaml("GATEWAY_CONFIG")?;
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.server.apply_env()?;
        if let Some(mode) = env_parse("GATEWAY_PRODUCER")? {
            self.producer = mode;
        }
        if let Some(url) = env_string("INFERENCE_URL") {
            self.bridge.inference_url = url;
        }
        if let Some(secs) = env_parse("BRIDGE_TIMEOUT_SECS")? {
            self.bridge.timeout_secs = secs;
        }
        if let Some(retries) = env_parse("BRIDGE_RETRIES")? {
            self.bridge.retries = retries;
        }
        if let Some(delay) = env_parse("MOCK_DELAY_MS")? {
            self.mock.delay_ms = delay;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use shared::config::from_yaml_str;

    #[test]
    fn defaults_to_mock_on_8081() {
        let config = GatewayConfig::default();
        assert_eq!(config.producer, ProducerMode::Mock);
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
        assert_eq!(config.mock.delay_ms, 1000);
        assert_eq!(config.bridge.inference_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn yaml_selects_bridge() {
        let raw = "
producer: bridge
bridge:
  inference_url: http://gpu-node:8000
  timeout_secs: 5
server:
  port: 9090
  allowed_origin: https://detector.example
";
        let config: GatewayConfig = from_yaml_str(raw).unwrap();
        assert_eq!(config.producer, ProducerMode::Bridge);
        assert_eq!(config.bridge.inference_url, "http://gpu-node:8000");
        assert_eq!(config.bridge.timeout(), Duration::from_secs(5));
        assert_eq!(config.bridge.retries, 1);
        assert_eq!(config.bind_address(), "0.0.0.0:9090");
        assert_eq!(
            config.server.allowed_origin.as_deref(),
            Some("https://detector.example")
        );
    }

    #[test]
    fn producer_mode_parses_from_env_strings() {
        assert_eq!(ProducerMode::from_str("mock").unwrap(), ProducerMode::Mock);
        assert_eq!(ProducerMode::from_str("bridge").unwrap(), ProducerMode::Bridge);
        assert!(ProducerMode::from_str("gpu").is_err());
        assert_eq!(ProducerMode::Bridge.to_string(), "bridge");
    }
}
