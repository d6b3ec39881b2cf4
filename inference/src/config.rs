use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use shared::config::{ConfigError, ServerConfig, env_parse, env_string, load_yaml};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ALGORITHM: &str = "ViT Deepfake Detection (V-Forensics)";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub server: ServerConfig,
    pub model_dir: PathBuf,
    /// Reported as `algoritmo` in every verdict.
    pub algorithm: String,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model_dir: PathBuf::from("./modelo_entrenado"),
            algorithm: DEFAULT_ALGORITHM.to_string(),
            timeout_secs: 30,
        }
    }
}

impl InferenceConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config: InferenceConfig = load_yaml("INFERENCE_CONFIG")?;
        config.server.apply_env()?;
        if let Some(dir) = env_string("MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Some(algorithm) = env_string("MODEL_ALGORITHM") {
            config.algorithm = algorithm;
        }
        if let Some(secs) = env_parse("INFERENCE_TIMEOUT_SECS")? {
            config.timeout_secs = secs;
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        self.server.bind_address(DEFAULT_PORT)
    }
}
