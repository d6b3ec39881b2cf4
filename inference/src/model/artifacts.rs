//! On-disk layout of an exported image classifier:
//!
//! ```text
//! <model_dir>/
//!   config.json               id2label table
//!   preprocessor_config.json  resize / rescale / normalize settings
//!   model.onnx                classifier graph
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const MODEL_CONFIG_FILE: &str = "config.json";
pub const PROCESSOR_CONFIG_FILE: &str = "preprocessor_config.json";
pub const ONNX_FILE: &str = "model.onnx";

/// Upper bound on class ids accepted from `id2label`.
pub const MAX_CLASSES: usize = 100_000;

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model artifact not found: {0}")]
    MissingArtifact(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
    #[error("Failed to load ONNX graph: {0}")]
    Onnx(String),
}

#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub dir: PathBuf,
    pub model_config: PathBuf,
    pub processor_config: PathBuf,
    pub onnx: PathBuf,
}

impl ModelArtifacts {
    /// Fails on the first missing file so a half-exported directory is
    /// never served.
    pub fn locate(dir: &Path) -> Result<Self, ModelLoadError> {
        let artifacts = Self {
            dir: dir.to_path_buf(),
            model_config: dir.join(MODEL_CONFIG_FILE),
            processor_config: dir.join(PROCESSOR_CONFIG_FILE),
            onnx: dir.join(ONNX_FILE),
        };
        for path in [
            &artifacts.model_config,
            &artifacts.processor_config,
            &artifacts.onnx,
        ] {
            if !path.is_file() {
                return Err(ModelLoadError::MissingArtifact(path.clone()));
            }
        }
        Ok(artifacts)
    }

    pub fn labels(&self) -> Result<Vec<String>, ModelLoadError> {
        let config: ModelConfig = read_json(&self.model_config)?;
        config.labels().map_err(|reason| ModelLoadError::Invalid {
            path: self.model_config.clone(),
            reason,
        })
    }

    pub fn processor(&self) -> Result<ProcessorConfig, ModelLoadError> {
        let config: ProcessorConfig = read_json(&self.processor_config)?;
        config.validate().map_err(|reason| ModelLoadError::Invalid {
            path: self.processor_config.clone(),
            reason,
        })?;
        Ok(config)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ModelLoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub id2label: HashMap<String, String>,
}

impl ModelConfig {
    /// Dense label table indexed by class id. Gaps get the `LABEL_<i>` name.
    pub fn labels(&self) -> Result<Vec<String>, String> {
        let mut indexed = Vec::with_capacity(self.id2label.len());
        for (key, label) in &self.id2label {
            let idx: usize = key
                .parse()
                .map_err(|_| format!("id2label key {:?} is not a class index", key))?;
            if idx >= MAX_CLASSES {
                return Err(format!(
                    "id2label key {} exceeds the {} class limit",
                    idx, MAX_CLASSES
                ));
            }
            indexed.push((idx, label.clone()));
        }
        let len = indexed.iter().map(|(idx, _)| idx + 1).max().unwrap_or(0);
        let mut labels: Vec<String> = (0..len).map(default_label).collect();
        for (idx, label) in indexed {
            labels[idx] = label;
        }
        Ok(labels)
    }
}

pub fn default_label(idx: usize) -> String {
    format!("LABEL_{}", idx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SizeConfig {
    Exact { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
    Square(u32),
}

/// Image processor settings as exported alongside the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub do_resize: bool,
    pub size: SizeConfig,
    /// PIL resampling filter id.
    pub resample: u8,
    pub do_center_crop: bool,
    pub crop_size: Option<SizeConfig>,
    pub do_rescale: bool,
    pub rescale_factor: f32,
    pub do_normalize: bool,
    pub image_mean: Vec<f32>,
    pub image_std: Vec<f32>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: SizeConfig::Exact {
                height: 224,
                width: 224,
            },
            resample: 2,
            do_center_crop: false,
            crop_size: None,
            do_rescale: true,
            rescale_factor: 1.0 / 255.0,
            do_normalize: true,
            image_mean: vec![0.5, 0.5, 0.5],
            image_std: vec![0.5, 0.5, 0.5],
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.image_mean.len() != 3 || self.image_std.len() != 3 {
            return Err("image_mean and image_std need one value per RGB channel".into());
        }
        if self.image_std.iter().any(|s| *s == 0.0) {
            return Err("image_std must not contain zeros".into());
        }
        let sizes = std::iter::once(self.size).chain(self.crop_size);
        for size in sizes {
            let zero = match size {
                SizeConfig::Exact { height, width } => height == 0 || width == 0,
                SizeConfig::ShortestEdge { shortest_edge } => shortest_edge == 0,
                SizeConfig::Square(edge) => edge == 0,
            };
            if zero {
                return Err("image sizes must be non-zero".into());
            }
        }
        Ok(())
    }
}
