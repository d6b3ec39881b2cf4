use std::env;
use std::str::FromStr;

use actix_cors::Cors;
use log::info;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::upload::{DEFAULT_MAX_UPLOAD_BYTES, UploadPolicy};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Listener settings common to both services.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Falls back to the service's own default port when unset.
    pub port: Option<u16>,
    pub max_upload_bytes: usize,
    /// `None` allows any origin, which is only meant for development.
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_origin: None,
        }
    }
}

impl ServerConfig {
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_string("HOST") {
            self.host = host;
        }
        if let Some(port) = env_parse("PORT")? {
            self.port = Some(port);
        }
        if let Some(max) = env_parse("MAX_UPLOAD_BYTES")? {
            self.max_upload_bytes = max;
        }
        if let Some(origin) = env_string("ALLOWED_ORIGIN") {
            self.allowed_origin = Some(origin);
        }
        Ok(())
    }

    pub fn bind_address(&self, default_port: u16) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(default_port))
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.max_upload_bytes,
        }
    }

    pub fn cors(&self) -> Cors {
        let cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allow_any_header()
            .max_age(3600);
        match &self.allowed_origin {
            Some(origin) => cors.allowed_origin(origin),
            None => cors.allow_any_origin(),
        }
    }
}

/// Reads the YAML file named by `path_var`, or returns defaults when the
/// variable is unset.
pub fn load_yaml<T: DeserializeOwned + Default>(path_var: &str) -> Result<T, ConfigError> {
    match env_string(path_var) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            from_yaml_str(&raw)
        }
        None => Ok(T::default()),
    }
}

pub fn from_yaml_str<T: DeserializeOwned + Default>(raw: &str) -> Result<T, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}

pub fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env_string(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::header;
    use actix_web::{App, HttpResponse, test, web};

    use super::*;

    macro_rules! cors_app {
        ($cfg:expr) => {
            test::init_service(
                App::new()
                    .wrap($cfg.cors())
                    .route("/", web::get().to(HttpResponse::Ok)),
            )
            .await
        };
    }

    fn from_origin(origin: &str) -> actix_http::Request {
        test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, origin))
            .to_request()
    }

    #[::core::prelude::v1::test]
    fn partial_yaml_keeps_defaults() {
        let cfg: ServerConfig = from_yaml_str("port: 9000\n").unwrap();
        assert_eq!(cfg.port, Some(9000));
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(cfg.bind_address(1), "0.0.0.0:9000");
    }

    #[::core::prelude::v1::test]
    fn empty_yaml_is_default() {
        let cfg: ServerConfig = from_yaml_str("  \n").unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.bind_address(8081), "0.0.0.0:8081");
    }

    #[::core::prelude::v1::test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            from_yaml_str::<ServerConfig>("port: [not, a, port]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[::core::prelude::v1::test]
    fn upload_policy_mirrors_limit() {
        let cfg = ServerConfig {
            max_upload_bytes: 42,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.upload_policy().max_bytes, 42);
    }

    #[actix_web::test]
    async fn default_cors_allows_any_origin() {
        let app = cors_app!(ServerConfig::default());
        let resp = test::call_service(&app, from_origin("http://x.test")).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://x.test"
        );
    }

    #[actix_web::test]
    async fn restricted_cors_only_answers_its_origin() {
        let cfg = ServerConfig {
            allowed_origin: Some("https://detector.example".into()),
            ..ServerConfig::default()
        };
        let app = cors_app!(cfg);

        let resp = test::call_service(&app, from_origin("https://detector.example")).await;
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://detector.example"
        );

        let resp = test::call_service(&app, from_origin("http://x.test")).await;
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
