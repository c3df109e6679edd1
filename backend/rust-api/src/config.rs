use serde::Deserialize;
use std::env;
use std::str::FromStr;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where documents are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = config::ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(config::ConfigError::Message(format!(
                "unknown storage backend {:?}, expected mongo or memory",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    /// Basic auth credentials for /metrics, as `username:password`
    pub metrics_auth: String,
    pub storage_backend: StorageBackend,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "examdesk".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            metrics_auth: "admin:changeme".to_string(),
            storage_backend: StorageBackend::Mongo,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or(defaults.mongo_uri);

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or(defaults.mongo_database);

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .or_else(|_| env::var("PORT").map(|port| format!("0.0.0.0:{}", port)))
            .unwrap_or(defaults.bind_addr);

        let max_upload_bytes = match settings
            .get_string("server.max_upload_bytes")
            .or_else(|_| env::var("MAX_UPLOAD_BYTES"))
        {
            Ok(raw) => raw.trim().parse::<usize>().map_err(|_| {
                config::ConfigError::Message(format!("invalid max_upload_bytes {:?}", raw))
            })?,
            Err(_) => defaults.max_upload_bytes,
        };

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    tracing::warn!("METRICS_AUTH not set, using default credentials");
                }
                defaults.metrics_auth
            });

        let storage_backend = match settings
            .get_string("storage.backend")
            .or_else(|_| env::var("STORAGE_BACKEND"))
        {
            Ok(raw) => raw.parse::<StorageBackend>()?,
            Err(_) => defaults.storage_backend,
        };

        Ok(Config {
            mongo_uri,
            mongo_database,
            bind_addr,
            max_upload_bytes,
            metrics_auth,
            storage_backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_known_names() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(" MongoDB ".parse::<StorageBackend>().unwrap(), StorageBackend::Mongo);
        assert!("redis".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn defaults_limit_uploads_to_ten_megabytes() {
        let config = Config::default();
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.mongo_database, "examdesk");
    }
}
