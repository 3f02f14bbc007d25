//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Handles all application settings from environment variables and files

use config::{Config as ConfigBuilder, Environment, File};
use fg_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Bucket that receives evidence uploads unless overridden
pub const DEFAULT_EVIDENCE_BUCKET: &str = "fair-go-justice-evidence";

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub database: DatabaseConfig,
    #[validate(nested)]
    pub security: SecurityConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub uploads: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
    #[validate(range(min = 1, max = 65535))]
    pub obs_port: u16,
    /// Maximum JSON body size in bytes
    #[validate(range(min = 1024, max = 10485760))]
    pub json_limit: usize,
    /// "production" switches log output to JSON
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            obs_port: 9000,
            json_limit: 65536,
            environment: "development".to_string(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub path: String,
    #[validate(range(min = 1, max = 100))]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "fairgo.db".to_string(),
            pool_size: 10,
        }
    }
}

/// Security configuration with secret redaction
#[derive(Clone, Deserialize, Serialize, Validate)]
pub struct SecurityConfig {
    #[validate(length(min = 32))]
    pub jwt_secret: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: insecure_placeholder_secret(),
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

fn insecure_placeholder_secret() -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("INSECURE-RANDOM-{}-CHANGE-IN-PRODUCTION", timestamp)
}

/// Evidence storage configuration
#[derive(Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct StorageConfig {
    /// One of `gcs`, `local`, `memory`
    #[validate(custom(function = "validate_backend"))]
    pub backend: String,
    #[validate(length(min = 3, max = 222))]
    pub bucket: String,
    /// Service account key file; falls back to GOOGLE_APPLICATION_CREDENTIALS when unset
    pub service_account_path: Option<String>,
    /// Root directory for the `local` backend
    pub local_dir: String,
    #[validate(url)]
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "gcs".to_string(),
            bucket: DEFAULT_EVIDENCE_BUCKET.to_string(),
            service_account_path: None,
            local_dir: "./data/evidence".to_string(),
            public_base_url: "https://storage.googleapis.com".to_string(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("bucket", &self.bucket)
            .field(
                "service_account_path",
                &self.service_account_path.as_ref().map(|_| "[REDACTED]"),
            )
            .field("local_dir", &self.local_dir)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

fn validate_backend(backend: &str) -> std::result::Result<(), ValidationError> {
    match backend {
        "gcs" | "local" | "memory" => Ok(()),
        _ => Err(ValidationError::new("unknown_storage_backend")),
    }
}

/// Upload limits for story submissions
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct UploadConfig {
    #[validate(range(min = 1024, max = 104857600))] // 1KB to 100MB
    pub max_file_bytes: usize,
    #[validate(range(min = 1024, max = 1048576))]
    pub max_field_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_field_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and optional .env file
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        builder = builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.obs_port", 9000)?
            .set_default("server.json_limit", 65536)?
            .set_default("server.environment", "development")?
            .set_default("database.path", "fairgo.db")?
            .set_default("database.pool_size", 10)?
            .set_default("storage.backend", "gcs")?
            .set_default("storage.bucket", DEFAULT_EVIDENCE_BUCKET)?
            .set_default("storage.local_dir", "./data/evidence")?
            .set_default("storage.public_base_url", "https://storage.googleapis.com")?
            .set_default("uploads.max_file_bytes", 10 * 1024 * 1024)?
            .set_default("uploads.max_field_bytes", 1024 * 1024)?;

        // Keys containing underscores don't survive the "_" separator, so map them explicitly
        if let Ok(jwt_secret) = std::env::var("FAIRGO_SECURITY_JWT_SECRET") {
            builder = builder.set_override("security.jwt_secret", jwt_secret)?;
        } else {
            builder = builder.set_default("security.jwt_secret", insecure_placeholder_secret())?;
        }

        let explicit_keys = [
            ("FAIRGO_DATABASE_POOL_SIZE", "database.pool_size"),
            ("FAIRGO_SERVER_OBS_PORT", "server.obs_port"),
            ("FAIRGO_SERVER_JSON_LIMIT", "server.json_limit"),
            (
                "FAIRGO_STORAGE_SERVICE_ACCOUNT_PATH",
                "storage.service_account_path",
            ),
            ("FAIRGO_STORAGE_LOCAL_DIR", "storage.local_dir"),
            ("FAIRGO_STORAGE_PUBLIC_BASE_URL", "storage.public_base_url"),
            ("FAIRGO_UPLOADS_MAX_FILE_BYTES", "uploads.max_file_bytes"),
            ("FAIRGO_UPLOADS_MAX_FIELD_BYTES", "uploads.max_field_bytes"),
        ];
        for (var, key) in explicit_keys {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        if std::path::Path::new(".env").exists() {
            builder = builder.add_source(File::with_name(".env").required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("FAIRGO")
                .try_parsing(true)
                .separator("_"),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed
            .validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Tests below mutate process-wide environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "FAIRGO_SERVER_HOST",
        "FAIRGO_SERVER_PORT",
        "FAIRGO_DATABASE_PATH",
        "FAIRGO_DATABASE_POOL_SIZE",
        "FAIRGO_SECURITY_JWT_SECRET",
        "FAIRGO_STORAGE_BACKEND",
        "FAIRGO_STORAGE_BUCKET",
        "FAIRGO_STORAGE_SERVICE_ACCOUNT_PATH",
        "FAIRGO_UPLOADS_MAX_FILE_BYTES",
    ];

    fn clear_env() {
        for key in VARS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_config_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = Config::load().expect("Should load with defaults");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "fairgo.db");
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.storage.backend, "gcs");
        assert_eq!(config.storage.bucket, DEFAULT_EVIDENCE_BUCKET);
        assert!(config.storage.service_account_path.is_none());
        assert_eq!(config.uploads.max_file_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_config_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("FAIRGO_SERVER_HOST", "0.0.0.0");
        env::set_var("FAIRGO_SERVER_PORT", "9100");
        env::set_var("FAIRGO_SECURITY_JWT_SECRET", "valid32characterjwtsecretfortest");
        env::set_var("FAIRGO_STORAGE_BACKEND", "local");
        env::set_var("FAIRGO_STORAGE_SERVICE_ACCOUNT_PATH", "/etc/keys/sa.json");

        let config = Config::load().expect("Should load from env");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.storage.backend, "local");
        assert_eq!(
            config.storage.service_account_path.as_deref(),
            Some("/etc/keys/sa.json")
        );

        clear_env();
    }

    #[test]
    fn test_config_validation_failure() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("FAIRGO_DATABASE_POOL_SIZE", "200");
        assert!(Config::load().is_err());

        clear_env();
    }

    #[test]
    fn test_unknown_storage_backend_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("FAIRGO_STORAGE_BACKEND", "ftp");
        assert!(Config::load().is_err());

        clear_env();
    }

    #[test]
    fn test_secret_redaction() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("FAIRGO_STORAGE_SERVICE_ACCOUNT_PATH", "/secret/key.json");

        let config = Config::load().expect("Should load with defaults");
        let debug_output = format!("{:?}", config);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("INSECURE-RANDOM"));
        assert!(!debug_output.contains("/secret/key.json"));

        clear_env();
    }

    #[test]
    fn test_jwt_secret_too_short() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("FAIRGO_SECURITY_JWT_SECRET", "short");
        assert!(Config::load().is_err());

        clear_env();
    }
}
