use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Public origin used to build OAuth redirect URLs, e.g. https://durus.example.com
    #[serde(default = "default_public_origin")]
    pub public_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            public_origin: default_public_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_public_origin() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Bootstrap admin account, created at startup if missing.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
    #[serde(default)]
    pub admin_password: String,
    /// Static API token accepted as a synthetic admin (CI, scripts).
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email: default_admin_email(),
            admin_password: String::new(),
            admin_token: default_admin_token(),
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_admin_email() -> String {
    "admin@durus.local".to_string()
}

fn default_admin_token() -> String {
    // Generate a random token if not provided
    uuid::Uuid::new_v4().to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub google: Option<OAuthProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProviderConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// OAuth redirect URI (callback URL); derived from public_origin when unset
    pub redirect_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// S3-compatible endpoint, e.g. https://minio.internal:9000
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_video_bucket")]
    pub video_bucket: String,
    #[serde(default = "default_thumbnail_bucket")]
    pub thumbnail_bucket: String,
    /// Base used to build public object URLs. Supports {bucket} and {key}
    /// placeholders; defaults to "<endpoint>/<bucket>/<key>".
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_video_bucket() -> String {
    "lesson-videos".to_string()
}

fn default_thumbnail_bucket() -> String {
    "course-thumbnails".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Mobile-money number learners are instructed to send payment to.
    #[serde(default = "default_receiver_number")]
    pub receiver_number: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            receiver_number: default_receiver_number(),
        }
    }
}

fn default_receiver_number() -> String {
    "+252 61 7211084".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            oauth: OAuthConfig::default(),
            storage: None,
            payment: PaymentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.session_ttl_days, 7);
        assert!(config.storage.is_none());
        assert!(config.oauth.google.is_none());
        assert!(!config.payment.receiver_number.is_empty());
    }

    #[test]
    fn parses_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9090

            [storage]
            endpoint = "http://localhost:9000"
            access_key = "minio"
            secret_key = "minio123"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        let storage = config.storage.unwrap();
        assert_eq!(storage.video_bucket, "lesson-videos");
        assert_eq!(storage.thumbnail_bucket, "course-thumbnails");
        assert_eq!(storage.region, "auto");
    }
}
