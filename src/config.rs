use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub paging: PagingConfig,

    pub images: ImagesConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Database URL, e.g. `sqlite:data/tvcatalog.db` or `sqlite::memory:`
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (0 = number of CPU cores)
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/tvcatalog.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Required; usually supplied through `JWT_SECRET`.
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    pub token_lifetime_seconds: u64,

    /// Argon2 memory cost in KiB
    pub argon2_memory_cost_kib: u32,

    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_lifetime_seconds: 60 * 60,
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub default_limit: u64,

    pub max_limit: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// `cloudinary://<api_key>:<api_secret>@<cloud_name>`
    #[serde(skip_serializing)]
    pub cloudinary_url: Option<String>,

    /// Maximum number of remote assets remembered by the upload cache
    pub cache_capacity: usize,

    /// Seconds before the remote listing is fetched again
    pub cache_ttl_seconds: u64,

    pub request_timeout_seconds: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            cloudinary_url: None,
            cache_capacity: 500,
            cache_ttl_seconds: 60 * 60,
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            paging: PagingConfig::default(),
            images: ImagesConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Credentials parsed from a `cloudinary://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryCredentials {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = url::Url::parse(raw).context("Invalid CLOUDINARY_URL")?;

        if url.scheme() != "cloudinary" {
            anyhow::bail!("CLOUDINARY_URL must use the cloudinary:// scheme");
        }

        let cloud_name = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| anyhow::anyhow!("CLOUDINARY_URL is missing the cloud name"))?;

        let api_secret = url
            .password()
            .ok_or_else(|| anyhow::anyhow!("CLOUDINARY_URL is missing the API secret"))?;

        if url.username().is_empty() {
            anyhow::bail!("CLOUDINARY_URL is missing the API key");
        }

        Ok(Self {
            cloud_name: cloud_name.to_string(),
            api_key: url.username().to_string(),
            api_secret: api_secret.to_string(),
        })
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over the config file.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.general.database_path = url;
        }

        if let Some(secret) = var("JWT_SECRET").filter(|v| !v.is_empty()) {
            self.auth.jwt_secret = secret;
        }

        if let Some(url) = var("CLOUDINARY_URL").filter(|v| !v.is_empty()) {
            self.images.cloudinary_url = Some(url);
        }

        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(level) = var("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.general.log_level = level;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("tvcatalog").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tvcatalog").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.general.database_path.trim().is_empty() {
            missing.push("DATABASE_URL");
        }

        if self.auth.jwt_secret.trim().is_empty() {
            missing.push("JWT_SECRET");
        }

        if !missing.is_empty() {
            anyhow::bail!("Missing required configuration: {}", missing.join(", "));
        }

        if self.paging.default_limit == 0 || self.paging.max_limit < self.paging.default_limit {
            anyhow::bail!("paging.default_limit must be > 0 and <= paging.max_limit");
        }

        if let Some(url) = &self.images.cloudinary_url {
            CloudinaryCredentials::parse(url)?;
        }

        Ok(())
    }

    pub fn cloudinary(&self) -> Result<Option<CloudinaryCredentials>> {
        self.images
            .cloudinary_url
            .as_deref()
            .map(CloudinaryCredentials::parse)
            .transpose()
    }
}
