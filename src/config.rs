use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, ContextCompat, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REGION: &str = "ap-northeast-1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public origin of the web client, allowed by CORS in release builds
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Custom endpoint for S3-compatible stores such as MinIO
    pub endpoint: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
}

impl StorageConfig {
    /// The configured bucket, treating an empty name as unset.
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket.as_deref().filter(|bucket| !bucket.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted request body for the upload endpoint
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
}

fn default_database() -> String {
    "~/.local/share/model-gallery/gallery.db".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_max_body_mb() -> usize {
    25
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            base_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            force_path_style: false,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_body_mb: default_max_body_mb(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("model-gallery").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write a default config file, unless one already exists
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().context("No config directory available")?;
        if path.exists() {
            log::info!("Config already exists at {}", path.display());
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }

        let contents = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        std::fs::write(&path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Values given on the command line or through the environment win over the file
    pub fn apply_overrides(&mut self, overrides: StorageOverrides) {
        if let Some(bucket) = overrides.bucket {
            self.storage.bucket = Some(bucket);
        }
        if let Some(region) = overrides.region {
            self.storage.region = region;
        }
        if let Some(access_key_id) = overrides.access_key_id {
            self.storage.access_key_id = Some(access_key_id);
        }
        if let Some(secret_access_key) = overrides.secret_access_key {
            self.storage.secret_access_key = Some(secret_access_key);
        }
        if let Some(base_url) = overrides.base_url {
            self.server.base_url = Some(base_url);
        }
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    /// Get expanded database path
    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }
}

#[derive(Debug, Default)]
pub struct StorageOverrides {
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub base_url: Option<String>,
}
