use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_LICENSE: &str = "Free to use under SolarPunk License (CC0).";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Base URL that object keys are appended to (e.g., "https://cdn.example.com").
    /// If not set, objects are served by this process under `/media`.
    pub public_base_url: Option<String>,
    /// License text attached to every photo detail.
    pub license: String,
    /// Origins allowed by CORS. Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("solarhub.db")
    }

    #[must_use]
    pub fn objects_dir(&self) -> PathBuf {
        self.data_dir.join("objects")
    }

    /// Prefix for every media URL handed out by the API.
    #[must_use]
    pub fn media_base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}/media", self.host, self.port),
        }
    }

    /// Layers explicit overrides over an optional file over the defaults.
    #[must_use]
    pub fn resolve(overrides: ConfigOverrides, file: FileConfig) -> Self {
        let defaults = Self::default();
        let cors_origins = if overrides.cors_origins.is_empty() {
            file.cors_origins.unwrap_or(defaults.cors_origins)
        } else {
            overrides.cors_origins
        };

        Self {
            host: overrides.host.or(file.host).unwrap_or(defaults.host),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            data_dir: overrides
                .data_dir
                .or(file.data_dir)
                .unwrap_or(defaults.data_dir),
            public_base_url: overrides
                .public_base_url
                .or(file.public_base_url)
                .filter(|url| !url.trim().is_empty()),
            license: overrides.license.or(file.license).unwrap_or(defaults.license),
            cors_origins,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            data_dir: PathBuf::from("./data"),
            public_base_url: None,
            license: DEFAULT_LICENSE.to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Values given on the command line or through `SOLARHUB_*` variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub license: Option<String>,
    pub cors_origins: Vec<String>,
}

/// The optional TOML config file. Every key may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub license: Option<String>,
    pub cors_origins: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
