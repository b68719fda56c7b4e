//! Import configuration
//!
//! Loaded once from YAML, with store credentials overridable from the
//! environment, then handed to the pipeline as a plain value.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Graph store connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// HTTP base URI of the store
    pub uri: String,
    /// Database name
    pub database: String,
    pub user: String,
    pub password: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            timeout_secs: 60,
        }
    }
}

/// A source document: where it is published and the file name it is cached under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub source_url: String,
    pub local_filename: String,
}

impl DataSource {
    pub fn new(source_url: impl Into<String>, local_filename: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            local_filename: local_filename.into(),
        }
    }

    /// File name without extension
    pub fn stem(&self) -> String {
        Path::new(&self.local_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.local_filename.clone())
    }
}

/// The three published workbooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSources {
    pub nist_csf: DataSource,
    pub nice_cwf: DataSource,
    pub nice_competencies: DataSource,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            nist_csf: DataSource::new(
                "https://www.nist.gov/file/448306",
                "nist_cybersecurity_framework.xlsx",
            ),
            nice_cwf: DataSource::new(
                "https://www.nist.gov/document/supplementnice-specialty-areas-and-work-role-ksas-and-tasksxlsx",
                "nice_cwf.xlsx",
            ),
            nice_competencies: DataSource::new(
                "https://www.nist.gov/document/nice-framework-competencies-ksas-mapped-competency",
                "nice_competencies.xlsx",
            ),
        }
    }
}

impl DataSources {
    pub fn iter(&self) -> impl Iterator<Item = &DataSource> {
        [&self.nist_csf, &self.nice_cwf, &self.nice_competencies].into_iter()
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub store: StoreConfig,
    /// Records per store round-trip
    pub batch_size: usize,
    /// Where source documents are cached; a temporary directory when unset
    pub cache_dir: Option<PathBuf>,
    pub data_sources: DataSources,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            batch_size: 1000,
            cache_dir: None,
            data_sources: DataSources::default(),
        }
    }
}

impl ImportConfig {
    /// Read a YAML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {:?}", path);
        let mut config = Self::from_yaml_str(&text)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Override store settings from the environment, as returned by `lookup`.
    ///
    /// `NEO4J_URI`, `NEO4J_DATABASE`, `NEO4J_USER` and `NEO4J_PASS` replace
    /// their setting. `NEO4J_HOST`, `NEO4J_HTTP_PORT` and `NEO4J_SECURE`
    /// (`true`/`1` for https) then edit the corresponding part of the URI.
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| {
            let value = lookup(name).filter(|v| !v.is_empty());
            if value.is_some() {
                debug!("Config override from {}", name);
            }
            value
        };

        let targets: [(&str, &mut String); 4] = [
            ("NEO4J_URI", &mut self.store.uri),
            ("NEO4J_DATABASE", &mut self.store.database),
            ("NEO4J_USER", &mut self.store.user),
            ("NEO4J_PASS", &mut self.store.password),
        ];
        for (name, target) in targets {
            if let Some(value) = lookup(name) {
                *target = value;
            }
        }

        let host = lookup("NEO4J_HOST");
        let port = lookup("NEO4J_HTTP_PORT");
        let secure = lookup("NEO4J_SECURE");
        if host.is_none() && port.is_none() && secure.is_none() {
            return Ok(());
        }

        let invalid = |field: &'static str, reason: String| ConfigError::Invalid { field, reason };
        let mut uri = Url::parse(&self.store.uri)
            .map_err(|e| invalid("store.uri", format!("'{}': {}", self.store.uri, e)))?;
        if let Some(secure) = secure {
            let scheme = match secure.to_ascii_lowercase().as_str() {
                "true" | "1" => "https",
                _ => "http",
            };
            uri.set_scheme(scheme).map_err(|()| {
                invalid("NEO4J_SECURE", format!("cannot switch {} to {}", uri, scheme))
            })?;
        }
        if let Some(host) = host {
            uri.set_host(Some(host.as_str()))
                .map_err(|e| invalid("NEO4J_HOST", format!("'{}': {}", host, e)))?;
        }
        if let Some(port) = port {
            let number: u16 = port
                .parse()
                .map_err(|_| invalid("NEO4J_HTTP_PORT", format!("'{}' is not a port", port)))?;
            uri.set_port(Some(number)).map_err(|()| {
                invalid("NEO4J_HTTP_PORT", format!("cannot set a port on {}", uri))
            })?;
        }
        self.store.uri = uri.as_str().trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.store.uri.starts_with("http://") && !self.store.uri.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "store.uri",
                reason: format!("expected an http(s) URI, got '{}'", self.store.uri),
            });
        }
        Ok(())
    }
}
