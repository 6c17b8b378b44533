//! Configuration management for bq-report.
//!
//! Handles loading configuration from a TOML file, layering CLI/environment
//! overrides on top, and producing the per-request settings snapshot the
//! report engine runs with.

use crate::error::{ReportError, Result};
use crate::report::PageLimits;
use crate::warehouse::{ConnectionSettings, Credentials};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the report SQL when none is configured.
pub const QUERY_ENV_VAR: &str = "DASH_QUERY";

/// Longest request deadline accepted from config or flags, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Main configuration structure for bq-report.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Warehouse connection settings.
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Report query and paging settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Warehouse connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WarehouseConfig {
    /// Project id jobs run in.
    pub project: Option<String>,

    /// Data location (US, EU, asia-south1, ...).
    pub location: Option<String>,

    /// Service account key JSON (not recommended to store in config).
    pub credentials_json: Option<String>,

    /// Path to a service account key file.
    pub credentials_file: Option<PathBuf>,
}

/// Report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Fixed report SQL. When unset, `DASH_QUERY` is read on every request.
    pub query: Option<String>,

    /// Rows per page during full materialization.
    pub page_size: Option<i64>,

    /// Maximum pages during full materialization.
    pub max_pages: Option<i64>,

    /// Include the executed SQL in responses.
    #[serde(default)]
    pub expose_sql: bool,

    /// Deadline for raw and single-page requests, in seconds.
    #[serde(default = "default_raw_timeout")]
    pub raw_timeout_secs: u64,

    /// Deadline for full materialization, in seconds.
    #[serde(default = "default_full_timeout")]
    pub full_timeout_secs: u64,
}

fn default_raw_timeout() -> u64 {
    60
}

fn default_full_timeout() -> u64 {
    300
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            query: None,
            page_size: None,
            max_pages: None,
            expose_sql: false,
            raw_timeout_secs: default_raw_timeout(),
            full_timeout_secs: default_full_timeout(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served under `/static`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Dashboard page served at `/`.
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            index_file: default_index_file(),
        }
    }
}

impl ServerConfig {
    /// Returns `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Values supplied on the command line or through environment variables.
///
/// Every set field wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project: Option<String>,
    pub location: Option<String>,
    pub credentials_json: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub query: Option<String>,
    pub page_size: Option<i64>,
    pub max_pages: Option<i64>,
    pub expose_sql: bool,
    pub raw_timeout_secs: Option<u64>,
    pub full_timeout_secs: Option<u64>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
    pub index_file: Option<PathBuf>,
}

/// Where the report SQL comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// Fixed text from the config file or command line.
    Fixed(String),
    /// Read from this environment variable on every request.
    Env(String),
}

impl QuerySource {
    /// Loads the current query text.
    pub fn load(&self) -> Result<String> {
        self.load_with(|key| std::env::var(key).ok())
    }

    /// Loads the query text using `lookup` for environment variables.
    pub fn load_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        let sql = match self {
            Self::Fixed(sql) => sql.clone(),
            Self::Env(key) => lookup(key).unwrap_or_default(),
        };
        if sql.trim().is_empty() {
            let origin = match self {
                Self::Fixed(_) => "configured query".to_string(),
                Self::Env(key) => format!("{key} env"),
            };
            return Err(ReportError::config(format!(
                "{origin} is empty; set your SELECT statement"
            )));
        }
        Ok(sql)
    }
}

/// Request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    /// Raw and single-page fetches.
    pub raw: Duration,
    /// Full materialization.
    pub full: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            raw: Duration::from_secs(default_raw_timeout()),
            full: Duration::from_secs(default_full_timeout()),
        }
    }
}

/// Snapshot of everything one request runs with.
///
/// Built once per request so a changed `DASH_QUERY` takes effect without restart.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    /// The report SQL, untrimmed.
    pub query: String,
    /// Paging bounds for full materialization.
    pub limits: PageLimits,
    /// Echo the SQL back in responses.
    pub expose_sql: bool,
}

impl ReportConfig {
    /// Returns where the query text is read from.
    pub fn query_source(&self) -> QuerySource {
        match self.query.as_deref().map(str::trim) {
            Some(sql) if !sql.is_empty() => QuerySource::Fixed(sql.to_string()),
            _ => QuerySource::Env(QUERY_ENV_VAR.to_string()),
        }
    }

    /// Returns the clamped paging bounds.
    pub fn limits(&self) -> PageLimits {
        PageLimits::new(self.page_size, self.max_pages)
    }

    /// Returns the request deadlines; zero falls back to the default and
    /// anything above [`MAX_TIMEOUT_SECS`] is capped.
    pub fn timeouts(&self) -> RequestTimeouts {
        let defaults = RequestTimeouts::default();
        let pick = |secs: u64, fallback: Duration| {
            if secs == 0 {
                fallback
            } else {
                Duration::from_secs(secs.min(MAX_TIMEOUT_SECS))
            }
        };
        RequestTimeouts {
            raw: pick(self.raw_timeout_secs, defaults.raw),
            full: pick(self.full_timeout_secs, defaults.full),
        }
    }
}

impl WarehouseConfig {
    /// Resolves connection settings; fails fast when no project id is configured.
    pub fn connection_settings(&self) -> Result<ConnectionSettings> {
        let credentials = Credentials::resolve(
            self.credentials_json.as_deref(),
            self.credentials_file.as_ref(),
        );
        ConnectionSettings::new(
            self.project.clone().unwrap_or_default(),
            self.location.clone(),
            credentials,
        )
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bq-report")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ReportError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ReportError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Merges overrides into this config, with the overrides taking precedence.
    pub fn merge(&mut self, o: &ConfigOverrides) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        set(&mut self.warehouse.project, &o.project);
        set(&mut self.warehouse.location, &o.location);
        set(&mut self.warehouse.credentials_json, &o.credentials_json);
        set(&mut self.warehouse.credentials_file, &o.credentials_file);

        set(&mut self.report.query, &o.query);
        set(&mut self.report.page_size, &o.page_size);
        set(&mut self.report.max_pages, &o.max_pages);
        if o.expose_sql {
            self.report.expose_sql = true;
        }
        if let Some(secs) = o.raw_timeout_secs {
            self.report.raw_timeout_secs = secs;
        }
        if let Some(secs) = o.full_timeout_secs {
            self.report.full_timeout_secs = secs;
        }

        if let Some(host) = &o.host {
            self.server.host = host.clone();
        }
        if let Some(port) = o.port {
            self.server.port = port;
        }
        if let Some(dir) = &o.static_dir {
            self.server.static_dir = dir.clone();
        }
        if let Some(index) = &o.index_file {
            self.server.index_file = index.clone();
        }
    }

    /// Applies environment fallbacks not covered by CLI env bindings (`PROJECT_ID`).
    pub fn apply_env_defaults(&mut self) {
        self.apply_env_defaults_with(|key| std::env::var(key).ok());
    }

    /// Same as [`Config::apply_env_defaults`] with an injectable lookup.
    pub fn apply_env_defaults_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.warehouse.project) {
            self.warehouse.project = lookup("GOOGLE_CLOUD_PROJECT")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| lookup("PROJECT_ID"));
        }
    }
}
