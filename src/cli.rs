//! Command-line argument parsing for bq-report.
//!
//! Every flag also reads an environment variable, so the service can be
//! configured entirely from its deployment environment.

use bq_report::config::{Config, ConfigOverrides};
use clap::Parser;
use std::path::PathBuf;

/// Serves a paginated, schema-stable JSON report over a BigQuery query.
#[derive(Parser, Debug)]
#[command(name = "bq-report")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project the query jobs run in (falls back to PROJECT_ID)
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT", value_name = "PROJECT")]
    pub project: Option<String>,

    /// Data location, e.g. US, EU or asia-south1
    #[arg(long, env = "BQ_LOCATION", value_name = "LOCATION")]
    pub location: Option<String>,

    /// Service account key JSON
    #[arg(
        long,
        env = "GOOGLE_APPLICATION_CREDENTIALS_JSON",
        value_name = "JSON",
        hide_env_values = true
    )]
    pub credentials_json: Option<String>,

    /// Path to a service account key file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", value_name = "PATH")]
    pub credentials_file: Option<PathBuf>,

    /// Fixed report SQL; when unset DASH_QUERY is read on every request
    #[arg(long, value_name = "SQL")]
    pub query: Option<String>,

    /// Rows per page during full materialization (invalid values use the default)
    #[arg(long, env = "PAGE_SIZE", value_name = "ROWS", allow_hyphen_values = true)]
    pub page_size: Option<String>,

    /// Maximum pages during full materialization (invalid values use the default)
    #[arg(long, env = "MAX_PAGES", value_name = "PAGES", allow_hyphen_values = true)]
    pub max_pages: Option<String>,

    /// Include the executed SQL in responses (env accepts 1/0, true/false, yes/no)
    #[arg(
        long,
        env = "DASH_EXPOSE_SQL",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub expose_sql: bool,

    /// Deadline for raw and single-page requests, in seconds
    #[arg(long, value_name = "SECS")]
    pub raw_timeout_secs: Option<u64>,

    /// Deadline for full materialization, in seconds
    #[arg(long, value_name = "SECS")]
    pub full_timeout_secs: Option<u64>,

    /// Listen address
    #[arg(long, env = "HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(short = 'p', long, env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Directory served under /static
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Dashboard page served at /
    #[arg(long, value_name = "PATH")]
    pub index_file: Option<PathBuf>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Serve a built-in demo dataset instead of connecting to BigQuery
    #[arg(long)]
    pub mock_warehouse: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Converts the parsed arguments into config overrides.
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            project: self.project.clone(),
            location: self.location.clone(),
            credentials_json: self.credentials_json.clone(),
            credentials_file: self.credentials_file.clone(),
            query: self.query.clone(),
            page_size: lenient_int(self.page_size.as_deref()),
            max_pages: lenient_int(self.max_pages.as_deref()),
            expose_sql: self.expose_sql,
            raw_timeout_secs: self.raw_timeout_secs,
            full_timeout_secs: self.full_timeout_secs,
            host: self.host.clone(),
            port: self.port,
            static_dir: self.static_dir.clone(),
            index_file: self.index_file.clone(),
        }
    }
}

/// Parses an integer setting; garbage is treated as unset.
fn lenient_int(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}
