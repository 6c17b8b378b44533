//! Warehouse abstraction layer for bq-report.
//!
//! Provides a trait-based interface for running SQL against a remote
//! warehouse, allowing the BigQuery backend and the in-memory mock to be
//! used interchangeably.

mod bigquery;
mod context;
mod mock;
mod types;

pub use bigquery::BigQueryClient;
pub use context::QueryContext;
pub use mock::{FailingWarehouse, MockWarehouse};
pub use types::{Record, ResultRow, Value};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ReportError, Result};

/// A statement ready to be sent to the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Cleaned SQL text.
    pub sql: String,
    /// Data location the job must run in, when the dataset is not in the default region.
    pub location: Option<String>,
    /// How long the warehouse may wait server-side before answering.
    pub timeout: Option<Duration>,
}

impl Statement {
    /// Creates a statement with no location pin.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            location: None,
            timeout: None,
        }
    }

    /// Pins execution to `location` when one is set.
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    /// Sets the server-side wait, usually the time left on the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Forward-only handle over one statement's result stream.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names from the result metadata, in declared order, when the backend has them.
    fn columns(&self) -> Option<&[String]>;

    /// Returns the next record, or `None` once the result is exhausted.
    async fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Trait defining the interface for warehouse clients.
///
/// Implementations are long-lived and shared across concurrent requests;
/// they hold no request-scoped state.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Starts a statement and returns a cursor over its rows.
    async fn query(&self, statement: Statement) -> Result<Box<dyn RowCursor>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Where warehouse credentials come from. First match wins.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Service account key JSON supplied inline.
    Inline(String),
    /// Path to a service account key file.
    File(PathBuf),
    /// Whatever the execution environment provides (ADC).
    Ambient,
}

impl Credentials {
    /// Resolves credentials in priority order: inline JSON, then key file, then ambient.
    pub fn resolve(inline: Option<&str>, file: Option<&PathBuf>) -> Self {
        if let Some(json) = inline.filter(|s| !s.trim().is_empty()) {
            return Self::Inline(json.to_string());
        }
        if let Some(path) = file.filter(|p| !p.as_os_str().is_empty()) {
            return Self::File(path.clone());
        }
        Self::Ambient
    }

    /// Returns the source name used in error messages and logs.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Inline(_) => "json",
            Self::File(_) => "file",
            Self::Ambient => "ADC",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline(<redacted>)"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Ambient => f.write_str("Ambient"),
        }
    }
}

/// Everything needed to open a warehouse connection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Project the jobs are billed to.
    pub project_id: String,
    /// Default data location.
    pub location: Option<String>,
    /// Credential source.
    pub credentials: Credentials,
}

impl ConnectionSettings {
    /// Validates the settings, failing fast on an empty project id.
    pub fn new(
        project_id: impl Into<String>,
        location: Option<String>,
        credentials: Credentials,
    ) -> Result<Self> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(ReportError::config(
                "project id required (set GOOGLE_CLOUD_PROJECT or PROJECT_ID)",
            ));
        }
        Ok(Self {
            project_id,
            location: location.filter(|l| !l.trim().is_empty()),
            credentials,
        })
    }
}

/// Creates a warehouse client for the given settings.
///
/// This is the central factory function for warehouse connections.
pub async fn connect(settings: &ConnectionSettings) -> Result<Arc<dyn WarehouseClient>> {
    let client = BigQueryClient::connect(settings).await?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_prefer_inline_json() {
        let path = PathBuf::from("/etc/key.json");
        let creds = Credentials::resolve(Some(r#"{"type":"service_account"}"#), Some(&path));
        assert_eq!(creds.source(), "json");
    }

    #[test]
    fn test_credentials_fall_back_to_file_then_ambient() {
        let path = PathBuf::from("/etc/key.json");
        assert_eq!(
            Credentials::resolve(None, Some(&path)),
            Credentials::File(path.clone())
        );
        assert_eq!(
            Credentials::resolve(Some("   "), Some(&path)),
            Credentials::File(path)
        );
        assert_eq!(Credentials::resolve(None, None), Credentials::Ambient);
    }

    #[test]
    fn test_credentials_debug_redacts_json() {
        let creds = Credentials::Inline("secret-key-material".to_string());
        assert_eq!(format!("{creds:?}"), "Inline(<redacted>)");
    }

    #[test]
    fn test_connection_settings_require_project() {
        let err = ConnectionSettings::new("  ", None, Credentials::Ambient).unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
        assert!(err.to_string().contains("project id required"));
    }

    #[test]
    fn test_connection_settings_drop_blank_location() {
        let settings =
            ConnectionSettings::new("acme", Some(String::new()), Credentials::Ambient).unwrap();
        assert_eq!(settings.location, None);

        let settings =
            ConnectionSettings::new("acme", Some("EU".to_string()), Credentials::Ambient).unwrap();
        assert_eq!(settings.location.as_deref(), Some("EU"));
    }

    #[test]
    fn test_statement_with_location() {
        let stmt = Statement::new("SELECT 1").with_location(Some("asia-south1".to_string()));
        assert_eq!(stmt.sql, "SELECT 1");
        assert_eq!(stmt.location.as_deref(), Some("asia-south1"));
    }
}
