//! Connection descriptor.
//!
//! The same model code runs against a local emulator or a live deployment;
//! only the descriptor changes. Endpoints understood here:
//!
//! - absent or `memory://` → fresh in-process table
//! - `file://<path>` → in-process table persisted to `<path>`
//!
//! Anything else names a remote store this crate does not ship a client for;
//! such a store is wired in by handing a `TableStore` implementation to the
//! model directly.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::errors::{StoreError, StoreResult};
use super::memory::MemoryTable;
use super::table::TableStore;

const MEMORY_SCHEME: &str = "memory://";
const FILE_SCHEME: &str = "file://";

/// Static credentials for a remote store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where the table lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Physical table name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl Connection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: None,
            endpoint: None,
            credentials: None,
        }
    }

    /// In-process emulator.
    pub fn memory(name: impl Into<String>) -> Self {
        Self::new(name).with_endpoint(MEMORY_SCHEME)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Configuration("table name is required".into()));
        }
        Ok(())
    }
}

/// Opens the store a connection points at.
pub async fn connect(connection: &Connection) -> StoreResult<Arc<dyn TableStore>> {
    connection.validate()?;

    let endpoint = connection.endpoint.as_deref().unwrap_or(MEMORY_SCHEME);
    let store: Arc<dyn TableStore> = if endpoint == MEMORY_SCHEME {
        Arc::new(MemoryTable::new(&connection.name))
    } else if let Some(path) = endpoint.strip_prefix(FILE_SCHEME) {
        if path.is_empty() {
            return Err(StoreError::Configuration("file endpoint needs a path".into()));
        }
        Arc::new(MemoryTable::open(&connection.name, path).await?)
    } else {
        return Err(StoreError::UnsupportedEndpoint(endpoint.to_string()));
    };

    info!(
        table = %connection.name,
        endpoint = %endpoint,
        region = connection.region.as_deref().unwrap_or("-"),
        "connected"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_secret_not_in_debug() {
        let conn = Connection::new("app").with_credentials(Credentials {
            access_key_id: "AKIA123".into(),
            secret_access_key: "hunter2".into(),
            session_token: Some("tok".into()),
        });
        let debug = format!("{:?}", conn);
        assert!(debug.contains("AKIA123"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("tok\""));
    }

    #[test]
    fn test_from_json_defaults() {
        let conn: Connection = serde_json::from_value(json!({ "name": "app" })).unwrap();
        assert_eq!(conn, Connection::new("app"));
    }

    #[tokio::test]
    async fn test_connect_memory() {
        let store = connect(&Connection::memory("app")).await.unwrap();
        assert_eq!(store.table_name(), "app");

        let store = connect(&Connection::new("default")).await.unwrap();
        assert_eq!(store.table_name(), "default");
    }

    #[tokio::test]
    async fn test_connect_file() {
        let temp_dir = TempDir::new().unwrap();
        let endpoint = format!("file://{}", temp_dir.path().join("t.json").display());
        let store = connect(&Connection::new("app").with_endpoint(endpoint))
            .await
            .unwrap();
        assert_eq!(store.table_name(), "app");
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_descriptors() {
        let err = connect(&Connection::new("  ")).await.unwrap_err();
        assert!(err.is_configuration());

        let err = connect(
            &Connection::new("app")
                .with_region("eu-west-1")
                .with_endpoint("https://dynamo.example"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "ST_STORE_UNSUPPORTED_ENDPOINT");

        let err = connect(&Connection::new("app").with_endpoint("file://"))
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
