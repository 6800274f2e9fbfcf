//! CLI configuration file.
//!
//! ```json
//! {
//!   "connection": { "name": "app", "endpoint": "file://./app-table.json" },
//!   "models": [
//!     {
//!       "name": "player",
//!       "schemaFile": "player.schema.json",
//!       "indexes": [
//!         { "partition": "id" },
//!         { "partition": "groupId", "sort": "dateCreated" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A model carries its schema inline (`schema`) or in a separate file
//! (`schemaFile`, relative to the configuration file).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::index::IndexSpec;
use crate::schema::{Schema, SchemaLoader};
use crate::store::Connection;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_file: Option<PathBuf>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl ModelDefinition {
    /// The model's schema, reading `schemaFile` relative to `base_dir`.
    pub fn load_schema(&self, base_dir: &Path) -> CliResult<Schema> {
        match (&self.schema, &self.schema_file) {
            (Some(schema), None) => Ok(schema.clone()),
            (None, Some(file)) => Ok(SchemaLoader::load_file(&base_dir.join(file))?),
            (Some(_), Some(_)) => Err(CliError::config_error(format!(
                "model '{}' declares both schema and schemaFile",
                self.name
            ))),
            (None, None) => Err(CliError::config_error(format!(
                "model '{}' declares no schema",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    pub connection: Connection,
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config '{}': {}", path.display(), e))
        })?;

        let mut config: CliConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        self.connection
            .validate()
            .map_err(|e| CliError::config_error(e.to_string()))?;

        if self.models.is_empty() {
            return Err(CliError::config_error("at least one model must be configured"));
        }

        for (i, model) in self.models.iter().enumerate() {
            if self.models[..i].iter().any(|m| m.name == model.name) {
                return Err(CliError::config_error(format!(
                    "model '{}' is configured twice",
                    model.name
                )));
            }
        }

        Ok(())
    }

    pub fn model(&self, name: &str) -> CliResult<&ModelDefinition> {
        self.models
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| CliError::unknown_model(name))
    }
}
