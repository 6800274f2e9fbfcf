//! Schema loader for schemas kept as JSON files next to the CLI config.
//!
//! A malformed or structurally invalid schema file is a configuration error,
//! reported with the offending path.

use std::fs;
use std::path::Path;

use super::errors::{SchemaError, SchemaResult};
use super::mapper::SchemaTypeMapper;
use super::types::Schema;

pub struct SchemaLoader;

impl SchemaLoader {
    /// Loads and checks a single schema file.
    pub fn load_file(path: &Path) -> SchemaResult<Schema> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        Self::parse(&content, &path.display().to_string())
    }

    /// Parses schema JSON. `origin` names the source in error messages.
    pub fn parse(content: &str, origin: &str) -> SchemaResult<Schema> {
        let schema: Schema = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(origin, format!("Invalid JSON: {}", e)))?;

        schema
            .validate_structure()
            .map_err(|e| SchemaError::malformed(origin, e))?;

        // Surface unsupported nodes now rather than on first write
        SchemaTypeMapper::map_schema(&schema)?;

        Ok(schema)
    }

    /// Writes a schema as pretty JSON.
    pub fn save_file(schema: &Schema, path: &Path) -> SchemaResult<()> {
        let content = serde_json::to_string_pretty(schema).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("Failed to serialize schema: {}", e),
            )
        })?;

        fs::write(path, content).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("Failed to write file: {}", e))
        })
    }
}
