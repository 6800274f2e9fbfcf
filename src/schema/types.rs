//! Declarative value schema.
//!
//! Supported node kinds:
//! - string, number, integer, boolean, date (ISO-8601 string in storage)
//! - enum: closed set of string values
//! - object: nested object with its own field schema
//! - array: homogeneous list with an element schema
//! - record: free-form string-keyed map with a value schema
//! - optional / refined: wrappers that do not change the storage shape
//! - union / tuple: validated, but have no storage shape of their own

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field names every entity schema must declare.
pub const ID_FIELD: &str = "id";
pub const DATE_CREATED_FIELD: &str = "dateCreated";
pub const DATE_UPDATED_FIELD: &str = "dateUpdated";

/// Validation rule attached to a `refined` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refinement {
    /// String or array must not be empty
    NonEmpty,
    /// Minimum string length (chars)
    MinLength { value: usize },
    /// Maximum string length (chars)
    MaxLength { value: usize },
    /// Inclusive numeric lower bound
    Min { value: f64 },
    /// Inclusive numeric upper bound
    Max { value: f64 },
    /// String must look like an email address
    Email,
}

impl Refinement {
    pub fn describe(&self) -> String {
        match self {
            Refinement::NonEmpty => "non-empty value".into(),
            Refinement::MinLength { value } => format!("length >= {}", value),
            Refinement::MaxLength { value } => format!("length <= {}", value),
            Refinement::Min { value } => format!("value >= {}", value),
            Refinement::Max { value } => format!("value <= {}", value),
            Refinement::Email => "email address".into(),
        }
    }
}

/// A node in the declarative schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaNode {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Enum {
        values: Vec<String>,
    },
    Object {
        fields: BTreeMap<String, SchemaNode>,
    },
    Array {
        items: Box<SchemaNode>,
    },
    Record {
        values: Box<SchemaNode>,
    },
    Optional {
        inner: Box<SchemaNode>,
    },
    Refined {
        inner: Box<SchemaNode>,
        rule: Refinement,
    },
    Union {
        variants: Vec<SchemaNode>,
    },
    Tuple {
        items: Vec<SchemaNode>,
    },
}

impl SchemaNode {
    pub fn optional(inner: SchemaNode) -> Self {
        SchemaNode::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode::Array {
            items: Box::new(items),
        }
    }

    pub fn record(values: SchemaNode) -> Self {
        SchemaNode::Record {
            values: Box::new(values),
        }
    }

    pub fn refined(inner: SchemaNode, rule: Refinement) -> Self {
        SchemaNode::Refined {
            inner: Box::new(inner),
            rule,
        }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaNode::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        SchemaNode::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaNode::String => "string",
            SchemaNode::Number => "number",
            SchemaNode::Integer => "integer",
            SchemaNode::Boolean => "boolean",
            SchemaNode::Date => "date",
            SchemaNode::Enum { .. } => "enum",
            SchemaNode::Object { .. } => "object",
            SchemaNode::Array { .. } => "array",
            SchemaNode::Record { .. } => "record",
            SchemaNode::Optional { .. } => "optional",
            SchemaNode::Refined { .. } => "refined",
            SchemaNode::Union { .. } => "union",
            SchemaNode::Tuple { .. } => "tuple",
        }
    }

    /// True when the field may be absent or null.
    pub fn is_optional(&self) -> bool {
        match self {
            SchemaNode::Optional { .. } => true,
            SchemaNode::Refined { inner, .. } => inner.is_optional(),
            _ => false,
        }
    }
}

/// Root schema of an entity: an object whose fields are the stored attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: BTreeMap<String, SchemaNode>,
}

impl Schema {
    pub fn new(fields: BTreeMap<String, SchemaNode>) -> Self {
        Self { fields }
    }

    /// Starts a schema with the three bookkeeping fields already declared.
    pub fn entity() -> Self {
        Self::default()
            .with_field(ID_FIELD, SchemaNode::String)
            .with_field(DATE_CREATED_FIELD, SchemaNode::Date)
            .with_field(DATE_UPDATED_FIELD, SchemaNode::Date)
    }

    pub fn with_field(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.fields.insert(name.into(), node);
        self
    }

    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Checks the schema itself (not a document): the bookkeeping fields must exist.
    pub fn validate_structure(&self) -> Result<(), String> {
        let missing: Vec<&str> = [ID_FIELD, DATE_CREATED_FIELD, DATE_UPDATED_FIELD]
            .into_iter()
            .filter(|f| !self.fields.contains_key(*f))
            .collect();

        if !missing.is_empty() {
            return Err(format!(
                "Schema must declare {}",
                missing
                    .iter()
                    .map(|f| format!("'{}'", f))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        Ok(())
    }

    /// The schema as an object node, for code that walks nodes uniformly.
    pub fn as_node(&self) -> SchemaNode {
        SchemaNode::Object {
            fields: self.fields.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_schema_structure_valid() {
        let schema = Schema::entity().with_field("name", SchemaNode::String);
        assert!(schema.validate_structure().is_ok());
    }

    #[test]
    fn test_missing_bookkeeping_fields_named() {
        let schema = Schema::default()
            .with_field("id", SchemaNode::String)
            .with_field("name", SchemaNode::String);

        let err = schema.validate_structure().unwrap_err();
        assert!(err.contains("dateCreated"));
        assert!(err.contains("dateUpdated"));
        assert!(!err.contains("'id'"));
    }

    #[test]
    fn test_schema_from_json() {
        let schema: Schema = serde_json::from_value(json!({
            "fields": {
                "id": { "type": "string" },
                "dateCreated": { "type": "date" },
                "dateUpdated": { "type": "date" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "nickname": { "type": "optional", "inner": { "type": "string" } },
                "email": {
                    "type": "refined",
                    "inner": { "type": "string" },
                    "rule": { "kind": "email" }
                }
            }
        }))
        .unwrap();

        assert_eq!(schema.field("tags"), Some(&SchemaNode::array(SchemaNode::String)));
        assert!(schema.field("nickname").unwrap().is_optional());
        assert!(schema.validate_structure().is_ok());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(SchemaNode::Date.type_name(), "date");
        assert_eq!(SchemaNode::record(SchemaNode::Number).type_name(), "record");
        assert_eq!(
            SchemaNode::Union { variants: vec![] }.type_name(),
            "union"
        );
    }
}
