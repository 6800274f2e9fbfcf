//! Schema validator for entity records
//!
//! Validation semantics:
//! - No undeclared fields, at any depth
//! - Field types exactly match schema types (no coercion)
//! - Strict mode: all non-optional fields are present
//! - Partial mode: required fields may be absent at any depth (entity being
//!   populated, or a partial update about to be merged)
//! - `null` only where the schema says optional
//!
//! Unlike a fail-fast check, every violation is collected so the caller gets one
//! aggregated error listing all failing fields.

use chrono::DateTime;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult, ValidationDetails, ValidationReport};
use super::types::{Refinement, Schema, SchemaNode};

/// How much of the schema a document must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Fully derived record about to be written
    Strict,
    /// Entity data still being populated
    Partial,
}

/// Validates documents against an entity schema. Never mutates the document.
pub struct SchemaValidator<'a> {
    schema: &'a Schema,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Validates an item, returning every failure at once.
    pub fn validate(&self, item: &Map<String, Value>, mode: ValidationMode) -> SchemaResult<()> {
        let mut report = ValidationReport::default();
        check_object(
            item,
            &self.schema.fields,
            "",
            mode == ValidationMode::Partial,
            &mut report,
        );

        if report.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::validation(report))
        }
    }

    /// Validates an arbitrary JSON value that is expected to be an object.
    pub fn validate_value(&self, value: &Value, mode: ValidationMode) -> SchemaResult<()> {
        match value.as_object() {
            Some(obj) => self.validate(obj, mode),
            None => {
                let mut report = ValidationReport::default();
                report.push(ValidationDetails::type_mismatch(
                    "$root",
                    "object",
                    json_type_name(value),
                ));
                Err(SchemaError::validation(report))
            }
        }
    }
}

fn check_object(
    obj: &Map<String, Value>,
    fields: &BTreeMap<String, SchemaNode>,
    prefix: &str,
    allow_missing: bool,
    report: &mut ValidationReport,
) {
    for key in obj.keys() {
        if !fields.contains_key(key) {
            report.push(ValidationDetails::extra_field(make_path(prefix, key)));
        }
    }

    for (name, node) in fields {
        let path = make_path(prefix, name);
        match obj.get(name) {
            Some(value) => check_node(value, node, &path, allow_missing, report),
            None => {
                if !allow_missing && !node.is_optional() {
                    report.push(ValidationDetails::missing_field(path));
                }
            }
        }
    }
}

fn check_node(
    value: &Value,
    node: &SchemaNode,
    path: &str,
    partial: bool,
    report: &mut ValidationReport,
) {
    match node {
        SchemaNode::Optional { inner } => {
            if !value.is_null() {
                check_node(value, inner, path, partial, report);
            }
            return;
        }
        SchemaNode::Refined { inner, rule } => {
            if value.is_null() && inner.is_optional() {
                return;
            }
            let before = report.details().len();
            check_node(value, inner, path, partial, report);
            if report.details().len() == before && !value.is_null() {
                check_rule(value, rule, path, report);
            }
            return;
        }
        _ => {}
    }

    if value.is_null() {
        report.push(ValidationDetails::null_value(path));
        return;
    }

    match node {
        SchemaNode::String => {
            if !value.is_string() {
                report.push(type_error(path, "string", value));
            }
        }
        SchemaNode::Number => {
            if !value.is_number() {
                report.push(type_error(path, "number", value));
            }
        }
        SchemaNode::Integer => {
            if !value.is_i64() && !value.is_u64() {
                report.push(type_error(path, "integer", value));
            }
        }
        SchemaNode::Boolean => {
            if !value.is_boolean() {
                report.push(type_error(path, "boolean", value));
            }
        }
        SchemaNode::Date => match value.as_str() {
            Some(s) if DateTime::parse_from_rfc3339(s).is_ok() => {}
            Some(s) => report.push(ValidationDetails::type_mismatch(
                path,
                "ISO-8601 date",
                format!("'{}'", s),
            )),
            None => report.push(type_error(path, "ISO-8601 date", value)),
        },
        SchemaNode::Enum { values } => {
            let ok = value
                .as_str()
                .map(|s| values.iter().any(|v| v == s))
                .unwrap_or(false);
            if !ok {
                report.push(ValidationDetails::type_mismatch(
                    path,
                    format!("one of [{}]", values.join(", ")),
                    describe_value(value),
                ));
            }
        }
        SchemaNode::Object { fields } => match value.as_object() {
            Some(obj) => check_object(obj, fields, path, partial, report),
            None => report.push(type_error(path, "object", value)),
        },
        SchemaNode::Array { items } => match value.as_array() {
            Some(arr) => {
                for (i, elem) in arr.iter().enumerate() {
                    check_node(elem, items, &format!("{}[{}]", path, i), partial, report);
                }
            }
            None => report.push(type_error(path, "array", value)),
        },
        SchemaNode::Record { values } => match value.as_object() {
            Some(obj) => {
                for (key, elem) in obj {
                    check_node(elem, values, &make_path(path, key), partial, report);
                }
            }
            None => report.push(type_error(path, "record", value)),
        },
        SchemaNode::Union { variants } => {
            let matched = variants.iter().any(|variant| {
                let mut scratch = ValidationReport::default();
                check_node(value, variant, path, partial, &mut scratch);
                scratch.is_empty()
            });
            if !matched {
                let names: Vec<&str> = variants.iter().map(|v| v.type_name()).collect();
                report.push(type_error(path, &names.join(" | "), value));
            }
        }
        SchemaNode::Tuple { items } => match value.as_array() {
            Some(arr) if arr.len() == items.len() => {
                for (i, (elem, item)) in arr.iter().zip(items).enumerate() {
                    check_node(elem, item, &format!("{}[{}]", path, i), partial, report);
                }
            }
            Some(arr) => report.push(ValidationDetails::type_mismatch(
                path,
                format!("tuple of {}", items.len()),
                format!("array of {}", arr.len()),
            )),
            None => report.push(type_error(path, "tuple", value)),
        },
        SchemaNode::Optional { .. } | SchemaNode::Refined { .. } => unreachable!(),
    }
}

fn check_rule(value: &Value, rule: &Refinement, path: &str, report: &mut ValidationReport) {
    let length = match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    };

    let ok = match rule {
        Refinement::NonEmpty => length.map_or(true, |n| n > 0),
        Refinement::MinLength { value: min } => length.map_or(true, |n| n >= *min),
        Refinement::MaxLength { value: max } => length.map_or(true, |n| n <= *max),
        Refinement::Min { value: min } => value.as_f64().map_or(true, |n| n >= *min),
        Refinement::Max { value: max } => value.as_f64().map_or(true, |n| n <= *max),
        Refinement::Email => value
            .as_str()
            .and_then(|s| s.split_once('@'))
            .map_or(false, |(user, domain)| !user.is_empty() && domain.contains('.')),
    };

    if !ok {
        report.push(ValidationDetails::new(path, rule.describe(), describe_value(value)));
    }
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Number(n) => n.to_string(),
        other => json_type_name(other).to_string(),
    }
}

fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

fn type_error(path: &str, expected: &str, actual: &Value) -> ValidationDetails {
    ValidationDetails::type_mismatch(path, expected, json_type_name(actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn campaign_schema() -> Schema {
        Schema::entity()
            .with_field("name", SchemaNode::refined(SchemaNode::String, Refinement::NonEmpty))
            .with_field("status", SchemaNode::enumeration(["draft", "live", "ended"]))
            .with_field("budget", SchemaNode::optional(SchemaNode::Number))
            .with_field("spins", SchemaNode::Integer)
            .with_field(
                "prizes",
                SchemaNode::array(SchemaNode::object([
                    ("label", SchemaNode::String),
                    ("weight", SchemaNode::refined(SchemaNode::Number, Refinement::Min { value: 0.0 })),
                ])),
            )
            .with_field("meta", SchemaNode::optional(SchemaNode::record(SchemaNode::String)))
    }

    fn valid_doc() -> Value {
        json!({
            "id": "c1",
            "dateCreated": "2024-05-01T10:00:00Z",
            "dateUpdated": "2024-05-01T10:00:00.123456Z",
            "name": "Spring",
            "status": "live",
            "spins": 3,
            "prizes": [{ "label": "mug", "weight": 0.5 }]
        })
    }

    fn fields_of(err: &SchemaError) -> Vec<String> {
        err.details().iter().map(|d| d.field.clone()).collect()
    }

    #[test]
    fn test_valid_document_passes() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);
        assert!(validator.validate_value(&valid_doc(), ValidationMode::Strict).is_ok());
    }

    #[test]
    fn test_all_failures_aggregated() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);

        let mut doc = valid_doc();
        doc["name"] = json!("");
        doc["status"] = json!("paused");
        doc["spins"] = json!(1.5);
        doc["unknown"] = json!(true);
        doc.as_object_mut().unwrap().remove("dateCreated");

        let err = validator
            .validate_value(&doc, ValidationMode::Strict)
            .unwrap_err();
        let fields = fields_of(&err);
        assert_eq!(err.details().len(), 5);
        for f in ["name", "status", "spins", "unknown", "dateCreated"] {
            assert!(fields.contains(&f.to_string()), "missing {}", f);
        }
    }

    #[test]
    fn test_partial_mode_allows_missing_required() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);

        let doc = json!({ "name": "Spring" });
        assert!(validator.validate_value(&doc, ValidationMode::Partial).is_ok());
        assert!(validator.validate_value(&doc, ValidationMode::Strict).is_err());

        // Unknown fields and wrong types are still rejected
        let doc = json!({ "name": 5, "bogus": 1 });
        let err = validator
            .validate_value(&doc, ValidationMode::Partial)
            .unwrap_err();
        assert_eq!(err.details().len(), 2);
    }

    #[test]
    fn test_partial_mode_reaches_nested_objects() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);

        let doc = json!({ "prizes": [{ "label": "mug" }] });
        assert!(validator.validate_value(&doc, ValidationMode::Partial).is_ok());

        let doc = json!({ "prizes": [{ "label": "mug", "colour": "red" }] });
        assert!(validator.validate_value(&doc, ValidationMode::Partial).is_err());
    }

    #[test]
    fn test_nested_paths_reported() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);

        let mut doc = valid_doc();
        doc["prizes"] = json!([{ "label": "mug", "weight": 1 }, { "label": 7, "weight": -1 }]);
        doc["meta"] = json!({ "source": 12 });

        let err = validator
            .validate_value(&doc, ValidationMode::Strict)
            .unwrap_err();
        let fields = fields_of(&err);
        assert!(fields.contains(&"prizes[1].label".to_string()));
        assert!(fields.contains(&"prizes[1].weight".to_string()));
        assert!(fields.contains(&"meta.source".to_string()));
    }

    #[test]
    fn test_null_only_for_optional() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);

        let mut doc = valid_doc();
        doc["budget"] = Value::Null;
        assert!(validator.validate_value(&doc, ValidationMode::Strict).is_ok());

        doc["spins"] = Value::Null;
        let err = validator
            .validate_value(&doc, ValidationMode::Strict)
            .unwrap_err();
        assert_eq!(err.details()[0].actual, "null");
    }

    #[test]
    fn test_bad_date_rejected() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);

        let mut doc = valid_doc();
        doc["dateUpdated"] = json!("yesterday");
        let err = validator
            .validate_value(&doc, ValidationMode::Strict)
            .unwrap_err();
        assert_eq!(err.details()[0].field, "dateUpdated");
        assert!(err.details()[0].expected.contains("ISO-8601"));
    }

    #[test]
    fn test_union_and_tuple() {
        let schema = Schema::entity()
            .with_field(
                "code",
                SchemaNode::Union {
                    variants: vec![SchemaNode::String, SchemaNode::Integer],
                },
            )
            .with_field(
                "point",
                SchemaNode::Tuple {
                    items: vec![SchemaNode::Number, SchemaNode::Number],
                },
            );
        let validator = SchemaValidator::new(&schema);

        let ok = json!({ "code": 4, "point": [1.0, 2.5] });
        assert!(validator.validate_value(&ok, ValidationMode::Partial).is_ok());

        let bad = json!({ "code": true, "point": [1.0] });
        let err = validator
            .validate_value(&bad, ValidationMode::Partial)
            .unwrap_err();
        assert_eq!(err.details().len(), 2);
        assert_eq!(err.details()[0].expected, "string | integer");
    }

    #[test]
    fn test_email_refinement() {
        let schema = Schema::entity().with_field(
            "email",
            SchemaNode::refined(SchemaNode::String, Refinement::Email),
        );
        let validator = SchemaValidator::new(&schema);

        assert!(validator
            .validate_value(&json!({ "email": "a@b.io" }), ValidationMode::Partial)
            .is_ok());
        assert!(validator
            .validate_value(&json!({ "email": "nope" }), ValidationMode::Partial)
            .is_err());
    }

    #[test]
    fn test_non_object_root() {
        let schema = campaign_schema();
        let validator = SchemaValidator::new(&schema);
        let err = validator
            .validate_value(&json!([1, 2]), ValidationMode::Strict)
            .unwrap_err();
        assert_eq!(err.details()[0].field, "$root");
    }
}
