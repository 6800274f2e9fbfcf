//! Item ↔ store value conversion, guided by the attribute descriptor.
//!
//! Encoding checks each value against its descriptor so a record that
//! slipped past validation never reaches the table in the wrong shape.
//! Fields the descriptor does not describe (opaque maps, physical key
//! attributes) are converted untyped.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::item::Item;
use crate::schema::{AttributeDescriptor, ScalarType};
use crate::store::{AttributeValue, StoreItem};

use super::errors::{EngineError, EngineResult};

/// Encodes a record using the entity's map descriptor.
pub fn encode_item(item: &Item, descriptor: &AttributeDescriptor) -> EngineResult<StoreItem> {
    let mut out = StoreItem::new();
    for (field, value) in item {
        let encoded = match descriptor.property(field) {
            Some(d) => encode_value(value, d, field)?,
            None => encode_untyped(value),
        };
        out.insert(field.clone(), encoded);
    }
    Ok(out)
}

/// Decodes a stored row using the entity's map descriptor.
pub fn decode_item(row: &StoreItem, descriptor: &AttributeDescriptor) -> EngineResult<Item> {
    let mut out = Item::new();
    for (field, value) in row {
        let decoded = decode_value(value, descriptor.property(field), field)?;
        out.insert(field.clone(), decoded);
    }
    Ok(out)
}

fn mismatch(path: &str, expected: &str, value: &Value) -> EngineError {
    EngineError::codec(
        path,
        format!("expected {}, got {}", expected, crate::schema::json_type_name(value)),
    )
}

fn encode_value(value: &Value, descriptor: &AttributeDescriptor, path: &str) -> EngineResult<AttributeValue> {
    if value.is_null() {
        return Ok(AttributeValue::Null(true));
    }

    match descriptor {
        AttributeDescriptor::Scalar(scalar) => match (scalar, value) {
            (ScalarType::String | ScalarType::Enum(_) | ScalarType::Date, Value::String(s)) => {
                Ok(AttributeValue::S(s.clone()))
            }
            (ScalarType::Number | ScalarType::Integer, Value::Number(n)) => {
                Ok(AttributeValue::N(n.to_string()))
            }
            (ScalarType::Boolean, Value::Bool(b)) => Ok(AttributeValue::Bool(*b)),
            (ScalarType::Number | ScalarType::Integer, _) => Err(mismatch(path, "number", value)),
            (ScalarType::Boolean, _) => Err(mismatch(path, "boolean", value)),
            _ => Err(mismatch(path, "string", value)),
        },
        AttributeDescriptor::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| encode_value(v, inner, &format!("{}[{}]", path, i)))
                .collect::<EngineResult<Vec<_>>>()
                .map(AttributeValue::L),
            _ => Err(mismatch(path, "array", value)),
        },
        AttributeDescriptor::Map(props) => match value {
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    let encoded = match props.get(k) {
                        Some(d) => encode_value(v, d, &format!("{}.{}", path, k))?,
                        None => encode_untyped(v),
                    };
                    out.insert(k.clone(), encoded);
                }
                Ok(AttributeValue::M(out))
            }
            _ => Err(mismatch(path, "object", value)),
        },
        AttributeDescriptor::OpaqueMap => match value {
            Value::Object(_) => Ok(encode_untyped(value)),
            _ => Err(mismatch(path, "object", value)),
        },
    }
}

fn encode_untyped(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(encode_untyped).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), encode_untyped(v)))
                .collect(),
        ),
    }
}

/// Parses a stored number, preferring integers.
fn parse_number(text: &str, path: &str) -> EngineResult<Number> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = text.parse::<u64>() {
        return Ok(Number::from(u));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| EngineError::codec(path, format!("'{}' is not a number", text)))
}

fn decode_value(
    value: &AttributeValue,
    descriptor: Option<&AttributeDescriptor>,
    path: &str,
) -> EngineResult<Value> {
    let decoded = match value {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(text) => {
            let number = parse_number(text, path)?;
            if matches!(descriptor, Some(AttributeDescriptor::Scalar(ScalarType::Integer)))
                && !(number.is_i64() || number.is_u64())
            {
                return Err(EngineError::codec(path, format!("'{}' is not an integer", text)));
            }
            Value::Number(number)
        }
        AttributeValue::L(items) => {
            let inner = descriptor.and_then(AttributeDescriptor::item_descriptor);
            Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| decode_value(v, inner, &format!("{}[{}]", path, i)))
                    .collect::<EngineResult<Vec<_>>>()?,
            )
        }
        AttributeValue::M(entries) => {
            let mut out = Map::new();
            for (k, v) in entries {
                let inner = descriptor.and_then(|d| d.property(k));
                out.insert(k.clone(), decode_value(v, inner, &format!("{}.{}", path, k))?);
            }
            Value::Object(out)
        }
    };
    Ok(decoded)
}
