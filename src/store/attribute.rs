//! Store wire values.
//!
//! Items cross the store boundary as typed attribute maps, serialized in the
//! familiar `{"S": "..."}` / `{"N": "12"}` shape. Numbers travel as decimal
//! strings so the store never rounds them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single stored attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    L(Vec<AttributeValue>),
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            _ => None,
        }
    }

    /// Text used when the value takes part in a composite key.
    pub fn key_text(&self) -> Option<String> {
        match self {
            AttributeValue::S(s) => Some(s.clone()),
            AttributeValue::N(n) => Some(n.clone()),
            AttributeValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// One stored row: attribute name → value.
pub type StoreItem = BTreeMap<String, AttributeValue>;
