//! Opaque list cursors.
//!
//! A cursor wraps the store's continuation key together with the index it
//! was issued for, serialized as JSON and base64url-encoded. Callers pass it
//! back unchanged; a cursor from one index is refused by another.
//!
//! Scan cursors may also carry an offset into the sorted batch that starts at
//! `key`: the batch is gathered again from the same position and the first
//! `offset` rows are skipped. An empty `key` means the start of the table.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::store::StoreItem;

use super::errors::{EngineError, EngineResult};

/// Index label used for cursors issued by full-table scans.
pub const SCAN_INDEX: &str = "scan";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub index: String,
    pub key: StoreItem,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub offset: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Cursor {
    pub fn new(index: impl Into<String>, key: StoreItem) -> Self {
        Self {
            index: index.into(),
            key,
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn encode(&self) -> EngineResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| EngineError::InvalidCursor(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(token: &str) -> EngineResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| EngineError::InvalidCursor(format!("not base64url: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::InvalidCursor(format!("unreadable: {}", e)))
    }

    /// Decodes `token` and checks it belongs to `index`.
    pub fn decode_for(token: &str, index: &str) -> EngineResult<Self> {
        let cursor = Self::decode(token)?;
        if cursor.index != index {
            return Err(EngineError::InvalidCursor(format!(
                "issued for '{}', used with '{}'",
                cursor.index, index
            )));
        }
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AttributeValue;

    fn key() -> StoreItem {
        let mut key = StoreItem::new();
        key.insert("pk".into(), AttributeValue::S("booking#b1".into()));
        key.insert("gsi1sk".into(), AttributeValue::S("2024-01-01".into()));
        key
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = Cursor::new("gsi1", key()).encode().unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(Cursor::decode_for(&token, "gsi1").unwrap().key, key());
    }

    #[test]
    fn test_scan_offset_survives_encoding() {
        let token = Cursor::new(SCAN_INDEX, StoreItem::new())
            .with_offset(4)
            .encode()
            .unwrap();
        let cursor = Cursor::decode_for(&token, SCAN_INDEX).unwrap();
        assert!(cursor.key.is_empty());
        assert_eq!(cursor.offset, 4);

        // Plain continuations omit the offset
        let token = Cursor::new("gsi1", key()).encode().unwrap();
        let raw = URL_SAFE_NO_PAD.decode(token).unwrap();
        assert!(!String::from_utf8(raw).unwrap().contains("offset"));
    }

    #[test]
    fn test_cursor_bound_to_index() {
        let token = Cursor::new("gsi1", key()).encode().unwrap();
        let err = Cursor::decode_for(&token, SCAN_INDEX).unwrap_err();
        assert_eq!(err.code(), "ST_ENGINE_INVALID_CURSOR");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Cursor::decode("***").is_err());
        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(Cursor::decode(&not_json).is_err());
    }
}
