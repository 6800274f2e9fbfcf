//! Untyped item model.
//!
//! Items are plain JSON objects: the field → value map the schema describes.
//! `serde_json::Value` already is the small tagged union (map / list /
//! scalar) the merge rules are defined over.

use serde_json::{Map, Value};

/// An untyped record: field name → value.
pub type Item = Map<String, Value>;

/// Deep-merges `source` over `target`.
///
/// - map + map: merged key by key, recursively
/// - anything else: the source value replaces the target wholesale
///   (lists are not merged element-wise)
pub fn deep_merge(target: &mut Item, source: &Item) {
    for (key, src) in source {
        if let (Some(Value::Object(dst)), Value::Object(src_map)) = (target.get_mut(key), src) {
            deep_merge(dst, src_map);
            continue;
        }
        target.insert(key.clone(), src.clone());
    }
}

/// Returns a merged copy.
pub fn merged(target: &Item, source: &Item) -> Item {
    let mut out = target.clone();
    deep_merge(&mut out, source);
    out
}

/// Converts a JSON value into an item, if it is an object.
pub fn into_item(value: Value) -> Option<Item> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
