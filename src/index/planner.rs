//! Index planner
//!
//! Turns declared indexes into physical key attributes and decides, for a
//! partial item, which index it can address.
//!
//! Key resolution for one index:
//! 1. Every partition field must be present, else the index is unusable
//! 2. Sort fields are taken greedily in declared order, stopping at the first
//!    absent one (a key prefix, never an arbitrary subset)
//!
//! Physical values:
//! - partition: `{entity}#{v1}#{v2}...`
//! - sort: `{v1}#{v2}...` (absent when the index has no sort fields)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::Item;
use crate::schema::Schema;
use crate::store::{
    index_name, partition_attribute, sort_attribute, AttributeValue, SortCondition, StoreItem,
    TableKey, MAX_SECONDARY_INDEXES,
};

use super::errors::{IndexError, IndexResult};

/// Separator between composite key parts.
pub const KEY_SEPARATOR: &str = "#";

/// One field or an ordered list of fields, as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyFields {
    One(String),
    Many(Vec<String>),
}

impl KeyFields {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            KeyFields::One(f) => vec![f],
            KeyFields::Many(fs) => fs,
        }
    }
}

impl From<&str> for KeyFields {
    fn from(field: &str) -> Self {
        KeyFields::One(field.to_string())
    }
}

impl From<String> for KeyFields {
    fn from(field: String) -> Self {
        KeyFields::One(field)
    }
}

impl From<Vec<&str>> for KeyFields {
    fn from(fields: Vec<&str>) -> Self {
        KeyFields::Many(fields.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for KeyFields {
    fn from(fields: Vec<String>) -> Self {
        KeyFields::Many(fields)
    }
}

/// An index as the caller declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub partition: KeyFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<KeyFields>,
}

impl IndexSpec {
    pub fn new(partition: impl Into<KeyFields>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: impl Into<KeyFields>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// A normalized index: field lists are always arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub partition_fields: Vec<String>,
    pub sort_fields: Vec<String>,
}

impl IndexDefinition {
    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.partition_fields.iter().chain(self.sort_fields.iter())
    }
}

/// A partial item split against one index.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolatedKey {
    /// Key fields found in the item (partition, then the sort prefix)
    pub key: Item,
    /// Every other field of the item
    pub remainder: Item,
    /// All partition fields were present
    pub resolved: bool,
    /// Number of leading sort fields included
    pub sort_depth: usize,
}

/// Physical key values for one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalKey {
    pub index: usize,
    pub partition: String,
    /// Sort value from the available prefix, if any sort field was present
    pub sort: Option<String>,
    /// Read condition: exact match for a full sort key, prefix otherwise
    pub condition: Option<SortCondition>,
}

/// Index planner for one entity.
#[derive(Debug, Clone)]
pub struct IndexPlanner {
    entity: String,
    indexes: Vec<IndexDefinition>,
}

impl IndexPlanner {
    /// Normalizes declared indexes without looking at a schema.
    pub fn normalize(specs: Vec<IndexSpec>) -> IndexResult<Vec<IndexDefinition>> {
        if specs.is_empty() {
            return Err(IndexError::NoIndexes);
        }
        if specs.len() > MAX_SECONDARY_INDEXES + 1 {
            return Err(IndexError::TooManyIndexes {
                count: specs.len(),
                max: MAX_SECONDARY_INDEXES,
            });
        }

        specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let definition = IndexDefinition {
                    partition_fields: spec.partition.into_vec(),
                    sort_fields: spec.sort.map(KeyFields::into_vec).unwrap_or_default(),
                };

                if definition.partition_fields.is_empty() {
                    return Err(IndexError::EmptyPartition(i));
                }

                let mut seen = std::collections::HashSet::new();
                for field in definition.fields() {
                    if !seen.insert(field) {
                        return Err(IndexError::DuplicateField {
                            index: i,
                            field: field.clone(),
                        });
                    }
                }

                Ok(definition)
            })
            .collect()
    }

    /// Builds a planner, checking every key field against the schema.
    pub fn new(entity: impl Into<String>, specs: Vec<IndexSpec>, schema: &Schema) -> IndexResult<Self> {
        let entity = entity.into();
        if entity.is_empty() || entity.contains(KEY_SEPARATOR) {
            return Err(IndexError::InvalidEntityName(entity));
        }

        let indexes = Self::normalize(specs)?;
        for (i, index) in indexes.iter().enumerate() {
            if let Some(field) = index.fields().find(|f| !schema.has_field(f)) {
                return Err(IndexError::UnknownField {
                    index: i,
                    field: field.clone(),
                });
            }
        }

        Ok(Self { entity, indexes })
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    pub fn primary(&self) -> &IndexDefinition {
        &self.indexes[0]
    }

    /// Prefix every partition value of this entity starts with.
    pub fn partition_prefix(&self) -> String {
        format!("{}{}", self.entity, KEY_SEPARATOR)
    }

    /// Physical attribute names of index `n`.
    pub fn physical_fields(&self, n: usize) -> (String, String) {
        (partition_attribute(n), sort_attribute(n))
    }

    pub fn index_name(&self, n: usize) -> String {
        index_name(n)
    }

    /// Splits `item` into key fields and remainder for index `n`.
    pub fn isolate_key(&self, item: &Item, n: usize) -> IsolatedKey {
        let index = &self.indexes[n];
        let mut key = Item::new();

        for field in &index.partition_fields {
            match item.get(field).filter(|v| key_text(v).is_some()) {
                Some(value) => {
                    key.insert(field.clone(), value.clone());
                }
                None => {
                    return IsolatedKey {
                        key: Item::new(),
                        remainder: item.clone(),
                        resolved: false,
                        sort_depth: 0,
                    };
                }
            }
        }

        let mut sort_depth = 0;
        for field in &index.sort_fields {
            match item.get(field).filter(|v| key_text(v).is_some()) {
                Some(value) => {
                    key.insert(field.clone(), value.clone());
                    sort_depth += 1;
                }
                None => break,
            }
        }

        let remainder = item
            .iter()
            .filter(|(k, _)| !key.contains_key(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        IsolatedKey {
            key,
            remainder,
            resolved: true,
            sort_depth,
        }
    }

    /// Physical key values of index `n` for `item`, if the index resolves.
    pub fn key_for(&self, item: &Item, n: usize) -> Option<PhysicalKey> {
        let isolated = self.isolate_key(item, n);
        if !isolated.resolved {
            return None;
        }

        let index = &self.indexes[n];
        let partition_parts = index
            .partition_fields
            .iter()
            .filter_map(|f| isolated.key.get(f).and_then(key_text));
        let partition = std::iter::once(self.entity.clone())
            .chain(partition_parts)
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR);

        let sort_parts: Vec<String> = index.sort_fields[..isolated.sort_depth]
            .iter()
            .filter_map(|f| isolated.key.get(f).and_then(key_text))
            .collect();

        let (sort, condition) = if sort_parts.is_empty() {
            (None, None)
        } else {
            let value = sort_parts.join(KEY_SEPARATOR);
            let condition = if isolated.sort_depth == index.sort_fields.len() {
                SortCondition::Equals(value.clone())
            } else {
                SortCondition::BeginsWith(format!("{}{}", value, KEY_SEPARATOR))
            };
            (Some(value), Some(condition))
        };

        Some(PhysicalKey {
            index: n,
            partition,
            sort,
            condition,
        })
    }

    /// First index, in declaration order, that `item` can address.
    pub fn resolve(&self, item: &Item) -> Option<PhysicalKey> {
        (0..self.indexes.len()).find_map(|n| self.key_for(item, n))
    }

    /// Table key (index 0) built from whatever primary fields `item` carries.
    pub fn primary_key(&self, item: &Item) -> Option<TableKey> {
        self.key_for(item, 0)
            .map(|key| TableKey::new(key.partition, key.sort))
    }

    /// All index attributes a write must stamp on the stored row.
    pub fn physical_attributes(&self, item: &Item) -> StoreItem {
        let mut attrs = StoreItem::new();
        for n in 0..self.indexes.len() {
            if let Some(key) = self.key_for(item, n) {
                let (p, s) = self.physical_fields(n);
                attrs.insert(p, AttributeValue::S(key.partition));
                if let Some(sort) = key.sort {
                    attrs.insert(s, AttributeValue::S(sort));
                }
            }
        }
        attrs
    }

    /// Ordering key of an item along the primary sort fields
    /// (string-compared concatenation).
    pub fn primary_sort_text(&self, item: &Item) -> String {
        self.primary()
            .sort_fields
            .iter()
            .map(|f| item.get(f).and_then(key_text).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }
}

/// Text of a value usable as a key part. Only scalars qualify.
pub fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::into_item;
    use crate::schema::SchemaNode;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::entity()
            .with_field("groupId", SchemaNode::String)
            .with_field("region", SchemaNode::String)
            .with_field("day", SchemaNode::String)
            .with_field("slot", SchemaNode::Integer)
            .with_field("name", SchemaNode::String)
    }

    fn planner() -> IndexPlanner {
        IndexPlanner::new(
            "booking",
            vec![
                IndexSpec::new("id"),
                IndexSpec::new("groupId").with_sort("dateCreated"),
                IndexSpec::new(vec!["region", "groupId"]).with_sort(vec!["day", "slot"]),
            ],
            &schema(),
        )
        .unwrap()
    }

    fn item(v: Value) -> Item {
        into_item(v).unwrap()
    }

    #[test]
    fn test_normalize_single_fields_to_arrays() {
        let defs = IndexPlanner::normalize(vec![IndexSpec::new("id").with_sort("day")]).unwrap();
        assert_eq!(defs[0].partition_fields, vec!["id"]);
        assert_eq!(defs[0].sort_fields, vec!["day"]);
    }

    #[test]
    fn test_normalize_from_json_declarations() {
        let specs: Vec<IndexSpec> = serde_json::from_value(json!([
            { "partition": "id" },
            { "partition": ["region", "groupId"], "sort": "day" }
        ]))
        .unwrap();
        let defs = IndexPlanner::normalize(specs).unwrap();
        assert!(defs[0].sort_fields.is_empty());
        assert_eq!(defs[1].partition_fields, vec!["region", "groupId"]);
        assert_eq!(defs[1].sort_fields, vec!["day"]);
    }

    #[test]
    fn test_normalize_rejects_bad_declarations() {
        assert_eq!(IndexPlanner::normalize(vec![]), Err(IndexError::NoIndexes));

        let six = (0..6).map(|_| IndexSpec::new("id")).collect();
        assert!(matches!(
            IndexPlanner::normalize(six),
            Err(IndexError::TooManyIndexes { count: 6, .. })
        ));

        let empty = vec![IndexSpec::new(Vec::<String>::new())];
        assert_eq!(IndexPlanner::normalize(empty), Err(IndexError::EmptyPartition(0)));

        let dup = vec![IndexSpec::new("id").with_sort("id")];
        assert!(matches!(
            IndexPlanner::normalize(dup),
            Err(IndexError::DuplicateField { index: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_field_and_entity_name() {
        let err = IndexPlanner::new("booking", vec![IndexSpec::new("nope")], &schema()).unwrap_err();
        assert_eq!(err.code(), "ST_INDEX_UNKNOWN_FIELD");

        let err = IndexPlanner::new("a#b", vec![IndexSpec::new("id")], &schema()).unwrap_err();
        assert_eq!(err, IndexError::InvalidEntityName("a#b".into()));
    }

    #[test]
    fn test_isolate_key_missing_partition() {
        let isolated = planner().isolate_key(&item(json!({"name": "x"})), 0);
        assert!(!isolated.resolved);
        assert!(isolated.key.is_empty());
        assert_eq!(isolated.remainder.len(), 1);
    }

    #[test]
    fn test_isolate_key_sort_prefix_only() {
        let p = planner();
        // slot present but day absent: slot must not be used
        let isolated = p.isolate_key(
            &item(json!({"region": "eu", "groupId": "g1", "slot": 3, "name": "x"})),
            2,
        );
        assert!(isolated.resolved);
        assert_eq!(isolated.sort_depth, 0);
        assert_eq!(isolated.key.len(), 2);
        assert_eq!(isolated.remainder.len(), 2);

        let isolated = p.isolate_key(
            &item(json!({"region": "eu", "groupId": "g1", "day": "mon"})),
            2,
        );
        assert_eq!(isolated.sort_depth, 1);
    }

    #[test]
    fn test_key_for_conditions() {
        let p = planner();

        let full = p
            .key_for(&item(json!({"region": "eu", "groupId": "g1", "day": "mon", "slot": 2})), 2)
            .unwrap();
        assert_eq!(full.partition, "booking#eu#g1");
        assert_eq!(full.sort.as_deref(), Some("mon#2"));
        assert_eq!(full.condition, Some(SortCondition::Equals("mon#2".into())));

        let prefix = p
            .key_for(&item(json!({"region": "eu", "groupId": "g1", "day": "mon"})), 2)
            .unwrap();
        assert_eq!(prefix.condition, Some(SortCondition::BeginsWith("mon#".into())));

        let bare = p.key_for(&item(json!({"region": "eu", "groupId": "g1"})), 2).unwrap();
        assert_eq!(bare.sort, None);
        assert_eq!(bare.condition, None);
    }

    #[test]
    fn test_resolve_first_eligible_in_declaration_order() {
        let p = planner();

        // id present: primary wins even though groupId is also present
        let key = p.resolve(&item(json!({"id": "b1", "groupId": "g1"}))).unwrap();
        assert_eq!(key.index, 0);

        // no id: index 1 (groupId) is the first that resolves
        let key = p.resolve(&item(json!({"region": "eu", "groupId": "g1"}))).unwrap();
        assert_eq!(key.index, 1);

        let key = p.resolve(&item(json!({"region": "eu", "day": "mon"})));
        assert!(key.is_none());
    }

    #[test]
    fn test_physical_attributes_sparse() {
        let p = planner();
        let attrs = p.physical_attributes(&item(json!({
            "id": "b1",
            "groupId": "g1",
            "dateCreated": "2024-01-01T00:00:00Z"
        })));

        assert_eq!(attrs.get("pk"), Some(&AttributeValue::S("booking#b1".into())));
        assert!(!attrs.contains_key("sk"));
        assert_eq!(attrs.get("gsi1pk"), Some(&AttributeValue::S("booking#g1".into())));
        assert_eq!(
            attrs.get("gsi1sk"),
            Some(&AttributeValue::S("2024-01-01T00:00:00Z".into()))
        );
        // region missing: row is not in gsi2
        assert!(!attrs.contains_key("gsi2pk"));
    }

    #[test]
    fn test_primary_key_and_physical_names() {
        let p = planner();
        assert_eq!(
            p.primary_key(&item(json!({"id": "b1"}))),
            Some(TableKey::new("booking#b1", None))
        );
        assert_eq!(p.primary_key(&item(json!({"name": "x"}))), None);
        assert_eq!(p.physical_fields(2), ("gsi2pk".to_string(), "gsi2sk".to_string()));
        assert_eq!(p.index_name(1), "gsi1");
    }

    #[test]
    fn test_non_scalar_values_are_not_keys() {
        let p = planner();
        assert!(p.key_for(&item(json!({"id": {"nested": 1}})), 0).is_none());
        assert!(p.key_for(&item(json!({"id": null})), 0).is_none());
    }
}
