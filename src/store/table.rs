//! Physical table protocol.
//!
//! One table holds every entity. Index 0 is the table's own key (`pk`/`sk`);
//! secondary index N (1..=4) reads the `gsi{N}pk`/`gsi{N}sk` attributes of
//! each row. Rows lacking an index's partition attribute are not in that
//! index.

use std::fmt;

use async_trait::async_trait;

use super::attribute::{AttributeValue, StoreItem};
use super::errors::{StoreError, StoreResult};

/// Highest secondary index number supported by the convention.
pub const MAX_SECONDARY_INDEXES: usize = 4;

/// Store-side name of the primary index.
pub const PRIMARY_INDEX: &str = "primary";

/// Store-side index name for index number `n` (0 = primary).
pub fn index_name(n: usize) -> String {
    if n == 0 {
        PRIMARY_INDEX.to_string()
    } else {
        format!("gsi{}", n)
    }
}

/// Parses a store-side index name back to its number.
pub fn index_number(name: &str) -> StoreResult<usize> {
    if name == PRIMARY_INDEX {
        return Ok(0);
    }
    name.strip_prefix("gsi")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| (1..=MAX_SECONDARY_INDEXES).contains(n))
        .ok_or_else(|| StoreError::UnknownIndex(name.to_string()))
}

/// Partition attribute name for index number `n`.
pub fn partition_attribute(n: usize) -> String {
    if n == 0 {
        "pk".to_string()
    } else {
        format!("gsi{}pk", n)
    }
}

/// Sort attribute name for index number `n`.
pub fn sort_attribute(n: usize) -> String {
    if n == 0 {
        "sk".to_string()
    } else {
        format!("gsi{}sk", n)
    }
}

/// True for attribute names the convention reserves for index keys, on any
/// index whether or not an entity declares it.
pub fn is_index_attribute(name: &str) -> bool {
    (0..=MAX_SECONDARY_INDEXES).any(|n| name == partition_attribute(n) || name == sort_attribute(n))
}

/// Unique identity of a row in the table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableKey {
    pub pk: String,
    pub sk: Option<String>,
}

impl TableKey {
    pub fn new(pk: impl Into<String>, sk: Option<String>) -> Self {
        Self { pk: pk.into(), sk }
    }

    /// Reads the table key attributes of a stored row.
    pub fn from_item(item: &StoreItem) -> StoreResult<Self> {
        let pk = item
            .get("pk")
            .and_then(AttributeValue::as_s)
            .ok_or_else(|| StoreError::MissingKey("pk".into()))?;
        let sk = item.get("sk").and_then(AttributeValue::as_s).map(str::to_string);
        Ok(Self::new(pk, sk))
    }

    /// Writes the key back as attributes.
    pub fn to_item(&self) -> StoreItem {
        let mut item = StoreItem::new();
        item.insert("pk".into(), AttributeValue::S(self.pk.clone()));
        if let Some(sk) = &self.sk {
            item.insert("sk".into(), AttributeValue::S(sk.clone()));
        }
        item
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sk {
            Some(sk) => write!(f, "{}/{}", self.pk, sk),
            None => write!(f, "{}", self.pk),
        }
    }
}

/// Condition on an index's sort attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    Equals(String),
    BeginsWith(String),
}

impl SortCondition {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            SortCondition::Equals(v) => value == v,
            SortCondition::BeginsWith(prefix) => value.starts_with(prefix.as_str()),
        }
    }
}

/// Key-condition query against one index.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub index: String,
    pub partition: String,
    pub sort: Option<SortCondition>,
    /// Continuation returned by the previous page
    pub cursor: Option<StoreItem>,
    pub limit: Option<usize>,
}

/// Full-table scan page request.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub cursor: Option<StoreItem>,
    pub limit: Option<usize>,
}

/// One page of rows plus the position to resume from.
///
/// `cursor` is `None` once the source is exhausted.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<StoreItem>,
    pub cursor: Option<StoreItem>,
}

/// The physical store the engine talks to.
///
/// `put_item` is a full replace keyed on the row's `pk`/`sk`. Implementations
/// perform no conditional checks and no retries.
#[async_trait]
pub trait TableStore: Send + Sync + fmt::Debug {
    /// Physical table name
    fn table_name(&self) -> &str;

    async fn put_item(&self, item: StoreItem) -> StoreResult<()>;

    async fn get_item(&self, key: &TableKey) -> StoreResult<Option<StoreItem>>;

    async fn query(&self, request: QueryRequest) -> StoreResult<Page>;

    async fn scan(&self, request: ScanRequest) -> StoreResult<Page>;

    /// Returns whether a row was removed.
    async fn delete_item(&self, key: &TableKey) -> StoreResult<bool>;
}
