//! In-process table emulator.
//!
//! Behaves like the remote store as far as the engine can observe: ordered
//! scans, sparse secondary indexes, key-condition queries ordered by the
//! index sort value, and page continuations that are only handed out while
//! rows remain. Optionally writes every mutation through to a JSON file so
//! the CLI can keep state between runs.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::attribute::{AttributeValue, StoreItem};
use super::errors::{StoreError, StoreResult};
use super::table::{
    index_number, partition_attribute, sort_attribute, Page, QueryRequest, ScanRequest,
    TableKey, TableStore,
};

/// Position of a row inside one index: sort value, then table key.
type IndexPosition = (Option<String>, TableKey);

#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    rows: RwLock<BTreeMap<TableKey, StoreItem>>,
    path: Option<PathBuf>,
}

impl MemoryTable {
    /// Empty, purely in-memory table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(BTreeMap::new()),
            path: None,
        }
    }

    /// Table backed by a JSON file; a missing file starts empty.
    pub async fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let rows = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let items: Vec<StoreItem> = serde_json::from_slice(&bytes)?;
                let mut rows = BTreeMap::new();
                for item in items {
                    rows.insert(TableKey::from_item(&item)?, item);
                }
                rows
            }
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(table = %path.display(), rows = rows.len(), "opened file-backed table");

        Ok(Self {
            name: name.into(),
            rows: RwLock::new(rows),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of stored rows (all entities).
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    async fn persist(&self, rows: &BTreeMap<TableKey, StoreItem>) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let items: Vec<&StoreItem> = rows.values().collect();
        let bytes = serde_json::to_vec_pretty(&items)?;

        // Temp file + rename so a crash never leaves a half-written table
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Builds a continuation from the last returned row: table key plus the
/// attributes of the index being read.
fn continuation(item: &StoreItem, index_attrs: &[String]) -> StoreItem {
    let mut key = StoreItem::new();
    for attr in ["pk", "sk"].iter().map(|s| s.to_string()).chain(index_attrs.iter().cloned()) {
        if let Some(value) = item.get(&attr) {
            key.insert(attr, value.clone());
        }
    }
    key
}

fn paginate<P>(
    rows: Vec<(P, &StoreItem)>,
    limit: Option<usize>,
    cursor_for: impl Fn(&StoreItem) -> StoreItem,
) -> Page {
    let take = limit.unwrap_or(usize::MAX).max(1);
    let has_more = rows.len() > take;

    let items: Vec<StoreItem> = rows.iter().take(take).map(|(_, item)| (*item).clone()).collect();
    let cursor = if has_more {
        items.last().map(cursor_for)
    } else {
        None
    };

    Page { items, cursor }
}

#[async_trait]
impl TableStore for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    async fn put_item(&self, item: StoreItem) -> StoreResult<()> {
        let key = TableKey::from_item(&item)?;
        let mut rows = self.rows.write().await;
        rows.insert(key, item);
        self.persist(&rows).await
    }

    async fn get_item(&self, key: &TableKey) -> StoreResult<Option<StoreItem>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn query(&self, request: QueryRequest) -> StoreResult<Page> {
        let n = index_number(&request.index)?;
        let partition_attr = partition_attribute(n);
        let sort_attr = sort_attribute(n);

        let after: Option<IndexPosition> = match &request.cursor {
            Some(cursor) => {
                let key = TableKey::from_item(cursor)
                    .map_err(|e| StoreError::InvalidContinuation(e.to_string()))?;
                let sort = cursor.get(&sort_attr).and_then(AttributeValue::as_s).map(str::to_string);
                Some((sort, key))
            }
            None => None,
        };

        let rows = self.rows.read().await;
        let mut matches: Vec<(IndexPosition, &StoreItem)> = rows
            .iter()
            .filter(|(_, item)| {
                item.get(&partition_attr).and_then(AttributeValue::as_s)
                    == Some(request.partition.as_str())
            })
            .filter_map(|(key, item)| {
                let sort = item.get(&sort_attr).and_then(AttributeValue::as_s).map(str::to_string);
                if let Some(condition) = &request.sort {
                    match &sort {
                        Some(s) if condition.matches(s) => {}
                        _ => return None,
                    }
                }
                Some(((sort, key.clone()), item))
            })
            .filter(|(position, _)| after.as_ref().map_or(true, |a| position > a))
            .collect();

        matches.sort_by(|a, b| a.0.cmp(&b.0));

        let index_attrs = [partition_attr, sort_attr];
        let page = paginate(matches, request.limit, |item| continuation(item, &index_attrs));

        debug!(
            index = %request.index,
            partition = %request.partition,
            returned = page.items.len(),
            more = page.cursor.is_some(),
            "query page"
        );
        Ok(page)
    }

    async fn scan(&self, request: ScanRequest) -> StoreResult<Page> {
        let start = match &request.cursor {
            Some(cursor) => Bound::Excluded(
                TableKey::from_item(cursor)
                    .map_err(|e| StoreError::InvalidContinuation(e.to_string()))?,
            ),
            None => Bound::Unbounded,
        };

        let rows = self.rows.read().await;
        let matches: Vec<(&TableKey, &StoreItem)> =
            rows.range((start, Bound::Unbounded)).collect();

        let page = paginate(matches, request.limit, |item| continuation(item, &[]));
        debug!(returned = page.items.len(), more = page.cursor.is_some(), "scan page");
        Ok(page)
    }

    async fn delete_item(&self, key: &TableKey) -> StoreResult<bool> {
        let mut rows = self.rows.write().await;
        let removed = rows.remove(key).is_some();
        if removed {
            self.persist(&rows).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SortCondition;
    use tempfile::TempDir;

    fn row(pk: &str, sk: Option<&str>, extra: &[(&str, &str)]) -> StoreItem {
        let mut item = TableKey::new(pk, sk.map(str::to_string)).to_item();
        for (k, v) in extra {
            item.insert(k.to_string(), AttributeValue::S(v.to_string()));
        }
        item
    }

    fn pks(page: &Page) -> Vec<String> {
        page.items
            .iter()
            .map(|i| i.get("pk").and_then(AttributeValue::as_s).unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_put_get_replace() {
        let table = MemoryTable::new("t");
        table.put_item(row("a", None, &[("v", "1")])).await.unwrap();
        table.put_item(row("a", None, &[("v", "2")])).await.unwrap();

        let got = table.get_item(&TableKey::new("a", None)).await.unwrap().unwrap();
        assert_eq!(got.get("v"), Some(&AttributeValue::S("2".into())));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_without_pk_rejected() {
        let table = MemoryTable::new("t");
        let err = table.put_item(StoreItem::new()).await.unwrap_err();
        assert_eq!(err.code(), "ST_STORE_MISSING_KEY");
    }

    #[tokio::test]
    async fn test_scan_pages_in_key_order() {
        let table = MemoryTable::new("t");
        for pk in ["c", "a", "e", "b", "d"] {
            table.put_item(row(pk, None, &[])).await.unwrap();
        }

        let first = table
            .scan(ScanRequest { cursor: None, limit: Some(2) })
            .await
            .unwrap();
        assert_eq!(pks(&first), vec!["a", "b"]);
        assert!(first.cursor.is_some());

        let second = table
            .scan(ScanRequest { cursor: first.cursor, limit: Some(3) })
            .await
            .unwrap();
        assert_eq!(pks(&second), vec!["c", "d", "e"]);
        assert!(second.cursor.is_none());
    }

    #[tokio::test]
    async fn test_query_secondary_index_sparse_and_ordered() {
        let table = MemoryTable::new("t");
        table
            .put_item(row("1", None, &[("gsi1pk", "g#1"), ("gsi1sk", "2024-03")]))
            .await
            .unwrap();
        table
            .put_item(row("2", None, &[("gsi1pk", "g#1"), ("gsi1sk", "2024-01")]))
            .await
            .unwrap();
        table
            .put_item(row("3", None, &[("gsi1pk", "g#2"), ("gsi1sk", "2024-02")]))
            .await
            .unwrap();
        // Not in gsi1 at all
        table.put_item(row("4", None, &[])).await.unwrap();

        let page = table
            .query(QueryRequest {
                index: "gsi1".into(),
                partition: "g#1".into(),
                sort: None,
                cursor: None,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(pks(&page), vec!["2", "1"]);

        let page = table
            .query(QueryRequest {
                index: "gsi1".into(),
                partition: "g#1".into(),
                sort: Some(SortCondition::BeginsWith("2024-03".into())),
                cursor: None,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(pks(&page), vec!["1"]);
    }

    #[tokio::test]
    async fn test_query_continuation_has_no_gaps() {
        let table = MemoryTable::new("t");
        // Equal sort values force the table-key tiebreak
        for pk in ["e", "d", "c", "b", "a"] {
            table
                .put_item(row(pk, None, &[("gsi2pk", "x"), ("gsi2sk", "same")]))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = table
                .query(QueryRequest {
                    index: "gsi2".into(),
                    partition: "x".into(),
                    sort: None,
                    cursor,
                    limit: Some(2),
                })
                .await
                .unwrap();
            seen.extend(pks(&page));
            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_unknown_index() {
        let table = MemoryTable::new("t");
        let err = table
            .query(QueryRequest {
                index: "gsi9".into(),
                partition: "x".into(),
                sort: None,
                cursor: None,
                limit: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ST_STORE_UNKNOWN_INDEX");
    }

    #[tokio::test]
    async fn test_delete_reports_removal() {
        let table = MemoryTable::new("t");
        table.put_item(row("a", Some("1"), &[])).await.unwrap();

        assert!(!table.delete_item(&TableKey::new("a", None)).await.unwrap());
        assert!(table.delete_item(&TableKey::new("a", Some("1".into()))).await.unwrap());
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn test_file_backed_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("table.json");

        {
            let table = MemoryTable::open("t", &path).await.unwrap();
            table.put_item(row("a", None, &[("v", "1")])).await.unwrap();
            table.put_item(row("b", None, &[])).await.unwrap();
            table.delete_item(&TableKey::new("b", None)).await.unwrap();
        }

        let reopened = MemoryTable::open("t", &path).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.path(), Some(path.as_path()));
        let got = reopened.get_item(&TableKey::new("a", None)).await.unwrap();
        assert!(got.is_some());
    }
}
