//! List options and results.

use serde::{Deserialize, Serialize};

use crate::item::Item;

/// Options for `StorageEngine::list`.
///
/// - `limit`: page size requested from the store
/// - `count`: how many rows to gather across pages before returning
///
/// Queries: without `count`, `limit` is also the number of rows gathered.
/// Scans gather up to `count` (everything when absent), sort, and then
/// return at most `limit` rows of the sorted batch. With neither option the
/// whole matching set is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Rows a query gathers before returning; `None` means until exhausted.
    pub(crate) fn target(&self) -> Option<usize> {
        self.count.or(self.limit)
    }

    /// Rows a scan gathers before sorting. `limit` only slices the sorted
    /// batch, so it never stops the scan early.
    pub(crate) fn scan_target(&self) -> Option<usize> {
        self.count
    }

    /// Page size for the next store call, never past `target`.
    pub(crate) fn page_limit(&self, target: Option<usize>, gathered: usize) -> Option<usize> {
        let remaining = target.map(|t| t.saturating_sub(gathered));
        match (self.limit, remaining) {
            (Some(limit), Some(remaining)) => Some(limit.min(remaining)),
            (limit, remaining) => limit.or(remaining),
        }
    }
}

/// One page of decoded records plus the resume cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListResult {
    pub data: Vec<Item>,
    /// `None` once the source is exhausted
    pub cursor: Option<String>,
}

impl ListResult {
    pub fn empty() -> Self {
        Self::default()
    }
}
