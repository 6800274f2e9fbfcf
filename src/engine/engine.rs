//! The put/get/list/delete engine for one entity.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::compute::{install_defaults, uuid_generator, Action, ComputedFieldRegistry, IdGenerator};
use crate::index::{IndexPlanner, IndexSpec, PhysicalKey};
use crate::item::Item;
use crate::schema::{
    AttributeDescriptor, Schema, SchemaError, SchemaTypeMapper, SchemaValidator, ValidationDetails,
    ValidationMode, ValidationReport,
};
use crate::store::{
    connect, is_index_attribute, AttributeValue, Connection, QueryRequest, ScanRequest,
    StoreError, StoreItem, TableStore,
};

use super::codec::{decode_item, encode_item};
use super::cursor::{Cursor, SCAN_INDEX};
use super::errors::{EngineError, EngineResult};
use super::options::{ListOptions, ListResult};

/// Everything fixed about an entity at configuration time.
#[derive(Clone)]
pub struct EngineConfig {
    pub name: String,
    pub schema: Schema,
    pub indexes: Vec<IndexSpec>,
    pub computed: ComputedFieldRegistry,
    pub id_generator: Option<IdGenerator>,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, schema: Schema, indexes: Vec<IndexSpec>) -> Self {
        Self {
            name: name.into(),
            schema,
            indexes,
            computed: ComputedFieldRegistry::new(),
            id_generator: None,
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("name", &self.name)
            .field("indexes", &self.indexes)
            .field("computed", &self.computed)
            .finish()
    }
}

/// Storage engine for one entity in the shared table.
///
/// Holds no per-call state; every operation goes straight to the store.
#[derive(Debug)]
pub struct StorageEngine {
    name: String,
    schema: Schema,
    descriptor: AttributeDescriptor,
    planner: IndexPlanner,
    computed: ComputedFieldRegistry,
    store: Arc<dyn TableStore>,
}

impl StorageEngine {
    /// Builds the engine, rejecting unusable configuration up front.
    pub fn new(config: EngineConfig, store: Arc<dyn TableStore>) -> EngineResult<Self> {
        let EngineConfig {
            name,
            schema,
            indexes,
            mut computed,
            id_generator,
        } = config;

        if name.trim().is_empty() {
            return Err(EngineError::configuration("entity name is required"));
        }
        schema
            .validate_structure()
            .map_err(|e| EngineError::configuration(format!("entity '{}': {}", name, e)))?;

        if let Some(field) = schema.fields.keys().find(|f| is_index_attribute(f)) {
            return Err(EngineError::configuration(format!(
                "field '{}' collides with a physical key attribute",
                field
            )));
        }

        let descriptor = SchemaTypeMapper::map_schema(&schema)?;
        let planner = IndexPlanner::new(name.as_str(), indexes, &schema)?;
        install_defaults(
            &mut computed,
            &schema,
            id_generator.unwrap_or_else(uuid_generator),
        );

        info!(
            entity = %name,
            table = store.table_name(),
            indexes = planner.indexes().len(),
            computed = ?computed.tags(),
            "entity configured"
        );

        Ok(Self {
            name,
            schema,
            descriptor,
            planner,
            computed,
            store,
        })
    }

    /// Builds the engine over the store a connection points at.
    pub async fn connect(config: EngineConfig, connection: &Connection) -> EngineResult<Self> {
        let store = connect(connection).await?;
        Self::new(config, store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn descriptor(&self) -> &AttributeDescriptor {
        &self.descriptor
    }

    pub fn planner(&self) -> &IndexPlanner {
        &self.planner
    }

    pub fn computed(&self) -> &ComputedFieldRegistry {
        &self.computed
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Validates a record against this entity's schema.
    pub fn validate(&self, item: &Item, mode: ValidationMode) -> EngineResult<()> {
        SchemaValidator::new(&self.schema).validate(item, mode)?;
        Ok(())
    }

    /// Creates or overwrites the record `item` identifies and returns what
    /// the store now holds.
    pub async fn put(&self, item: &Item) -> EngineResult<Item> {
        let existing = self.get(item).await?;
        let action = match &existing {
            Some(stored)
                if self.planner.primary_key(stored) == self.planner.primary_key(item) =>
            {
                Action::Push
            }
            _ => Action::Create,
        };

        let record = self.computed.apply(item, existing.as_ref(), action);
        self.validate(&record, ValidationMode::Strict)?;

        let key = self.planner.primary_key(&record).ok_or_else(|| {
            let mut report = ValidationReport::default();
            for field in &self.planner.primary().partition_fields {
                report.push(ValidationDetails::missing_field(field.as_str()));
            }
            EngineError::Validation(SchemaError::validation(report))
        })?;

        let mut row = encode_item(&record, &self.descriptor)?;
        row.extend(self.planner.physical_attributes(&record));

        debug!(entity = %self.name, key = %key, %action, "put");
        self.store.put_item(row).await?;

        let stored = self.store.get_item(&key).await?.ok_or_else(|| {
            EngineError::Store(StoreError::Unavailable(format!(
                "record {} not readable after write",
                key
            )))
        })?;
        self.decode_row(&stored)
    }

    /// First record `item` resolves to, if any.
    pub async fn get(&self, item: &Item) -> EngineResult<Option<Item>> {
        let result = self.list(item, &ListOptions::new().with_limit(1)).await?;
        Ok(result.data.into_iter().next())
    }

    /// First record reachable through index `n` with the fields of `item`.
    ///
    /// `None` when the index cannot be resolved from `item`.
    pub async fn get_via(&self, item: &Item, n: usize) -> EngineResult<Option<Item>> {
        if n >= self.planner.indexes().len() {
            return Ok(None);
        }
        let Some(key) = self.planner.key_for(item, n) else {
            return Ok(None);
        };
        let result = self.query(&key, &ListOptions::new().with_limit(1)).await?;
        Ok(result.data.into_iter().next())
    }

    /// Records matching `item`.
    ///
    /// An empty item scans this entity's rows. Otherwise the first declared
    /// index `item` resolves is queried; when none resolves the result is
    /// empty. Pages are fetched one after another until the target is met or
    /// the source runs out, and a single cursor is returned for the combined
    /// position.
    pub async fn list(&self, item: &Item, options: &ListOptions) -> EngineResult<ListResult> {
        if item.is_empty() {
            return self.scan(options).await;
        }

        match self.planner.resolve(item) {
            Some(key) => self.query(&key, options).await,
            None => {
                debug!(entity = %self.name, fields = ?item.keys().collect::<Vec<_>>(), "no index resolves");
                Ok(ListResult::empty())
            }
        }
    }

    /// Deletes by the primary key fields present in `item`.
    ///
    /// Returns `false` without touching the store when the primary
    /// partition cannot be built.
    pub async fn delete(&self, item: &Item) -> EngineResult<bool> {
        let Some(key) = self.planner.primary_key(item) else {
            debug!(entity = %self.name, "delete skipped: primary key unresolved");
            return Ok(false);
        };

        let removed = self.store.delete_item(&key).await?;
        debug!(entity = %self.name, key = %key, removed, "delete");
        Ok(removed)
    }

    async fn query(&self, key: &PhysicalKey, options: &ListOptions) -> EngineResult<ListResult> {
        let index = self.planner.index_name(key.index);
        let mut cursor = options
            .cursor
            .as_deref()
            .map(|token| Cursor::decode_for(token, &index).map(|c| c.key))
            .transpose()?;

        let target = options.target();
        let mut data = Vec::new();
        let mut pages = 0;
        loop {
            let Some(limit) = next_page(options, target, data.len()) else {
                break;
            };

            let page = self
                .store
                .query(QueryRequest {
                    index: index.clone(),
                    partition: key.partition.clone(),
                    sort: key.condition.clone(),
                    cursor: cursor.take(),
                    limit,
                })
                .await?;
            pages += 1;

            for row in &page.items {
                data.push(self.decode_row(row)?);
            }
            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }

        debug!(
            entity = %self.name,
            index = %index,
            partition = %key.partition,
            rows = data.len(),
            pages,
            more = cursor.is_some(),
            "query"
        );
        self.finish(data, cursor, &index)
    }

    /// Gathers this entity's rows up to `count`, sorts them by the primary
    /// sort fields and returns at most `limit` of them.
    ///
    /// When the slice leaves rows of the batch unreturned, the cursor points
    /// back at the batch start with an offset; the batch is gathered again on
    /// resume. Otherwise it carries the store position after the batch.
    async fn scan(&self, options: &ListOptions) -> EngineResult<ListResult> {
        if options.count == Some(0) || options.limit == Some(0) {
            return Ok(ListResult::empty());
        }

        let (start, skip) = match options.cursor.as_deref() {
            Some(token) => {
                let cursor = Cursor::decode_for(token, SCAN_INDEX)?;
                let start = (!cursor.key.is_empty()).then_some(cursor.key);
                (start, cursor.offset)
            }
            None => (None, 0),
        };

        let prefix = self.planner.partition_prefix();
        let target = options.scan_target();
        let mut batch = Vec::new();
        let mut cursor = start.clone();
        let mut pages = 0;
        loop {
            let Some(limit) = next_page(options, target, batch.len()) else {
                break;
            };

            let page = self
                .store
                .scan(ScanRequest {
                    cursor: cursor.take(),
                    limit,
                })
                .await?;
            pages += 1;

            for row in &page.items {
                let ours = row
                    .get("pk")
                    .and_then(AttributeValue::as_s)
                    .is_some_and(|pk| pk.starts_with(&prefix));
                if ours {
                    batch.push(self.decode_row(row)?);
                }
            }
            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }

        // Ordered within the gathered batch, not across store positions
        batch.sort_by(|a, b| self.compare_primary_sort(a, b));

        let gathered = batch.len();
        let data: Vec<Item> = batch
            .into_iter()
            .skip(skip)
            .take(options.limit.unwrap_or(usize::MAX))
            .collect();
        let served = skip + data.len();

        debug!(
            entity = %self.name,
            gathered,
            returned = data.len(),
            pages,
            more = served < gathered || cursor.is_some(),
            "scan"
        );

        let next = if served < gathered {
            Some(Cursor::new(SCAN_INDEX, start.unwrap_or_default()).with_offset(served))
        } else {
            cursor.map(|key| Cursor::new(SCAN_INDEX, key))
        };
        let cursor = next.map(|c| c.encode()).transpose()?;
        Ok(ListResult { data, cursor })
    }

    fn compare_primary_sort(&self, a: &Item, b: &Item) -> Ordering {
        self.planner
            .primary_sort_text(a)
            .cmp(&self.planner.primary_sort_text(b))
    }

    fn finish(
        &self,
        data: Vec<Item>,
        cursor: Option<StoreItem>,
        index: &str,
    ) -> EngineResult<ListResult> {
        let cursor = cursor
            .map(|key| Cursor::new(index, key).encode())
            .transpose()?;
        Ok(ListResult { data, cursor })
    }

    /// Decodes a stored row and drops the physical key attributes.
    fn decode_row(&self, row: &StoreItem) -> EngineResult<Item> {
        let mut item = decode_item(row, &self.descriptor)?;
        item.retain(|field, _| !is_index_attribute(field));
        Ok(item)
    }
}

/// Page size for the next store call; `None` once `target` is met.
fn next_page(
    options: &ListOptions,
    target: Option<usize>,
    gathered: usize,
) -> Option<Option<usize>> {
    match target {
        Some(t) if gathered >= t => None,
        _ => Some(options.page_limit(target, gathered)),
    }
}
