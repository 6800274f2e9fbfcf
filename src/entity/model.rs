//! Entity models: typed configuration plus a shared engine.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::compute::{Action, ComputedFieldRegistry, IdGenerator};
use crate::engine::{EngineConfig, ListOptions, StorageEngine};
use crate::index::IndexSpec;
use crate::item::Item;
use crate::schema::Schema;
use crate::store::{connect, Connection, TableStore};

use super::errors::{EntityError, EntityResult};
use super::instance::{Entity, EntityState};

/// Builds an [`EntityModel`]. Every missing piece is reported by `build`.
pub struct EntityModelBuilder<T = Item> {
    name: String,
    schema: Option<Schema>,
    indexes: Vec<IndexSpec>,
    connection: Option<Connection>,
    store: Option<Arc<dyn TableStore>>,
    computed: ComputedFieldRegistry,
    id_generator: Option<IdGenerator>,
    _record: PhantomData<fn() -> T>,
}

impl<T> EntityModelBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            indexes: Vec::new(),
            connection: None,
            store: None,
            computed: ComputedFieldRegistry::new(),
            id_generator: None,
            _record: PhantomData,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Index 0 is the primary index.
    pub fn with_indexes(mut self, indexes: impl IntoIterator<Item = IndexSpec>) -> Self {
        self.indexes = indexes.into_iter().collect();
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Uses an already opened store; takes precedence over a connection.
    pub fn with_store(mut self, store: Arc<dyn TableStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_generator = Some(Arc::new(generator));
        self
    }

    /// Registers a computed field function under `tag`.
    ///
    /// Functions run in registration order, ahead of the `id`, `dateCreated`
    /// and `dateUpdated` defaults appended at build time, so on create they
    /// see no generated id yet. Registering under one of those tags replaces
    /// that default.
    pub fn with_compute<F>(mut self, tag: &str, func: F) -> Self
    where
        F: Fn(&Item, Option<&Item>, Action) -> Item + Send + Sync + 'static,
    {
        self.computed.register(func, Some(tag));
        self
    }

    pub async fn build(self) -> EntityResult<EntityModel<T>> {
        let missing = |what: &str| {
            EntityError::Configuration(format!("entity '{}': {} is required", self.name, what))
        };

        let schema = self.schema.clone().ok_or_else(|| missing("schema"))?;
        if self.indexes.is_empty() {
            return Err(missing("at least one index"));
        }
        let store = match (&self.store, &self.connection) {
            (Some(store), _) => Arc::clone(store),
            (None, Some(connection)) => connect(connection)
                .await
                .map_err(|e| EntityError::Configuration(e.to_string()))?,
            (None, None) => return Err(missing("connection")),
        };

        let config = EngineConfig {
            name: self.name,
            schema,
            indexes: self.indexes,
            computed: self.computed,
            id_generator: self.id_generator,
        };
        let engine = StorageEngine::new(config, store)?;

        Ok(EntityModel {
            engine: Arc::new(engine),
            _record: PhantomData,
        })
    }
}

/// A configured entity type. Cheap to clone; clones share one engine.
pub struct EntityModel<T = Item> {
    engine: Arc<StorageEngine>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityModel<T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EntityModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityModel")
            .field("name", &self.engine.name())
            .finish()
    }
}

/// Typed entities from one `list` call plus the resume cursor.
#[derive(Debug)]
pub struct EntityList<T = Item> {
    pub items: Vec<Entity<T>>,
    pub cursor: Option<String>,
}

impl<T> EntityModel<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn builder(name: impl Into<String>) -> EntityModelBuilder<T> {
        EntityModelBuilder::new(name)
    }

    /// Wraps an engine built elsewhere.
    pub fn from_engine(engine: Arc<StorageEngine>) -> Self {
        Self {
            engine,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn engine(&self) -> &Arc<StorageEngine> {
        &self.engine
    }

    /// An empty, detached entity.
    pub fn new_entity(&self) -> Entity<T> {
        Entity::new(Arc::clone(&self.engine), Item::new(), EntityState::Detached)
    }

    /// An entity populated from a typed record.
    pub fn entity_from(&self, record: &T) -> EntityResult<Entity<T>> {
        self.entity_from_item(to_item(record)?)
    }

    /// An entity populated from raw fields, checked against the schema.
    pub fn entity_from_item(&self, item: Item) -> EntityResult<Entity<T>> {
        let mut entity = self.new_entity();
        entity.set_data(item)?;
        Ok(entity)
    }

    /// Stored records matching `partial`, as persisted entities.
    pub async fn list(&self, partial: &Item, options: &ListOptions) -> EntityResult<EntityList<T>> {
        let result = self.engine.list(partial, options).await?;
        let items = result
            .data
            .into_iter()
            .map(|row| Entity::new(Arc::clone(&self.engine), row, EntityState::Persisted))
            .collect();
        Ok(EntityList {
            items,
            cursor: result.cursor,
        })
    }

    /// First stored record matching `partial`.
    pub async fn get(&self, partial: &Item) -> EntityResult<Option<Entity<T>>> {
        Ok(self
            .engine
            .get(partial)
            .await?
            .map(|row| Entity::new(Arc::clone(&self.engine), row, EntityState::Persisted)))
    }
}

/// Serializes a typed record to fields, dropping top-level nulls (an unset
/// optional is an absent field).
pub(crate) fn to_item<T: Serialize>(record: &T) -> EntityResult<Item> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Ok(map)
        }
        other => Err(EntityError::Decode(format!(
            "record serialized to {} instead of an object",
            crate::schema::json_type_name(&other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaNode;
    use crate::store::MemoryTable;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Player {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        group_id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_created: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_updated: Option<String>,
    }

    fn schema() -> Schema {
        Schema::entity()
            .with_field("groupId", SchemaNode::String)
            .with_field("name", SchemaNode::String)
    }

    async fn model() -> EntityModel<Player> {
        EntityModel::builder("player")
            .with_schema(schema())
            .with_indexes([
                IndexSpec::new("id"),
                IndexSpec::new("groupId").with_sort("dateCreated"),
            ])
            .with_store(Arc::new(MemoryTable::new("test")))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_fails_fast() {
        let err = EntityModelBuilder::<Item>::new("player")
            .with_indexes([IndexSpec::new("id")])
            .with_connection(Connection::memory("t"))
            .build()
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("schema"));

        let err = EntityModelBuilder::<Item>::new("player")
            .with_schema(schema())
            .with_connection(Connection::memory("t"))
            .build()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("index"));

        let err = EntityModelBuilder::<Item>::new("player")
            .with_schema(schema())
            .with_indexes([IndexSpec::new("id")])
            .build()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection"));

        let err = EntityModelBuilder::<Item>::new("player")
            .with_schema(Schema::default().with_field("id", SchemaNode::String))
            .with_indexes([IndexSpec::new("id")])
            .with_connection(Connection::memory("t"))
            .build()
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_build_from_connection() {
        let model = EntityModelBuilder::<Item>::new("player")
            .with_schema(schema())
            .with_indexes([IndexSpec::new("id")])
            .with_connection(Connection::memory("t"))
            .build()
            .await
            .unwrap();
        assert_eq!(model.name(), "player");
        assert_eq!(model.engine().store().table_name(), "t");
    }

    #[tokio::test]
    async fn test_custom_id_generator_and_compute() {
        let model: EntityModel<Item> = EntityModelBuilder::new("player")
            .with_schema(schema())
            .with_indexes([IndexSpec::new("id")])
            .with_store(Arc::new(MemoryTable::new("t")))
            .with_id_generator(|| "fixed-id".to_string())
            .with_compute("shout", |item: &Item, _: Option<&Item>, _| {
                let mut out = Item::new();
                if let Some(Value::String(name)) = item.get("name") {
                    out.insert("name".into(), json!(name.to_uppercase()));
                }
                out
            })
            .build()
            .await
            .unwrap();

        let stored = model
            .engine()
            .put(&crate::item::into_item(json!({"groupId": "g", "name": "ann"})).unwrap())
            .await
            .unwrap();
        assert_eq!(stored["id"], json!("fixed-id"));
        assert_eq!(stored["name"], json!("ANN"));
    }

    #[tokio::test]
    async fn test_compute_runs_before_defaults() {
        let model: EntityModel<Item> = EntityModelBuilder::new("player")
            .with_schema(schema())
            .with_indexes([IndexSpec::new("id")])
            .with_store(Arc::new(MemoryTable::new("t")))
            .with_id_generator(|| "fixed-id".to_string())
            .with_compute("sawId", |item: &Item, _: Option<&Item>, _| {
                let mut out = Item::new();
                let seen = if item.contains_key("id") { "with-id" } else { "no-id" };
                out.insert("name".into(), json!(seen));
                out
            })
            .with_compute("dateUpdated", |_: &Item, _: Option<&Item>, _| {
                let mut out = Item::new();
                out.insert("dateUpdated".into(), json!("2000-01-01T00:00:00Z"));
                out
            })
            .build()
            .await
            .unwrap();

        assert_eq!(
            model.engine().computed().tags(),
            vec!["sawId", "dateUpdated", "id", "dateCreated"]
        );

        let stored = model
            .engine()
            .put(&crate::item::into_item(json!({"groupId": "g", "name": "ann"})).unwrap())
            .await
            .unwrap();
        assert_eq!(stored["name"], json!("no-id"));
        assert_eq!(stored["id"], json!("fixed-id"));
        assert_eq!(stored["dateUpdated"], json!("2000-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_entity_from_typed_record() {
        let model = model().await;
        let entity = model
            .entity_from(&Player {
                id: None,
                group_id: "g1".into(),
                name: "a".into(),
                date_created: None,
                date_updated: None,
            })
            .unwrap();

        assert_eq!(entity.state(), EntityState::Populated);
        assert_eq!(entity.data().get("groupId"), Some(&json!("g1")));
        assert!(entity.id().is_none());
    }

    #[tokio::test]
    async fn test_list_maps_rows_into_entities() {
        let model = model().await;
        for name in ["a", "b"] {
            let mut entity = model.new_entity();
            entity.set("groupId", json!("g1")).unwrap();
            entity.set("name", json!(name)).unwrap();
            entity.create().await.unwrap();
        }

        let list = model
            .list(&crate::item::into_item(json!({"groupId": "g1"})).unwrap(), &ListOptions::new())
            .await
            .unwrap();
        assert_eq!(list.items.len(), 2);
        assert!(list.cursor.is_none());

        let records: Vec<Player> = list.items.iter().map(|e| e.record().unwrap()).collect();
        assert_eq!(records[0].name, "a");
        assert_eq!(records[1].name, "b");
        assert!(list.items.iter().all(|e| e.state() == EntityState::Persisted));
    }

    #[test]
    fn test_to_item_drops_nulls() {
        let item = to_item(&json!({"a": null, "b": 1})).unwrap();
        assert_eq!(Value::Object(item), json!({"b": 1}));
        assert!(to_item(&json!([1])).is_err());
    }
}
