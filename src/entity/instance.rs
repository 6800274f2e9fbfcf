//! Entity instances: one record's data bound to its model's engine.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::engine::StorageEngine;
use crate::item::{deep_merge, merged, Item};
use crate::schema::{ValidationMode, ID_FIELD};

use super::errors::{EntityError, EntityResult};
use super::model::to_item;

/// Where an entity is in its life.
///
/// A persisted entity goes stale silently when someone else writes the same
/// record; `pull` brings it back in line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// No data yet
    Detached,
    /// Data set locally, not written
    Populated,
    /// Data matches what the last create/push/pull saw in the store
    Persisted,
    /// Deleted; no further store operations
    Deleted,
}

/// Options for [`Entity::push`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Write the local data as-is, creating the record if needed
    pub force: bool,
}

impl PushOptions {
    pub fn force() -> Self {
        Self { force: true }
    }
}

pub struct Entity<T = Item> {
    engine: Arc<StorageEngine>,
    data: Item,
    state: EntityState,
    _record: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("entity", &self.engine.name())
            .field("state", &self.state)
            .field("data", &self.data)
            .finish()
    }
}

impl<T> Entity<T>
where
    T: Serialize + DeserializeOwned,
{
    pub(crate) fn new(engine: Arc<StorageEngine>, data: Item, state: EntityState) -> Self {
        Self {
            engine,
            data,
            state,
            _record: PhantomData,
        }
    }

    pub fn data(&self) -> &Item {
        &self.data
    }

    /// Replaces the data after checking the types of the given fields.
    pub fn set_data(&mut self, data: Item) -> EntityResult<()> {
        self.ensure_live()?;
        self.engine.validate(&data, ValidationMode::Partial)?;
        self.data = data;
        self.touch();
        Ok(())
    }

    /// The data as a typed record.
    pub fn record(&self) -> EntityResult<T> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Replaces the data from a typed record.
    pub fn set_record(&mut self, record: &T) -> EntityResult<()> {
        self.set_data(to_item(record)?)
    }

    pub fn id(&self) -> Option<&str> {
        self.data.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> EntityResult<Self> {
        self.set(ID_FIELD, Value::String(id.into()))?;
        Ok(self)
    }

    /// Sets one field.
    pub fn set(&mut self, field: &str, value: Value) -> EntityResult<&mut Self> {
        let mut candidate = self.data.clone();
        candidate.insert(field.to_string(), value);
        self.set_data(candidate)?;
        Ok(self)
    }

    /// Deep-merges `fields` over the current data.
    pub fn merge(&mut self, fields: &Item) -> EntityResult<&mut Self> {
        self.set_data(merged(&self.data, fields))?;
        Ok(self)
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// True when any declared index, tried in order, finds a stored record
    /// for the fields currently set.
    pub async fn exists(&self) -> EntityResult<bool> {
        for n in 0..self.engine.planner().indexes().len() {
            if self.engine.get_via(&self.data, n).await?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Writes a new record. A preset id must not already be stored.
    pub async fn create(&mut self) -> EntityResult<&mut Self> {
        self.ensure_live()?;

        if let Some(id) = self.id() {
            let mut probe = Item::new();
            probe.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            if self.engine.get(&probe).await?.is_some() {
                return Err(EntityError::AlreadyExists(id.to_string()));
            }
        }

        self.data = self.engine.put(&self.data).await?;
        self.state = EntityState::Persisted;
        debug!(entity = %self.engine.name(), id = ?self.id(), "created");
        Ok(self)
    }

    /// Writes local changes.
    ///
    /// Without `force`, pulls the stored record, deep-merges the local data
    /// over it and writes the result. Nothing guards the gap between the
    /// pull and the write: a concurrent change to a field this entity did
    /// not touch is overwritten with the value pulled here.
    pub async fn push(&mut self, options: PushOptions) -> EntityResult<&mut Self> {
        self.ensure_live()?;

        let record = if options.force {
            self.data.clone()
        } else {
            let id = self.id().ok_or(EntityError::MissingId)?.to_string();
            let mut stored = self.fetch().await?.ok_or(EntityError::NotFound(id))?;
            deep_merge(&mut stored, &self.data);
            stored
        };

        self.data = self.engine.put(&record).await?;
        self.state = EntityState::Persisted;
        debug!(entity = %self.engine.name(), id = ?self.id(), force = options.force, "pushed");
        Ok(self)
    }

    /// Replaces the local data with the stored record.
    pub async fn pull(&mut self) -> EntityResult<&mut Self> {
        self.ensure_live()?;

        let stored = self.fetch().await?.ok_or_else(|| {
            EntityError::NotFound(self.id().unwrap_or("<no key fields>").to_string())
        })?;
        self.data = stored;
        self.state = EntityState::Persisted;
        Ok(self)
    }

    /// Deletes the stored record by primary key.
    pub async fn delete(&mut self) -> EntityResult<bool> {
        self.ensure_live()?;
        if self.id().is_none() {
            return Err(EntityError::MissingId);
        }

        let removed = self.engine.delete(&self.data).await?;
        self.state = EntityState::Deleted;
        debug!(entity = %self.engine.name(), id = ?self.id(), removed, "deleted");
        Ok(removed)
    }

    /// Stored record for the key fields currently set; `None` when no index
    /// resolves from them.
    async fn fetch(&self) -> EntityResult<Option<Item>> {
        if self.engine.planner().resolve(&self.data).is_none() {
            return Ok(None);
        }
        Ok(self.engine.get(&self.data).await?)
    }

    fn ensure_live(&self) -> EntityResult<()> {
        if self.state == EntityState::Deleted {
            return Err(EntityError::Deleted);
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.state = if self.data.is_empty() {
            EntityState::Detached
        } else {
            EntityState::Populated
        };
    }
}
