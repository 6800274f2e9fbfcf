//! CLI command implementations
//!
//! Every command loads the configuration, opens the shared table once, and
//! builds the configured models over it. Results go to stdout as a single
//! JSON envelope; failures are written the same way before the process exits
//! non-zero.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error};

use crate::engine::ListOptions;
use crate::entity::{EntityModel, EntityModelBuilder};
use crate::item::Item;
use crate::store::{connect, TableStore};

use super::args::{Cli, Command};
use super::config::CliConfig;
use super::errors::{CliError, CliResult};
use super::io::{read_item, write_error, write_response};

/// All configured models, sharing one store.
#[derive(Debug)]
pub struct Session {
    store: Arc<dyn TableStore>,
    models: BTreeMap<String, EntityModel>,
}

impl Session {
    /// Connects and builds every model; any bad model fails the session.
    pub async fn open(config: &CliConfig) -> CliResult<Self> {
        let store = connect(&config.connection).await?;

        let mut models = BTreeMap::new();
        for definition in &config.models {
            let schema = definition.load_schema(&config.base_dir)?;
            let model = EntityModelBuilder::new(definition.name.as_str())
                .with_schema(schema)
                .with_indexes(definition.indexes.iter().cloned())
                .with_store(Arc::clone(&store))
                .build()
                .await?;
            models.insert(definition.name.clone(), model);
        }

        Ok(Self { store, models })
    }

    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    pub fn model(&self, name: &str) -> CliResult<&EntityModel> {
        self.models
            .get(name)
            .ok_or_else(|| CliError::unknown_model(name))
    }

    pub async fn put(&self, model: &str, item: &Item) -> CliResult<Value> {
        let stored = self.model(model)?.engine().put(item).await?;
        Ok(Value::Object(stored))
    }

    pub async fn get(&self, model: &str, item: &Item) -> CliResult<Value> {
        let found = self.model(model)?.engine().get(item).await?;
        Ok(found.map(Value::Object).unwrap_or(Value::Null))
    }

    pub async fn list(&self, model: &str, item: &Item, options: &ListOptions) -> CliResult<Value> {
        let result = self.model(model)?.engine().list(item, options).await?;
        Ok(json!({
            "data": result.data,
            "cursor": result.cursor,
        }))
    }

    pub async fn delete(&self, model: &str, item: &Item) -> CliResult<Value> {
        let deleted = self.model(model)?.engine().delete(item).await?;
        Ok(json!({ "deleted": deleted }))
    }

    /// Indexes, physical attribute names and computed tags per model.
    pub fn describe(&self, only: Option<&str>) -> CliResult<Value> {
        let names: Vec<&str> = match only {
            Some(name) => vec![self.model(name)?.name()],
            None => self.models.keys().map(String::as_str).collect(),
        };

        let mut out = Vec::new();
        for name in names {
            let engine = self.model(name)?.engine();
            let planner = engine.planner();
            let indexes: Vec<Value> = planner
                .indexes()
                .iter()
                .enumerate()
                .map(|(n, index)| {
                    let (partition_attr, sort_attr) = planner.physical_fields(n);
                    json!({
                        "name": planner.index_name(n),
                        "partition": index.partition_fields,
                        "sort": index.sort_fields,
                        "partitionAttribute": partition_attr,
                        "sortAttribute": sort_attr,
                    })
                })
                .collect();

            out.push(json!({
                "name": name,
                "table": engine.store().table_name(),
                "fields": engine.schema().fields.keys().collect::<Vec<_>>(),
                "indexes": indexes,
                "computed": engine.computed().tags(),
            }));
        }
        Ok(Value::Array(out))
    }
}

/// Main CLI entry point
///
/// Parses arguments, runs the command and writes the response envelope.
/// This is the only function main.rs should call.
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let input = if cli.command.reads_input() {
        match read_item() {
            Ok(item) => item,
            Err(e) => return report(e),
        }
    } else {
        Item::new()
    };

    match run_command(cli.command, input).await {
        Ok(data) => write_response(data),
        Err(e) => report(e),
    }
}

fn report(e: CliError) -> CliResult<()> {
    error!(code = e.code_str(), "{}", e.message());
    write_error(e.code_str(), e.message())?;
    Err(e)
}

/// Runs one command against the configuration it names.
pub async fn run_command(command: Command, input: Item) -> CliResult<Value> {
    let config = CliConfig::load(command.config_path())?;
    let session = Session::open(&config).await?;
    debug!(command = ?command, "running");

    match command {
        Command::Put { model, .. } => session.put(&model, &input).await,
        Command::Get { model, .. } => session.get(&model, &input).await,
        Command::List {
            model,
            count,
            limit,
            cursor,
            ..
        } => {
            let options = ListOptions {
                count,
                limit,
                cursor,
            };
            session.list(&model, &input, &options).await
        }
        Command::Delete { model, .. } => session.delete(&model, &input).await,
        Command::Describe { model, .. } => session.describe(model.as_deref()),
    }
}
