//! In-process table backend.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::dynamodb::backend::TableBackend;
use crate::dynamodb::table::{TableDescription, TableSpec, TableStatus, PARTITION_KEY};
use crate::error::{AttributesError, Result};

type ItemMap = HashMap<String, AttributeValue>;

/// Number of calls made to each backend operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_tables: usize,
    pub create_table: usize,
    pub describe_table: usize,
    pub put_item: usize,
    pub get_item: usize,
}

/// How a newly created table moves towards ACTIVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Reports CREATING for this many describe calls, then ACTIVE.
    AfterDescribes(usize),
    /// Reports CREATING forever.
    Never,
    /// Reports CREATING for this many describe calls, then disappears.
    VanishAfter(usize),
}

#[derive(Debug)]
struct MemoryTable {
    spec: TableSpec,
    partition_key: String,
    activation: Activation,
    describes: usize,
    items: HashMap<String, ItemMap>,
}

impl MemoryTable {
    fn status(&self) -> TableStatus {
        match self.activation {
            Activation::AfterDescribes(n) if self.describes >= n => TableStatus::Active,
            _ => TableStatus::Creating,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemoryTable>,
    calls: CallCounts,
    activation: Option<Activation>,
    reject_creates: Option<String>,
    hide_from_listing: bool,
}

/// Table backend that keeps everything in memory.
///
/// Clones share state, so a test can hand one clone to a store and inspect
/// the other. Tables created through [`TableBackend::create_table`] follow
/// the configured [`Activation`] (ACTIVE immediately by default); reads and
/// writes against a table that is not ACTIVE fail with `TableNotFound`, as
/// DynamoDB does.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    /// Creates a new backend with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how tables created from now on become ACTIVE.
    pub async fn set_activation(&self, activation: Activation) {
        self.state.lock().await.activation = Some(activation);
    }

    /// Makes every create request fail as a `CreateTable` service error
    /// carrying `message`.
    pub async fn reject_creates(&self, message: impl Into<String>) {
        self.state.lock().await.reject_creates = Some(message.into());
    }

    /// Omits every table from `list_table_names`, as a listing taken before
    /// a concurrent creation would.
    pub async fn hide_tables_from_listing(&self) {
        self.state.lock().await.hide_from_listing = true;
    }

    /// Adds an ACTIVE `id`-keyed table directly, without counting a create
    /// call.
    pub async fn seed_table(&self, table_name: &str) {
        self.seed_table_with_key(table_name, PARTITION_KEY).await;
    }

    /// Adds an ACTIVE table keyed by `partition_key`, as one created outside
    /// this crate would be.
    pub async fn seed_table_with_key(&self, table_name: &str, partition_key: &str) {
        let mut state = self.state.lock().await;
        state.tables.insert(
            table_name.to_string(),
            MemoryTable {
                spec: TableSpec::new(table_name, 5, 5),
                partition_key: partition_key.to_string(),
                activation: Activation::AfterDescribes(0),
                describes: 0,
                items: HashMap::new(),
            },
        );
    }

    /// Writes a raw item, bypassing the call counters.
    pub async fn seed_item(&self, table_name: &str, item: ItemMap) -> Result<()> {
        let mut state = self.state.lock().await;
        let table = active_table(&mut state, table_name)?;
        let key = item_key(table, "PutItem", &item)?;
        table.items.insert(key, item);
        Ok(())
    }

    /// Raw item stored under `id`, if any.
    pub async fn stored_item(&self, table_name: &str, id: &str) -> Option<ItemMap> {
        let state = self.state.lock().await;
        state
            .tables
            .get(table_name)
            .and_then(|table| table.items.get(id))
            .cloned()
    }

    /// Creation parameters a table was created with.
    pub async fn table_spec(&self, table_name: &str) -> Option<TableSpec> {
        let state = self.state.lock().await;
        state.tables.get(table_name).map(|table| table.spec.clone())
    }

    pub async fn calls(&self) -> CallCounts {
        self.state.lock().await.calls
    }
}

fn active_table<'a>(state: &'a mut State, table_name: &str) -> Result<&'a mut MemoryTable> {
    match state.tables.get_mut(table_name) {
        Some(table) if table.status().is_active() => Ok(table),
        _ => Err(AttributesError::TableNotFound {
            table_name: table_name.to_string(),
        }),
    }
}

/// The string value of `table`'s key attribute in `item`.
fn item_key(table: &MemoryTable, operation: &'static str, item: &ItemMap) -> Result<String> {
    item.get(&table.partition_key)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| AttributesError::Service {
            operation,
            message: format!(
                "ValidationException: missing string key '{}'",
                table.partition_key
            ),
        })
}

#[async_trait]
impl TableBackend for InMemoryBackend {
    async fn list_table_names(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        state.calls.list_tables += 1;
        if state.hide_from_listing {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = state.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.create_table += 1;

        if let Some(message) = &state.reject_creates {
            return Err(AttributesError::Service {
                operation: "CreateTable",
                message: message.clone(),
            });
        }
        if state.tables.contains_key(spec.name()) {
            return Err(AttributesError::TableAlreadyExists {
                table_name: spec.name().to_string(),
            });
        }

        let activation = state.activation.unwrap_or(Activation::AfterDescribes(0));
        state.tables.insert(
            spec.name().to_string(),
            MemoryTable {
                spec: spec.clone(),
                partition_key: spec.partition_key().to_string(),
                activation,
                describes: 0,
                items: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
        let mut state = self.state.lock().await;
        state.calls.describe_table += 1;

        let vanished = match state.tables.get_mut(table_name) {
            Some(table) => {
                table.describes += 1;
                matches!(table.activation, Activation::VanishAfter(n) if table.describes > n)
            }
            None => true,
        };
        if vanished {
            state.tables.remove(table_name);
            return Err(AttributesError::TableNotFound {
                table_name: table_name.to_string(),
            });
        }

        let table = &state.tables[table_name];
        let status = match table.activation {
            // `describes` already counts this call.
            Activation::AfterDescribes(n) if table.describes > n => TableStatus::Active,
            _ => TableStatus::Creating,
        };
        Ok(TableDescription {
            name: table_name.to_string(),
            status,
            partition_key: Some(table.partition_key.clone()),
        })
    }

    async fn put_item(&self, table_name: &str, item: ItemMap) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.put_item += 1;
        let table = active_table(&mut state, table_name)?;
        let key = item_key(table, "PutItem", &item)?;
        table.items.insert(key, item);
        Ok(())
    }

    async fn get_item(
        &self,
        table_name: &str,
        key: ItemMap,
        _consistent_read: bool,
    ) -> Result<Option<ItemMap>> {
        let mut state = self.state.lock().await;
        state.calls.get_item += 1;
        let table = active_table(&mut state, table_name)?;
        let key = item_key(table, "GetItem", &key)?;
        Ok(table.items.get(&key).cloned())
    }
}
