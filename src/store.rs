use aws_sdk_dynamodb::types::AttributeValue;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use tracing::{error, info};

use crate::config::StoreConfig;
use crate::dynamodb::item::{from_stored_item, to_stored_item};
use crate::dynamodb::{Attributes, TableBackend, TableHandle, TableSpec, PARTITION_KEY};
use crate::error::Result;
use crate::provision::provision;

/// Persistent attributes of one user, kept in a single item of a DynamoDB
/// table.
///
/// Opening a store makes sure the table exists (creating it on first use)
/// and binds it. Attributes are then collected in memory with
/// [`set_attribute`](Self::set_attribute) and written in one go with
/// [`save_attributes`](Self::save_attributes), which replaces whatever was
/// stored for the user before.
///
/// The backend is owned by the store; pass a [`DynamoDb`](crate::dynamodb::DynamoDb)
/// in production and an [`InMemoryBackend`](crate::dynamodb::InMemoryBackend)
/// in tests.
///
/// # Example
///
/// ```no_run
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use persistent_attributes::{config::StoreConfig, dynamodb::DynamoDb, AttributesStore};
///
/// # async fn example() -> persistent_attributes::error::Result<()> {
/// let sdk_config = aws_config::load_from_env().await;
/// let mut store = AttributesStore::open(
///     DynamoDb::new(&sdk_config),
///     "amzn1.ask.account.EXAMPLE",
///     "my-skill-attributes",
///     &StoreConfig::default(),
/// )
/// .await?;
///
/// store.set_attribute("visits", AttributeValue::N("1".to_string()));
/// store.save_attributes().await?;
///
/// let saved = store.get_attributes().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AttributesStore<B> {
    backend: B,
    table: TableHandle,
    attributes: Attributes,
    user_id: String,
    table_name: String,
    consistent_reads: bool,
}

impl<B: TableBackend> AttributesStore<B> {
    /// Ensures the table exists and binds it for `user_id`.
    ///
    /// Fails if listing, creating, waiting for or connecting to the table
    /// fails. The failure is logged before it is returned.
    pub async fn open(
        backend: B,
        user_id: impl Into<String>,
        table_name: impl Into<String>,
        config: &StoreConfig,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let table_name = table_name.into();
        let spec = TableSpec::from_config(table_name.as_str(), config);

        let table = provision(&backend, &spec, config).await.map_err(|e| {
            error!("Failed to provision table '{}': {}", table_name, e);
            e
        })?;

        Ok(Self {
            backend,
            table,
            attributes: Attributes::new(),
            user_id,
            table_name,
            consistent_reads: config.consistent_reads,
        })
    }

    /// Sets `name` in the in-memory attributes. Nothing is written until
    /// [`save_attributes`](Self::save_attributes).
    pub fn set_attribute(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name, value);
    }

    /// Serializes `value` and sets it as `name` in the in-memory attributes.
    pub fn set_serialized<T: Serialize>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        self.attributes.insert_serialized(name, value)
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    /// Writes the in-memory attributes as the user's item, replacing any
    /// previous item.
    ///
    /// Nothing is written if a number attribute is NaN or infinite.
    pub async fn save_attributes(&self) -> Result<()> {
        self.attributes.check_numbers()?;
        let item = to_stored_item(&self.user_id, &self.attributes);
        self.backend.put_item(self.table.name(), item).await?;
        info!(
            "Saved {} attribute(s) for user '{}'",
            self.attributes.len(),
            self.user_id
        );
        Ok(())
    }

    /// Reads the user's stored attributes. `Ok(None)` when nothing has been
    /// saved for this user.
    pub async fn get_attributes(&self) -> Result<Option<Attributes>> {
        let key = HashMap::from([(
            PARTITION_KEY.to_string(),
            AttributeValue::S(self.user_id.clone()),
        )]);

        self.backend
            .get_item(self.table.name(), key, self.consistent_reads)
            .await?
            .map(|item| from_stored_item(&self.user_id, item))
            .transpose()
    }

    /// Reads the user's stored attributes and deserializes them into `T`.
    pub async fn get_attributes_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.get_attributes()
            .await?
            .map(|attributes| attributes.deserialize())
            .transpose()
    }
}

impl<B> AttributesStore<B> {
    /// The in-memory attributes, including unsaved changes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn table(&self) -> &TableHandle {
        &self.table
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
