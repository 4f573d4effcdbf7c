use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::dynamodb::table::{TableDescription, TableSpec};
use crate::error::Result;

/// The table service operations an attributes store depends on.
///
/// [`DynamoDb`](crate::dynamodb::DynamoDb) implements this against the AWS
/// SDK; [`InMemoryBackend`](crate::dynamodb::InMemoryBackend) implements it
/// in process for tests.
///
/// Implementations report a missing table as
/// [`AttributesError::TableNotFound`](crate::error::AttributesError::TableNotFound)
/// and a create for a name already in use as
/// [`AttributesError::TableAlreadyExists`](crate::error::AttributesError::TableAlreadyExists).
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Names of every table visible to the caller.
    async fn list_table_names(&self) -> Result<Vec<String>>;

    /// Submits a create request; returns once the request is acknowledged.
    async fn create_table(&self, spec: &TableSpec) -> Result<()>;

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription>;

    /// Replaces the whole item stored under its key.
    async fn put_item(
        &self,
        table_name: &str,
        item: HashMap<String, AttributeValue>,
    ) -> Result<()>;

    async fn get_item(
        &self,
        table_name: &str,
        key: HashMap<String, AttributeValue>,
        consistent_read: bool,
    ) -> Result<Option<HashMap<String, AttributeValue>>>;
}
