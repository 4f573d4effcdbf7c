use async_trait::async_trait;
use aws_sdk_dynamodb::{
    operation::{
        create_table::CreateTableError, describe_table::DescribeTableError,
        get_item::GetItemError, put_item::PutItemError,
    },
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ProvisionedThroughput, ScalarAttributeType,
    },
    Client,
};
use std::collections::HashMap;
use tracing::{error, info};

use crate::dynamodb::backend::TableBackend;
use crate::dynamodb::table::{TableDescription, TableSpec, TableStatus};
use crate::error::{AttributesError, Result};

/// DynamoDB client wrapper implementing [`TableBackend`].
///
/// Each store owns one of these. The wrapped [`Client`] is cheap to clone, so
/// several stores can be built from one SDK configuration without sharing any
/// process-wide state.
///
/// # Error Handling
///
/// Service errors are classified from the typed operation errors: a missing
/// table becomes [`AttributesError::TableNotFound`], a create that collides
/// with an existing table becomes [`AttributesError::TableAlreadyExists`], and
/// anything else is reported as [`AttributesError::Service`] with the full SDK
/// error context.
///
/// # Example
///
/// ```no_run
/// use persistent_attributes::dynamodb::DynamoDb;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = aws_config::load_from_env().await;
/// let ddb = DynamoDb::new(&config);
/// ddb.check_auth().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Wraps an already configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Verifies authentication by attempting to list tables.
    pub async fn check_auth(&self) -> Result<()> {
        self.client.list_tables().limit(1).send().await.map_err(|e| {
            error!("Authentication failed: {}", e);
            AttributesError::service("ListTables", e)
        })?;
        info!("Authentication successful");
        Ok(())
    }
}

#[async_trait]
impl TableBackend for DynamoDb {
    async fn list_table_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut start_table_name = None;

        loop {
            let response = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start_table_name)
                .send()
                .await
                .map_err(|e| AttributesError::service("ListTables", e))?;

            names.extend(response.table_names().iter().cloned());

            start_table_name = response.last_evaluated_table_name().map(str::to_string);
            if start_table_name.is_none() {
                break;
            }
        }

        Ok(names)
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let attribute_definition = AttributeDefinition::builder()
            .attribute_name(spec.partition_key())
            .attribute_type(ScalarAttributeType::S)
            .build()?;

        let key_schema = KeySchemaElement::builder()
            .attribute_name(spec.partition_key())
            .key_type(KeyType::Hash)
            .build()?;

        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(spec.read_capacity_units())
            .write_capacity_units(spec.write_capacity_units())
            .build()?;

        let result = self
            .client
            .create_table()
            .table_name(spec.name())
            .billing_mode(BillingMode::Provisioned)
            .attribute_definitions(attribute_definition)
            .key_schema(key_schema)
            .provisioned_throughput(throughput)
            .send()
            .await;

        match result {
            Ok(output) => {
                let status = output
                    .table_description()
                    .and_then(|description| description.table_status())
                    .map(TableStatus::from);
                info!("Create requested for '{}' (status: {:?})", spec.name(), status);
                Ok(())
            }
            Err(err) => match err.as_service_error() {
                Some(CreateTableError::ResourceInUseException(_)) => {
                    Err(AttributesError::TableAlreadyExists {
                        table_name: spec.name().to_string(),
                    })
                }
                _ => Err(AttributesError::service("CreateTable", err)),
            },
        }
    }

    async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
        let response = match self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                return match err.as_service_error() {
                    Some(DescribeTableError::ResourceNotFoundException(_)) => {
                        Err(AttributesError::TableNotFound {
                            table_name: table_name.to_string(),
                        })
                    }
                    _ => Err(AttributesError::service("DescribeTable", err)),
                };
            }
        };

        let table = response
            .table()
            .ok_or_else(|| AttributesError::MissingTableDescription {
                table_name: table_name.to_string(),
            })?;

        let partition_key = table
            .key_schema()
            .iter()
            .find(|element| element.key_type() == &KeyType::Hash)
            .map(|element| element.attribute_name().to_string());

        Ok(TableDescription {
            name: table.table_name().unwrap_or(table_name).to_string(),
            status: table
                .table_status()
                .map(TableStatus::from)
                .unwrap_or_else(|| TableStatus::Other("UNKNOWN".to_string())),
            partition_key,
        })
    }

    async fn put_item(
        &self,
        table_name: &str,
        item: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        match self
            .client
            .put_item()
            .table_name(table_name)
            .set_item(Some(item))
            .send()
            .await
        {
            Ok(_) => {
                info!("Item written to '{table_name}'");
                Ok(())
            }
            Err(err) => match err.as_service_error() {
                Some(PutItemError::ResourceNotFoundException(_)) => {
                    Err(AttributesError::TableNotFound {
                        table_name: table_name.to_string(),
                    })
                }
                _ => Err(AttributesError::service("PutItem", err)),
            },
        }
    }

    async fn get_item(
        &self,
        table_name: &str,
        key: HashMap<String, AttributeValue>,
        consistent_read: bool,
    ) -> Result<Option<HashMap<String, AttributeValue>>> {
        match self
            .client
            .get_item()
            .table_name(table_name)
            .set_key(Some(key))
            .consistent_read(consistent_read)
            .send()
            .await
        {
            Ok(response) => Ok(response.item),
            Err(err) => match err.as_service_error() {
                Some(GetItemError::ResourceNotFoundException(_)) => {
                    Err(AttributesError::TableNotFound {
                        table_name: table_name.to_string(),
                    })
                }
                _ => Err(AttributesError::service("GetItem", err)),
            },
        }
    }
}
