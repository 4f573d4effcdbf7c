use std::fmt;

use aws_sdk_dynamodb::types::TableStatus as SdkTableStatus;

use crate::config::StoreConfig;

/// Partition key attribute of every attributes table.
pub const PARTITION_KEY: &str = "id";

/// Attribute holding the user's document inside a stored item.
pub const ATTRIBUTES_FIELD: &str = "attributes";

/// Creation parameters for an attributes table.
///
/// The key schema is fixed: a single string partition key named `id` and no
/// sort key. Only the table name and provisioned throughput vary.
///
/// # Example
///
/// ```
/// use persistent_attributes::dynamodb::TableSpec;
///
/// let spec = TableSpec::new("skill-attributes", 5, 5);
/// assert_eq!(spec.partition_key(), "id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    name: String,
    read_capacity_units: i64,
    write_capacity_units: i64,
}

impl TableSpec {
    pub fn new(
        name: impl Into<String>,
        read_capacity_units: i64,
        write_capacity_units: i64,
    ) -> Self {
        Self {
            name: name.into(),
            read_capacity_units,
            write_capacity_units,
        }
    }

    /// Builds the creation parameters for `name` using the throughput from `config`.
    pub fn from_config(name: impl Into<String>, config: &StoreConfig) -> Self {
        Self::new(
            name,
            config.read_capacity_units,
            config.write_capacity_units,
        )
    }

    /// Returns the name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the partition key of the table.
    pub fn partition_key(&self) -> &str {
        PARTITION_KEY
    }

    pub fn read_capacity_units(&self) -> i64 {
        self.read_capacity_units
    }

    pub fn write_capacity_units(&self) -> i64 {
        self.write_capacity_units
    }
}

/// Lifecycle status reported by the backend for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    /// Any status this crate does not act on (archiving, inaccessible key...).
    Other(String),
}

impl TableStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TableStatus::Active)
    }
}

impl From<&SdkTableStatus> for TableStatus {
    fn from(status: &SdkTableStatus) -> Self {
        match status {
            SdkTableStatus::Active => TableStatus::Active,
            SdkTableStatus::Creating => TableStatus::Creating,
            SdkTableStatus::Updating => TableStatus::Updating,
            SdkTableStatus::Deleting => TableStatus::Deleting,
            other => TableStatus::Other(other.as_str().to_string()),
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Creating => f.write_str("CREATING"),
            TableStatus::Active => f.write_str("ACTIVE"),
            TableStatus::Updating => f.write_str("UPDATING"),
            TableStatus::Deleting => f.write_str("DELETING"),
            TableStatus::Other(status) => f.write_str(status),
        }
    }
}

/// Table metadata as returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub name: String,
    pub status: TableStatus,
    /// Name of the HASH key attribute, if the backend reported one.
    pub partition_key: Option<String>,
}

/// A table the store is bound to.
///
/// Produced by the connect step once the table is known to exist; every item
/// read or write goes through the name recorded here. `partition_key` is the
/// HASH key the table reported (`id` when none was reported).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    name: String,
    partition_key: String,
    status: TableStatus,
}

impl TableHandle {
    pub fn new(description: TableDescription) -> Self {
        Self {
            name: description.name,
            partition_key: description
                .partition_key
                .unwrap_or_else(|| PARTITION_KEY.to_string()),
            status: description.status,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Status observed when the handle was bound.
    pub fn status(&self) -> &TableStatus {
        &self.status
    }
}
