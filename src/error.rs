//! Error types for attribute persistence.

use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext};
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AttributesError>;

/// Errors raised while provisioning the attributes table or reading and
/// writing a user's attributes.
#[derive(Error, Debug)]
pub enum AttributesError {
    #[error("Table '{table_name}' not found")]
    TableNotFound { table_name: String },

    #[error("Table '{table_name}' already exists")]
    TableAlreadyExists { table_name: String },

    #[error("Table '{table_name}' was not active after {attempts} status checks")]
    ProvisioningTimedOut { table_name: String, attempts: u32 },

    #[error("Failed to connect to table '{table_name}': {source}")]
    Connect {
        table_name: String,
        #[source]
        source: Box<AttributesError>,
    },

    #[error("Table '{table_name}' is keyed by '{partition_key}', expected 'id'")]
    KeySchemaMismatch {
        table_name: String,
        partition_key: String,
    },

    #[error("Attribute '{name}' holds '{value}', which DynamoDB does not accept as a number")]
    InvalidNumber { name: String, value: String },

    #[error("Stored item for user '{user_id}' is malformed: {reason}")]
    MalformedItem { user_id: String, reason: String },

    #[error("DescribeTable returned no description for '{table_name}'")]
    MissingTableDescription { table_name: String },

    #[error("Invalid value '{value}' for {key}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("Attribute serialization failed: {0}")]
    Serialization(#[from] serde_dynamo::Error),

    #[error("Failed to build request: {0}")]
    Build(#[from] BuildError),

    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },
}

impl AttributesError {
    /// Wraps an SDK error that has no dedicated variant.
    pub(crate) fn service(operation: &'static str, err: impl std::error::Error) -> Self {
        Self::Service {
            operation,
            message: DisplayErrorContext(err).to_string(),
        }
    }

    /// True when the backend reported the table as missing.
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound { .. })
    }
}
