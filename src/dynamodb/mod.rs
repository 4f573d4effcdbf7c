//! # DynamoDB Module
//!
//! Storage plumbing for the attributes store.
//!
//! ## Components
//!
//! - `TableBackend`: the table service operations the store needs.
//! - `DynamoDb`: `TableBackend` over the AWS SDK client.
//! - `InMemoryBackend`: `TableBackend` kept in process, for tests.
//! - `Attributes`: a user's attributes document.
//! - `TableSpec`, `TableStatus`, `TableHandle`: table creation parameters,
//!   lifecycle status and the bound table.
//!
//! ## Usage
//!
//! `DynamoDb` is built from an `aws_config::SdkConfig`, which reads the
//! standard environment variables:
//!
//! - `AWS_ACCESS_KEY_ID`: Your AWS access key ID.
//! - `AWS_SECRET_ACCESS_KEY`: Your AWS secret access key.
//! - `AWS_REGION`: The AWS region where your DynamoDB tables are located.
//!
//! Optionally, you can also set:
//! - `AWS_SESSION_TOKEN`: If you're using temporary credentials.
//! - `AWS_ENDPOINT_URL`: For using a custom endpoint (e.g., DynamoDB Local).

mod backend;
mod client;
pub(crate) mod item;
mod memory;
mod table;

pub use backend::TableBackend;
pub use client::DynamoDb;
pub use item::Attributes;
pub use memory::{Activation, CallCounts, InMemoryBackend};
pub use table::{
    TableDescription, TableHandle, TableSpec, TableStatus, ATTRIBUTES_FIELD, PARTITION_KEY,
};
