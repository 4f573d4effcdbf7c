//! Per-user persistent attributes for voice-assistant skills, stored in
//! DynamoDB.
//!
//! [`AttributesStore`] provisions the backing table on first use (a single
//! string partition key `id`) and keeps one item per user:
//!
//! ```text
//! { "id": "<user id>", "attributes": { ... } }
//! ```

pub mod config;
pub mod dynamodb;
pub mod error;
pub mod logging;
pub mod provision;
mod store;
pub mod utils;

#[cfg(test)]
mod tests;

pub use error::{AttributesError, Result};
pub use store::AttributesStore;
