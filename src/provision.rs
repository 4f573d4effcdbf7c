//! Table lifecycle: make sure the attributes table exists, optionally wait
//! for a freshly created table to become ACTIVE, then bind a handle to it.
//!
//! ```text
//! UNKNOWN ──exists──────────────────────┐
//!    │                                  ▼
//!    └──create──▶ CREATING ──poll──▶ ACTIVE ──connect──▶ CONNECTED
//! ```
//!
//! Tables are never altered or deleted here.

use tracing::{error, info, instrument};

use crate::config::StoreConfig;
use crate::dynamodb::{TableBackend, TableHandle, TableSpec, PARTITION_KEY};
use crate::error::{AttributesError, Result};
use crate::utils::poll_until;

/// What [`ensure_table`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The table was already listed.
    Existing,
    /// This call issued the create request.
    Created,
    /// The create request lost a race with another creator.
    CreatedConcurrently,
}

/// Checks whether `table_name` is listed by the backend.
#[instrument(skip(backend))]
pub async fn table_exists<B: TableBackend + ?Sized>(
    backend: &B,
    table_name: &str,
) -> Result<bool> {
    let names = backend.list_table_names().await?;
    Ok(names.iter().any(|name| name == table_name))
}

/// Creates the table described by `spec` unless it already exists.
///
/// A create that fails because the name is already in use is treated as the
/// table existing: another store created it between the listing and the
/// create request.
#[instrument(skip(backend, spec), fields(table = spec.name()))]
pub async fn ensure_table<B: TableBackend + ?Sized>(
    backend: &B,
    spec: &TableSpec,
) -> Result<Provisioned> {
    if table_exists(backend, spec.name()).await? {
        info!("Table '{}' exists", spec.name());
        return Ok(Provisioned::Existing);
    }

    match backend.create_table(spec).await {
        Ok(()) => {
            info!("Table '{}' created", spec.name());
            Ok(Provisioned::Created)
        }
        Err(AttributesError::TableAlreadyExists { .. }) => {
            info!("Table '{}' was created concurrently", spec.name());
            Ok(Provisioned::CreatedConcurrently)
        }
        Err(e) => Err(e),
    }
}

/// Polls the table status until it is ACTIVE.
///
/// Sleeps `config.poll_interval` before each check and gives up after
/// `config.max_poll_attempts` checks (at least one). A table that disappears
/// while being polled is reported immediately, not retried.
#[instrument(skip(backend, config))]
pub async fn wait_until_active<B: TableBackend + ?Sized>(
    backend: &B,
    table_name: &str,
    config: &StoreConfig,
) -> Result<()> {
    let outcome = poll_until(
        move |attempt| async move {
            let description = backend.describe_table(table_name).await.map_err(|e| {
                if e.is_table_not_found() {
                    error!("Table '{}' disappeared while waiting for it: {}", table_name, e);
                }
                e
            })?;
            info!(
                "Table '{}' status: {} (check {})",
                table_name, description.status, attempt
            );
            Ok::<_, AttributesError>(description.status.is_active().then_some(()))
        },
        config.poll_interval,
        config.poll_attempts(),
    )
    .await?;

    outcome.ok_or_else(|| AttributesError::ProvisioningTimedOut {
        table_name: table_name.to_string(),
        attempts: config.poll_attempts(),
    })
}

/// Loads the table metadata and binds a handle to it.
///
/// The table must be keyed by `id` alone; items are always written under
/// that key.
#[instrument(skip(backend))]
pub async fn connect_table<B: TableBackend + ?Sized>(
    backend: &B,
    table_name: &str,
) -> Result<TableHandle> {
    let handle = backend
        .describe_table(table_name)
        .await
        .map(TableHandle::new)
        .map_err(|e| AttributesError::Connect {
            table_name: table_name.to_string(),
            source: Box::new(e),
        })?;

    if handle.partition_key() != PARTITION_KEY {
        error!(
            "Table '{}' is keyed by '{}', not '{}'",
            table_name,
            handle.partition_key(),
            PARTITION_KEY
        );
        return Err(AttributesError::KeySchemaMismatch {
            table_name: table_name.to_string(),
            partition_key: handle.partition_key().to_string(),
        });
    }
    Ok(handle)
}

/// Runs the whole lifecycle for `spec` and returns the bound handle.
pub async fn provision<B: TableBackend + ?Sized>(
    backend: &B,
    spec: &TableSpec,
    config: &StoreConfig,
) -> Result<TableHandle> {
    let provisioned = ensure_table(backend, spec).await?;

    if provisioned != Provisioned::Existing && config.wait_for_active {
        wait_until_active(backend, spec.name(), config).await?;
    }

    let handle = connect_table(backend, spec.name()).await?;
    info!(
        "Connected to table '{}' (status: {})",
        handle.name(),
        handle.status()
    );
    Ok(handle)
}
