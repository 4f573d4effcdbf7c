//! Tests for table provisioning and attribute persistence.
//!
//! Most tests run against [`InMemoryBackend`], which counts every backend
//! call and can simulate slow, stuck or failing table creation.
//!
//! # Live DynamoDB
//!
//! The tests marked `#[ignore]` need a reachable DynamoDB and credentials.
//! Set the following environment variables in your `.env` file:
//!
//! ```text
//! AWS_ACCESS_KEY_ID=your_access_key
//! AWS_SECRET_ACCESS_KEY=your_secret_key
//! AWS_REGION=your_preferred_region
//! ```
//!
//! For DynamoDB Local, use dummy values and set:
//!
//! ```text
//! AWS_ENDPOINT_URL=http://localhost:8000
//! ```
//!
//! Then run:
//!
//! ```text
//! cargo test -- --ignored
//! ```
//!
//! Note: These tests may incur AWS charges if run against a real DynamoDB instance.

use crate::config::StoreConfig;
use crate::dynamodb::{
    Activation, Attributes, CallCounts, DynamoDb, InMemoryBackend, TableBackend, TableSpec,
    TableStatus, ATTRIBUTES_FIELD, PARTITION_KEY,
};
use crate::error::{AttributesError, Result};
use crate::provision::{ensure_table, Provisioned};
use crate::utils::poll_until;
use crate::AttributesStore;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

const TEST_TABLE_NAME: &str = "test-skill-attributes";
const USER_X: &str = "amzn1.ask.account.USER_X";
const USER_Y: &str = "amzn1.ask.account.USER_Y";

fn fast_config() -> StoreConfig {
    StoreConfig::default()
        .with_poll_interval(Duration::ZERO)
        .with_max_poll_attempts(10)
}

async fn open(
    backend: &InMemoryBackend,
    user_id: &str,
) -> Result<AttributesStore<InMemoryBackend>> {
    AttributesStore::open(backend.clone(), user_id, TEST_TABLE_NAME, &fast_config()).await
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct QuizProgress {
    level: u32,
    streak: Vec<bool>,
    nickname: Option<String>,
}

// --- Provisioning ---

#[tokio::test]
async fn test_open_creates_missing_table() -> Result<()> {
    let backend = InMemoryBackend::new();

    let store = open(&backend, USER_X).await?;

    let calls = backend.calls().await;
    assert_eq!(calls.list_tables, 1);
    assert_eq!(calls.create_table, 1);
    assert_eq!(store.table().name(), TEST_TABLE_NAME);
    assert_eq!(store.table().partition_key(), PARTITION_KEY);
    assert_eq!(store.table().status(), &TableStatus::Active);
    assert!(store.attributes().is_empty());

    let spec = backend.table_spec(TEST_TABLE_NAME).await.unwrap();
    assert_eq!(spec.partition_key(), "id");
    assert_eq!(spec.read_capacity_units(), 5);
    assert_eq!(spec.write_capacity_units(), 5);
    Ok(())
}

#[tokio::test]
async fn test_open_twice_does_not_recreate_table() -> Result<()> {
    let backend = InMemoryBackend::new();

    open(&backend, USER_X).await?;
    open(&backend, USER_Y).await?;

    let calls = backend.calls().await;
    assert_eq!(calls.list_tables, 2);
    assert_eq!(calls.create_table, 1);
    Ok(())
}

#[tokio::test]
async fn test_open_existing_table_skips_create_and_poll() -> Result<()> {
    let backend = InMemoryBackend::new();
    backend.seed_table(TEST_TABLE_NAME).await;

    open(&backend, USER_X).await?;

    let calls = backend.calls().await;
    assert_eq!(calls.create_table, 0);
    // Only the connect step describes the table.
    assert_eq!(calls.describe_table, 1);
    Ok(())
}

#[tokio::test]
async fn test_create_failure_aborts_open() {
    let backend = InMemoryBackend::new();
    backend.reject_creates("LimitExceededException").await;

    let result = open(&backend, USER_X).await;

    match result {
        Err(AttributesError::Service { operation, message }) => {
            assert_eq!(operation, "CreateTable");
            assert_eq!(message, "LimitExceededException");
        }
        other => panic!("expected creation failure, got {other:?}"),
    }
    assert_eq!(backend.calls().await.describe_table, 0);
}

#[tokio::test]
async fn test_poll_stops_at_first_active_status() -> Result<()> {
    const CREATING_CHECKS: usize = 3;
    let backend = InMemoryBackend::new();
    backend
        .set_activation(Activation::AfterDescribes(CREATING_CHECKS))
        .await;

    let store = open(&backend, USER_X).await?;

    // N CREATING checks, one ACTIVE check, then the connect describe.
    assert_eq!(backend.calls().await.describe_table, CREATING_CHECKS + 1 + 1);
    assert!(store.table().status().is_active());
    Ok(())
}

#[tokio::test]
async fn test_poll_gives_up_after_max_attempts() {
    let backend = InMemoryBackend::new();
    backend.set_activation(Activation::Never).await;
    let config = fast_config().with_max_poll_attempts(4);

    let result =
        AttributesStore::open(backend.clone(), USER_X, TEST_TABLE_NAME, &config).await;

    match result {
        Err(AttributesError::ProvisioningTimedOut {
            table_name,
            attempts,
        }) => {
            assert_eq!(table_name, TEST_TABLE_NAME);
            assert_eq!(attempts, 4);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(backend.calls().await.describe_table, 4);
}

#[tokio::test]
async fn test_table_vanishing_while_polling_is_not_retried() {
    let backend = InMemoryBackend::new();
    backend.set_activation(Activation::VanishAfter(2)).await;

    let result = open(&backend, USER_X).await;

    assert!(matches!(
        result,
        Err(AttributesError::TableNotFound { ref table_name }) if table_name == TEST_TABLE_NAME
    ));
    assert_eq!(backend.calls().await.describe_table, 3);
}

#[tokio::test]
async fn test_fire_and_forget_does_not_poll() -> Result<()> {
    let backend = InMemoryBackend::new();
    backend.set_activation(Activation::AfterDescribes(5)).await;
    let config = fast_config().with_wait_for_active(false);

    let store = AttributesStore::open(backend.clone(), USER_X, TEST_TABLE_NAME, &config).await?;

    assert_eq!(backend.calls().await.describe_table, 1);
    assert_eq!(store.table().status(), &TableStatus::Creating);

    // Writes are refused until the table is ACTIVE.
    assert!(matches!(
        store.save_attributes().await,
        Err(AttributesError::TableNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_create_race_is_tolerated() -> Result<()> {
    let backend = InMemoryBackend::new();
    backend.seed_table(TEST_TABLE_NAME).await;
    backend.hide_tables_from_listing().await;

    let spec = TableSpec::new(TEST_TABLE_NAME, 5, 5);
    assert_eq!(
        ensure_table(&backend, &spec).await?,
        Provisioned::CreatedConcurrently
    );

    let store = open(&backend, USER_X).await?;
    assert!(store.table().status().is_active());
    Ok(())
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let backend = InMemoryBackend::new();
    backend.seed_table(TEST_TABLE_NAME).await;

    let result = crate::provision::connect_table(&backend, "missing-table").await;

    match result {
        Err(AttributesError::Connect { table_name, source }) => {
            assert_eq!(table_name, "missing-table");
            assert!(source.is_table_not_found());
        }
        other => panic!("expected connect failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_poll_attempts_still_checks_status_once() -> Result<()> {
    let backend = InMemoryBackend::new();
    let config = StoreConfig {
        max_poll_attempts: 0,
        ..fast_config()
    };

    let store = AttributesStore::open(backend.clone(), USER_X, TEST_TABLE_NAME, &config).await?;

    // One status check, then the connect describe.
    assert_eq!(backend.calls().await.describe_table, 2);
    assert!(store.table().status().is_active());
    Ok(())
}

#[tokio::test]
async fn test_table_keyed_by_other_attribute_is_rejected() {
    let backend = InMemoryBackend::new();
    backend.seed_table_with_key(TEST_TABLE_NAME, "userId").await;

    let result = open(&backend, USER_X).await;

    match result {
        Err(AttributesError::KeySchemaMismatch {
            table_name,
            partition_key,
        }) => {
            assert_eq!(table_name, TEST_TABLE_NAME);
            assert_eq!(partition_key, "userId");
        }
        other => panic!("expected key schema mismatch, got {other:?}"),
    }
    assert_eq!(backend.calls().await.create_table, 0);
}

#[tokio::test]
async fn test_custom_throughput_is_used_for_creation() -> Result<()> {
    let backend = InMemoryBackend::new();
    let config = fast_config().with_capacity(1, 2);

    AttributesStore::open(backend.clone(), USER_X, TEST_TABLE_NAME, &config).await?;

    let spec = backend.table_spec(TEST_TABLE_NAME).await.unwrap();
    assert_eq!(spec.read_capacity_units(), 1);
    assert_eq!(spec.write_capacity_units(), 2);
    Ok(())
}

// --- Attributes ---

#[tokio::test]
async fn test_save_then_get_round_trips() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store = open(&backend, USER_X).await?;

    store.set_attribute("favorite_color", AttributeValue::S("blue".to_string()));
    store.set_attribute("launch_count", AttributeValue::N("3".to_string()));
    store.set_attribute("tutorial_done", AttributeValue::Bool(true));
    store.save_attributes().await?;

    let loaded = store.get_attributes().await?.expect("attributes saved");
    assert_eq!(&loaded, store.attributes());

    // A fresh store for the same user sees the same document.
    let fresh = open(&backend, USER_X).await?;
    assert!(fresh.attributes().is_empty());
    assert_eq!(fresh.get_attributes().await?, Some(loaded));
    Ok(())
}

#[tokio::test]
async fn test_stored_item_shape() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store = open(&backend, USER_X).await?;
    store.set_attribute("score", AttributeValue::N("10".to_string()));
    store.save_attributes().await?;

    let item = backend
        .stored_item(TEST_TABLE_NAME, USER_X)
        .await
        .expect("item stored");
    assert_eq!(item.len(), 2);
    assert_eq!(item.get("id"), Some(&AttributeValue::S(USER_X.to_string())));
    assert_eq!(
        item.get(ATTRIBUTES_FIELD),
        Some(&AttributeValue::M(HashMap::from([(
            "score".to_string(),
            AttributeValue::N("10".to_string())
        )])))
    );
    Ok(())
}

#[tokio::test]
async fn test_users_are_isolated() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store_x = open(&backend, USER_X).await?;
    let mut store_y = open(&backend, USER_Y).await?;

    store_x.set_attribute("color", AttributeValue::S("red".to_string()));
    store_x.save_attributes().await?;
    assert_eq!(store_y.get_attributes().await?, None);

    store_y.set_attribute("color", AttributeValue::S("green".to_string()));
    store_y.save_attributes().await?;

    let x = store_x.get_attributes().await?.unwrap();
    let y = store_y.get_attributes().await?.unwrap();
    assert_eq!(x.get_string("color"), Some(&"red".to_string()));
    assert_eq!(y.get_string("color"), Some(&"green".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_save_replaces_previous_document() -> Result<()> {
    let backend = InMemoryBackend::new();

    let mut first = open(&backend, USER_X).await?;
    first.set_attribute("a", AttributeValue::S("1".to_string()));
    first.set_attribute("b", AttributeValue::S("2".to_string()));
    first.save_attributes().await?;

    let mut second = open(&backend, USER_X).await?;
    second.set_attribute("c", AttributeValue::S("3".to_string()));
    second.save_attributes().await?;

    let stored = second.get_attributes().await?.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(!stored.contains("a"));
    assert!(!stored.contains("b"));
    assert_eq!(stored.get_string("c"), Some(&"3".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_get_for_unknown_user_is_none() -> Result<()> {
    let backend = InMemoryBackend::new();
    let store = open(&backend, "never-saved").await?;

    assert_eq!(store.get_attributes().await?, None);
    assert_eq!(store.get_attributes_as::<QuizProgress>().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_set_attribute_does_not_write() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store = open(&backend, USER_X).await?;

    store.set_attribute("pending", AttributeValue::Bool(true));

    assert_eq!(backend.calls().await.put_item, 0);
    assert_eq!(store.get_attributes().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_set_attribute_overwrites_and_removes() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store = open(&backend, USER_X).await?;

    store.set_attribute("level", AttributeValue::N("1".to_string()));
    store.set_attribute("level", AttributeValue::N("2".to_string()));
    assert_eq!(store.attributes().get_number("level"), Some(2.0));

    assert!(store.remove_attribute("level").is_some());
    assert!(store.remove_attribute("level").is_none());
    assert!(store.attributes().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_serialized_attributes_round_trip() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store = open(&backend, USER_X).await?;
    let progress = QuizProgress {
        level: 4,
        streak: vec![true, true, false],
        nickname: Some("quizzer".to_string()),
    };

    store.set_serialized("progress", &progress)?;
    store.save_attributes().await?;

    let stored = store.get_attributes().await?.unwrap();
    assert_eq!(
        stored.get_deserialized::<QuizProgress>("progress")?,
        Some(progress)
    );
    assert_eq!(stored.get_deserialized::<QuizProgress>("missing")?, None);
    Ok(())
}

#[tokio::test]
async fn test_get_attributes_as_deserializes_document() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store = open(&backend, USER_X).await?;
    let progress = QuizProgress {
        level: 2,
        streak: vec![],
        nickname: None,
    };

    for (name, value) in Attributes::from_serialize(&progress)?.into_map() {
        store.set_attribute(name, value);
    }
    store.save_attributes().await?;

    assert_eq!(store.get_attributes_as::<QuizProgress>().await?, Some(progress));
    Ok(())
}

#[tokio::test]
async fn test_malformed_item_is_reported() -> Result<()> {
    let backend = InMemoryBackend::new();
    let store = open(&backend, USER_X).await?;
    backend
        .seed_item(
            TEST_TABLE_NAME,
            HashMap::from([
                ("id".to_string(), AttributeValue::S(USER_X.to_string())),
                (
                    ATTRIBUTES_FIELD.to_string(),
                    AttributeValue::S("not a map".to_string()),
                ),
            ]),
        )
        .await?;

    match store.get_attributes().await {
        Err(AttributesError::MalformedItem { user_id, .. }) => assert_eq!(user_id, USER_X),
        other => panic!("expected malformed item, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_item_without_attributes_is_reported() -> Result<()> {
    let backend = InMemoryBackend::new();
    let store = open(&backend, USER_X).await?;
    backend
        .seed_item(
            TEST_TABLE_NAME,
            HashMap::from([("id".to_string(), AttributeValue::S(USER_X.to_string()))]),
        )
        .await?;

    match store.get_attributes().await {
        Err(AttributesError::MalformedItem { user_id, reason }) => {
            assert_eq!(user_id, USER_X);
            assert_eq!(reason, "'attributes' is missing");
        }
        other => panic!("expected malformed item, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_non_finite_number_is_not_saved() -> Result<()> {
    let backend = InMemoryBackend::new();
    let mut store = open(&backend, USER_X).await?;

    store.set_attribute("score", AttributeValue::N(f64::NAN.to_string()));
    match store.save_attributes().await {
        Err(AttributesError::InvalidNumber { name, value }) => {
            assert_eq!(name, "score");
            assert_eq!(value, "NaN");
        }
        other => panic!("expected invalid number, got {other:?}"),
    }

    store.remove_attribute("score");
    store.set_attribute(
        "stats",
        AttributeValue::M(HashMap::from([(
            "best".to_string(),
            AttributeValue::N(f64::INFINITY.to_string()),
        )])),
    );
    assert!(matches!(
        store.save_attributes().await,
        Err(AttributesError::InvalidNumber { ref name, .. }) if name == "stats.best"
    ));

    assert_eq!(backend.calls().await.put_item, 0);
    Ok(())
}

#[tokio::test]
async fn test_stores_do_not_call_backend_after_open_until_used() -> Result<()> {
    let backend = InMemoryBackend::new();
    let before = backend.calls().await;
    assert_eq!(before, CallCounts::default());

    let store = open(&backend, USER_X).await?;
    let after_open = backend.calls().await;
    assert_eq!(after_open.put_item, 0);
    assert_eq!(after_open.get_item, 0);

    store.get_attributes().await?;
    assert_eq!(backend.calls().await.get_item, 1);
    Ok(())
}

// --- Building blocks ---

#[test]
fn test_attributes_operations() {
    let attributes = Attributes::new()
        .set_string("key1", "value1")
        .set_number("key2", 42.0)
        .set_bool("key3", false);

    assert_eq!(attributes.len(), 3);
    assert_eq!(attributes.get_string("key1"), Some(&"value1".to_string()));
    assert_eq!(attributes.get_number("key2"), Some(42.0));
    assert_eq!(attributes.get_bool("key3"), Some(false));
    assert_eq!(attributes.get_string("key2"), None);
    assert_eq!(attributes.get_string("non_existent"), None);
    assert_eq!(attributes.get_number("non_existent"), None);
}

#[test]
fn test_config_from_lookup() -> Result<()> {
    let vars = HashMap::from([
        ("ATTRIBUTES_WAIT_FOR_ACTIVE", "false"),
        ("ATTRIBUTES_POLL_INTERVAL_MS", "250"),
        ("ATTRIBUTES_MAX_POLL_ATTEMPTS", "12"),
        ("ATTRIBUTES_READ_CAPACITY", "3"),
        ("ATTRIBUTES_WRITE_CAPACITY", "10"),
        ("ATTRIBUTES_CONSISTENT_READS", "false"),
    ]);

    let config = StoreConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))?;

    assert!(!config.wait_for_active);
    assert_eq!(config.poll_interval, Duration::from_millis(250));
    assert_eq!(config.max_poll_attempts, 12);
    assert_eq!(config.read_capacity_units, 3);
    assert_eq!(config.write_capacity_units, 10);
    assert!(!config.consistent_reads);

    let defaults = StoreConfig::from_lookup(|_| None)?;
    assert_eq!(defaults, StoreConfig::default());
    Ok(())
}

#[test]
fn test_config_rejects_invalid_value() {
    let result = StoreConfig::from_lookup(|key| {
        (key == "ATTRIBUTES_MAX_POLL_ATTEMPTS").then(|| "forever".to_string())
    });

    assert!(matches!(
        result,
        Err(AttributesError::InvalidConfig {
            key: "ATTRIBUTES_MAX_POLL_ATTEMPTS",
            ..
        })
    ));
}

#[test]
fn test_config_rejects_zero_poll_attempts() {
    let result = StoreConfig::from_lookup(|key| {
        (key == "ATTRIBUTES_MAX_POLL_ATTEMPTS").then(|| "0".to_string())
    });

    assert!(matches!(
        result,
        Err(AttributesError::InvalidConfig {
            key: "ATTRIBUTES_MAX_POLL_ATTEMPTS",
            ref value,
        }) if value == "0"
    ));
    assert_eq!(StoreConfig::new().with_max_poll_attempts(0).max_poll_attempts, 1);
}

#[tokio::test]
async fn test_poll_until_returns_none_when_exhausted() {
    let mut checks = 0;
    let outcome: std::result::Result<Option<()>, ()> = poll_until(
        |_| {
            checks += 1;
            async { Ok(None) }
        },
        Duration::ZERO,
        3,
    )
    .await;

    assert_eq!(outcome, Ok(None));
    assert_eq!(checks, 3);
}

// --- Live DynamoDB ---

#[tokio::test]
#[ignore = "requires DynamoDB credentials"]
async fn test_check_auth() -> Result<()> {
    dotenv::dotenv().ok();
    let sdk_config = aws_config::load_from_env().await;
    let ddb = DynamoDb::new(&sdk_config);

    ddb.check_auth().await
}

#[tokio::test]
#[ignore = "requires DynamoDB credentials"]
async fn test_dynamodb_round_trip() -> Result<()> {
    dotenv::dotenv().ok();
    let sdk_config = aws_config::load_from_env().await;
    let ddb = DynamoDb::new(&sdk_config);

    info!("Opening store against '{}'", TEST_TABLE_NAME);
    let mut store =
        AttributesStore::open(ddb.clone(), USER_X, TEST_TABLE_NAME, &StoreConfig::default())
            .await?;
    assert!(store.table().status().is_active());

    store.set_attribute("visits", AttributeValue::N("1".to_string()));
    store.save_attributes().await?;
    let stored = store.get_attributes().await?.expect("item written");
    assert_eq!(stored.get_number("visits"), Some(1.0));

    let description = ddb.describe_table(TEST_TABLE_NAME).await?;
    assert_eq!(description.partition_key.as_deref(), Some("id"));
    Ok(())
}
