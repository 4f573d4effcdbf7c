mod command_line;

use anyhow::{anyhow, Result};
use persistent_attributes::config::StoreConfig;
use persistent_attributes::dynamodb::DynamoDb;
use persistent_attributes::{logging, AttributesStore};
use tracing::info;

const DEFAULT_TABLE_NAME: &str = "skill-attributes";
const USER_ID_VAR: &str = "ATTRIBUTES_USER_ID";
const TABLE_NAME_VAR: &str = "ATTRIBUTES_TABLE_NAME";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging(logging::level_from_env()?)?;

    let mut args = std::env::args().skip(1);
    let user_id = args
        .next()
        .or_else(|| std::env::var(USER_ID_VAR).ok())
        .ok_or_else(|| anyhow!("usage: persistent-attributes <user-id> [table-name]"))?;
    let table_name = args
        .next()
        .or_else(|| std::env::var(TABLE_NAME_VAR).ok())
        .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

    let config = StoreConfig::from_env()?;
    let sdk_config = aws_config::load_from_env().await;

    let ddb = DynamoDb::new(&sdk_config);
    ddb.check_auth().await?;

    let mut store = AttributesStore::open(ddb, user_id, table_name, &config).await?;
    info!(
        "Attributes store ready for '{}' on '{}'",
        store.user_id(),
        store.table_name()
    );

    command_line::run(&mut store).await
}
