use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub const LOG_LEVEL_VAR: &str = "ATTRIBUTES_LOG_LEVEL";

/// Reads the log level from `ATTRIBUTES_LOG_LEVEL`, defaulting to `INFO`.
pub fn level_from_env() -> Result<Level> {
    match std::env::var(LOG_LEVEL_VAR) {
        Ok(value) => value
            .parse()
            .map_err(|_| anyhow!("Invalid {LOG_LEVEL_VAR}: '{value}'")),
        Err(_) => Ok(Level::INFO),
    }
}

pub fn init_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
