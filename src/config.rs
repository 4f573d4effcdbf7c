//! Store configuration.
//!
//! Every setting has a default matching the classic behaviour: 5/5
//! provisioned throughput, polling once per second after creating a table.
//! The binary layers environment overrides on top through
//! [`StoreConfig::from_env`].

use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AttributesError, Result};

pub const WAIT_FOR_ACTIVE_VAR: &str = "ATTRIBUTES_WAIT_FOR_ACTIVE";
pub const POLL_INTERVAL_MS_VAR: &str = "ATTRIBUTES_POLL_INTERVAL_MS";
pub const MAX_POLL_ATTEMPTS_VAR: &str = "ATTRIBUTES_MAX_POLL_ATTEMPTS";
pub const READ_CAPACITY_VAR: &str = "ATTRIBUTES_READ_CAPACITY";
pub const WRITE_CAPACITY_VAR: &str = "ATTRIBUTES_WRITE_CAPACITY";
pub const CONSISTENT_READS_VAR: &str = "ATTRIBUTES_CONSISTENT_READS";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;
pub const DEFAULT_CAPACITY_UNITS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Poll a freshly created table until it reports ACTIVE before binding it.
    pub wait_for_active: bool,
    /// Delay before each status check.
    pub poll_interval: Duration,
    /// Upper bound on status checks before giving up. At least one check is
    /// always made.
    pub max_poll_attempts: u32,
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
    pub consistent_reads: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            wait_for_active: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            read_capacity_units: DEFAULT_CAPACITY_UNITS,
            write_capacity_units: DEFAULT_CAPACITY_UNITS,
            consistent_reads: true,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wait_for_active(mut self, wait: bool) -> Self {
        self.wait_for_active = wait;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the status check limit; `0` is raised to `1`.
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts.max(1);
        self
    }

    /// Status checks the poll loop may make, never less than one.
    pub fn poll_attempts(&self) -> u32 {
        self.max_poll_attempts.max(1)
    }

    pub fn with_capacity(mut self, read_units: i64, write_units: i64) -> Self {
        self.read_capacity_units = read_units;
        self.write_capacity_units = write_units;
        self
    }

    pub fn with_consistent_reads(mut self, consistent: bool) -> Self {
        self.consistent_reads = consistent;
        self
    }

    /// Builds a config from the defaults plus any `ATTRIBUTES_*` overrides
    /// present in the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(wait) = parse_var::<bool, _>(&lookup, WAIT_FOR_ACTIVE_VAR)? {
            config.wait_for_active = wait;
        }
        if let Some(millis) = parse_var::<u64, _>(&lookup, POLL_INTERVAL_MS_VAR)? {
            config.poll_interval = Duration::from_millis(millis);
        }
        if let Some(attempts) = parse_var::<NonZeroU32, _>(&lookup, MAX_POLL_ATTEMPTS_VAR)? {
            config.max_poll_attempts = attempts.get();
        }
        if let Some(units) = parse_var(&lookup, READ_CAPACITY_VAR)? {
            config.read_capacity_units = units;
        }
        if let Some(units) = parse_var(&lookup, WRITE_CAPACITY_VAR)? {
            config.write_capacity_units = units;
        }
        if let Some(consistent) = parse_var(&lookup, CONSISTENT_READS_VAR)? {
            config.consistent_reads = consistent;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AttributesError::InvalidConfig { key, value }),
        None => Ok(None),
    }
}
