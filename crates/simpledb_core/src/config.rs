//! Store configuration.

use crate::id::IdAlgorithm;
use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to hold an advisory lock on the store directory while open.
    pub lock_directory: bool,

    /// Whether to fsync files and directories on every write (safer but slower).
    pub sync_writes: bool,

    /// How many ids `create` tries before giving up on collisions.
    pub max_create_attempts: u32,

    /// Pause between collision retries.
    pub create_retry_delay: Duration,

    /// Algorithm used when Fix registers or normalizes a collection.
    pub default_algorithm: IdAlgorithm,

    /// Temp files older than this are reported as stale by Check.
    pub stale_temp_age: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            lock_directory: true,
            sync_writes: true,
            max_create_attempts: 5,
            create_retry_delay: Duration::ZERO,
            default_algorithm: IdAlgorithm::Tid62,
            stale_temp_age: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to lock the store directory.
    #[must_use]
    pub const fn lock_directory(mut self, value: bool) -> Self {
        self.lock_directory = value;
        self
    }

    /// Sets whether to fsync on every write.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets the collision retry budget. Values below 1 are treated as 1.
    #[must_use]
    pub const fn max_create_attempts(mut self, attempts: u32) -> Self {
        self.max_create_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Sets the pause between collision retries.
    #[must_use]
    pub const fn create_retry_delay(mut self, delay: Duration) -> Self {
        self.create_retry_delay = delay;
        self
    }

    /// Sets the algorithm Fix uses for orphan and unrecognized collections.
    #[must_use]
    pub const fn default_algorithm(mut self, algorithm: IdAlgorithm) -> Self {
        self.default_algorithm = algorithm;
        self
    }

    /// Sets the age after which temp files count as stale.
    #[must_use]
    pub const fn stale_temp_age(mut self, age: Duration) -> Self {
        self.stale_temp_age = age;
        self
    }
}
