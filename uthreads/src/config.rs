//! Runtime configuration.

use uthreads_abi::{Quantum, ThreadResult};
use uthreads_lib::klog::klog_set_level;
use uthreads_lib::{KlogLevel, klog_warn};

/// Environment variable selecting the log level.
pub const LOG_ENV: &str = "UTHREADS_LOG";

pub const DEFAULT_LOG_LEVEL: KlogLevel = KlogLevel::Warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub quantum: Quantum,
    pub log_level: KlogLevel,
}

impl RuntimeConfig {
    pub fn new(quantum_usecs: i64) -> ThreadResult<Self> {
        Ok(Self {
            quantum: Quantum::from_micros(quantum_usecs)?,
            log_level: DEFAULT_LOG_LEVEL,
        })
    }

    /// Configuration with the log level read from [`LOG_ENV`].
    pub fn from_env(quantum_usecs: i64) -> ThreadResult<Self> {
        Self::from_lookup(quantum_usecs, |key| std::env::var(key).ok())
    }

    /// Configuration with settings resolved through `lookup`. Unknown level
    /// names fall back to the default with a warning.
    pub fn from_lookup(
        quantum_usecs: i64,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ThreadResult<Self> {
        let mut config = Self::new(quantum_usecs)?;
        if let Some(raw) = lookup(LOG_ENV) {
            match KlogLevel::parse(&raw) {
                Some(level) => config.log_level = level,
                None => klog_warn!("uthreads: ignoring {}={:?}", LOG_ENV, raw),
            }
        }
        Ok(config)
    }

    pub fn with_log_level(mut self, level: KlogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn apply(&self) {
        klog_set_level(self.log_level);
    }
}
