use std::time::Duration;

use thiserror::Error;

pub const TIMEOUT_ENV: &str = "CMDSNAP_TIMEOUT_MS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for env var {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Kill policy for [`crate::ProcessExecutor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecConfig {
    /// Wall-clock budget before the child is killed and recorded as halted.
    pub timeout: Duration,
    /// How often the child is polled for exit.
    pub poll_interval: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ExecConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let ms = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|&ms| ms > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    var: TIMEOUT_ENV,
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
