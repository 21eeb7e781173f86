use std::time::Duration;

use core_config::{ConfigError, FromEnv, env_parse_or};

/// HTTP transport tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Upper bound for a single invocation when the caller's context has no
    /// tighter deadline
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_millis(1000),
        }
    }
}

impl FromEnv for TransportConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = env_parse_or("TRANSPORT_TIMEOUT_SECS", 5)?;
        let connect_ms: u64 = env_parse_or("TRANSPORT_CONNECT_TIMEOUT_MS", 1000)?;

        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "TRANSPORT_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_millis(connect_ms),
        })
    }
}
