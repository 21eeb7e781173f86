//! Logical consumer names and their physical endpoints.

use std::collections::HashMap;
use std::str::FromStr;

use core_config::{ConfigError, FromEnv};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{TransportError, TransportResult};

/// Every service that can be the target of an invocation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Consumer {
    /// Match profiles, embeddings and suggestions
    Explore,
    /// Ingests translate/explain usage events
    CollectingPush,
    /// Serves collected usage logs
    CollectingGet,
}

impl Consumer {
    pub const ALL: [Consumer; 3] = [
        Consumer::Explore,
        Consumer::CollectingPush,
        Consumer::CollectingGet,
    ];

    /// Per-consumer environment variable, e.g. `CONSUMER_COLLECTING_PUSH_URL`
    pub fn env_key(&self) -> String {
        format!(
            "CONSUMER_{}_URL",
            self.as_ref().replace('-', "_").to_ascii_uppercase()
        )
    }
}

/// Immutable mapping from [`Consumer`] to a physical endpoint.
///
/// Built once at process start and shared behind an `Arc`. There is no way
/// to mutate a map after construction; [`ConsumerMap::with`] consumes the
/// builder value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerMap {
    endpoints: HashMap<Consumer, String>,
}

impl ConsumerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `consumer` to `endpoint`, replacing an earlier binding
    pub fn with(mut self, consumer: Consumer, endpoint: impl Into<String>) -> Self {
        self.endpoints.insert(consumer, endpoint.into());
        self
    }

    /// Parse `{"explore": "http://...", ...}`.
    ///
    /// Unknown consumer names and empty endpoints are configuration errors.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let entries: HashMap<String, String> =
            serde_json::from_str(raw).map_err(|e| ConfigError::ParseError {
                key: "CONSUMER_MAP".to_string(),
                details: e.to_string(),
            })?;

        let mut map = Self::new();
        for (name, endpoint) in entries {
            let consumer = Consumer::from_str(&name)
                .map_err(|_| ConfigError::Invalid(format!("unknown consumer '{}'", name)))?;
            if endpoint.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "empty endpoint for consumer '{}'",
                    consumer
                )));
            }
            map = map.with(consumer, endpoint.trim());
        }
        Ok(map)
    }

    /// Physical endpoint for `consumer`
    pub fn resolve(&self, consumer: Consumer) -> TransportResult<&str> {
        self.endpoints
            .get(&consumer)
            .map(String::as_str)
            .ok_or(TransportError::UnknownConsumer(consumer))
    }

    pub fn contains(&self, consumer: Consumer) -> bool {
        self.endpoints.contains_key(&consumer)
    }

    /// Fail fast at startup when a consumer this process talks to is not
    /// registered.
    pub fn require(&self, required: &[Consumer]) -> Result<(), ConfigError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !self.contains(**c))
            .map(|c| c.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "no endpoint registered for consumer(s): {}",
                missing.join(", ")
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Consumer, &str)> {
        self.endpoints.iter().map(|(c, e)| (*c, e.as_str()))
    }
}

impl FromEnv for ConsumerMap {
    /// `CONSUMER_MAP` (JSON object) wins when set. Otherwise each consumer
    /// is read from its own `CONSUMER_<NAME>_URL` variable; unset ones are
    /// simply absent.
    fn from_env() -> Result<Self, ConfigError> {
        if let Ok(raw) = std::env::var("CONSUMER_MAP") {
            return Self::from_json(&raw);
        }

        let mut map = Self::new();
        for consumer in Consumer::ALL {
            if let Ok(endpoint) = std::env::var(consumer.env_key()) {
                if !endpoint.trim().is_empty() {
                    map = map.with(consumer, endpoint.trim());
                }
            }
        }
        Ok(map)
    }
}
