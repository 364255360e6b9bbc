//! Mediator configuration.
//!
//! # Example
//!
//! ```
//! use mediator::{MediatorConfig, PublishStrategy};
//!
//! let config = MediatorConfig::from_json(r#"{"publish_strategy":"parallel"}"#).unwrap();
//! assert_eq!(config.publish_strategy, PublishStrategy::Parallel);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MediatorError, Result};

/// Strategy used when no strategy is configured.
pub const DEFAULT_PUBLISH_STRATEGY: PublishStrategy = PublishStrategy::Sequential;

/// How a notification is fanned out to its handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStrategy {
    /// Start every handler, wait for all, aggregate failures.
    Parallel,
    /// Run handlers one at a time in registration order, aggregate failures.
    #[default]
    Sequential,
    /// Run handlers in registration order, stop at the first failure.
    SequentialStopOnFailure,
}

impl PublishStrategy {
    /// Configuration name of the strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            PublishStrategy::Parallel => "parallel",
            PublishStrategy::Sequential => "sequential",
            PublishStrategy::SequentialStopOnFailure => "sequential_stop_on_failure",
        }
    }
}

impl fmt::Display for PublishStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStrategy {
    type Err = MediatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "parallel" => Ok(PublishStrategy::Parallel),
            "sequential" => Ok(PublishStrategy::Sequential),
            "sequential_stop_on_failure" => Ok(PublishStrategy::SequentialStopOnFailure),
            other => Err(MediatorError::Config(format!(
                "unknown publish strategy '{}'",
                other
            ))),
        }
    }
}

/// Configuration for a [`Mediator`](crate::Mediator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediatorConfig {
    /// Strategy used by `publish` when the caller does not pick one.
    pub publish_strategy: PublishStrategy,
}

impl MediatorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MediatorError::Config(e.to_string()))
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| MediatorError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MediatorConfig::default();
        assert_eq!(config.publish_strategy, DEFAULT_PUBLISH_STRATEGY);
    }

    #[test]
    fn test_from_json() {
        let config =
            MediatorConfig::from_json(r#"{"publish_strategy":"sequential_stop_on_failure"}"#)
                .unwrap();
        assert_eq!(
            config.publish_strategy,
            PublishStrategy::SequentialStopOnFailure
        );

        let empty = MediatorConfig::from_json("{}").unwrap();
        assert_eq!(empty, MediatorConfig::default());
    }

    #[test]
    fn test_from_json_rejects_unknown() {
        let err = MediatorConfig::from_json(r#"{"publish_strategy":"random"}"#).unwrap_err();
        assert!(matches!(err, MediatorError::Config(_)));

        let err = MediatorConfig::from_json(r#"{"strategy":"parallel"}"#).unwrap_err();
        assert!(matches!(err, MediatorError::Config(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = MediatorConfig {
            publish_strategy: PublishStrategy::Parallel,
        };
        let json = config.to_json().unwrap();
        assert_eq!(json, r#"{"publish_strategy":"parallel"}"#);
        assert_eq!(MediatorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_strategy_from_str() {
        for strategy in [
            PublishStrategy::Parallel,
            PublishStrategy::Sequential,
            PublishStrategy::SequentialStopOnFailure,
        ] {
            assert_eq!(strategy.to_string().parse::<PublishStrategy>().unwrap(), strategy);
        }
        assert!("fast".parse::<PublishStrategy>().is_err());
    }
}
