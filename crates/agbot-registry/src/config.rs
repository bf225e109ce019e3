//! Registry configuration.
//!
//! Loaded from the environment by the binary; library callers may build it
//! directly.

use std::str::FromStr;

/// How policy events reach their consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventDelivery {
    /// Bounded channel. A full channel blocks the registry, holding its
    /// lock, until the consumer catches up.
    #[default]
    Synchronous,
    /// Unbounded channel. Mutations never wait on the consumer, so events
    /// may lag the state that produced them.
    Decoupled,
}

impl FromStr for EventDelivery {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(Self::Synchronous),
            "decoupled" | "async" => Ok(Self::Decoupled),
            other => Err(ConfigError::InvalidDelivery(other.to_string())),
        }
    }
}

impl std::fmt::Display for EventDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Synchronous => "sync",
            Self::Decoupled => "decoupled",
        })
    }
}

/// Tunables for a [`PolicyManager`](crate::PolicyManager) and its event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Capacity of the bounded event channel. Ignored for decoupled delivery.
    /// Must be at least 1. A 0 set directly is treated as 1.
    pub event_channel_capacity: usize,
    /// Delivery mode.
    pub event_delivery: EventDelivery,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 64,
            event_delivery: EventDelivery::Synchronous,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AGBOT_EVENT_CHANNEL_CAPACITY`: at least 1 (default: 64)
    /// - `AGBOT_EVENT_DELIVERY`: `sync` or `decoupled` (default: `sync`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let event_channel_capacity = match lookup("AGBOT_EVENT_CHANNEL_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidCapacity(raw)),
            },
            None => defaults.event_channel_capacity,
        };
        let event_delivery = match lookup("AGBOT_EVENT_DELIVERY") {
            Some(raw) => raw.parse()?,
            None => defaults.event_delivery,
        };
        Ok(Self {
            event_channel_capacity,
            event_delivery,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The channel capacity is not a positive integer.
    #[error("AGBOT_EVENT_CHANNEL_CAPACITY must be a positive integer, got \"{0}\"")]
    InvalidCapacity(String),

    /// The delivery mode is not one of the known names.
    #[error("AGBOT_EVENT_DELIVERY must be \"sync\" or \"decoupled\", got \"{0}\"")]
    InvalidDelivery(String),
}
