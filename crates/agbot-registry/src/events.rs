//! # Policy Events
//!
//! The registry tells negotiation workers about policy state changes through
//! an [`EventSink`]. Two messages exist:
//!
//! - [`PolicyEvent::Changed`]: the content hash of a cached business policy
//!   changed; existing agreements should be renegotiated.
//! - [`PolicyEvent::Deleted`]: a cached business policy was removed, on its
//!   own or as part of an org; its agreements should be cancelled.
//!
//! Events are published while the registry still holds its org lock, so the
//! order of events always matches the order of the state changes behind
//! them. With a bounded sink that also means a slow consumer stalls the
//! registry; see [`EventDelivery`](crate::EventDelivery).

use std::sync::mpsc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{EventDelivery, RegistryConfig};

/// Payload shared by both event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEventPayload {
    /// Internal policy name (the composite `<org>/<name>` id).
    pub name: String,
    /// Org the policy is cached under.
    pub org: String,
    /// The internal policy marshalled to JSON.
    pub policy: String,
}

/// A policy lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PolicyEvent {
    /// Content of a cached policy changed.
    Changed(PolicyEventPayload),
    /// A cached policy was removed.
    Deleted(PolicyEventPayload),
}

impl PolicyEvent {
    /// Build a change event.
    pub fn changed(name: impl Into<String>, org: impl Into<String>, policy: String) -> Self {
        Self::Changed(PolicyEventPayload {
            name: name.into(),
            org: org.into(),
            policy,
        })
    }

    /// Build a delete event.
    pub fn deleted(name: impl Into<String>, org: impl Into<String>, policy: String) -> Self {
        Self::Deleted(PolicyEventPayload {
            name: name.into(),
            org: org.into(),
            policy,
        })
    }

    /// The event payload.
    pub fn payload(&self) -> &PolicyEventPayload {
        match self {
            Self::Changed(p) | Self::Deleted(p) => p,
        }
    }

    /// Message type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Changed(_) => "PolicyChanged",
            Self::Deleted(_) => "PolicyDeleted",
        }
    }
}

impl std::fmt::Display for PolicyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let p = self.payload();
        write!(f, "{} {} (org {})", self.kind(), p.name, p.org)
    }
}

/// Failure to hand an event to its consumer.
#[derive(Error, Debug)]
pub enum EventError {
    /// The receiving side is gone; the event was dropped.
    #[error("event receiver disconnected, dropped {0}")]
    Disconnected(Box<PolicyEvent>),
}

/// Outbound notification channel for policy events.
pub trait EventSink: Send + Sync {
    /// Deliver one event. May block, depending on the implementation.
    fn publish(&self, event: PolicyEvent) -> Result<(), EventError>;
}

/// Bounded: blocks while the channel is full.
impl EventSink for mpsc::SyncSender<PolicyEvent> {
    fn publish(&self, event: PolicyEvent) -> Result<(), EventError> {
        self.send(event)
            .map_err(|mpsc::SendError(e)| EventError::Disconnected(Box::new(e)))
    }
}

/// Unbounded: never blocks.
impl EventSink for mpsc::Sender<PolicyEvent> {
    fn publish(&self, event: PolicyEvent) -> Result<(), EventError> {
        self.send(event)
            .map_err(|mpsc::SendError(e)| EventError::Disconnected(Box::new(e)))
    }
}

/// Unbounded, for consumers running on a tokio runtime. Never blocks.
impl EventSink for tokio::sync::mpsc::UnboundedSender<PolicyEvent> {
    fn publish(&self, event: PolicyEvent) -> Result<(), EventError> {
        self.send(event)
            .map_err(|tokio::sync::mpsc::error::SendError(e)| {
                EventError::Disconnected(Box::new(e))
            })
    }
}

/// Build the event channel described by `config`.
///
/// A synchronous channel always has room for at least one event.
pub fn event_channel(config: &RegistryConfig) -> (Arc<dyn EventSink>, mpsc::Receiver<PolicyEvent>) {
    match config.event_delivery {
        EventDelivery::Synchronous => {
            let (tx, rx) = mpsc::sync_channel(config.event_channel_capacity.max(1));
            (Arc::new(tx), rx)
        }
        EventDelivery::Decoupled => {
            let (tx, rx) = mpsc::channel();
            (Arc::new(tx), rx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_and_kind() {
        let ev = PolicyEvent::changed("e2edev/bp_netspeed", "e2edev", "{}".to_string());
        assert_eq!(ev.kind(), "PolicyChanged");
        assert_eq!(ev.payload().org, "e2edev");
        assert_eq!(ev.to_string(), "PolicyChanged e2edev/bp_netspeed (org e2edev)");
    }

    #[test]
    fn json_is_tagged() {
        let ev = PolicyEvent::deleted("userdev/bp_gpstest", "userdev", "{}".to_string());
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "deleted");
        assert_eq!(json["name"], "userdev/bp_gpstest");
    }

    #[test]
    fn sync_channel_delivers() {
        let (sink, rx) = event_channel(&RegistryConfig::default());
        sink.publish(PolicyEvent::deleted("o/p", "o", String::new()))
            .unwrap();
        assert_eq!(rx.recv().unwrap().kind(), "PolicyDeleted");
    }

    #[test]
    fn zero_capacity_still_buffers_one_event() {
        let (sink, rx) = event_channel(&RegistryConfig {
            event_channel_capacity: 0,
            event_delivery: EventDelivery::Synchronous,
        });
        sink.publish(PolicyEvent::deleted("o/p", "o", String::new()))
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().kind(), "PolicyDeleted");
    }

    #[test]
    fn dropped_receiver_is_reported() {
        let (sink, rx) = event_channel(&RegistryConfig {
            event_channel_capacity: 1,
            event_delivery: EventDelivery::Decoupled,
        });
        drop(rx);
        let err = sink
            .publish(PolicyEvent::changed("o/p", "o", String::new()))
            .unwrap_err();
        let EventError::Disconnected(ev) = err;
        assert_eq!(ev.payload().name, "o/p");
    }

    #[tokio::test]
    async fn tokio_sink_reaches_async_consumer() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink: Arc<dyn EventSink> = Arc::new(tx);
        let consumer = tokio::spawn(async move { rx.recv().await });
        sink.publish(PolicyEvent::changed("o/p", "o", String::new()))
            .unwrap();
        let received = consumer.await.unwrap().expect("event");
        assert_eq!(received.payload().name, "o/p");
    }
}
