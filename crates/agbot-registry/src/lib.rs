//! # agbot-registry: Policy Cache and Change Detection
//!
//! Tracks which orgs and business policies this agreement bot serves, caches
//! the converted form of every served policy, detects content changes by
//! hash and tells negotiation workers when to renegotiate or cancel.
//!
//! ## Architecture
//!
//! - **Served table** (`served.rs`): the `(policy org, policy, node org)`
//!   triplets assigned to this agent.
//!
//! - **Entries** (`entry.rs`): cached business and service policies with
//!   their content hashes.
//!
//! - **Events** (`events.rs`): `PolicyChanged` / `PolicyDeleted` messages and
//!   the sinks they are delivered through.
//!
//! - **Manager** (`manager.rs`): the two-lock cache driven by the refresh
//!   loop and read by negotiation workers.
//!
//! Fetching triplets and definitions from the fleet registry is the caller's
//! job; this crate does no I/O.

pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod manager;
pub mod served;

pub use config::{ConfigError, EventDelivery, RegistryConfig};
pub use entry::{BusinessPolicyEntry, ServicePolicyEntry};
pub use error::{EntryError, RegistryError};
pub use events::{event_channel, EventError, EventSink, PolicyEvent, PolicyEventPayload};
pub use manager::{OrgPolicies, PolicyDefinitions, PolicyManager};
pub use served::{ServedBusinessPolicy, ServedPolicyMap, ServedPolicyTable};
