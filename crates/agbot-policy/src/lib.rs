//! # agbot-policy: Policy Payloads and the Internal Policy Form
//!
//! The fleet registry serves two kinds of policy definition:
//!
//! - **Business policies** (`business.rs`): which service to deploy, on
//!   which versions and architectures, plus properties and constraints the
//!   node must satisfy.
//!
//! - **External (service) policies** (`external.rs`): properties and
//!   constraints attached to one service referenced by a business policy.
//!
//! Both are validated and converted into the internal [`Policy`]
//! (`policy.rs`), the form negotiation workers match against nodes and the
//! form carried, marshalled to JSON, in change and delete events.
//!
//! Evaluating constraint expressions is not this crate's concern; a
//! constraint is validated only for being present and non-blank.

pub mod business;
pub mod error;
pub mod external;
pub mod policy;

pub use business::{
    BusinessPolicy, ExchangeBusinessPolicy, NodeHealth, ServiceRef, WorkloadChoice,
    WorkloadPriority,
};
pub use error::PolicyError;
pub use external::{ExternalPolicy, Property};
pub use policy::{AgreementProtocol, Policy, PolicyHeader, Workload};
