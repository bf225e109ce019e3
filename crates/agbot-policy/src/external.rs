//! # External Policies
//!
//! An external policy is the properties-and-constraints payload the fleet
//! registry attaches to a service. It is also the shape shared by the
//! property and constraint sections of a business policy, so the validation
//! helpers here are reused by `business.rs`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::policy::{Policy, PolicyHeader};

/// A named property value. Values are arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name, unique within its list.
    pub name: String,
    /// Property value.
    pub value: serde_json::Value,
}

impl Property {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A service policy as served by the fleet registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalPolicy {
    /// Properties the service advertises.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    /// Constraint expressions a counterparty must satisfy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

impl ExternalPolicy {
    /// Check property names and constraint expressions.
    pub fn validate(&self) -> Result<(), PolicyError> {
        validate_properties(&self.properties)?;
        validate_constraints(&self.constraints)
    }

    /// Validate and convert into the internal policy form for `service_id`.
    pub fn to_policy(&self, service_id: &str) -> Result<Policy, PolicyError> {
        self.validate()?;
        if service_id.is_empty() {
            return Err(PolicyError::MissingPolicyName);
        }
        Ok(Policy {
            header: PolicyHeader::new(service_id),
            agreement_protocols: Vec::new(),
            workloads: Vec::new(),
            properties: self.properties.clone(),
            constraints: self.constraints.clone(),
            node_health: None,
        })
    }
}

pub(crate) fn validate_properties(properties: &[Property]) -> Result<(), PolicyError> {
    let mut seen = BTreeSet::new();
    for prop in properties {
        if prop.name.trim().is_empty() {
            return Err(PolicyError::EmptyPropertyName);
        }
        if !seen.insert(prop.name.as_str()) {
            return Err(PolicyError::DuplicateProperty {
                name: prop.name.clone(),
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_constraints(constraints: &[String]) -> Result<(), PolicyError> {
    match constraints.iter().position(|c| c.trim().is_empty()) {
        Some(index) => Err(PolicyError::BlankConstraint { index }),
        None => Ok(()),
    }
}
