//! # Replay Subcommand
//!
//! Drives a [`PolicyManager`] through a scripted sequence of refresh steps
//! and prints every event it publishes, one JSON object per line, followed
//! by the orgs still tracked at the end.
//!
//! ## Scenario format
//!
//! ```yaml
//! steps:
//!   - served:
//!       - { businessPolOrg: e2edev, businessPol: bp_netspeed, nodeOrg: userdev }
//!   - update:
//!       org: e2edev
//!       policies:
//!         e2edev/bp_netspeed:
//!           service:
//!             name: https://bluehorizon.network/services/netspeed
//!             org: e2edev
//!             serviceVersions: [{ version: 2.3.0 }]
//!   - served: []
//! ```
//!
//! A `served` step replaces the complete served-triplet set. An `update`
//! step hands the complete set of definitions of one org to the registry.
//! A failing step is reported and the replay continues with the next one.

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;

use agbot_registry::{
    EventDelivery, PolicyDefinitions, PolicyEvent, PolicyManager, RegistryConfig,
    ServedBusinessPolicy, ServedPolicyMap,
};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Deserialize;

use crate::load_document;

/// Arguments for the replay subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Scenario file (JSON or YAML).
    pub scenario: PathBuf,

    /// Event delivery mode, overriding `AGBOT_EVENT_DELIVERY`.
    #[arg(long)]
    pub delivery: Option<EventDelivery>,

    /// Bounded channel capacity, overriding `AGBOT_EVENT_CHANNEL_CAPACITY`.
    #[arg(long)]
    pub capacity: Option<NonZeroUsize>,

    /// Print the full manager state after the replay instead of the org list.
    #[arg(long)]
    pub full_summary: bool,
}

/// A scripted refresh sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    // Steps are single-key maps (`served:` / `update:`) in both formats.
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

/// One refresh step.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Replace the served-triplet set.
    Served(Vec<ServedBusinessPolicy>),
    /// Reconcile one org against its current definitions.
    Update {
        org: String,
        #[serde(default)]
        policies: PolicyDefinitions,
    },
}

/// What a replay produced.
#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Every published event, in publication order.
    pub events: Vec<PolicyEvent>,
    /// Orgs tracked after the last step.
    pub tracked_orgs: Vec<String>,
    /// `(step index, error)` for every step that failed.
    pub failures: Vec<(usize, String)>,
    /// Display form of the manager after the last step.
    pub summary: String,
}

/// Execute the replay subcommand.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let mut config = RegistryConfig::from_env().context("invalid registry configuration")?;
    if let Some(delivery) = args.delivery {
        config.event_delivery = delivery;
    }
    if let Some(capacity) = args.capacity {
        config.event_channel_capacity = capacity.get();
    }

    let scenario: Scenario = load_document(&args.scenario)?;
    tracing::info!(
        steps = scenario.steps.len(),
        delivery = %config.event_delivery,
        capacity = config.event_channel_capacity,
        "replaying scenario"
    );

    let report = replay(&scenario, &config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for event in &report.events {
        writeln!(out, "{}", serde_json::to_string(event)?)?;
    }
    if args.full_summary {
        writeln!(out, "{}", report.summary)?;
    } else {
        writeln!(out, "tracked orgs: [{}]", report.tracked_orgs.join(", "))?;
    }

    for (index, error) in &report.failures {
        tracing::error!(step = index, "{error}");
    }
    Ok(if report.failures.is_empty() { 0 } else { 1 })
}

/// Run `scenario` against a fresh manager built from `config`.
///
/// Events are drained on a separate thread while the steps run, so a
/// bounded channel smaller than the number of events does not stall.
pub fn replay(scenario: &Scenario, config: &RegistryConfig) -> Result<ReplayReport> {
    let (pm, rx) = PolicyManager::with_config(config);

    thread::scope(|s| {
        let consumer = s.spawn(move || rx.iter().collect::<Vec<PolicyEvent>>());

        let mut report = ReplayReport::default();
        for (index, step) in scenario.steps.iter().enumerate() {
            if let Err(e) = apply_step(&pm, step) {
                tracing::warn!(step = index, error = %e, "scenario step failed");
                report.failures.push((index, e.to_string()));
            }
        }
        report.tracked_orgs = pm.all_tracked_orgs();
        report.summary = pm.to_string();

        // Dropping the manager closes the channel and ends the consumer.
        drop(pm);
        report.events = consumer
            .join()
            .map_err(|_| anyhow!("event consumer thread panicked"))?;
        Ok(report)
    })
}

fn apply_step(pm: &PolicyManager, step: &Step) -> Result<()> {
    match step {
        Step::Served(triplets) => {
            pm.replace_served_policies(served_map(triplets))?;
        }
        Step::Update { org, policies } => {
            pm.update_org_policies(org, policies)?;
        }
    }
    Ok(())
}

/// Key triplets the way the fleet registry does: `<org>_<policy>_<node org>`.
fn served_map(triplets: &[ServedBusinessPolicy]) -> ServedPolicyMap {
    triplets
        .iter()
        .map(|sp| {
            (
                format!("{}_{}_{}", sp.business_pol_org, sp.business_pol, sp.node_org),
                sp.clone(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
steps:
  - served:
      - { businessPolOrg: orgA, businessPol: polA, nodeOrg: nodeOrgA }
  - update:
      org: orgA
      policies:
        orgA/polA:
          service:
            name: https://bluehorizon.network/services/netspeed
            org: orgA
            serviceVersions: [{ version: 1.0.0 }]
  - update:
      org: orgA
      policies:
        orgA/polA:
          service:
            name: https://bluehorizon.network/services/netspeed
            org: orgA
            serviceVersions: [{ version: 2.0.0 }]
  - update:
      org: orgA
      policies: {}
"#;

    fn parse(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn scenario_yields_change_then_delete() {
        let report = replay(&parse(SCENARIO), &RegistryConfig::default()).unwrap();
        let kinds: Vec<&str> = report.events.iter().map(PolicyEvent::kind).collect();
        assert_eq!(kinds, vec!["PolicyChanged", "PolicyDeleted"]);
        assert!(report.tracked_orgs.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn single_slot_channel_does_not_stall() {
        let config = RegistryConfig {
            event_channel_capacity: 1,
            event_delivery: EventDelivery::Synchronous,
        };
        let report = replay(&parse(SCENARIO), &config).unwrap();
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn failing_step_is_recorded_and_replay_continues() {
        let scenario = parse(
            r#"
steps:
  - update: { org: ghost, policies: {} }
  - served:
      - { businessPolOrg: orgB, businessPol: "*" }
"#,
        );
        let report = replay(&scenario, &RegistryConfig::default()).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, 0);
        assert!(report.failures[0].1.contains("org ghost not found"));
        assert_eq!(report.tracked_orgs, vec!["orgB"]);
    }

    #[test]
    fn served_keys_follow_registry_format() {
        let map = served_map(&[ServedBusinessPolicy::new("orgA", "*", "")]);
        assert!(map.contains_key("orgA_*_"));
    }
}
