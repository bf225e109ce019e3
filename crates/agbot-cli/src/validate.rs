//! # Validate Subcommand
//!
//! Runs a business policy definition through the same validation and
//! conversion the registry applies when caching it, and prints the
//! resulting internal policy.

use std::path::PathBuf;

use agbot_core::PolicyId;
use agbot_policy::ExchangeBusinessPolicy;
use anyhow::{Context, Result};
use clap::Args;

use crate::load_document;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Business policy definition (JSON or YAML).
    pub file: PathBuf,

    /// Policy id to name the internal policy with (`<org>/<name>`).
    /// Defaults to the owner's org and the file stem.
    #[arg(long)]
    pub id: Option<PolicyId>,

    /// Only report whether the definition is valid.
    #[arg(long, short)]
    pub quiet: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let record: ExchangeBusinessPolicy = load_document(&args.file)?;
    let policy_id = match &args.id {
        Some(id) => id.clone(),
        None => default_policy_id(&record, &args.file)?,
    };

    match record.business_policy().to_policy(&policy_id.to_string()) {
        Ok(policy) => {
            if args.quiet {
                println!("OK: {policy_id}");
            } else {
                println!("{}", serde_json::to_string_pretty(&policy)?);
            }
            Ok(0)
        }
        Err(e) => {
            println!("INVALID: {policy_id}: {e}");
            Ok(1)
        }
    }
}

fn default_policy_id(
    record: &ExchangeBusinessPolicy,
    path: &std::path::Path,
) -> Result<PolicyId> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("policy");
    let org = record
        .business_policy()
        .owner
        .split_once('/')
        .map_or(record.business_policy().service.org.as_str(), |(org, _)| org);
    PolicyId::new(org, name)
        .with_context(|| format!("no org to name {} with; pass --id", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(dir: &Path, file: &str, body: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, body).unwrap();
        path
    }

    const VALID: &str = r#"{
        "owner": "e2edev/admin",
        "service": {
            "name": "https://bluehorizon.network/services/netspeed",
            "org": "e2edev",
            "serviceVersions": [{"version": "2.3.0"}]
        }
    }"#;

    #[test]
    fn valid_definition_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bp_netspeed.json", VALID);
        let args = ValidateArgs {
            file: path,
            id: None,
            quiet: true,
        };
        assert_eq!(run_validate(&args).unwrap(), 0);
    }

    #[test]
    fn invalid_definition_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bp_broken.json",
            r#"{"service": {"name": "svc", "org": "e2edev", "serviceVersions": []}}"#,
        );
        let args = ValidateArgs {
            file: path,
            id: Some("e2edev/bp_broken".parse().unwrap()),
            quiet: true,
        };
        assert_eq!(run_validate(&args).unwrap(), 1);
    }

    #[test]
    fn default_id_uses_owner_org_and_file_stem() {
        let record: ExchangeBusinessPolicy = serde_json::from_str(VALID).unwrap();
        assert_eq!(
            default_policy_id(&record, Path::new("/tmp/bp_netspeed.json"))
                .unwrap()
                .to_string(),
            "e2edev/bp_netspeed"
        );
    }

    #[test]
    fn default_id_falls_back_to_service_org() {
        let mut record: ExchangeBusinessPolicy = serde_json::from_str(VALID).unwrap();
        record.policy.owner = "admin".to_string();
        let id = default_policy_id(&record, Path::new("bp.yaml")).unwrap();
        assert_eq!(id.org(), "e2edev");
        assert_eq!(id.name(), "bp");
    }

    #[test]
    fn default_id_needs_an_org() {
        let mut record: ExchangeBusinessPolicy = serde_json::from_str(VALID).unwrap();
        record.policy.owner = "admin".to_string();
        record.policy.service.org.clear();
        let err = default_policy_id(&record, Path::new("bp.yaml")).unwrap_err();
        assert!(err.to_string().contains("pass --id"));
    }
}
