//! # agbot-cli: Policy Cache Tooling
//!
//! Provides the `agbot` command-line interface for working with business
//! policy definitions offline and for exercising the policy registry.
//!
//! ## Subcommands
//!
//! - `agbot hash`: content digest of a business policy definition.
//! - `agbot validate`: validate a definition and print its internal policy.
//! - `agbot replay`: drive a `PolicyManager` through a scenario file and
//!   print every event it publishes.
//!
//! ```bash
//! agbot hash policies/bp_netspeed.json
//! agbot validate policies/bp_netspeed.yaml --id e2edev/bp_netspeed
//! agbot replay scenarios/unserve_org.yaml --delivery decoupled
//! ```
//!
//! Definition and scenario files may be JSON or YAML; the format is picked by
//! file extension.

pub mod hash;
pub mod replay;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Read and parse a JSON or YAML document.
///
/// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
/// as JSON.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&raw).with_context(|| format!("failed to parse YAML {}", path.display()))
    } else {
        serde_json::from_str(&raw).with_context(|| format!("failed to parse JSON {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("doc.yml");
        std::fs::File::create(&yaml)
            .unwrap()
            .write_all(b"a: 1\nb: [x, y]\n")
            .unwrap();
        let v: serde_json::Value = load_document(&yaml).unwrap();
        assert_eq!(v["b"][1], "y");

        let json = dir.path().join("doc.json");
        std::fs::write(&json, r#"{"a": 1}"#).unwrap();
        let v: serde_json::Value = load_document(&json).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn reports_missing_file() {
        let err = load_document::<serde_json::Value>(Path::new("/nonexistent/agbot.json"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_document::<serde_json::Value>(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse JSON"));
    }
}
