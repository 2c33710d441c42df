//! Split configuration document.
//!
//! The configuration is a JSON file mapping split names to their module
//! path, include/exclude prefixes and optional VCS coordinates. Loading
//! validates everything the pipeline relies on so later stages can assume
//! a well-formed split set.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CarveError, Result};
use crate::partition::canonical_prefix;

/// The root configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Credential configuration, opaque to the pipeline and forwarded to
    /// external VCS tooling.
    #[serde(default)]
    pub credentials: Option<serde_json::Value>,

    /// Commit author identity, forwarded to external VCS tooling.
    #[serde(default)]
    pub author: Option<Author>,

    /// The configured splits, keyed by name.
    #[serde(default)]
    pub splits: BTreeMap<String, SplitSpec>,
}

/// Commit author identity.
#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    /// Author name.
    pub name: String,
    /// Author email.
    pub email: String,
}

/// Configuration of a single split.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitSpec {
    /// Module path under which the split is published. Required.
    #[serde(default)]
    pub module_path: String,

    /// Root-relative path prefixes selecting packages for this split. At
    /// least one is required.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Root-relative path prefixes deselecting packages from this split.
    #[serde(default)]
    pub excludes: Vec<String>,

    /// URL of the VCS repository hosting the split.
    #[serde(default)]
    pub url: Option<String>,

    /// Branch to publish split content on.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "master".to_string()
}

/// Load and validate a configuration file.
pub fn load(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| CarveError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let cfg: Config = serde_json::from_str(&content).map_err(|e| CarveError::ConfigInvalid {
        message: format!("cannot parse {}: {e}", path.display()),
    })?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration document.
///
/// Rejects an empty split set, splits without a module path or includes,
/// and the same canonical include prefix claimed by two different splits.
pub fn validate(cfg: &Config) -> Result<()> {
    if cfg.splits.is_empty() {
        return Err(CarveError::ConfigInvalid {
            message: "no splits are configured".to_string(),
        });
    }

    let mut claimed: BTreeMap<String, &str> = BTreeMap::new();
    for (name, spec) in &cfg.splits {
        if spec.module_path.is_empty() {
            return Err(CarveError::ConfigInvalid {
                message: format!("split {name:?} has no module_path"),
            });
        }
        if spec.includes.is_empty() {
            return Err(CarveError::ConfigInvalid {
                message: format!("split {name:?} has no includes"),
            });
        }
        for include in &spec.includes {
            let prefix = canonical_prefix(include);
            if let Some(other) = claimed.insert(prefix, name.as_str()) {
                if other != name.as_str() {
                    return Err(CarveError::ConfigInvalid {
                        message: format!(
                            "include {include:?} is claimed by both splits {other:?} and {name:?}"
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}
