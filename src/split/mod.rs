//! Split data model.
//!
//! A [`Split`] is one carved sub-module; a [`SplitSet`] holds every split
//! of a run plus the derived lookup tables. Splits refer to each other by
//! name only, which keeps the dependency relation a flat, serialisable
//! table instead of a pointer graph.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::config::{Config, SplitSpec};

/// One configured split and the state accumulated for it by the pipeline.
///
/// The configuration fields are fixed at construction; the derived fields
/// are populated monotonically as the pipeline stages run.
#[derive(Debug, Clone)]
pub struct Split {
    /// Name of the split, unique within the configuration.
    pub name: String,
    /// Module path under which the split will be published.
    pub module_path: String,
    /// Root-relative path prefixes whose packages belong to this split.
    pub includes: Vec<String>,
    /// Root-relative path prefixes excluded from this split.
    pub excludes: Vec<String>,
    /// Remote VCS URL, forwarded to external tooling.
    pub url: Option<String>,
    /// Remote VCS branch, forwarded to external tooling.
    pub branch: String,

    /// Files directly belonging to the split, relative to the source root.
    pub files: BTreeSet<String>,
    /// Import paths of packages the split pulls in without exposing them.
    pub residuals: BTreeSet<String>,
    /// Files making up the residual packages.
    pub residual_files: BTreeSet<String>,
    /// Names of other splits this split imports packages from.
    pub split_deps: BTreeSet<String>,
    /// Longest common directory of `files`; the split's new module root.
    pub root: String,
    /// Longest common directory of the residual files, never shallower
    /// than `root`. Unused when `residuals` is empty.
    pub residuals_root: String,
    /// Directory the split's rewritten content is emitted into.
    pub work_dir: Option<PathBuf>,
}

impl Split {
    /// Create the initial state for a configured split.
    pub fn from_spec(name: &str, spec: &SplitSpec) -> Self {
        Self {
            name: name.to_string(),
            module_path: spec.module_path.clone(),
            includes: spec.includes.clone(),
            excludes: spec.excludes.clone(),
            url: spec.url.clone(),
            branch: spec.branch.clone(),
            files: BTreeSet::new(),
            residuals: BTreeSet::new(),
            residual_files: BTreeSet::new(),
            split_deps: BTreeSet::new(),
            root: String::new(),
            residuals_root: String::new(),
            work_dir: None,
        }
    }
}

/// All splits of a run, indexed by name, plus derived lookup tables.
#[derive(Debug, Clone, Default)]
pub struct SplitSet {
    /// The splits, keyed by name.
    pub splits: BTreeMap<String, Split>,
    /// Package import path to owning split, for every package directly
    /// included in a split.
    pub pkg_to_split: BTreeMap<String, String>,
    /// Target module path to split name; diagnostic lookups only.
    pub path_to_split: BTreeMap<String, String>,
}

impl SplitSet {
    /// Build the initial split set from a validated configuration.
    pub fn from_config(cfg: &Config) -> Self {
        let splits = cfg
            .splits
            .iter()
            .map(|(name, spec)| (name.clone(), Split::from_spec(name, spec)))
            .collect();
        Self {
            splits,
            pkg_to_split: BTreeMap::new(),
            path_to_split: BTreeMap::new(),
        }
    }

    /// The split owning the given package, if any.
    pub fn split_for_pkg(&self, pkg: &str) -> Option<&str> {
        self.pkg_to_split.get(pkg).map(String::as_str)
    }
}
