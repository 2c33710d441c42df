//! Package partitioning.
//!
//! Assigns every file of the source module to at most one split by
//! matching the file's directory against the configured include and
//! exclude prefixes. The longest matching prefix wins, which lets an
//! exclude carve a subtree out of a shorter include and lets one split
//! nest inside another.

use std::cmp::Ordering;

use log::debug;

use crate::cache::{dir_of, pkg_path, FileCache};
use crate::error::Result;
use crate::split::SplitSet;

/// Canonical form of an include/exclude prefix: `.` segments removed and
/// a trailing separator appended, so that `one/` can never match inside
/// the segment `onetwo/`.
pub fn canonical_prefix(prefix: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        "./".to_string()
    } else {
        format!("{}/", segments.join("/"))
    }
}

/// The key a file is matched under: its directory, canonicalised the same
/// way as the prefixes.
fn match_key(file: &str) -> String {
    canonical_prefix(dir_of(file))
}

/// A single prefix rule; excludes carry no split.
#[derive(Debug, Clone)]
struct PrefixRule {
    prefix: String,
    split: Option<String>,
}

/// Total order over prefixes: when one is a prefix of the other the longer
/// sorts first, otherwise plain lexicographic order. This guarantees a
/// binary search encounters the longest matching rule before any shorter
/// rule sharing its prefix.
fn prefix_cmp(a: &str, b: &str) -> Ordering {
    if a.starts_with(b) || b.starts_with(a) {
        b.len().cmp(&a.len())
    } else {
        a.cmp(b)
    }
}

/// Find the rule matching a key, if any, and return its split.
fn matched_split<'a>(rules: &'a [PrefixRule], key: &str) -> Option<&'a str> {
    let mut low = 0;
    let mut high = rules.len();
    while low != high && low < rules.len() {
        let mid = (low + high) / 2;
        match prefix_cmp(key, &rules[mid].prefix) {
            Ordering::Less => high = mid,
            Ordering::Equal => return rules[mid].split.as_deref(),
            Ordering::Greater => low = mid + 1,
        }
    }
    if high < rules.len() && key.starts_with(&rules[high].prefix) {
        return rules[high].split.as_deref();
    }
    None
}

/// Assign every module file to at most one split and derive the package
/// and module-path lookup tables.
///
/// The partitioner is total: files matching no rule, or matching an
/// exclude, are simply left out of every split.
pub fn partition_files(cache: &impl FileCache, world: &mut SplitSet) -> Result<()> {
    let mut rules = Vec::new();
    for (name, split) in &world.splits {
        for include in &split.includes {
            rules.push(PrefixRule {
                prefix: canonical_prefix(include),
                split: Some(name.clone()),
            });
        }
        for exclude in &split.excludes {
            rules.push(PrefixRule {
                prefix: canonical_prefix(exclude),
                split: None,
            });
        }
    }
    rules.sort_by(|a, b| prefix_cmp(&a.prefix, &b.prefix));
    debug!(
        "Partitioning {} file(s) over {} prefix rule(s).",
        cache.files().len(),
        rules.len()
    );

    for file in cache.files() {
        let Some(split) = matched_split(&rules, &match_key(file)) else {
            continue;
        };
        if let Some(s) = world.splits.get_mut(split) {
            s.files.insert(file.clone());
        }
    }

    let module_path = cache.module_path();
    world.pkg_to_split.clear();
    world.path_to_split.clear();
    for (name, split) in &world.splits {
        world
            .path_to_split
            .insert(split.module_path.clone(), name.clone());
        for file in &split.files {
            world
                .pkg_to_split
                .insert(pkg_path(module_path, file), name.clone());
        }
    }
    Ok(())
}
