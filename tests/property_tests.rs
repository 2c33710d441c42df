//! Property tests for the pipeline's universal invariants.

use std::collections::BTreeSet;

use proptest::prelude::*;

use carve::cache::MemCache;
use carve::config::Config;
use carve::layout::common_root;
use carve::partition::partition_files;
use carve::rewrite::rewrite_import_path;
use carve::split::{Split, SplitSet};

/// A path segment from a small alphabet that deliberately includes pairs
/// sharing string prefixes (`one`/`onetwo`) and the `internal` token.
fn segment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("one".to_string()),
        Just("onetwo".to_string()),
        Just("two".to_string()),
        Just("lib".to_string()),
        Just("util".to_string()),
        Just("internal".to_string()),
    ]
}

fn rel_dir() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 0..4).prop_map(|segs| segs.join("/"))
}

fn rel_file() -> impl Strategy<Value = String> {
    (rel_dir(), "[a-z]{1,4}").prop_map(|(dir, name)| {
        if dir.is_empty() {
            format!("{name}.go")
        } else {
            format!("{dir}/{name}.go")
        }
    })
}

fn config_for(includes_a: &[String], includes_b: &[String]) -> Option<Config> {
    let cfg = serde_json::json!({
        "splits": {
            "a": {"module_path": "split.com/a", "includes": includes_a},
            "b": {"module_path": "split.com/b", "includes": includes_b},
        }
    });
    let cfg: Config = serde_json::from_value(cfg).ok()?;
    carve::config::validate(&cfg).ok().map(|()| cfg)
}

proptest! {
    /// Every file is claimed by at most one split, whatever the includes.
    #[test]
    fn prop_partition_is_disjoint(
        files in prop::collection::btree_set(rel_file(), 1..20),
        includes_a in prop::collection::vec(rel_dir(), 1..4),
        includes_b in prop::collection::vec(rel_dir(), 1..4),
    ) {
        // Configurations with the same canonical include on both splits
        // are rejected up front and carry no partition to check.
        let Some(cfg) = config_for(&includes_a, &includes_b) else {
            return Ok(());
        };

        let mut entries: Vec<(String, Vec<u8>)> =
            vec![("go.mod".to_string(), b"module example.com/mod\n".to_vec())];
        for f in &files {
            entries.push((f.clone(), b"package x\n".to_vec()));
        }
        let cache = MemCache::new(entries.into_iter().collect()).expect("cache should build");

        let mut world = SplitSet::from_config(&cfg);
        partition_files(&cache, &mut world).expect("partitioning is total");

        for f in &files {
            let owners = world
                .splits
                .values()
                .filter(|s| s.files.contains(f))
                .count();
            prop_assert!(owners <= 1, "file {f:?} is claimed by {owners} splits");
        }
    }

    /// The common root is deterministic, order-independent and a true
    /// directory prefix of every member.
    #[test]
    fn prop_common_root_is_stable(files in prop::collection::vec(rel_file(), 1..12)) {
        let root = common_root(files.iter().map(String::as_str));
        let again = common_root(files.iter().map(String::as_str));
        prop_assert_eq!(&root, &again);

        let mut reversed = files.clone();
        reversed.reverse();
        prop_assert_eq!(&root, &common_root(reversed.iter().map(String::as_str)));

        if !root.is_empty() {
            for f in &files {
                prop_assert!(
                    f == &root || f.starts_with(&format!("{root}/")),
                    "root {root:?} is not a prefix of {f:?}"
                );
            }
        }
    }

    /// Rewriting an already-rewritten import path is a no-op: the result
    /// never matches an intra-repo package or residual again.
    #[test]
    fn prop_import_rewrite_is_idempotent(
        suffix in rel_dir(),
        residual in prop::bool::ANY,
    ) {
        const MODULE: &str = "example.com/repo";

        let mut world = SplitSet::default();
        let spec: carve::config::SplitSpec = serde_json::from_value(serde_json::json!({
            "module_path": "split.com/a",
            "includes": ["a"],
        }))
        .expect("spec should deserialize");
        let mut split = Split::from_spec("a", &spec);
        split.root = "a".to_string();

        let path = if suffix.is_empty() {
            format!("{MODULE}/a")
        } else if residual {
            format!("{MODULE}/lib/{suffix}")
        } else {
            format!("{MODULE}/a/{suffix}")
        };

        if residual && !suffix.is_empty() {
            split.residuals = BTreeSet::from([path.clone()]);
        } else {
            world
                .pkg_to_split
                .insert(path.clone(), "a".to_string());
        }
        world.splits.insert("a".to_string(), split);

        let split = &world.splits["a"];
        let once = rewrite_import_path(&world, split, MODULE, &path);
        prop_assert!(once.is_some(), "intra-repo import must rewrite");
        let once = once.expect("presence just asserted");
        prop_assert_eq!(rewrite_import_path(&world, split, MODULE, &once), None);
    }
}
