//! Split layout planning.
//!
//! Computes each split's root (the longest directory prefix common to all
//! of its files, which becomes the split's new module root) and, when the
//! split carries residuals, the analogous root of its residual files.

use log::debug;

use crate::cache::dir_of;
use crate::split::SplitSet;

/// Populate `root` and `residuals_root` on every split.
///
/// The planner is total and deterministic: the same file sets always
/// yield the same roots.
pub fn plan_layout(world: &mut SplitSet) {
    for split in world.splits.values_mut() {
        split.root = common_root(split.files.iter().map(String::as_str));
        debug!(
            "Computed root {:?} for split {:?}.",
            split.root, split.name
        );

        if !split.residuals.is_empty() {
            // Seeding the fold with the split root keeps the residuals
            // root from ending up shallower than the split root itself.
            split.residuals_root = common_root_seeded(
                &split.root,
                split.residual_files.iter().map(String::as_str),
            );
            debug!(
                "Computed residuals root {:?} for split {:?}.",
                split.residuals_root, split.name
            );
        }
    }
}

/// Longest common directory prefix of a set of file paths. Empty for an
/// empty set and for sets with no shared leading directory.
pub fn common_root<'a>(files: impl IntoIterator<Item = &'a str>) -> String {
    fold_root(None, files)
}

fn common_root_seeded<'a>(seed: &'a str, files: impl IntoIterator<Item = &'a str>) -> String {
    fold_root(Some(segments_of(seed)), files)
}

fn fold_root<'a>(
    seed: Option<Vec<&'a str>>,
    files: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut root = seed;
    for file in files {
        let dir = segments_of(dir_of(file));
        match &mut root {
            None => root = Some(dir),
            Some(common) => {
                let shared = common
                    .iter()
                    .zip(&dir)
                    .take_while(|(a, b)| a == b)
                    .count();
                common.truncate(shared);
            }
        }
    }
    root.unwrap_or_default().join("/")
}

fn segments_of(dir: &str) -> Vec<&str> {
    dir.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_of(files: &[&str]) -> String {
        common_root(files.iter().copied())
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(root_of(&[]), "");
    }

    #[test]
    fn test_one_element() {
        assert_eq!(root_of(&["my/own/path/file.go"]), "my/own/path");
    }

    #[test]
    fn test_root_level_file() {
        assert_eq!(root_of(&["file.go"]), "");
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(root_of(&["/my/own/path/file.go"]), "my/own/path");
    }

    #[test]
    fn test_two_related_paths() {
        assert_eq!(
            root_of(&["my/own/path/file.go", "my/own/way/file.go"]),
            "my/own"
        );
    }

    #[test]
    fn test_two_unrelated_paths() {
        assert_eq!(
            root_of(&["my/own/path/file.go", "your/other/way/file.go"]),
            ""
        );
    }

    #[test]
    fn test_short_long_and_long_short() {
        assert_eq!(
            root_of(&["my/own/file.go", "my/own/path/file.go"]),
            "my/own"
        );
        assert_eq!(
            root_of(&["my/own/path/file.go", "my/own/file.go"]),
            "my/own"
        );
    }

    #[test]
    fn test_residuals_root_never_shallower_than_seed() {
        assert_eq!(
            common_root_seeded("one/two", ["one/two/util/u.go"].into_iter()),
            "one/two"
        );
        assert_eq!(
            common_root_seeded("one/two", ["one/other/u.go"].into_iter()),
            "one"
        );
    }

    #[test]
    fn test_roots_are_deterministic() {
        let files = ["a/b/c/file.go", "a/b/d/file.go", "a/b/file.go"];
        assert_eq!(root_of(&files), root_of(&files));
        assert_eq!(root_of(&files), "a/b");
    }
}
