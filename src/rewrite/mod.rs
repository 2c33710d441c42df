//! Split content emission.
//!
//! Writes every split's files and residual files into its work directory,
//! relocated to the split's new layout and with every intra-repository
//! import rewritten to its destination: another split's module path, or
//! the split's own internalized residual location.
//!
//! Go files are re-emitted as their original bytes with only the import
//! path literals spliced, in descending byte order. That printer is a
//! fixed point of itself, which makes the whole rewrite idempotent and
//! keeps untouched files byte-identical.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;
use ropey::Rope;

use crate::cache::FileCache;
use crate::error::{CarveError, Result};
use crate::ingest::goast::{is_go_file, SourceFile, Span};
use crate::ingest::ParseMode;
use crate::pipeline::CancelToken;
use crate::split::{Split, SplitSet};

/// Module-manifest files owned by the external build collaborator; the
/// rewriter never copies them.
const MANIFEST_FILES: &[&str] = &["go.mod", "go.sum"];

/// Emit the rewritten content of every split, in the dependency order
/// computed by the split graph.
pub fn cleave_splits(
    cache: &impl FileCache,
    world: &SplitSet,
    order: &[String],
    cancel: &CancelToken,
) -> Result<()> {
    for name in order {
        let Some(split) = world.splits.get(name) else {
            continue;
        };
        cleave_split(cache, world, split, cancel)?;
    }
    Ok(())
}

fn cleave_split(
    cache: &impl FileCache,
    world: &SplitSet,
    split: &Split,
    cancel: &CancelToken,
) -> Result<()> {
    debug!("Cleaving split {:?}.", split.name);
    let Some(work_dir) = &split.work_dir else {
        return Err(CarveError::Rewrite {
            file: PathBuf::from(&split.name),
            message: "split has no work directory assigned".to_string(),
        });
    };

    // Maps each emitted target path back to its source, so that two
    // sources claiming one target fail loudly instead of overwriting.
    let mut targets: BTreeMap<String, String> = BTreeMap::new();

    for file in &split.files {
        cancel.check()?;
        emit_file(cache, world, split, work_dir, file, false, &mut targets)?;
    }
    for file in &split.residual_files {
        cancel.check()?;
        emit_file(cache, world, split, work_dir, file, true, &mut targets)?;
    }

    copy_metafiles(cache, work_dir)?;
    write_readme(cache, work_dir)?;
    Ok(())
}

/// Relative path a file is emitted under inside the split's work dir.
///
/// Direct files, and residual files that already live under the split
/// root without crossing an `internal/` boundary, keep their position
/// relative to the root. Every other residual file is relocated into the
/// `internal/residuals/` subtree with any pre-existing `internal`
/// segments flattened away.
fn target_rel_path(split: &Split, source: &str, residual: bool) -> String {
    let under_root = !split.root.is_empty()
        && source.starts_with(&format!("{}/", split.root));

    if !residual || (under_root && !has_internal_segment(strip_dir_prefix(source, &split.root))) {
        strip_dir_prefix(source, &split.root).to_string()
    } else {
        let tail = strip_dir_prefix(source, &split.residuals_root);
        format!("internal/residuals/{}", strip_internal_segments(tail))
    }
}

fn emit_file(
    cache: &impl FileCache,
    world: &SplitSet,
    split: &Split,
    work_dir: &Path,
    source: &str,
    residual: bool,
    targets: &mut BTreeMap<String, String>,
) -> Result<()> {
    let basename = source.rsplit('/').next().unwrap_or(source);
    if MANIFEST_FILES.contains(&basename) {
        debug!("Skipping module manifest {source:?}; the build collaborator owns it.");
        return Ok(());
    }

    let rel = target_rel_path(split, source, residual);
    if let Some(previous) = targets.insert(rel.clone(), source.to_string()) {
        return Err(CarveError::Rewrite {
            file: PathBuf::from(&rel),
            message: format!(
                "both {previous:?} and {source:?} map to the same target path"
            ),
        });
    }

    let target = work_dir.join(&rel);
    debug!("Copying {source:?} to {}.", target.display());
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CarveError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let content = if is_go_file(source) {
        let src = cache.read_source(source, ParseMode::Full)?;
        rewrite_imports(world, split, cache.module_path(), &src).into_bytes()
    } else {
        cache.read_file(source)?
    };

    std::fs::write(&target, content).map_err(|e| CarveError::Io {
        path: target,
        source: e,
    })
}

/// Re-emit a Go file with its intra-repository imports rewritten.
pub fn rewrite_imports(
    world: &SplitSet,
    split: &Split,
    module_path: &str,
    src: &SourceFile,
) -> String {
    let mut edits: Vec<(Span, String)> = Vec::new();
    for imp in &src.imports {
        let Some(new_path) = rewrite_import_path(world, split, module_path, &imp.path) else {
            continue;
        };
        if new_path == imp.path {
            continue;
        }
        debug!("Rewrote import {:?} to {:?}.", imp.path, new_path);
        edits.push((imp.path_span, format!("\"{new_path}\"")));
    }
    if edits.is_empty() {
        return src.text.clone();
    }

    // Splice back to front so earlier spans stay valid.
    edits.sort_by_key(|(span, _)| Reverse(span.start));
    let mut rope = Rope::from_str(&src.text);
    for (span, literal) in edits {
        let start = rope.byte_to_char(span.start);
        let end = rope.byte_to_char(span.end);
        rope.remove(start..end);
        rope.insert(start, &literal);
    }
    rope.to_string()
}

/// Rewritten form of one import path, or `None` when it is external and
/// stays untouched.
pub fn rewrite_import_path(
    world: &SplitSet,
    split: &Split,
    module_path: &str,
    path: &str,
) -> Option<String> {
    if let Some(owner) = world.split_for_pkg(path) {
        // The package belongs to a split (possibly this one): swap the
        // source-module prefix up to that split's root for its new module
        // path, keeping any suffix below the root.
        let target = world.splits.get(owner)?;
        let old_prefix = module_prefix(module_path, &target.root);
        return match strip_path_prefix(path, &old_prefix) {
            Some("") => Some(target.module_path.clone()),
            Some(suffix) => Some(format!("{}/{}", target.module_path, suffix)),
            None => None,
        };
    }

    if split.residuals.contains(path) {
        // A residual physically under the split's own root behind an
        // internal boundary keeps its path below the new module root.
        if !split.root.is_empty() {
            let own_prefix = module_prefix(module_path, &split.root);
            if let Some(rest) = strip_path_prefix(path, &own_prefix) {
                if has_internal_segment(rest) {
                    return Some(format!("{}/{}", split.module_path, rest));
                }
            }
        }

        let base = module_prefix(module_path, &split.residuals_root);
        let tail = strip_path_prefix(path, &base).unwrap_or(path);
        return Some(format!(
            "{}/internal/residuals/{}",
            split.module_path,
            strip_internal_segments(tail)
        ));
    }

    None
}

/// The source-module import-path prefix covering a split root.
fn module_prefix(module_path: &str, root: &str) -> String {
    if root.is_empty() {
        module_path.to_string()
    } else {
        format!("{module_path}/{root}")
    }
}

/// Strip `prefix` plus its separator; `Some("")` on an exact match.
fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if path == prefix {
        return Some("");
    }
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// Strip a directory prefix from a repo-relative file path, leaving the
/// path untouched when it does not lie under the directory.
fn strip_dir_prefix<'a>(path: &'a str, dir: &str) -> &'a str {
    if dir.is_empty() {
        return path;
    }
    match path.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(rest) => rest,
        None => path,
    }
}

/// Whether `internal` occurs as a whole path segment.
fn has_internal_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "internal")
}

/// Remove every `internal` segment from a path.
fn strip_internal_segments(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty() && *segment != "internal")
        .collect::<Vec<_>>()
        .join("/")
}

/// Copy root-level license files into the work dir.
fn copy_metafiles(cache: &impl FileCache, work_dir: &Path) -> Result<()> {
    let license = Regex::new(r"(?i)^licen[cs]e(\.md)?$").expect("static pattern");
    for file in cache.files() {
        if file.contains('/') || !license.is_match(file) {
            continue;
        }
        let content = cache.read_file(file)?;
        let target = work_dir.join(file);
        std::fs::write(&target, content).map_err(|e| CarveError::Io {
            path: target,
            source: e,
        })?;
    }
    Ok(())
}

/// Write the default README placeholder for a split.
fn write_readme(cache: &impl FileCache, work_dir: &Path) -> Result<()> {
    let readme = format!(
        "# Carved module\n\n\
         This module was automatically carved out of [{0}](https://{0}).\n\n\
         Please direct any issues or contributions to the source module.\n",
        cache.module_path()
    );
    let target = work_dir.join("README.md");
    std::fs::write(&target, readme).map_err(|e| CarveError::Io {
        path: target,
        source: e,
    })
}
