//! Read-only access to the files and parsed sources of a Go module.
//!
//! The pipeline never touches the filesystem directly; everything flows
//! through the [`FileCache`] trait. Two implementations are provided:
//! [`DiskCache`] over a checked-out repository and [`MemCache`] over an
//! in-memory file map (used pervasively by tests).

mod diskcache;
mod memcache;

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::ingest::goast::SourceFile;
use crate::ingest::ParseMode;

pub use diskcache::DiskCache;
pub use memcache::MemCache;

/// Read-only facade over a Go module's files and parsed sources.
///
/// Implementations must be usable from multiple threads (`Sync`): the
/// residual resolver reads through the cache from a worker pool. Parsed
/// sources returned by [`FileCache::read_source`] are always independent
/// values; callers may consume or mutate them freely without affecting
/// later reads of the same path.
pub trait FileCache: Sync {
    /// Absolute path of the module root. Diagnostics only.
    fn root(&self) -> &Path;

    /// The module path declared by the repository's `go.mod`.
    fn module_path(&self) -> &str;

    /// All files of the module, as `/`-separated paths relative to the
    /// root. Nested modules and VCS metadata are excluded.
    fn files(&self) -> &BTreeSet<String>;

    /// Import paths of all Go packages of the module.
    fn pkgs(&self) -> &BTreeSet<String>;

    /// All files (Go and non-Go) belonging to the given package.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CarveError::UnknownPackage`] if the package is not
    /// part of the module.
    fn files_in_pkg(&self, pkg: &str) -> Result<BTreeSet<String>>;

    /// Raw content of a file of the module.
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Parsed content of a Go source file of the module.
    fn read_source(&self, path: &str, mode: ParseMode) -> Result<SourceFile>;
}

/// Directory portion of a `/`-separated relative path; empty at the root.
pub fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Import path of the package a file belongs to.
pub fn pkg_path(module_path: &str, file: &str) -> String {
    let dir = dir_of(file);
    if dir.is_empty() {
        module_path.to_string()
    } else {
        format!("{module_path}/{dir}")
    }
}

/// Extract the module path from `go.mod` content.
pub(crate) fn module_path_from_gomod(data: &[u8]) -> Option<String> {
    let re = Regex::new(r"(?m)^module\s+(\S+)\s*$").expect("static pattern");
    let text = std::str::from_utf8(data).ok()?;
    re.captures(text).map(|c| c[1].to_string())
}

/// Derive the package set from a file listing.
pub(crate) fn pkgs_from_files<'a>(
    module_path: &str,
    files: impl IntoIterator<Item = &'a String>,
) -> BTreeSet<String> {
    files
        .into_iter()
        .filter(|f| crate::ingest::goast::is_go_file(f))
        .map(|f| pkg_path(module_path, f))
        .collect()
}
