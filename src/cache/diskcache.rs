//! Filesystem-backed file cache.
//!
//! Walks a checked-out Go module once at construction time, recording its
//! files and packages. `.git/` trees and nested modules (directories with
//! their own `go.mod`) are excluded, matching the boundary of what belongs
//! to the carved module.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::debug;

use crate::cache::{dir_of, module_path_from_gomod, pkg_path, pkgs_from_files, FileCache};
use crate::error::{CarveError, Result};
use crate::ingest::goast::SourceFile;
use crate::ingest::{parse_source, ParseMode};

/// A [`FileCache`] over a module checked out on disk.
#[derive(Debug)]
pub struct DiskCache {
    root: PathBuf,
    module_path: String,
    files: BTreeSet<String>,
    pkgs: BTreeSet<String>,
}

impl DiskCache {
    /// Open the module rooted at `root`.
    ///
    /// # Errors
    ///
    /// Fails if `root` has no readable `go.mod` with a `module` directive,
    /// or if the directory walk fails.
    pub fn open(root: &Path) -> Result<Self> {
        let root = root.canonicalize().map_err(|e| CarveError::Io {
            path: root.to_path_buf(),
            source: e,
        })?;

        let gomod_path = root.join("go.mod");
        let gomod = std::fs::read(&gomod_path).map_err(|e| CarveError::Io {
            path: gomod_path.clone(),
            source: e,
        })?;
        let module_path =
            module_path_from_gomod(&gomod).ok_or_else(|| CarveError::ConfigInvalid {
                message: format!("no module path found in {}", gomod_path.display()),
            })?;

        let files = walk_module(&root)?;
        debug!(
            "Opened module {} at {} with {} file(s).",
            module_path,
            root.display(),
            files.len()
        );

        let pkgs = pkgs_from_files(&module_path, &files);
        Ok(Self {
            root,
            module_path,
            files,
            pkgs,
        })
    }
}

/// Enumerate a module's files, relative to `root` with `/` separators.
fn walk_module(root: &Path) -> Result<BTreeSet<String>> {
    let pattern = format!("{}/**/*", root.display());
    let entries = glob::glob(&pattern).map_err(|e| CarveError::ConfigInvalid {
        message: format!("invalid module root {}: {e}", root.display()),
    })?;

    let mut files = BTreeSet::new();
    for entry in entries {
        let path = entry.map_err(|e| CarveError::Io {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        if !path.is_file() {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let rel: Vec<&str> = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        if rel.iter().any(|c| *c == ".git") {
            continue;
        }
        files.insert(rel.join("/"));
    }

    // Drop nested modules: any subtree rooted at a directory holding its
    // own go.mod belongs to a different module.
    let nested: Vec<String> = files
        .iter()
        .filter(|f| *f != "go.mod" && f.ends_with("/go.mod"))
        .map(|f| format!("{}/", dir_of(f)))
        .collect();
    files.retain(|f| !nested.iter().any(|prefix| f.starts_with(prefix)));

    Ok(files)
}

impl FileCache for DiskCache {
    fn root(&self) -> &Path {
        &self.root
    }

    fn module_path(&self) -> &str {
        &self.module_path
    }

    fn files(&self) -> &BTreeSet<String> {
        &self.files
    }

    fn pkgs(&self) -> &BTreeSet<String> {
        &self.pkgs
    }

    fn files_in_pkg(&self, pkg: &str) -> Result<BTreeSet<String>> {
        if !self.pkgs.contains(pkg) {
            return Err(CarveError::UnknownPackage {
                pkg: pkg.to_string(),
                module: self.module_path.clone(),
            });
        }
        Ok(self
            .files
            .iter()
            .filter(|f| pkg_path(&self.module_path, f) == pkg)
            .cloned()
            .collect())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        if !self.files.contains(path) {
            return Err(CarveError::UnknownFile {
                path: path.to_string(),
                module: self.module_path.clone(),
            });
        }
        let abs = self.root.join(path);
        std::fs::read(&abs).map_err(|e| CarveError::Io {
            path: abs,
            source: e,
        })
    }

    fn read_source(&self, path: &str, mode: ParseMode) -> Result<SourceFile> {
        if !crate::ingest::goast::is_go_file(path) {
            return Err(CarveError::Parse {
                file: PathBuf::from(path),
                message: "not a Go source file".to_string(),
            });
        }
        let data = self.read_file(path)?;
        parse_source(path, &data, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("file path has a parent"))
            .expect("mkdir should succeed");
        fs::write(path, content).expect("write should succeed");
    }

    #[test]
    fn test_open_and_walk() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let root = dir.path();
        write(root, "go.mod", "module example.com/repo\n");
        write(root, "one/one.go", "package one\n");
        write(root, ".git/config", "ignored\n");
        write(root, "vendor-mod/go.mod", "module example.com/other\n");
        write(root, "vendor-mod/other.go", "package other\n");

        let cache = DiskCache::open(root).expect("module should open");
        assert_eq!(cache.module_path(), "example.com/repo");
        assert!(cache.files().contains("one/one.go"));
        assert!(cache.files().contains("go.mod"));
        assert!(!cache.files().contains(".git/config"));
        assert!(!cache.files().contains("vendor-mod/other.go"));
        assert!(!cache.files().contains("vendor-mod/go.mod"));
        assert!(cache.pkgs().contains("example.com/repo/one"));
    }

    #[test]
    fn test_read_source() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let root = dir.path();
        write(root, "go.mod", "module example.com/repo\n");
        write(root, "one/one.go", "package one\n\nimport \"fmt\"\n");

        let cache = DiskCache::open(root).expect("module should open");
        let src = cache
            .read_source("one/one.go", ParseMode::ImportsOnly)
            .expect("source should parse");
        assert_eq!(src.package, "one");
        assert_eq!(src.imports.len(), 1);
    }

    #[test]
    fn test_missing_gomod() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let err = DiskCache::open(dir.path()).expect_err("module without go.mod must fail");
        assert!(matches!(err, CarveError::Io { .. }));
    }
}
