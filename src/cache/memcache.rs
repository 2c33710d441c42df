//! In-memory file cache.
//!
//! Serves the [`FileCache`] contract from a plain file map. This is the
//! backing store for unit and integration tests, which assemble small
//! synthetic modules without touching the filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::cache::{module_path_from_gomod, pkg_path, pkgs_from_files, FileCache};
use crate::error::{CarveError, Result};
use crate::ingest::goast::SourceFile;
use crate::ingest::{parse_source, ParseMode};

/// A [`FileCache`] over an in-memory file map.
#[derive(Debug)]
pub struct MemCache {
    root: PathBuf,
    module_path: String,
    entries: BTreeMap<String, Vec<u8>>,
    files: BTreeSet<String>,
    pkgs: BTreeSet<String>,
}

impl MemCache {
    /// Build a cache from a file map. The map must contain a `go.mod` with
    /// a `module` directive; entries under `.git/` are dropped.
    pub fn new(files: BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let gomod = files.get("go.mod").ok_or_else(|| CarveError::ConfigInvalid {
            message: "no go.mod in the supplied file entries".to_string(),
        })?;
        let module_path =
            module_path_from_gomod(gomod).ok_or_else(|| CarveError::ConfigInvalid {
                message: "no module path found in go.mod".to_string(),
            })?;

        let entries: BTreeMap<String, Vec<u8>> = files
            .into_iter()
            .filter(|(path, _)| !path.starts_with(".git/"))
            .collect();
        let file_set: BTreeSet<String> = entries.keys().cloned().collect();
        let pkgs = pkgs_from_files(&module_path, &file_set);

        Ok(Self {
            root: PathBuf::new(),
            module_path,
            entries,
            files: file_set,
            pkgs,
        })
    }

    /// Convenience constructor from `&str` content pairs.
    pub fn from_sources<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        Self::new(
            files
                .into_iter()
                .map(|(path, data)| (path.to_string(), data.as_bytes().to_vec()))
                .collect(),
        )
    }
}

impl FileCache for MemCache {
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
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| CarveError::UnknownFile {
                path: path.to_string(),
                module: self.module_path.clone(),
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
