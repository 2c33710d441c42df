//! Carve error types.
//!
//! All errors are typed and provide root cause information.

use std::path::PathBuf;
use thiserror::Error;

use crate::api::errors::ApiError;

/// Main error type for carve operations.
#[derive(Error, Debug)]
pub enum CarveError {
    /// I/O error during file operations.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file path that caused the I/O error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Go source parsing error.
    #[error("Parse error in {file}: {message}")]
    Parse {
        /// The file that failed to parse.
        file: PathBuf,
        /// The parse error message.
        message: String,
    },

    /// The split configuration is unusable.
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// What makes the configuration invalid.
        message: String,
    },

    /// One or more public-surface violations were found across the splits.
    ///
    /// The violations are aggregated over all splits before the pipeline
    /// aborts so that users see every finding in one run.
    #[error("errors detected during validation of the split APIs")]
    ApiViolation {
        /// Every violation found, across all splits.
        errors: Vec<ApiError>,
    },

    /// A package was requested that is not part of the source module.
    #[error("package {pkg} is not part of module {module}")]
    UnknownPackage {
        /// The unknown import path.
        pkg: String,
        /// The module the request was issued against.
        module: String,
    },

    /// A file was requested that is not part of the source module.
    #[error("file {path} is not part of module {module}")]
    UnknownFile {
        /// The unknown file path.
        path: String,
        /// The module the request was issued against.
        module: String,
    },

    /// The split dependency graph contains a cycle.
    #[error("circular dependency between splits: {}", stack.join(" -> "))]
    CyclicDependency {
        /// The splits on the traversal stack witnessing the cycle.
        stack: Vec<String>,
    },

    /// Emitting a split's rewritten content failed.
    #[error("failed to rewrite {file}: {message}")]
    Rewrite {
        /// The file being emitted when the failure occurred.
        file: PathBuf,
        /// Why the emission failed.
        message: String,
    },

    /// The pipeline was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for carve operations.
pub type Result<T> = std::result::Result<T, CarveError>;
