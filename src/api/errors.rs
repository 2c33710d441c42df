//! Public-surface violation records.
//!
//! Each violation carries a short summary for terse output and a
//! location-bearing details rendition for verbose output. Violations are
//! aggregated across all splits before the pipeline aborts.

use std::fmt;

/// A single violation found while validating a split's public surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A declaration whose shape could not be recognized as a type,
    /// constant or variable spec.
    UnexpectedSyntax {
        /// Split the declaration belongs to.
        split: String,
        /// Rendered source of the offending declaration.
        symbol: String,
        /// Rendered source location.
        loc: String,
    },
    /// A public declaration names an unexported identifier from an
    /// imported package.
    UnexportedImport {
        /// Split the declaration belongs to.
        split: String,
        /// Import path of the referenced package.
        pkg: String,
        /// Rendered reference, e.g. `pkg.symbol`.
        symbol: String,
        /// Rendered source location.
        loc: String,
    },
    /// A public declaration names an identifier from an intra-repository
    /// package that belongs to no split.
    NonSplitImport {
        /// Split the declaration belongs to.
        split: String,
        /// Import path of the referenced package.
        pkg: String,
        /// Rendered reference, e.g. `pkg.Symbol`.
        symbol: String,
        /// Rendered source location.
        loc: String,
    },
}

impl ApiError {
    /// Short, location-free description of the violation.
    pub fn summary(&self) -> String {
        match self {
            ApiError::UnexpectedSyntax { split, .. } => {
                format!("public interface of split {split:?} contains an unexpected syntax")
            }
            ApiError::UnexportedImport { split, pkg, .. } => format!(
                "public interface of split {split:?} imports an unexported symbol from package {pkg:?}"
            ),
            ApiError::NonSplitImport { split, pkg, .. } => format!(
                "public interface of split {split:?} refers to package {pkg:?} which is not part of any configured split"
            ),
        }
    }

    /// Full description including the offending symbol and its location.
    pub fn details(&self) -> String {
        match self {
            ApiError::UnexpectedSyntax { split, symbol, loc } => format!(
                "public interface of split {split:?} contains an unexpected syntax {symbol:?} at {loc:?}"
            ),
            ApiError::UnexportedImport {
                split,
                pkg,
                symbol,
                loc,
            } => format!(
                "public interface of split {split:?} imports an unexported symbol {symbol:?} from package {pkg:?} at {loc:?}"
            ),
            ApiError::NonSplitImport {
                split,
                pkg,
                symbol,
                loc,
            } => format!(
                "public interface of split {split:?} refers to symbol {symbol:?} of package {pkg:?} at {loc:?} which is not part of any configured split"
            ),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
