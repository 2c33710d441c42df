//! Go abstract syntax data model.
//!
//! Only the shapes the pipeline reasons about are modelled: the import
//! table of a file and the type skeleton of its top-level declarations.
//! Function bodies, initializer expressions and comments are deliberately
//! absent: they never influence partitioning, API validation or residual
//! resolution, and the rewriter works on the original file bytes anyway.

use std::collections::BTreeMap;
use std::fmt;

/// A half-open byte range into a file's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// First byte of the range.
    pub start: usize,
    /// One past the last byte of the range.
    pub end: usize,
}

/// A source location, rendered as `file:line:col` in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Loc {
    /// File path, relative to the module root. May be empty for
    /// synthetically constructed nodes.
    pub file: String,
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub col: usize,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "{}:{}", self.line, self.col)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.col)
        }
    }
}

/// A parsed Go source file.
///
/// Instances are independent of each other: every read through the source
/// provider yields a fresh value that callers may consume or mutate freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path of the file relative to the module root.
    pub path: String,
    /// Declared package name.
    pub package: String,
    /// Import table, in declaration order.
    pub imports: Vec<ImportSpec>,
    /// Top-level declarations. Empty for imports-only parses.
    pub decls: Vec<Decl>,
    /// The complete original source text.
    pub text: String,
}

impl SourceFile {
    /// Map from local import binding to import path.
    ///
    /// The binding is the explicit rename when present, otherwise the last
    /// path segment, mirroring Go's default package binding.
    pub fn import_bindings(&self) -> BTreeMap<String, String> {
        self.imports
            .iter()
            .map(|imp| (imp.local_name().to_string(), imp.path.clone()))
            .collect()
    }
}

/// A single import in a file's import table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit local rename (including `.` and `_`), if any.
    pub name: Option<String>,
    /// The import path, without quotes.
    pub path: String,
    /// Byte span of the quoted path literal in [`SourceFile::text`],
    /// quotes included. This is the span the rewriter splices.
    pub path_span: Span,
    /// Location of the import spec.
    pub loc: Loc,
}

impl ImportSpec {
    /// The name under which the imported package is referenced locally.
    pub fn local_name(&self) -> &str {
        match &self.name {
            Some(n) => n,
            None => self.path.rsplit('/').next().unwrap_or(&self.path),
        }
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    /// A function or method declaration. Only the signature is kept.
    Func(FuncDecl),
    /// A `type` declaration with one or more specs.
    Type(Vec<TypeSpec>),
    /// A `const` or `var` declaration with one or more specs.
    Value(Vec<ValueSpec>),
}

/// A function or method declaration signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    /// Declared name.
    pub name: String,
    /// Parameter types, one entry per parameter group.
    pub params: Vec<TypeExpr>,
    /// Result types, one entry per result group.
    pub results: Vec<TypeExpr>,
    /// Location of the declaration.
    pub loc: Loc,
}

/// One spec of a `type` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// A well-formed named type or alias.
    Named {
        /// Declared type name.
        name: String,
        /// The right-hand-side type expression.
        ty: TypeExpr,
        /// Location of the spec.
        loc: Loc,
    },
    /// A spec whose shape could not be recognized.
    Malformed {
        /// Rendered source of the spec.
        text: String,
        /// Location of the spec.
        loc: Loc,
    },
}

/// One spec of a `const` or `var` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSpec {
    /// A well-formed value spec.
    Named {
        /// Declared names.
        names: Vec<String>,
        /// The declared type, if spelled out. Initializers are not kept.
        ty: Option<TypeExpr>,
        /// Location of the spec.
        loc: Loc,
    },
    /// A spec whose shape could not be recognized.
    Malformed {
        /// Rendered source of the spec.
        text: String,
        /// Location of the spec.
        loc: Loc,
    },
}

/// A type expression, as a tagged variant tree.
///
/// Composite forms recurse; wrapper forms nest a single inner type and are
/// unwrapped by the analyser in a fixed-point loop; `Selector` is the one
/// shape that triggers cross-package validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A function type: `func(...) (...)`.
    Func {
        /// Parameter types.
        params: Vec<TypeExpr>,
        /// Result types.
        results: Vec<TypeExpr>,
    },
    /// An interface type; one entry per method or embedded type.
    Interface(Vec<TypeExpr>),
    /// A struct type; one entry per field group.
    Struct(Vec<TypeExpr>),
    /// A pointer wrapper: `*T`.
    Pointer(Box<TypeExpr>),
    /// A parenthesised wrapper: `(T)`.
    Paren(Box<TypeExpr>),
    /// An array or slice wrapper: `[N]T`, `[]T`.
    Array(Box<TypeExpr>),
    /// A channel wrapper: `chan T`, `<-chan T`, `chan<- T`.
    Chan(Box<TypeExpr>),
    /// A map type, carrying both key and value types.
    Map {
        /// Key type.
        key: Box<TypeExpr>,
        /// Value type.
        value: Box<TypeExpr>,
    },
    /// A cross-package type reference `pkg.Name`.
    Selector {
        /// Local binding of the imported package.
        pkg: String,
        /// Referenced identifier in that package.
        symbol: String,
        /// Location of the reference.
        loc: Loc,
    },
    /// A plain local identifier.
    Ident(String),
    /// A shape that should not occur in a well-formed type position.
    Bad {
        /// Rendered source of the offending node.
        text: String,
        /// Location of the node.
        loc: Loc,
    },
    /// A recognized shape that needs no further analysis.
    Other,
}

/// Whether a Go identifier is exported (first character uppercase).
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Whether a path names a Go source file.
pub fn is_go_file(path: &str) -> bool {
    path.ends_with(".go")
}

/// Whether a path names a Go test source file, which is excluded from the
/// public-surface walk.
pub fn is_test_file(path: &str) -> bool {
    let base = path.rsplit('/').next().unwrap_or(path);
    base == "test.go" || base.ends_with("_test.go")
}
