//! Public-API validation.
//!
//! Walks the exported declarations of every split's non-test sources and
//! checks each cross-package type reference: it must point at an exported
//! symbol that lives either in another split or outside the repository.
//! A reference into an intra-repository package that belongs to no split
//! would make the published surface unresolvable, so it is a violation.
//!
//! Violations are collected across all splits before the pipeline aborts,
//! so one run surfaces every finding.

pub mod errors;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use log::{debug, error};

use crate::cache::FileCache;
use crate::error::{CarveError, Result};
use crate::ingest::goast::{
    is_exported, is_go_file, is_test_file, Decl, SourceFile, TypeExpr, TypeSpec, ValueSpec,
};
use crate::ingest::ParseMode;
use crate::pipeline::CancelToken;
use crate::split::SplitSet;
use errors::ApiError;

/// Validate the public surface of every split.
///
/// # Errors
///
/// Returns [`CarveError::ApiViolation`] carrying every violation found; a
/// provider failure or cancellation aborts immediately.
pub fn analyse_api(
    cache: &impl FileCache,
    world: &SplitSet,
    cancel: &CancelToken,
) -> Result<()> {
    let mut violations = Vec::new();
    for name in world.splits.keys() {
        let errs = analyse_split(cache, world, name, cancel)?;
        if errs.is_empty() {
            continue;
        }
        error!("Detected errors in the public API of split {name:?}:");
        for err in &errs {
            error!(" - {}", err.details());
        }
        violations.extend(errs);
    }
    if !violations.is_empty() {
        return Err(CarveError::ApiViolation { errors: violations });
    }
    Ok(())
}

fn analyse_split(
    cache: &impl FileCache,
    world: &SplitSet,
    name: &str,
    cancel: &CancelToken,
) -> Result<Vec<ApiError>> {
    debug!("Analysing the public API of split {name:?}.");
    let Some(split) = world.splits.get(name) else {
        return Ok(Vec::new());
    };

    let mut errs = Vec::new();
    for file in &split.files {
        if !is_go_file(file) {
            debug!("Skipping analysis of non-Go file {file:?}.");
            continue;
        }
        if is_test_file(file) {
            continue;
        }
        cancel.check()?;
        let src = cache.read_source(file, ParseMode::Full)?;
        errs.extend(analyse_file(world, name, cache.pkgs(), &src));
    }
    Ok(errs)
}

/// Per-file validation context.
struct FileContext<'a> {
    split: &'a str,
    imports: BTreeMap<String, String>,
    pkgs: &'a BTreeSet<String>,
    pkg_to_split: &'a BTreeMap<String, String>,
}

/// Walk the exported top-level declarations of one file.
pub(crate) fn analyse_file(
    world: &SplitSet,
    split: &str,
    pkgs: &BTreeSet<String>,
    src: &SourceFile,
) -> Vec<ApiError> {
    let ctx = FileContext {
        split,
        imports: src.import_bindings(),
        pkgs,
        pkg_to_split: &world.pkg_to_split,
    };

    let mut errs = Vec::new();
    for decl in &src.decls {
        match decl {
            Decl::Func(fd) => {
                if is_exported(&fd.name) {
                    walk_signature(&ctx, &fd.params, &fd.results, &mut errs);
                }
            }
            Decl::Type(specs) => {
                for spec in specs {
                    match spec {
                        TypeSpec::Named { name, ty, .. } => {
                            if is_exported(name) {
                                walk_composite(&ctx, ty, &mut errs);
                            }
                        }
                        TypeSpec::Malformed { text, loc } => {
                            errs.push(ApiError::UnexpectedSyntax {
                                split: ctx.split.to_string(),
                                symbol: text.clone(),
                                loc: loc.to_string(),
                            });
                        }
                    }
                }
            }
            Decl::Value(specs) => {
                for spec in specs {
                    match spec {
                        ValueSpec::Named { names, ty, .. } => {
                            // The declared type is public surface as soon as
                            // any declared name is exported; initializers are
                            // not walked.
                            if names.iter().any(|n| is_exported(n)) {
                                if let Some(ty) = ty {
                                    walk_composite(&ctx, ty, &mut errs);
                                }
                            }
                        }
                        ValueSpec::Malformed { text, loc } => {
                            errs.push(ApiError::UnexpectedSyntax {
                                split: ctx.split.to_string(),
                                symbol: text.clone(),
                                loc: loc.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
    errs
}

fn walk_signature(
    ctx: &FileContext<'_>,
    params: &[TypeExpr],
    results: &[TypeExpr],
    errs: &mut Vec<ApiError>,
) {
    for ty in params.iter().chain(results) {
        walk_composite(ctx, ty, errs);
    }
}

/// Recurse through composite forms; everything else is a type reference.
fn walk_composite(ctx: &FileContext<'_>, ty: &TypeExpr, errs: &mut Vec<ApiError>) {
    match ty {
        TypeExpr::Func { params, results } => walk_signature(ctx, params, results, errs),
        TypeExpr::Interface(members) | TypeExpr::Struct(members) => {
            for member in members {
                walk_composite(ctx, member, errs);
            }
        }
        other => walk_reference(ctx, other, errs),
    }
}

/// Unwrap pointer/paren/array/channel layers, then validate what remains.
fn walk_reference(ctx: &FileContext<'_>, ty: &TypeExpr, errs: &mut Vec<ApiError>) {
    let mut ty = ty;
    loop {
        match ty {
            TypeExpr::Pointer(inner)
            | TypeExpr::Paren(inner)
            | TypeExpr::Array(inner)
            | TypeExpr::Chan(inner) => ty = inner.as_ref(),
            _ => break,
        }
    }

    match ty {
        TypeExpr::Map { key, value } => {
            // Maps carry two types that both need resolving.
            walk_composite(ctx, key, errs);
            walk_composite(ctx, value, errs);
        }
        TypeExpr::Selector { pkg, symbol, loc } => {
            let import_path = ctx.imports.get(pkg).cloned().unwrap_or_default();
            let rendered = format!("{pkg}.{symbol}");
            if !is_exported(symbol) {
                errs.push(ApiError::UnexportedImport {
                    split: ctx.split.to_string(),
                    pkg: import_path,
                    symbol: rendered,
                    loc: loc.to_string(),
                });
            } else if ctx.pkgs.contains(&import_path)
                && !ctx.pkg_to_split.contains_key(&import_path)
            {
                errs.push(ApiError::NonSplitImport {
                    split: ctx.split.to_string(),
                    pkg: import_path,
                    symbol: rendered,
                    loc: loc.to_string(),
                });
            }
        }
        TypeExpr::Bad { text, loc } => {
            errs.push(ApiError::UnexpectedSyntax {
                split: ctx.split.to_string(),
                symbol: text.clone(),
                loc: loc.to_string(),
            });
        }
        _ => {
            // Local identifiers and recognized-but-inert shapes need no
            // further analysis.
        }
    }
}
