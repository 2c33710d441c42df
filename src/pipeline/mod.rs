//! Pipeline orchestration.
//!
//! Drives the carving stages in order (partition, API validation,
//! residual resolution, dependency graph, layout, rewrite), tracking the
//! stage machine and absorbing any failure into the `Failed` state. Each
//! stage is final with respect to its writes; later stages only append.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;

use crate::cache::FileCache;
use crate::config::Config;
use crate::error::{CarveError, Result};
use crate::split::SplitSet;
use crate::{api, graph, layout, partition, resolve, rewrite};

/// Cooperative cancellation flag, polled between file analyses.
///
/// Cloning shares the flag; cancelling any clone cancels the run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Error out if cancellation has been requested.
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CarveError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The pipeline stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Configuration parsed, provider ready.
    Loaded,
    /// Files assigned to splits.
    Partitioned,
    /// Every split's public surface validated.
    ApiValidated,
    /// Residual closures computed.
    ResidualsClosed,
    /// Dependency graph accepted as acyclic.
    GraphAccepted,
    /// Split roots computed.
    LayoutPlanned,
    /// Split content emitted.
    Rewritten,
    /// A stage failed; the error was returned to the caller.
    Failed,
}

/// A single carving run over one source module.
pub struct Pipeline<'a, C: FileCache> {
    cache: &'a C,
    world: SplitSet,
    stage: Stage,
    cancel: CancelToken,
    order: Vec<String>,
}

impl<'a, C: FileCache> Pipeline<'a, C> {
    /// Create a pipeline for a validated configuration.
    pub fn new(cache: &'a C, config: &Config) -> Result<Self> {
        crate::config::validate(config)?;
        Ok(Self {
            cache,
            world: SplitSet::from_config(config),
            stage: Stage::Loaded,
            cancel: CancelToken::new(),
            order: Vec::new(),
        })
    }

    /// The current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The split set, with whatever state the stages so far populated.
    pub fn world(&self) -> &SplitSet {
        &self.world
    }

    /// A token that cancels this run when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the validation stages: partition, API analysis, residual
    /// resolution and the dependency-graph check.
    pub fn check(&mut self) -> Result<()> {
        info!("Partitioning module files over the configured splits.");
        self.advance(Stage::Partitioned, |p| {
            partition::partition_files(p.cache, &mut p.world)
        })?;

        info!("Validating the public API surface of every split.");
        self.advance(Stage::ApiValidated, |p| {
            api::analyse_api(p.cache, &p.world, &p.cancel)
        })?;

        info!("Computing residual packages and inter-split dependencies.");
        self.advance(Stage::ResidualsClosed, |p| {
            resolve::resolve_residuals(p.cache, &mut p.world, &p.cancel)
        })?;

        info!("Checking the split dependency graph.");
        self.advance(Stage::GraphAccepted, |p| {
            p.order = graph::toposort_splits(&p.world)?;
            Ok(())
        })?;
        Ok(())
    }

    /// Run the full pipeline, emitting every split under `work_tree`.
    ///
    /// On failure, any content already written stays in place for
    /// inspection.
    pub fn split(&mut self, work_tree: &Path) -> Result<()> {
        self.check()?;

        info!("Planning split layouts.");
        self.advance(Stage::LayoutPlanned, |p| {
            layout::plan_layout(&mut p.world);
            Ok(())
        })?;

        info!(
            "Writing split content under {}.",
            work_tree.display()
        );
        self.assign_work_dirs(work_tree)?;
        self.advance(Stage::Rewritten, |p| {
            rewrite::cleave_splits(p.cache, &p.world, &p.order, &p.cancel)
        })?;
        Ok(())
    }

    fn advance(
        &mut self,
        next: Stage,
        run: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        match run(self) {
            Ok(()) => {
                self.stage = next;
                Ok(())
            }
            Err(err) => {
                self.stage = Stage::Failed;
                Err(err)
            }
        }
    }

    /// Create one empty work directory per split under the work tree.
    fn assign_work_dirs(&mut self, work_tree: &Path) -> Result<()> {
        let result = assign_work_dirs(&mut self.world, work_tree);
        if result.is_err() {
            self.stage = Stage::Failed;
        }
        result
    }
}

fn assign_work_dirs(world: &mut SplitSet, work_tree: &Path) -> Result<()> {
    for split in world.splits.values_mut() {
        let dir = work_tree.join(&split.name);
        match std::fs::read_dir(&dir) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    return Err(CarveError::Rewrite {
                        file: dir.clone(),
                        message: "work directory exists and is not empty".to_string(),
                    });
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                std::fs::create_dir_all(&dir).map_err(|e| CarveError::Io {
                    path: dir.clone(),
                    source: e,
                })?;
            }
            Err(e) => {
                return Err(CarveError::Io {
                    path: dir.clone(),
                    source: e,
                });
            }
        }
        split.work_dir = Some(dir);
    }
    Ok(())
}
