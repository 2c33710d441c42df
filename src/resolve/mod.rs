//! Residual resolution.
//!
//! For each split, computes the transitive closure of intra-repository
//! packages the split references without publicly exposing them. These
//! residuals are carried into the split privately so it stays buildable.
//! Imports that land in another split record an inter-split dependency
//! instead; external imports are ignored.
//!
//! Files are analysed by a bounded worker pool draining a shared queue.
//! The discovered sets only ever grow, and insertion into the residual set
//! decides enqueueing, so every package is expanded exactly once no matter
//! how the workers interleave.

use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::cache::FileCache;
use crate::error::{CarveError, Result};
use crate::ingest::goast::is_go_file;
use crate::ingest::ParseMode;
use crate::pipeline::CancelToken;
use crate::split::SplitSet;

/// Resolve residuals and inter-split dependencies for every split.
pub fn resolve_residuals(
    cache: &impl FileCache,
    world: &mut SplitSet,
    cancel: &CancelToken,
) -> Result<()> {
    let names: Vec<String> = world.splits.keys().cloned().collect();
    for name in names {
        resolve_split(cache, world, &name, cancel)?;
    }
    Ok(())
}

fn resolve_split(
    cache: &impl FileCache,
    world: &mut SplitSet,
    name: &str,
    cancel: &CancelToken,
) -> Result<()> {
    debug!("Resolving dependencies and residuals of split {name:?}.");
    let Some(split) = world.splits.get(name) else {
        return Ok(());
    };

    let seeds: Vec<String> = split
        .files
        .iter()
        .filter(|f| is_go_file(f))
        .cloned()
        .collect();

    let resolver = Resolver {
        cache,
        cancel,
        split_name: name,
        world,
        queue: WorkQueue::new(seeds),
        residuals: Mutex::new(BTreeSet::new()),
        split_deps: Mutex::new(BTreeSet::new()),
        failure: Mutex::new(None),
    };

    let workers = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| resolver.run());
        }
    });

    if let Some(err) = unpoison(resolver.failure.into_inner()) {
        return Err(err);
    }
    let residuals = unpoison(resolver.residuals.into_inner());
    let split_deps = unpoison(resolver.split_deps.into_inner());

    let mut residual_files = BTreeSet::new();
    for pkg in &residuals {
        residual_files.extend(cache.files_in_pkg(pkg)?);
    }

    if let Some(split) = world.splits.get_mut(name) {
        split.residuals = residuals;
        split.residual_files = residual_files;
        split.split_deps = split_deps;
    }
    Ok(())
}

/// Shared state of one split's closure computation.
struct Resolver<'a, C: FileCache> {
    cache: &'a C,
    cancel: &'a CancelToken,
    split_name: &'a str,
    world: &'a SplitSet,
    queue: WorkQueue,
    residuals: Mutex<BTreeSet<String>>,
    split_deps: Mutex<BTreeSet<String>>,
    failure: Mutex<Option<CarveError>>,
}

impl<C: FileCache> Resolver<'_, C> {
    fn run(&self) {
        while let Some(file) = self.queue.pop() {
            if self.cancel.is_cancelled() {
                self.fail(CarveError::Cancelled);
            } else if let Err(err) = self.process(&file) {
                self.fail(err);
            }
            self.queue.item_done();
        }
    }

    fn process(&self, file: &str) -> Result<()> {
        debug!("Scanning {file:?} for residual imports.");
        let src = self.cache.read_source(file, ParseMode::ImportsOnly)?;

        for imp in &src.imports {
            let path = &imp.path;
            if !self.cache.pkgs().contains(path) {
                continue;
            }

            match self.world.split_for_pkg(path) {
                Some(owner) if owner == self.split_name => {}
                Some(owner) => {
                    debug!(
                        "Import of {path:?} induces a dependency of split {:?} on split {owner:?}.",
                        self.split_name
                    );
                    lock(&self.split_deps).insert(owner.to_string());
                }
                None => {
                    // First insertion wins the expansion of the package.
                    if !lock(&self.residuals).insert(path.clone()) {
                        continue;
                    }
                    debug!(
                        "Import of {path:?} makes it a residual of split {:?}.",
                        self.split_name
                    );
                    let files = self.cache.files_in_pkg(path)?;
                    self.queue
                        .push_all(files.into_iter().filter(|f| is_go_file(f)));
                }
            }
        }
        Ok(())
    }

    fn fail(&self, err: CarveError) {
        let mut failure = lock(&self.failure);
        if failure.is_none() {
            *failure = Some(err);
        }
        self.queue.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unpoison<T>(result: std::result::Result<T, PoisonError<T>>) -> T {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// A condvar-guarded work queue with in-flight tracking.
///
/// `pop` blocks while the queue is empty but peers are still processing
/// items, because any of them may enqueue more work; it returns `None`
/// once the queue is drained and nothing is in flight, or after an abort.
struct WorkQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

struct QueueState {
    items: VecDeque<String>,
    in_flight: usize,
    aborted: bool,
}

impl WorkQueue {
    fn new(seeds: Vec<String>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: seeds.into(),
                in_flight: 0,
                aborted: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn pop(&self) -> Option<String> {
        let mut state = lock(&self.state);
        loop {
            if state.aborted {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                state.in_flight += 1;
                return Some(item);
            }
            if state.in_flight == 0 {
                self.ready.notify_all();
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn push_all(&self, items: impl IntoIterator<Item = String>) {
        let mut state = lock(&self.state);
        state.items.extend(items);
        self.ready.notify_all();
    }

    fn item_done(&self) {
        let mut state = lock(&self.state);
        state.in_flight -= 1;
        if state.in_flight == 0 && state.items.is_empty() {
            self.ready.notify_all();
        }
    }

    fn abort(&self) {
        let mut state = lock(&self.state);
        state.aborted = true;
        state.items.clear();
        self.ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemCache;
    use crate::config::Config;
    use crate::partition::partition_files;

    fn world_for(files: Vec<(&str, &str)>, config: &str) -> (MemCache, SplitSet) {
        let cache = MemCache::from_sources(files).expect("cache should build");
        let cfg: Config = serde_json::from_str(config).expect("config should deserialize");
        let mut world = SplitSet::from_config(&cfg);
        partition_files(&cache, &mut world).expect("partitioning is total");
        (cache, world)
    }

    fn resolve(cache: &MemCache, world: &mut SplitSet) {
        resolve_residuals(cache, world, &CancelToken::new()).expect("resolution should succeed");
    }

    #[test]
    fn test_no_residuals() {
        let (cache, mut world) = world_for(
            vec![
                ("go.mod", "module example.com/repo\n"),
                ("one/one.go", "package one\n\nimport \"fmt\"\n"),
            ],
            r#"{"splits": {"a": {"module_path": "split.com/a", "includes": ["one"]}}}"#,
        );
        resolve(&cache, &mut world);
        let a = &world.splits["a"];
        assert!(a.residuals.is_empty());
        assert!(a.residual_files.is_empty());
        assert!(a.split_deps.is_empty());
    }

    #[test]
    fn test_transitive_residual_closure() {
        let (cache, mut world) = world_for(
            vec![
                ("go.mod", "module example.com/repo\n"),
                ("main.go", "package main\n\nimport \"example.com/repo/lib\"\n"),
                (
                    "lib/lib.go",
                    "package lib\n\nimport \"example.com/repo/util\"\n",
                ),
                ("util/util.go", "package util\n"),
            ],
            r#"{"splits": {"a": {"module_path": "split.com/a", "includes": ["."]}}}"#,
        );
        // The `.` include claims only the root package, so both lib and
        // util stay unowned and must close into residuals.
        resolve(&cache, &mut world);
        let a = &world.splits["a"];
        assert_eq!(
            a.residuals,
            BTreeSet::from([
                "example.com/repo/lib".to_string(),
                "example.com/repo/util".to_string()
            ])
        );
        assert_eq!(
            a.residual_files,
            BTreeSet::from(["lib/lib.go".to_string(), "util/util.go".to_string()])
        );
        assert!(a.split_deps.is_empty());
    }

    #[test]
    fn test_inter_split_dependency() {
        let (cache, mut world) = world_for(
            vec![
                ("go.mod", "module example.com/repo\n"),
                (
                    "app/main.go",
                    "package main\n\nimport \"example.com/repo/lib\"\n",
                ),
                ("lib/lib.go", "package lib\n"),
            ],
            r#"{"splits": {
                "a": {"module_path": "split.com/a", "includes": ["app"]},
                "b": {"module_path": "split.com/b", "includes": ["lib"]}
            }}"#,
        );
        resolve(&cache, &mut world);
        let a = &world.splits["a"];
        assert_eq!(a.split_deps, BTreeSet::from(["b".to_string()]));
        assert!(a.residuals.is_empty());
        assert!(world.splits["b"].split_deps.is_empty());
    }

    #[test]
    fn test_residual_importing_split_records_dependency() {
        // app -> helper (residual) -> lib (owned by split b).
        let (cache, mut world) = world_for(
            vec![
                ("go.mod", "module example.com/repo\n"),
                (
                    "app/main.go",
                    "package main\n\nimport \"example.com/repo/helper\"\n",
                ),
                (
                    "helper/helper.go",
                    "package helper\n\nimport \"example.com/repo/lib\"\n",
                ),
                ("lib/lib.go", "package lib\n"),
            ],
            r#"{"splits": {
                "a": {"module_path": "split.com/a", "includes": ["app"]},
                "b": {"module_path": "split.com/b", "includes": ["lib"]}
            }}"#,
        );
        resolve(&cache, &mut world);
        let a = &world.splits["a"];
        assert_eq!(
            a.residuals,
            BTreeSet::from(["example.com/repo/helper".to_string()])
        );
        assert_eq!(a.split_deps, BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn test_closure_is_a_fixpoint() {
        let (cache, mut world) = world_for(
            vec![
                ("go.mod", "module example.com/repo\n"),
                (
                    "app/main.go",
                    "package main\n\nimport \"example.com/repo/helper\"\n",
                ),
                (
                    "helper/helper.go",
                    "package helper\n\nimport \"example.com/repo/util\"\n",
                ),
                ("util/util.go", "package util\n"),
            ],
            r#"{"splits": {"a": {"module_path": "split.com/a", "includes": ["app"]}}}"#,
        );
        resolve(&cache, &mut world);
        let first = world.splits["a"].clone();
        resolve(&cache, &mut world);
        let second = &world.splits["a"];
        assert_eq!(first.residuals, second.residuals);
        assert_eq!(first.residual_files, second.residual_files);
        assert_eq!(first.split_deps, second.split_deps);
    }

    #[test]
    fn test_cancellation() {
        let (cache, mut world) = world_for(
            vec![
                ("go.mod", "module example.com/repo\n"),
                ("one/one.go", "package one\n"),
            ],
            r#"{"splits": {"a": {"module_path": "split.com/a", "includes": ["one"]}}}"#,
        );
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = resolve_residuals(&cache, &mut world, &cancel)
            .expect_err("cancelled run must not complete");
        assert!(matches!(err, CarveError::Cancelled));
    }
}
