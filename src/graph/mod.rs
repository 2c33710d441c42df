//! Split dependency graph.
//!
//! The inter-split dependency relation must be a DAG: a cycle between
//! splits would make the published modules mutually unresolvable. A
//! three-colour depth-first search rejects cycles and yields the
//! topological order the rewriter processes splits in.

use log::{debug, error};

use crate::error::{CarveError, Result};
use crate::split::SplitSet;

/// Check the split dependency graph for cycles and return the splits in
/// topological order, dependencies first.
///
/// # Errors
///
/// Returns [`CarveError::CyclicDependency`] with the traversal stack
/// witnessing the first cycle encountered.
pub fn toposort_splits(world: &SplitSet) -> Result<Vec<String>> {
    let mut walk = Walk::default();
    for name in world.splits.keys() {
        walk.visit(world, name)?;
    }
    debug!("Split processing order: {:?}.", walk.order);
    Ok(walk.order)
}

/// Three-colour DFS state: `order` holds black nodes, `grey` the current
/// stack members, everything else is white.
#[derive(Default)]
struct Walk {
    order: Vec<String>,
    grey: Vec<String>,
}

impl Walk {
    fn visit(&mut self, world: &SplitSet, name: &str) -> Result<()> {
        if self.order.iter().any(|n| n == name) {
            return Ok(());
        }
        if self.grey.iter().any(|n| n == name) {
            error!(
                "A circular dependency exists between the configured splits: {:?}.",
                self.grey
            );
            return Err(CarveError::CyclicDependency {
                stack: self.grey.clone(),
            });
        }

        self.grey.push(name.to_string());
        if let Some(split) = world.splits.get(name) {
            for dep in &split.split_deps {
                self.visit(world, dep)?;
            }
        }
        self.grey.pop();
        self.order.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::Split;
    use std::collections::BTreeSet;

    fn world(deps: &[(&str, &[&str])]) -> SplitSet {
        let mut world = SplitSet::default();
        for (name, dep_names) in deps {
            let spec = crate::config::SplitSpec {
                module_path: format!("split.com/{name}"),
                includes: vec![name.to_string()],
                excludes: Vec::new(),
                url: None,
                branch: "master".to_string(),
            };
            let mut split = Split::from_spec(name, &spec);
            split.split_deps = dep_names.iter().map(|d| d.to_string()).collect();
            world.splits.insert(name.to_string(), split);
        }
        world
    }

    #[test]
    fn test_no_deps() {
        let order = toposort_splits(&world(&[("a", &[]), ("b", &[])]))
            .expect("independent splits are acyclic");
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn test_single_dep_orders_dependency_first() {
        let order = toposort_splits(&world(&[("a", &["b"]), ("b", &[])]))
            .expect("a chain is acyclic");
        assert_eq!(order, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_chained_deps() {
        let order = toposort_splits(&world(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]))
            .expect("a chain is acyclic");
        assert_eq!(
            order,
            vec!["c".to_string(), "b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_multiple_deps() {
        let order = toposort_splits(&world(&[("a", &["b", "c"]), ("b", &[]), ("c", &[])]))
            .expect("a fan-out is acyclic");
        let pos = |n: &str| order.iter().position(|x| x == n).expect("split in order");
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn test_simple_cycle() {
        let err = toposort_splits(&world(&[("a", &["b"]), ("b", &["a"])]))
            .expect_err("a two-cycle must be rejected");
        let CarveError::CyclicDependency { stack } = err else {
            panic!("expected a cyclic dependency error");
        };
        let stack: BTreeSet<String> = stack.into_iter().collect();
        assert_eq!(
            stack,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_deep_cycle() {
        let err = toposort_splits(&world(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]))
            .expect_err("a three-cycle must be rejected");
        assert!(matches!(err, CarveError::CyclicDependency { .. }));
    }

    #[test]
    fn test_forked_cycle() {
        let err = toposort_splits(&world(&[
            ("a", &["b"]),
            ("b", &["c", "d"]),
            ("c", &[]),
            ("d", &["e"]),
            ("e", &["a"]),
        ]))
        .expect_err("a forked cycle must be rejected");
        let CarveError::CyclicDependency { stack } = err else {
            panic!("expected a cyclic dependency error");
        };
        // The stack witnesses the cycle through a, b, d and e; c is not on it.
        assert!(stack.contains(&"a".to_string()));
        assert!(!stack.contains(&"c".to_string()));
    }

    #[test]
    fn test_order_is_stable() {
        let w = world(&[("a", &[]), ("b", &[]), ("c", &["a"])]);
        let first = toposort_splits(&w).expect("acyclic");
        let second = toposort_splits(&w).expect("acyclic");
        assert_eq!(first, second);
    }
}
