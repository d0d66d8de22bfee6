use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::ops::AddAssign;

use log::{debug, trace};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::var::{NodeId, Var};
use crate::error::{GraphError, Result};

/// We know roughly how big our maps get, but we cant create a map with a given
/// capacity without also supplying the hasher...
trait HashMapExt {
  fn with_capacity(x: usize) -> Self;
}

impl<K, V, S> HashMapExt for HashMap<K, V, S>
where
  K: Hash + Eq,
  S: BuildHasher + Default,
{
  fn with_capacity(capacity: usize) -> Self {
    HashMap::with_capacity_and_hasher(capacity, S::default())
  }
}

/// Same again for sets...
trait HashSetExt {
  fn with_capacity(x: usize) -> Self;
}

impl<K, S> HashSetExt for HashSet<K, S>
where
  K: Hash + Eq,
  S: BuildHasher + Default,
{
  fn with_capacity(capacity: usize) -> Self {
    HashSet::with_capacity_and_hasher(capacity, S::default())
  }
}

/// Order the subgraph reachable from `root` so every parent comes before each
/// of its children, with `root` last; every reachable node appears once.
///
/// Recomputed on every call, nothing is cached on the nodes.
pub fn topological_sort<T: 'static>(root: &Var<T>) -> Vec<Var<T>> {
  let mut stack = Vec::with_capacity(64);
  let mut order = Vec::with_capacity(64);
  let mut visited = FxHashSet::with_capacity(64);

  stack.push((root.clone(), false));

  // linear dfs, a recursive one overflows on long chains...
  while let Some((node, parents_done)) = stack.pop() {
    if parents_done {
      // postorder
      order.push(node);
    } else if visited.insert(node.id()) {
      // revisit once the parents are in
      stack.push((node.clone(), true));
      // push in reverse so the first operand is explored first
      for parent in node.parents().iter().rev() {
        if !visited.contains(&parent.id()) {
          stack.push((parent.clone(), false));
        }
      }
    }
  }

  order
}

/// Walk the graph from `root` back to its leaves, carrying `seed` (the
/// derivative of the root with respect to itself) through every recorded
/// operation and accumulating the results into leaf gradients.
///
/// Interior nodes never store anything; their pending derivatives live in a
/// table local to this call, where contributions arriving over different paths
/// are summed before the node itself is processed.
pub fn backpropagate<T>(root: &Var<T>, seed: T) -> Result<()>
where
  T: Clone + AddAssign + 'static,
{
  let order = topological_sort(root);
  debug!("backpropagating from {} through {} nodes", root.id(), order.len());

  let mut pending: FxHashMap<NodeId, T> = FxHashMap::with_capacity(order.len());
  pending.insert(root.id(), seed);

  for node in order.iter().rev() {
    // leaves already received everything directly
    if node.is_leaf() {
      continue;
    }

    let upstream = pending
      .remove(&node.id())
      .ok_or(GraphError::MissingDerivative { id: node.id() })?;

    for (parent, grad) in node.chain_rule(&upstream)? {
      trace!("d{}/d{} via {}", root.id(), parent.id(), node.id());
      if parent.is_leaf() {
        parent.accumulate_grad(grad)?;
        continue;
      }
      match pending.entry(parent.id()) {
        Entry::Occupied(mut entry) => *entry.get_mut() += grad,
        Entry::Vacant(entry) => {
          entry.insert(grad);
        }
      }
    }
  }

  Ok(())
}
