//! # Dependency Graph
//!
//! Kahn-style topological sorting over [`Identity`] nodes.
//! See: <https://en.wikipedia.org/wiki/Topological_sorting>
//!
//! The graph only knows edges. A node exists as soon as it is an endpoint of one, and
//! [`Graph::build`] orders every such node so that producers precede consumers.
//! When several nodes are ready at once the order among them is not part of the contract;
//! callers must not rely on it.

use crate::error::GraphError;
use crate::identity::Identity;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct Graph {
    edges: BTreeMap<Identity, BTreeSet<Identity>>,
    result: Vec<Identity>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the edge `from -> to`. Repeating an edge has no further effect.
    pub fn add_edge(&mut self, from: Identity, to: Identity) -> Result<(), GraphError> {
        if from == to {
            return Err(GraphError::SelfReference(from));
        }
        self.edges.entry(from).or_default().insert(to);
        Ok(())
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Computes a fresh order over every node seen so far.
    ///
    /// Fails with [`GraphError::Empty`] when no edge was ever added and with
    /// [`GraphError::Unsatisfiable`] when the remaining nodes all wait on each other.
    pub fn build(&mut self) -> Result<(), GraphError> {
        self.result.clear();
        if self.edges.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut waiting: BTreeMap<&Identity, usize> = BTreeMap::new();
        for (from, targets) in &self.edges {
            waiting.entry(from).or_default();
            for to in targets {
                *waiting.entry(to).or_default() += 1;
            }
        }

        let total = waiting.len();
        let mut ready: VecDeque<&Identity> = waiting
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(total);

        while let Some(node) = ready.pop_front() {
            order.push(node.clone());
            if let Some(targets) = self.edges.get(node) {
                for to in targets {
                    if let Some(n) = waiting.get_mut(to) {
                        *n -= 1;
                        if *n == 0 {
                            ready.push_back(to);
                        }
                    }
                }
            }
        }

        if order.len() < total {
            let emitted: HashSet<&Identity> = order.iter().collect();
            let remaining = waiting
                .keys()
                .filter(|id| !emitted.contains(*id))
                .map(|id| (*id).clone())
                .collect();
            return Err(GraphError::Unsatisfiable { remaining });
        }

        self.result = order;
        Ok(())
    }

    /// The order computed by the last successful [`build`](Self::build).
    pub fn result(&self) -> &[Identity] {
        &self.result
    }

    /// Every node `target` transitively depends on, plus `target` itself.
    pub fn ancestors(&self, target: &Identity) -> HashSet<Identity> {
        let mut reverse: BTreeMap<&Identity, Vec<&Identity>> = BTreeMap::new();
        for (from, targets) in &self.edges {
            for to in targets {
                reverse.entry(to).or_default().push(from);
            }
        }

        let mut seen = HashSet::new();
        let mut stack = vec![target];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.clone()) {
                continue;
            }
            if let Some(parents) = reverse.get(node) {
                stack.extend(parents.iter().copied());
            }
        }
        seen
    }
}
