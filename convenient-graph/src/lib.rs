//! Generic dependency graph keyed by ordered node identities.
//!
//! This crate provides the graph used to schedule build units:
//! - Nodes are identified by their own key (e.g. a `(module, unit)` pair)
//! - Edges point from a dependency to its dependent
//! - Cycles are accepted when edges are added and reported on demand
//! - All traversals are deterministic (ordered by key)
//!
//! # Example
//!
//! ```
//! use convenient_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("lib");
//! graph.add_node("app");
//!
//! // app depends on lib: lib must be processed first
//! graph.add_edge(&"lib", &"app").unwrap();
//!
//! assert_eq!(graph.topological_sort().unwrap(), vec!["lib", "app"]);
//! assert!(graph.transitive_dependents(&"lib").unwrap().contains("app"));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Cycle detected in the graph
    #[error("Cycle detected in graph involving: {}", .0.join(", "))]
    CycleDetected(Vec<String>),

    /// Node not found
    #[error("Node {0} not found in graph")]
    NodeNotFound(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone)]
struct Node<K> {
    // Nodes that must be processed before this one
    incoming: BTreeSet<K>,
    // Nodes waiting for this one
    outgoing: BTreeSet<K>,
}

impl<K> Default for Node<K> {
    fn default() -> Self {
        Self {
            incoming: BTreeSet::new(),
            outgoing: BTreeSet::new(),
        }
    }
}

/// Directed dependency graph over ordered keys.
///
/// Unlike a strict DAG, adding an edge never fails because of a cycle:
/// callers that need acyclicity ask for it via [`topological_sort`],
/// [`blocked_nodes`] or [`find_cycles`].
///
/// [`topological_sort`]: DependencyGraph::topological_sort
/// [`blocked_nodes`]: DependencyGraph::blocked_nodes
/// [`find_cycles`]: DependencyGraph::find_cycles
#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    nodes: BTreeMap<K, Node<K>>,
    edge_count: usize,
}

impl<K: Ord + Clone> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> DependencyGraph<K> {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edge_count: 0,
        }
    }

    /// Add a node. Returns `false` if the node was already present.
    pub fn add_node(&mut self, key: K) -> bool {
        if self.nodes.contains_key(&key) {
            return false;
        }
        let _ = self.nodes.insert(key, Node::default());
        true
    }

    /// Whether the node exists.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.nodes.contains_key(key)
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of distinct edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Iterate over all nodes in key order.
    pub fn nodes(&self) -> impl Iterator<Item = &K> {
        self.nodes.keys()
    }

    /// Nodes without dependencies, in key order.
    #[must_use]
    pub fn roots(&self) -> Vec<&K> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.incoming.is_empty())
            .map(|(key, _)| key)
            .collect()
    }
}

impl<K: Ord + Clone + fmt::Display> DependencyGraph<K> {
    /// Add a directed edge: `dependency` must be processed before `dependent`.
    ///
    /// Adding the same edge twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if either node doesn't exist.
    pub fn add_edge(&mut self, dependency: &K, dependent: &K) -> GraphResult<()> {
        self.require(dependency)?;
        self.require(dependent)?;

        let inserted = self
            .nodes
            .get_mut(dependency)
            .is_some_and(|node| node.outgoing.insert(dependent.clone()));
        if let Some(node) = self.nodes.get_mut(dependent) {
            let _ = node.incoming.insert(dependency.clone());
        }
        if inserted {
            self.edge_count += 1;
        }

        Ok(())
    }

    fn require(&self, key: &K) -> GraphResult<&Node<K>> {
        self.nodes
            .get(key)
            .ok_or_else(|| GraphError::NodeNotFound(key.to_string()))
    }

    /// Direct dependencies of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependencies(&self, key: &K) -> GraphResult<&BTreeSet<K>> {
        self.require(key).map(|node| &node.incoming)
    }

    /// Direct dependents of a node.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependents(&self, key: &K) -> GraphResult<&BTreeSet<K>> {
        self.require(key).map(|node| &node.outgoing)
    }

    /// Every node reachable through dependent edges, excluding the start
    /// node unless it sits on a cycle.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn transitive_dependents(&self, key: &K) -> GraphResult<BTreeSet<K>> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&K> = self.require(key)?.outgoing.iter().collect();

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.outgoing.iter().filter(|k| !seen.contains(*k)));
            }
        }

        Ok(seen)
    }

    /// Topological order using Kahn's algorithm, ties broken by key order.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::CycleDetected` naming the nodes that could not be
    /// ordered.
    pub fn topological_sort(&self) -> GraphResult<Vec<K>> {
        let (order, blocked) = self.kahn();
        if blocked.is_empty() {
            Ok(order)
        } else {
            Err(GraphError::CycleDetected(
                blocked.iter().map(ToString::to_string).collect(),
            ))
        }
    }

    /// Nodes that can never be reached by Kahn's algorithm: members of a
    /// cycle and everything downstream of one.
    #[must_use]
    pub fn blocked_nodes(&self) -> BTreeSet<K> {
        self.kahn().1
    }

    fn kahn(&self) -> (Vec<K>, BTreeSet<K>) {
        let mut in_degree: BTreeMap<&K, usize> = self
            .nodes
            .iter()
            .map(|(key, node)| (key, node.incoming.len()))
            .collect();

        let mut ready: BTreeSet<&K> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&key, _)| key)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(key) = ready.pop_first() {
            order.push(key.clone());
            if let Some(node) = self.nodes.get(key) {
                for dependent in &node.outgoing {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            let _ = ready.insert(dependent);
                        }
                    }
                }
            }
        }

        let blocked = in_degree
            .into_iter()
            .filter(|&(_, degree)| degree > 0)
            .map(|(key, _)| key.clone())
            .collect();

        (order, blocked)
    }

    /// Find cycles in the graph.
    ///
    /// Each cycle is reported once, starting at the node where the depth
    /// first search re-entered it.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<K>> {
        let mut cycles = Vec::new();
        let mut visited = BTreeSet::new();
        let mut on_stack = BTreeSet::new();
        let mut path = Vec::new();

        for key in self.nodes.keys() {
            if !visited.contains(key) {
                self.find_cycles_dfs(key, &mut visited, &mut on_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn find_cycles_dfs<'a>(
        &'a self,
        key: &'a K,
        visited: &mut BTreeSet<&'a K>,
        on_stack: &mut BTreeSet<&'a K>,
        path: &mut Vec<&'a K>,
        cycles: &mut Vec<Vec<K>>,
    ) {
        let _ = visited.insert(key);
        let _ = on_stack.insert(key);
        path.push(key);

        if let Some(node) = self.nodes.get(key) {
            for next in &node.outgoing {
                if !visited.contains(next) {
                    self.find_cycles_dfs(next, visited, on_stack, path, cycles);
                } else if on_stack.contains(next) {
                    if let Some(start) = path.iter().position(|&k| k == next) {
                        cycles.push(path[start..].iter().map(|&k| k.clone()).collect());
                    }
                }
            }
        }

        let _ = path.pop();
        let _ = on_stack.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> DependencyGraph<&'static str> {
        let mut graph = DependencyGraph::new();
        for key in ["a", "b", "c"] {
            let _ = graph.add_node(key);
        }
        graph.add_edge(&"a", &"b").unwrap();
        graph.add_edge(&"b", &"c").unwrap();
        graph
    }

    #[test]
    fn test_create_empty_graph() {
        let graph = DependencyGraph::<String>::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut graph = DependencyGraph::new();
        assert!(graph.add_node("a"));
        assert!(!graph.add_node("a"));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_duplicate_edges_counted_once() {
        let mut graph = chain();
        graph.add_edge(&"a", &"b").unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_edge_to_missing_node() {
        let mut graph = chain();
        let result = graph.add_edge(&"a", &"zzz");
        assert!(matches!(result, Err(GraphError::NodeNotFound(name)) if name == "zzz"));
    }

    #[test]
    fn test_topological_sort() {
        let graph = chain();
        assert_eq!(graph.topological_sort().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_transitive_dependents() {
        let graph = chain();
        let dependents = graph.transitive_dependents(&"a").unwrap();
        assert_eq!(dependents.into_iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(graph.transitive_dependents(&"c").unwrap().is_empty());
    }

    #[test]
    fn test_roots() {
        let mut graph = chain();
        let _ = graph.add_node("d");
        assert_eq!(graph.roots(), vec![&"a", &"d"]);
    }

    #[test]
    fn test_cycles_are_accepted_and_reported() {
        let mut graph = chain();
        graph.add_edge(&"c", &"a").unwrap();
        let _ = graph.add_node("x");
        let _ = graph.add_node("y");
        graph.add_edge(&"c", &"y").unwrap();

        assert!(matches!(graph.topological_sort(), Err(GraphError::CycleDetected(_))));

        let blocked = graph.blocked_nodes();
        assert_eq!(blocked.into_iter().collect::<Vec<_>>(), vec!["a", "b", "c", "y"]);

        let cycles = graph.find_cycles();
        assert_eq!(cycles, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_self_loop() {
        let mut graph = DependencyGraph::new();
        let _ = graph.add_node("a");
        graph.add_edge(&"a", &"a").unwrap();
        assert_eq!(graph.find_cycles(), vec![vec!["a"]]);
        assert!(graph.transitive_dependents(&"a").unwrap().contains("a"));
    }
}
