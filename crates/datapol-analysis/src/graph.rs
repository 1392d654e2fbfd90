//! Reference-counted directed graphs
//!
//! Nodes and labelled edges are counted so the same dependency can be
//! added by several formulas and removed by each of them independently.
//! Cycle, reachability and component queries build a `petgraph` view on
//! demand.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::{AddAssign, SubAssign};

use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef, Reversed};

/// Edge from `src` to `dst`; the label marks a negated dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub src: String,
    pub dst: String,
    pub label: bool,
}

impl Edge {
    pub fn new(src: impl Into<String>, dst: impl Into<String>, label: bool) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            label,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagGraph {
    nodes: BTreeMap<String, usize>,
    edges: BTreeMap<Edge, usize>,
}

/// Borrowed `petgraph` view of a `BagGraph`
struct View<'a> {
    graph: DiGraph<&'a str, bool>,
    index: HashMap<&'a str, NodeIndex>,
}

impl BagGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: &str) {
        *self.nodes.entry(node.to_string()).or_insert(0) += 1;
    }

    /// Drop one reference to `node`. The last reference removes the node
    /// and every edge touching it.
    pub fn delete_node(&mut self, node: &str) {
        let Some(count) = self.nodes.get_mut(node) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.remove_node(node);
        }
    }

    /// Remove `node` and its edges regardless of references. The references
    /// each removed edge held on its other endpoint are released too.
    pub fn remove_node(&mut self, node: &str) {
        self.nodes.remove(node);
        let incident: Vec<(Edge, usize)> = self
            .edges
            .iter()
            .filter(|(edge, _)| edge.src == node || edge.dst == node)
            .map(|(edge, count)| (edge.clone(), *count))
            .collect();
        for (edge, count) in incident {
            self.edges.remove(&edge);
            let other = if edge.src == node { &edge.dst } else { &edge.src };
            if other != node {
                self.release_node(other, count);
            }
        }
    }

    fn release_node(&mut self, node: &str, references: usize) {
        let Some(count) = self.nodes.get_mut(node) else {
            return;
        };
        *count = count.saturating_sub(references);
        if *count == 0 {
            self.remove_node(node);
        }
    }

    /// Add one reference to the edge, and to each endpoint
    pub fn add_edge(&mut self, src: &str, dst: &str, label: bool) {
        self.add_node(src);
        self.add_node(dst);
        *self.edges.entry(Edge::new(src, dst, label)).or_insert(0) += 1;
    }

    /// Drop one reference to the edge and to each endpoint; unknown edges
    /// are ignored
    pub fn delete_edge(&mut self, src: &str, dst: &str, label: bool) {
        let edge = Edge::new(src, dst, label);
        let Some(count) = self.edges.get_mut(&edge) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.edges.remove(&edge);
        }
        self.delete_node(src);
        self.delete_node(dst);
    }

    #[must_use]
    pub fn node_count(&self, node: &str) -> usize {
        self.nodes.get(node).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn edge_count(&self, src: &str, dst: &str, label: bool) -> usize {
        self.edges
            .get(&Edge::new(src, dst, label))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.keys()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn view(&self) -> View<'_> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::with_capacity(self.nodes.len());
        for node in self.nodes() {
            index.insert(node, graph.add_node(node));
        }
        for edge in self.edges.keys() {
            if let (Some(&src), Some(&dst)) = (index.get(edge.src.as_str()), index.get(edge.dst.as_str())) {
                graph.add_edge(src, dst, edge.label);
            }
        }
        View { graph, index }
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.view().graph)
    }

    /// Assign each node a stratum so that an edge whose label is in
    /// `labels` points to a strictly lower stratum and any other edge to an
    /// equal or lower one. `None` when a cycle runs through such an edge.
    #[must_use]
    pub fn stratification(&self, labels: &[bool]) -> Option<BTreeMap<String, usize>> {
        let view = self.view();
        let graph = &view.graph;
        let mut component = vec![0; graph.node_count()];
        // components come out with every successor component before them
        let sccs = tarjan_scc(graph);
        for (number, scc) in sccs.iter().enumerate() {
            for node in scc {
                component[node.index()] = number;
            }
        }

        let mut strata: BTreeMap<String, usize> = BTreeMap::new();
        let mut component_stratum = vec![0; sccs.len()];
        for (number, scc) in sccs.iter().enumerate() {
            let mut stratum = 0;
            for &node in scc {
                for edge in graph.edges_directed(node, Direction::Outgoing) {
                    let bumps = labels.contains(edge.weight());
                    let target = component[edge.target().index()];
                    if target == number {
                        if bumps {
                            return None;
                        }
                        continue;
                    }
                    stratum = stratum.max(component_stratum[target] + usize::from(bumps));
                }
            }
            component_stratum[number] = stratum;
            for &node in scc {
                strata.insert(graph[node].to_string(), stratum);
            }
        }
        Some(strata)
    }

    fn search(&self, roots: &[&str], direction: Direction) -> BTreeSet<String> {
        let view = self.view();
        let mut found: BTreeSet<String> = roots.iter().map(|root| (*root).to_string()).collect();
        for root in roots {
            let Some(&start) = view.index.get(root) else {
                continue;
            };
            match direction {
                Direction::Outgoing => {
                    let mut bfs = Bfs::new(&view.graph, start);
                    while let Some(node) = bfs.next(&view.graph) {
                        found.insert(view.graph[node].to_string());
                    }
                }
                Direction::Incoming => {
                    let reversed = Reversed(&view.graph);
                    let mut bfs = Bfs::new(reversed, start);
                    while let Some(node) = bfs.next(reversed) {
                        found.insert(view.graph[node].to_string());
                    }
                }
            }
        }
        found
    }

    /// `roots` plus every node with a path into one of them
    #[must_use]
    pub fn find_dependent_nodes(&self, roots: &[&str]) -> BTreeSet<String> {
        self.search(roots, Direction::Incoming)
    }

    /// `roots` plus every node reachable from one of them
    #[must_use]
    pub fn find_reachable_nodes(&self, roots: &[&str]) -> BTreeSet<String> {
        self.search(roots, Direction::Outgoing)
    }

    /// Nodes reachable from `node`, including itself; `None` when absent
    #[must_use]
    pub fn dependencies(&self, node: &str) -> Option<BTreeSet<String>> {
        self.contains_node(node)
            .then(|| self.find_reachable_nodes(&[node]))
    }
}

impl fmt::Display for BagGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.nodes().collect::<Vec<_>>().join(", ");
        let edges = self
            .edges()
            .map(|edge| {
                let arrow = if edge.label { "-not->" } else { "->" };
                format!("{} {arrow} {}", edge.src, edge.dst)
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{nodes: [{nodes}], edges: [{edges}]}}")
    }
}

/// Tables appearing under each modal, with reference counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalIndex {
    index: BTreeMap<String, BTreeMap<String, usize>>,
}

impl ModalIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, modal: &str, table: &str) {
        *self
            .index
            .entry(modal.to_string())
            .or_default()
            .entry(table.to_string())
            .or_insert(0) += 1;
    }

    /// Drop one reference; modals with no tables left disappear
    pub fn remove(&mut self, modal: &str, table: &str) {
        let Some(tables) = self.index.get_mut(modal) else {
            return;
        };
        if let Some(count) = tables.get_mut(table) {
            *count -= 1;
            if *count == 0 {
                tables.remove(table);
            }
        }
        if tables.is_empty() {
            self.index.remove(modal);
        }
    }

    pub fn modals(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    #[must_use]
    pub fn tables(&self, modal: &str) -> BTreeSet<String> {
        self.index
            .get(modal)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &str, usize)> {
        self.index.iter().flat_map(|(modal, tables)| {
            tables
                .iter()
                .map(move |(table, count)| (modal.as_str(), table.as_str(), *count))
        })
    }
}

impl AddAssign<&ModalIndex> for ModalIndex {
    fn add_assign(&mut self, other: &ModalIndex) {
        for (modal, table, count) in other.entries() {
            for _ in 0..count {
                self.add(modal, table);
            }
        }
    }
}

impl SubAssign<&ModalIndex> for ModalIndex {
    fn sub_assign(&mut self, other: &ModalIndex) {
        for (modal, table, count) in other.entries() {
            for _ in 0..count {
                self.remove(modal, table);
            }
        }
    }
}

impl fmt::Display for ModalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .index
            .iter()
            .map(|(modal, tables)| {
                let tables = tables.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
                format!("{modal}: [{tables}]")
            })
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{entries}}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    #[test]
    fn test_refcounts() {
        let mut graph = BagGraph::new();
        graph.add_edge("p", "q", false);
        graph.add_edge("p", "q", false);
        assert_eq!(graph.edge_count("p", "q", false), 2);
        assert_eq!(graph.node_count("p"), 2);

        graph.delete_edge("p", "q", false);
        assert_eq!(graph.edge_count("p", "q", false), 1);
        graph.delete_edge("p", "q", false);
        assert_eq!(graph.edge_count("p", "q", false), 0);
        assert!(graph.is_empty());

        // unknown edges and nodes are ignored
        graph.delete_edge("p", "q", true);
        graph.delete_node("r");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_remove_node_releases_neighbours() {
        let mut graph = BagGraph::new();
        graph.add_node("p");
        graph.add_edge("p", "q", false);
        graph.add_edge("r", "q", true);
        graph.add_edge("q", "q", false);
        graph.remove_node("q");
        assert_eq!(graph.edges().count(), 0);
        // r was only held by its edge to q
        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["p"]);
        assert_eq!(graph.node_count("p"), 1);

        graph.delete_node("p");
        assert!(graph.is_empty());
    }

    #[test]
    fn test_has_cycle() {
        let mut graph = BagGraph::new();
        graph.add_edge("p", "q", false);
        graph.add_edge("q", "r", false);
        assert!(!graph.has_cycle());
        graph.add_edge("r", "p", true);
        assert!(graph.has_cycle());
        graph.delete_edge("r", "p", true);
        assert!(!graph.has_cycle());
        graph.add_edge("s", "s", false);
        assert!(graph.has_cycle());
    }

    #[test]
    fn test_stratification() {
        let mut graph = BagGraph::new();
        graph.add_edge("p", "q", true);
        graph.add_edge("q", "r", false);
        graph.add_edge("r", "q", false);
        graph.add_edge("p", "s", false);
        graph.add_edge("t", "p", true);
        let strata = graph.stratification(&[true]).unwrap();
        assert_eq!(strata["q"], 0);
        assert_eq!(strata["r"], 0);
        assert_eq!(strata["s"], 0);
        assert_eq!(strata["p"], 1);
        assert_eq!(strata["t"], 2);

        graph.add_edge("q", "p", false);
        assert_eq!(graph.stratification(&[true]), None);
        // with no bumping labels every graph is stratified
        assert!(graph.stratification(&[]).is_some());
    }

    #[test]
    fn test_reachability() {
        let mut graph = BagGraph::new();
        graph.add_edge("p", "q", false);
        graph.add_edge("q", "r", true);
        graph.add_edge("s", "r", false);
        assert_eq!(graph.find_reachable_nodes(&["q"]), names(&["q", "r"]));
        assert_eq!(graph.find_dependent_nodes(&["q"]), names(&["p", "q"]));
        assert_eq!(graph.find_dependent_nodes(&["r"]), names(&["p", "q", "r", "s"]));
        assert_eq!(graph.find_dependent_nodes(&["missing"]), names(&["missing"]));
        assert_eq!(graph.dependencies("p"), Some(names(&["p", "q", "r"])));
        assert_eq!(graph.dependencies("missing"), None);
    }

    #[test]
    fn test_display() {
        let mut graph = BagGraph::new();
        graph.add_edge("p", "q", false);
        graph.add_edge("p", "r", true);
        assert_eq!(graph.to_string(), "{nodes: [p, q, r], edges: [p -> q, p -not-> r]}");
    }

    #[test]
    fn test_modal_index() {
        let mut index = ModalIndex::new();
        index.add("execute", "nova:servers.pause");
        index.add("execute", "nova:servers.pause");
        index.add("execute", "neutron:ports.delete");
        assert_eq!(index.tables("execute").len(), 2);

        let mut other = ModalIndex::new();
        other.add("execute", "nova:servers.pause");
        index -= &other;
        assert_eq!(index.tables("execute").len(), 2);
        index -= &other;
        assert_eq!(index.tables("execute"), names(&["neutron:ports.delete"]));

        index += &other;
        assert_eq!(index.modals().collect::<Vec<_>>(), vec!["execute"]);
        index.remove("execute", "nova:servers.pause");
        index.remove("execute", "neutron:ports.delete");
        assert!(index.is_empty());
        assert!(index.tables("execute").is_empty());
    }
}
