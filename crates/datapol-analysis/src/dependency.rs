//! Table dependency graph of a set of rules
//!
//! A node per table and an edge `head -> body` for every body literal of
//! every rule (or the reverse when built with `head_to_body = false`).
//! Edges are labelled `true` when the body literal is negated.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use datapol_ast::{Event, Formula, Literal, Rule};
use tracing::{debug, info};

use crate::graph::{BagGraph, Edge, ModalIndex};

/// Which parts of a formula contribute to the graph
#[derive(Clone, Copy)]
pub struct Selection<'a> {
    /// Whether atoms (facts) add their table as a node
    pub include_atoms: bool,
    pub select_head: Option<&'a dyn Fn(&Literal) -> bool>,
    pub select_body: Option<&'a dyn Fn(&Literal) -> bool>,
}

impl Default for Selection<'_> {
    fn default() -> Self {
        Self {
            include_atoms: true,
            select_head: None,
            select_body: None,
        }
    }
}

impl fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("include_atoms", &self.include_atoms)
            .field("select_head", &self.select_head.is_some())
            .field("select_body", &self.select_body.is_some())
            .finish()
    }
}

fn selected(select: Option<&dyn Fn(&Literal) -> bool>, lit: &Literal) -> bool {
    select.is_none_or(|select| select(lit))
}

/// One modification made by `formula_update`, replayable backwards with
/// `undo_changes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphChange {
    Node { node: String, insert: bool },
    Edge { edge: Edge, insert: bool },
    Modal { modals: ModalIndex, insert: bool },
}

/// Nodes, edges and modal heads contributed by one formula
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaGraph {
    pub nodes: BTreeSet<String>,
    pub edges: BTreeSet<Edge>,
    pub modals: ModalIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDependencyGraph {
    graph: BagGraph,
    head_to_body: bool,
    modal_index: ModalIndex,
}

impl Default for RuleDependencyGraph {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RuleDependencyGraph {
    #[must_use]
    pub fn new(head_to_body: bool) -> Self {
        Self {
            graph: BagGraph::new(),
            head_to_body,
            modal_index: ModalIndex::new(),
        }
    }

    /// Graph over `formulas`, resolving unqualified tables against `theory`
    #[must_use]
    pub fn from_formulas<'f>(
        formulas: impl IntoIterator<Item = &'f Formula>,
        theory: Option<&str>,
        selection: Selection<'_>,
        head_to_body: bool,
    ) -> Self {
        let mut graph = Self::new(head_to_body);
        for formula in formulas {
            graph.formula_insert(formula, theory, selection);
        }
        debug!(
            tables = graph.graph.nodes().count(),
            edges = graph.graph.edges().count(),
            "built rule dependency graph"
        );
        graph
    }

    /// Graph over plain rules with default options
    #[must_use]
    pub fn from_rules<'r>(rules: impl IntoIterator<Item = &'r Rule>) -> Self {
        let formulas: Vec<Formula> = rules.into_iter().cloned().map(Formula::Rule).collect();
        Self::from_formulas(&formulas, None, Selection::default(), true)
    }

    /// Apply inserts and deletes in order and return what changed
    pub fn formula_update(&mut self, events: &[Event], selection: Selection<'_>) -> Vec<GraphChange> {
        let mut changes = Vec::new();
        for event in events {
            let FormulaGraph {
                nodes,
                edges,
                modals,
            } = self.formula_nodes_edges(&event.formula, event.target.as_deref(), selection);
            let insert = event.is_insert();
            for node in nodes {
                if insert {
                    self.graph.add_node(&node);
                } else {
                    self.graph.delete_node(&node);
                }
                changes.push(GraphChange::Node { node, insert });
            }
            for edge in edges {
                if insert {
                    self.graph.add_edge(&edge.src, &edge.dst, edge.label);
                } else {
                    self.graph.delete_edge(&edge.src, &edge.dst, edge.label);
                }
                changes.push(GraphChange::Edge { edge, insert });
            }
            if insert {
                self.modal_index += &modals;
            } else {
                self.modal_index -= &modals;
            }
            changes.push(GraphChange::Modal { modals, insert });
        }
        changes
    }

    /// Reverse `changes`, most recent first
    pub fn undo_changes(&mut self, changes: &[GraphChange]) {
        for change in changes.iter().rev() {
            match change {
                GraphChange::Node { node, insert: true } => self.graph.delete_node(node),
                GraphChange::Node { node, insert: false } => self.graph.add_node(node),
                GraphChange::Edge { edge, insert: true } => {
                    self.graph.delete_edge(&edge.src, &edge.dst, edge.label);
                }
                GraphChange::Edge { edge, insert: false } => {
                    self.graph.add_edge(&edge.src, &edge.dst, edge.label);
                }
                GraphChange::Modal {
                    modals,
                    insert: true,
                } => self.modal_index -= modals,
                GraphChange::Modal {
                    modals,
                    insert: false,
                } => self.modal_index += modals,
            }
        }
    }

    pub fn formula_insert(
        &mut self,
        formula: &Formula,
        theory: Option<&str>,
        selection: Selection<'_>,
    ) -> Vec<GraphChange> {
        let event = Event::new(formula.clone(), true).with_target(theory);
        self.formula_update(&[event], selection)
    }

    pub fn formula_delete(
        &mut self,
        formula: &Formula,
        theory: Option<&str>,
        selection: Selection<'_>,
    ) -> Vec<GraphChange> {
        let event = Event::new(formula.clone(), false).with_target(theory);
        self.formula_update(&[event], selection)
    }

    #[must_use]
    pub fn tables_with_modal(&self, modal: &str) -> BTreeSet<String> {
        self.modal_index.tables(modal)
    }

    /// Nodes, edges and modal heads `formula` would contribute
    #[must_use]
    pub fn formula_nodes_edges(
        &self,
        formula: &Formula,
        theory: Option<&str>,
        selection: Selection<'_>,
    ) -> FormulaGraph {
        let mut result = FormulaGraph::default();
        match formula {
            Formula::Literal(atom) => {
                if formula.is_atom() && selection.include_atoms {
                    let table = atom.table.global_tablename(theory);
                    if let Some(modal) = atom.table.modal.as_deref() {
                        result.modals.add(modal, &table);
                    }
                    result.nodes.insert(table);
                }
            }
            Formula::Rule(rule) => {
                for head in rule.heads() {
                    if !selected(selection.select_head, head) {
                        continue;
                    }
                    // a head with its own service becomes theory:service:table
                    let head_table = head.table.global_tablename(theory);
                    if let Some(modal) = head.table.modal.as_deref() {
                        result.modals.add(modal, &head_table);
                    }
                    for lit in &rule.body {
                        if !selected(selection.select_body, lit) {
                            continue;
                        }
                        let lit_table = lit.tablename(theory);
                        let edge = if self.head_to_body {
                            Edge::new(head_table.clone(), lit_table.clone(), lit.is_negated())
                        } else {
                            Edge::new(lit_table.clone(), head_table.clone(), lit.is_negated())
                        };
                        result.nodes.insert(lit_table);
                        result.edges.insert(edge);
                    }
                    result.nodes.insert(head_table);
                }
            }
        }
        result
    }

    /// Remove a table and its edges outright
    pub fn table_delete(&mut self, table: &str) {
        self.graph.remove_node(table);
    }

    /// `tables` plus every table that depends on one of them
    #[must_use]
    pub fn find_dependencies(&self, tables: &[&str]) -> BTreeSet<String> {
        self.graph.find_dependent_nodes(tables)
    }

    /// `tables` plus every table used in defining one of them
    #[must_use]
    pub fn find_definitions(&self, tables: &[&str]) -> BTreeSet<String> {
        self.graph.find_reachable_nodes(tables)
    }

    #[must_use]
    pub fn tables(&self) -> BTreeSet<String> {
        self.graph.nodes().map(str::to_string).collect()
    }

    #[must_use]
    pub const fn graph(&self) -> &BagGraph {
        &self.graph
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.graph.has_cycle()
    }

    /// Strata where negated edges must point to a lower stratum
    #[must_use]
    pub fn stratification(&self) -> Option<BTreeMap<String, usize>> {
        self.graph.stratification(&[true])
    }
}

impl fmt::Display for RuleDependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.graph)
    }
}

/// True when some table is defined in terms of itself
#[must_use]
pub fn is_recursive(formulas: &[Formula]) -> bool {
    RuleDependencyGraph::from_formulas(formulas, None, Selection::default(), true).has_cycle()
}

/// Table to stratum, or `None` when some table depends negatively on itself
#[must_use]
pub fn stratification(formulas: &[Formula]) -> Option<BTreeMap<String, usize>> {
    RuleDependencyGraph::from_formulas(formulas, None, Selection::default(), true).stratification()
}

#[must_use]
pub fn is_stratified(formulas: &[Formula]) -> bool {
    stratification(formulas).is_some()
}

fn as_strs(tables: &BTreeSet<String>) -> Vec<&str> {
    tables.iter().map(String::as_str).collect()
}

/// Rules defining `output` tables that avoid `prohibited` tables and build
/// on at least one `required` table.
///
/// A chosen rule with table R in its head satisfies: some output table
/// depends on R; R depends on no prohibited table (output tables exempt);
/// R depends on at least one required table.
#[must_use]
pub fn find_subpolicy(
    rules: &[Rule],
    required: &BTreeSet<String>,
    prohibited: &BTreeSet<String>,
    output: &BTreeSet<String>,
) -> BTreeSet<Rule> {
    let mut graph = RuleDependencyGraph::from_rules(rules);
    info!(%graph, "sub-policy graph");

    let mut definitions: BTreeMap<String, BTreeSet<Rule>> = BTreeMap::new();
    for rule in rules {
        for head in rule.heads() {
            definitions
                .entry(head.tablename(None))
                .or_default()
                .insert(rule.clone());
        }
    }
    info!(tables = definitions.len(), "sub-policy definitions");

    let mut filter_output_definitions = |graph: &mut RuleDependencyGraph, permitted: &dyn Fn(&Rule) -> bool| {
        for table in output {
            let Some(defining) = definitions.get_mut(table) else {
                continue;
            };
            let (kept, dropped): (BTreeSet<Rule>, BTreeSet<Rule>) =
                std::mem::take(defining).into_iter().partition(|rule| permitted(rule));
            for rule in dropped {
                graph.formula_delete(&Formula::Rule(rule), None, Selection::default());
            }
            *defining = kept;
        }
    };

    // drop rules that depend on prohibited tables, except through outputs
    let banned: BTreeSet<String> = graph
        .find_dependencies(&as_strs(prohibited))
        .difference(output)
        .cloned()
        .collect();
    filter_output_definitions(&mut graph, &|rule: &Rule| {
        rule.body.iter().all(|lit| !banned.contains(&lit.tablename(None)))
    });
    debug!(banned = banned.len(), "filtered prohibited dependencies");

    // drop rules that build on no required table
    let needed = graph.find_dependencies(&as_strs(required));
    filter_output_definitions(&mut graph, &|rule: &Rule| {
        rule.body.iter().any(|lit| needed.contains(&lit.tablename(None)))
    });
    debug!(needed = needed.len(), "filtered required dependencies");

    let outputs = graph.find_definitions(&as_strs(output));
    outputs
        .iter()
        .filter_map(|table| definitions.get(table))
        .flatten()
        .cloned()
        .collect()
}
