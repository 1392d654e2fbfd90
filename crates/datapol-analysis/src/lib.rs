//! Static analysis of compiled datapol policies
//!
//! Safety and schema checks, body reordering, and the table dependency
//! graph used for recursion, stratification and sub-policy queries.

pub mod builtin;
pub mod dependency;
pub mod graph;
pub mod safety;

pub use builtin::{BUILTINS, Builtin, BuiltinRegistry};
pub use dependency::{
    FormulaGraph, GraphChange, RuleDependencyGraph, Selection, find_subpolicy, is_recursive,
    is_stratified, stratification,
};
pub use graph::{BagGraph, Edge, ModalIndex};
pub use safety::{
    Checker, PERMITTED_MODALS, PermitHead, fact_errors, fact_has_no_theory, formula_errors,
    literal_schema_consistency, reorder_for_safety, rule_body_safety, rule_errors,
    rule_head_has_no_theory, rule_head_safety, rule_modal_safety, rule_schema_consistency,
};
