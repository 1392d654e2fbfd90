//! Variable naming for column-reference expansion
//!
//! Columns left unspecified by a reference-style atom are filled with fresh
//! variables. Fresh names start with a prefix of underscores that no
//! variable already in the formula starts with, so they cannot capture a
//! user variable.

use std::collections::BTreeSet;

use crate::tree::{RawAtom, RawLiteral, RawParam};

/// Variable names occurring in `atom`, including values of named parameters
pub fn atom_variables(atom: &RawAtom) -> BTreeSet<String> {
    atom.params
        .iter()
        .filter_map(|param| match param {
            RawParam::Positional(term) | RawParam::Named { term, .. } => term.variable_name(),
        })
        .map(str::to_string)
        .collect()
}

/// Variable names occurring anywhere in `literals`
pub fn literal_variables<'a>(literals: impl IntoIterator<Item = &'a RawLiteral>) -> BTreeSet<String> {
    literals
        .into_iter()
        .flat_map(|lit| atom_variables(&lit.atom))
        .collect()
}

/// Shortest run of underscores that no name in `variables` starts with
pub fn unused_variable_prefix(variables: &BTreeSet<String>) -> String {
    let mut prefix = String::from("_");
    while variables.iter().any(|var| var.starts_with(&prefix)) {
        prefix.push('_');
    }
    prefix
}

/// Fresh variable for column `column` of the literal at `literal_index`
pub fn fresh_variable(prefix: &str, literal_index: usize, column: usize) -> String {
    format!("{prefix}x_{literal_index}_{column}")
}
