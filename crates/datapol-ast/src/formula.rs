//! Compiled formulas, ground facts and change events

use std::cmp::Ordering;
use std::fmt;

use crate::{Literal, Rule, Value};

/// A compiled policy sentence: a (possibly negated) literal or a rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Formula {
    Literal(Literal),
    Rule(Rule),
}

impl Formula {
    /// Non-negated literal
    #[must_use]
    pub const fn is_atom(&self) -> bool {
        matches!(self, Self::Literal(lit) if lit.is_atom())
    }

    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Rule whose heads are all atoms
    #[must_use]
    pub fn is_rule(&self) -> bool {
        matches!(self, Self::Rule(rule) if rule.heads().iter().all(Literal::is_atom))
    }

    #[must_use]
    pub fn is_regular_rule(&self) -> bool {
        matches!(self, Self::Rule(rule) if rule.heads().len() == 1) && self.is_rule()
    }

    #[must_use]
    pub fn is_multi_rule(&self) -> bool {
        matches!(self, Self::Rule(rule) if rule.heads().len() != 1) && self.is_rule()
    }

    /// Atom or single-head rule
    #[must_use]
    pub fn is_datalog(&self) -> bool {
        self.is_atom() || self.is_regular_rule()
    }

    /// Atom or rule with any number of heads
    #[must_use]
    pub fn is_extended_datalog(&self) -> bool {
        self.is_atom() || self.is_rule()
    }

    /// Atom or single-head rule whose table is an update table
    #[must_use]
    pub fn is_update(&self) -> bool {
        match self {
            Self::Literal(lit) => lit.is_atom() && lit.is_update(),
            Self::Rule(rule) => self.is_regular_rule() && rule.is_update(),
        }
    }

    /// Atom or rule defining the `result` table of an action invocation
    #[must_use]
    pub fn is_result(&self) -> bool {
        match self {
            Self::Literal(lit) => lit.is_atom() && tablename_is_result(&lit.table.table),
            Self::Rule(rule) => self.is_rule() && tablename_is_result(&rule.head().table.table),
        }
    }

    /// The literal itself, or the first head of a rule
    #[must_use]
    pub fn head(&self) -> &Literal {
        match self {
            Self::Literal(lit) => lit,
            Self::Rule(rule) => rule.head(),
        }
    }

    #[must_use]
    pub fn tablename(&self, theory: Option<&str>) -> String {
        self.head().tablename(theory)
    }

    #[must_use]
    pub const fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            Self::Literal(_) => None,
        }
    }

    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            Self::Rule(_) => None,
        }
    }

    #[must_use]
    pub fn pretty_str(&self) -> String {
        match self {
            Self::Literal(lit) => lit.pretty_str(),
            Self::Rule(rule) => rule.pretty_str(),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Rule(rule) => write!(f, "{rule}"),
        }
    }
}

impl From<Literal> for Formula {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

impl From<Rule> for Formula {
    fn from(rule: Rule) -> Self {
        Self::Rule(rule)
    }
}

/// True when a table name ends in an update sign
#[must_use]
pub fn tablename_is_update(table: &str) -> bool {
    table.ends_with('+') || table.ends_with('-')
}

#[must_use]
pub fn tablename_is_result(table: &str) -> bool {
    table == "result"
}

/// Space-separated rendering that the parser reads back into `formulas`
pub fn formulas_to_string<'a>(formulas: impl IntoIterator<Item = &'a Formula>) -> String {
    formulas
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compact ground tuple of a table, e.g. `p(1, 2, 3)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    pub table: String,
    pub values: Vec<Value>,
}

impl Fact {
    pub fn new(table: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            table: table.into(),
            values,
        }
    }

    #[must_use]
    pub fn to_literal(&self) -> Literal {
        Literal::from_values(&self.table, self.values.iter().cloned())
    }
}

impl Ord for Fact {
    fn cmp(&self, other: &Self) -> Ordering {
        self.table
            .cmp(&other.table)
            .then_with(|| self.values.cmp(&other.values))
    }
}

impl PartialOrd for Fact {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

/// Insertion or deletion of a formula, optionally aimed at a theory
#[derive(Debug, Clone)]
pub struct Event {
    pub formula: Formula,
    pub insert: bool,
    pub proofs: Vec<Rule>,
    pub target: Option<String>,
}

impl Event {
    #[must_use]
    pub const fn new(formula: Formula, insert: bool) -> Self {
        Self {
            formula,
            insert,
            proofs: Vec::new(),
            target: None,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: Option<&str>) -> Self {
        self.target = target.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_proofs(mut self, proofs: Vec<Rule>) -> Self {
        self.proofs = proofs;
        self
    }

    #[must_use]
    pub const fn is_insert(&self) -> bool {
        self.insert
    }

    #[must_use]
    pub fn tablename(&self) -> String {
        self.formula.tablename(None)
    }

    /// Display followed by the supporting proofs
    #[must_use]
    pub fn lstr(&self) -> String {
        let proofs = self
            .proofs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{self} with proofs [{proofs}]")
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.formula == other.formula && self.proofs == other.proofs && self.insert == other.insert
    }
}

impl Eq for Event {}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.insert { "insert" } else { "delete" };
        write!(f, "{action}[{}]", self.formula)?;
        if let Some(target) = &self.target {
            write!(f, " for {target}")?;
        }
        Ok(())
    }
}
