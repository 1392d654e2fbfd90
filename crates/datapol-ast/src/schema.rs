//! Table metadata for a theory

use std::collections::BTreeMap;
use std::fmt;

/// Column names for a collection of tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: BTreeMap<String, Vec<String>>,
    /// Whether every permitted table has an entry
    pub complete: bool,
}

/// Schemas of known theories, keyed by theory name
pub type Theories = BTreeMap<String, Schema>;

impl Schema {
    #[must_use]
    pub fn new(tables: BTreeMap<String, Vec<String>>, complete: bool) -> Self {
        Self { tables, complete }
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<String>) {
        self.tables.insert(table.into(), columns);
    }

    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Column names of `table`, or `None` when unknown
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    #[must_use]
    pub fn arity(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(Vec::len)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .tables
            .iter()
            .map(|(table, columns)| format!("{table}: [{}]", columns.join(", ")))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{entries}}}")
    }
}
