//! Literals: possibly negated atomic statements such as `p(a, 17, b)`

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{Location, Substitution, Tablename, Term, Value};

#[derive(Debug, Clone)]
pub struct Literal {
    pub table: Tablename,
    pub arguments: Vec<Term>,
    pub negated: bool,
    pub location: Option<Location>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub original_str: Option<String>,
}

impl Literal {
    #[must_use]
    pub const fn new(table: Tablename, arguments: Vec<Term>) -> Self {
        Self {
            table,
            arguments,
            negated: false,
            location: None,
            id: None,
            name: None,
            comment: None,
            original_str: None,
        }
    }

    /// Literal for `table`, splitting off the service when `use_modules`
    #[must_use]
    pub fn from_name(table: &str, arguments: Vec<Term>, use_modules: bool) -> Self {
        Self::new(Tablename::create(table, use_modules), arguments)
    }

    /// Ground atom for a row of `table`, e.g. `p(17, "string", 3.14)`
    pub fn from_values(table: &str, values: impl IntoIterator<Item = Value>) -> Self {
        let arguments = values
            .into_iter()
            .map(|value| Term::from_value(value, false))
            .collect();
        Self::from_name(table, arguments, true)
    }

    /// Ground atom from a tuple whose first element names the table, e.g.
    /// `("p", 1, "s")`. `None` when the tuple is empty or the table name is
    /// not a string.
    pub fn from_tuple(values: impl IntoIterator<Item = Value>) -> Option<Self> {
        let mut values = values.into_iter();
        match values.next()? {
            Value::Str(table) => Some(Self::from_values(&table, values)),
            Value::Int(_) | Value::Float(_) => None,
        }
    }

    #[must_use]
    pub const fn with_negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    #[must_use]
    pub const fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    pub fn set_original_str(&mut self, original_str: impl Into<String>) {
        self.original_str = Some(original_str.into());
    }

    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    #[must_use]
    pub const fn is_atom(&self) -> bool {
        !self.negated
    }

    #[must_use]
    pub fn pretty_str(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub fn variables(&self) -> BTreeSet<Term> {
        self.arguments
            .iter()
            .filter(|arg| arg.is_variable())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn variable_names(&self) -> BTreeSet<String> {
        self.arguments
            .iter()
            .filter_map(Term::variable_name)
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.arguments.iter().all(Term::is_object)
    }

    /// Copy with every argument replaced according to `binding`
    #[must_use]
    pub fn plug(&self, binding: &dyn Substitution) -> Self {
        let mut new = self.clone();
        new.arguments = self
            .arguments
            .iter()
            .map(|arg| binding.apply(arg).unwrap_or_else(|| arg.clone()))
            .collect();
        new
    }

    #[must_use]
    pub fn argument_names(&self) -> Vec<String> {
        self.arguments.iter().map(Term::name).collect()
    }

    #[must_use]
    pub fn complement(&self) -> Self {
        let mut new = self.clone();
        new.negated = !new.negated;
        new
    }

    #[must_use]
    pub fn make_positive(&self) -> Self {
        let mut new = self.clone();
        new.negated = false;
        new
    }

    #[must_use]
    pub fn invert_update(&self) -> Self {
        self.modify_table(Tablename::invert_update)
    }

    #[must_use]
    pub fn drop_update(&self) -> Self {
        self.modify_table(Tablename::drop_update)
    }

    #[must_use]
    pub fn make_update(&self, is_insert: bool) -> Self {
        self.modify_table(|table| Some(table.make_update(is_insert)))
    }

    fn modify_table(&self, func: impl Fn(&Tablename) -> Option<Tablename>) -> Self {
        let mut new = self.clone();
        if let Some(table) = func(&self.table) {
            new.table = table;
        }
        new
    }

    #[must_use]
    pub fn is_update(&self) -> bool {
        self.table.is_update()
    }

    #[must_use]
    pub fn tablename(&self, default_service: Option<&str>) -> String {
        self.table.name(default_service)
    }

    #[must_use]
    pub fn theory_name(&self) -> Option<&str> {
        self.table.service.as_deref()
    }

    pub fn drop_theory(&mut self) -> &mut Self {
        self.table.drop_service();
        self
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let arguments: Vec<serde_json::Value> = self
            .arguments
            .iter()
            .map(|arg| match arg {
                Term::Variable { name, .. } => serde_json::json!({ "variable": name }),
                Term::Object { value, .. } => value.to_json(),
            })
            .collect();
        serde_json::json!({
            "table": self.table.table,
            "service": self.table.service,
            "modal": self.table.modal,
            "negated": self.negated,
            "arguments": arguments,
        })
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
            && self.negated == other.negated
            && self.arguments == other.arguments
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.table.hash(state);
        self.arguments.hash(state);
        self.negated.hash(state);
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.table
            .cmp(&other.table)
            .then_with(|| self.negated.cmp(&other.negated))
            .then_with(|| self.arguments.len().cmp(&other.arguments.len()))
            .then_with(|| self.arguments.cmp(&other.arguments))
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .arguments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let atom = format!("{}({args})", self.tablename(None));
        let atom = match &self.table.modal {
            Some(modal) => format!("{modal}[{atom}]"),
            None => atom,
        };
        if self.negated {
            write!(f, "not {atom}")
        } else {
            f.write_str(&atom)
        }
    }
}
