//! Rules such as `p(x) :- q(x), not r(x)`

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

use crate::{DatapolError, Literal, Location, Substitution, Term};

/// A rule with one or more heads. Reasoning works on `head()` only;
/// additional heads come from multi-head rules.
#[derive(Debug, Clone)]
pub struct Rule {
    heads: Vec<Literal>,
    pub body: Vec<Literal>,
    pub location: Option<Location>,
    pub id: Uuid,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub original_str: Option<String>,
}

impl Rule {
    #[must_use]
    pub fn new(head: Literal, body: Vec<Literal>) -> Self {
        Self {
            heads: vec![head],
            body,
            location: None,
            id: Uuid::new_v4(),
            name: None,
            comment: None,
            original_str: None,
        }
    }

    /// Rule with several heads
    ///
    /// # Errors
    ///
    /// Returns `DatapolError::Policy` when `heads` is empty
    pub fn with_heads(heads: Vec<Literal>, body: Vec<Literal>) -> Result<Self, DatapolError> {
        let mut heads = heads.into_iter();
        let Some(first) = heads.next() else {
            return Err(DatapolError::policy("A rule requires at least one head"));
        };
        let mut rule = Self::new(first, body);
        rule.heads.extend(heads);
        Ok(rule)
    }

    #[must_use]
    pub const fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn head(&self) -> &Literal {
        // heads is never empty: both constructors install a first head
        &self.heads[0]
    }

    #[must_use]
    pub fn heads(&self) -> &[Literal] {
        &self.heads
    }

    pub const fn set_id(&mut self, id: Uuid) {
        self.id = id;
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

    /// Multi-line rendering with one body literal per line
    #[must_use]
    pub fn pretty_str(&self) -> String {
        if self.body.is_empty() {
            return self.to_string();
        }
        format!(
            "{} :- \n    {}",
            join(&self.heads, ", "),
            join(&self.body, ",\n    ")
        )
    }

    #[must_use]
    pub fn tablename(&self, theory: Option<&str>) -> String {
        self.head().tablename(theory)
    }

    #[must_use]
    pub fn theory_name(&self) -> Option<&str> {
        self.head().theory_name()
    }

    /// Remove the service from every head
    pub fn drop_theory(&mut self) -> &mut Self {
        for head in &mut self.heads {
            head.drop_theory();
        }
        self
    }

    /// Every tablename in the rule, optionally only those in the body
    #[must_use]
    pub fn tablenames(&self, theory: Option<&str>, body_only: bool) -> BTreeSet<String> {
        let heads: &[Literal] = if body_only { &[] } else { &self.heads };
        heads
            .iter()
            .chain(&self.body)
            .map(|lit| lit.tablename(theory))
            .collect()
    }

    #[must_use]
    pub fn variables(&self) -> BTreeSet<Term> {
        self.heads
            .iter()
            .chain(&self.body)
            .flat_map(Literal::variables)
            .collect()
    }

    #[must_use]
    pub fn variable_names(&self) -> BTreeSet<String> {
        self.heads
            .iter()
            .chain(&self.body)
            .flat_map(Literal::variable_names)
            .collect()
    }

    /// New rule (fresh id, no metadata) with `binding` applied everywhere
    #[must_use]
    pub fn plug(&self, binding: &dyn Substitution) -> Self {
        let mut rule = Self::new(self.head().plug(binding), self.plug_body(binding));
        rule.heads = self.plug_heads(binding);
        rule
    }

    #[must_use]
    pub fn plug_body(&self, binding: &dyn Substitution) -> Vec<Literal> {
        self.body.iter().map(|lit| lit.plug(binding)).collect()
    }

    #[must_use]
    pub fn plug_heads(&self, binding: &dyn Substitution) -> Vec<Literal> {
        self.heads.iter().map(|lit| lit.plug(binding)).collect()
    }

    #[must_use]
    pub fn invert_update(&self) -> Self {
        self.map_heads(Literal::invert_update)
    }

    #[must_use]
    pub fn drop_update(&self) -> Self {
        self.map_heads(Literal::drop_update)
    }

    #[must_use]
    pub fn make_update(&self, is_insert: bool) -> Self {
        self.map_heads(|head| head.make_update(is_insert))
    }

    fn map_heads(&self, func: impl Fn(&Literal) -> Literal) -> Self {
        let mut new = self.clone();
        new.heads = self.heads.iter().map(func).collect();
        new
    }

    #[must_use]
    pub fn is_update(&self) -> bool {
        self.head().is_update()
    }

    fn sorted_heads(&self) -> Vec<&Literal> {
        let mut heads: Vec<&Literal> = self.heads.iter().collect();
        heads.sort();
        heads
    }

    fn sorted_body(&self) -> Vec<&Literal> {
        let mut body: Vec<&Literal> = self.body.iter().collect();
        body.sort();
        body
    }
}

fn join(lits: &[Literal], separator: &str) -> String {
    lits.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Heads and body compare as multisets; id, location and metadata are ignored
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.heads.len() == other.heads.len()
            && self.body.len() == other.body.len()
            && self.sorted_heads() == other.sorted_heads()
            && self.sorted_body() == other.sorted_body()
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted_heads().hash(state);
        self.sorted_body().hash(state);
    }
}

impl Ord for Rule {
    fn cmp(&self, other: &Self) -> Ordering {
        self.heads
            .len()
            .cmp(&other.heads.len())
            .then_with(|| self.body.len().cmp(&other.body.len()))
            .then_with(|| self.sorted_heads().cmp(&other.sorted_heads()))
            .then_with(|| self.sorted_body().cmp(&other.sorted_body()))
    }
}

impl PartialOrd for Rule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            return f.write_str(&join(&self.heads, " "));
        }
        write!(f, "{} :- {}", join(&self.heads, ", "), join(&self.body, ", "))
    }
}
