//! Terms: variables and object constants

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::Location;

/// Value of an object constant
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
}

impl Value {
    const fn rank(&self) -> u8 {
        match self {
            Self::Float(_) => 0,
            Self::Int(_) => 1,
            Self::Str(_) => 2,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Str(_) => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Str(s) => s.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
        }
    }
}

impl Ord for Value {
    /// Numbers sort before strings and compare numerically across kinds
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a
                    .total_cmp(&b)
                    .then_with(|| self.rank().cmp(&other.rank())),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => {
                f.write_str("\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            Self::Int(i) => write!(f, "{i}"),
            // Debug keeps the decimal point on whole floats
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A variable or an object constant
#[derive(Debug, Clone)]
pub enum Term {
    Variable {
        name: String,
        location: Option<Location>,
    },
    Object {
        value: Value,
        location: Option<Location>,
    },
}

impl Term {
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable {
            name: name.into(),
            location: None,
        }
    }

    pub fn object(value: impl Into<Value>) -> Self {
        Self::Object {
            value: value.into(),
            location: None,
        }
    }

    /// Create a constant from a value, or a variable named after the value
    /// when `force_var` is set
    #[must_use]
    pub fn from_value(value: Value, force_var: bool) -> Self {
        if force_var {
            let name = match value {
                Value::Str(s) => s,
                other => other.to_string(),
            };
            Self::variable(name)
        } else {
            Self::Object {
                value,
                location: None,
            }
        }
    }

    #[must_use]
    pub fn with_location(self, location: Option<Location>) -> Self {
        match self {
            Self::Variable { name, .. } => Self::Variable { name, location },
            Self::Object { value, .. } => Self::Object { value, location },
        }
    }

    #[must_use]
    pub const fn is_variable(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }

    /// Variable name, or `None` for constants
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Self::Variable { name, .. } => Some(name),
            Self::Object { .. } => None,
        }
    }

    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Object { value, .. } => Some(value),
            Self::Variable { .. } => None,
        }
    }

    #[must_use]
    pub const fn location(&self) -> Option<Location> {
        match self {
            Self::Variable { location, .. } | Self::Object { location, .. } => *location,
        }
    }

    /// Text used for argument names: the variable name or the constant's text
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Variable { name, .. } => name.clone(),
            Self::Object {
                value: Value::Str(s),
                ..
            } => s.clone(),
            Self::Object { value, .. } => value.to_string(),
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Variable { name: a, .. }, Self::Variable { name: b, .. }) => a == b,
            (Self::Object { value: a, .. }, Self::Object { value: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Variable { name, .. } => {
                0u8.hash(state);
                name.hash(state);
            }
            Self::Object { value, .. } => {
                1u8.hash(state);
                value.hash(state);
            }
        }
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Variable { name: a, .. }, Self::Variable { name: b, .. }) => a.cmp(b),
            (Self::Object { value: a, .. }, Self::Object { value: b, .. }) => a.cmp(b),
            (Self::Variable { .. }, Self::Object { .. }) => Ordering::Less,
            (Self::Object { .. }, Self::Variable { .. }) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable { name, .. } => f.write_str(name),
            Self::Object { value, .. } => write!(f, "{value}"),
        }
    }
}

/// Mapping from variables to replacement terms, used by `plug`
pub trait Substitution {
    /// Replacement for `term`, or `None` to keep it unchanged
    fn apply(&self, term: &Term) -> Option<Term>;
}

impl<S: BuildHasher> Substitution for HashMap<String, Term, S> {
    fn apply(&self, term: &Term) -> Option<Term> {
        term.variable_name().and_then(|name| self.get(name).cloned())
    }
}

impl Substitution for BTreeMap<String, Term> {
    fn apply(&self, term: &Term) -> Option<Term> {
        term.variable_name().and_then(|name| self.get(name).cloned())
    }
}

impl<S: BuildHasher> Substitution for HashMap<String, Value, S> {
    fn apply(&self, term: &Term) -> Option<Term> {
        term.variable_name()
            .and_then(|name| self.get(name))
            .map(|value| Term::object(value.clone()))
    }
}
