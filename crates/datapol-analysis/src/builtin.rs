//! Builtin tables evaluated by the engine rather than stored
//!
//! A builtin is identified by table name and arity. Its first `num_inputs`
//! arguments must be bound before it can be evaluated.

use std::collections::BTreeMap;

use datapol_ast::Tablename;
use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
    pub num_inputs: usize,
}

impl Builtin {
    #[must_use]
    pub const fn new(name: &'static str, arity: usize, num_inputs: usize) -> Self {
        Self {
            name,
            arity,
            num_inputs,
        }
    }
}

const STANDARD: &[Builtin] = &[
    // comparison
    Builtin::new("lt", 2, 2),
    Builtin::new("lteq", 2, 2),
    Builtin::new("equal", 2, 2),
    Builtin::new("gteq", 2, 2),
    Builtin::new("gt", 2, 2),
    // arithmetic
    Builtin::new("max", 3, 2),
    Builtin::new("plus", 3, 2),
    Builtin::new("minus", 3, 2),
    Builtin::new("mul", 3, 2),
    Builtin::new("div", 3, 2),
    Builtin::new("float", 2, 1),
    Builtin::new("int", 2, 1),
    // string
    Builtin::new("concat", 3, 2),
];

/// Registry shared by the safety checks
pub static BUILTINS: Lazy<BuiltinRegistry> = Lazy::new(BuiltinRegistry::default);

#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    builtins: BTreeMap<&'static str, Builtin>,
}

impl BuiltinRegistry {
    /// Registry with no builtins
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            builtins: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, builtin: Builtin) {
        self.builtins.insert(builtin.name, builtin);
    }

    /// Builtin named by `table`. Tables qualified by a service or a modal
    /// are never builtins.
    #[must_use]
    pub fn builtin(&self, table: &Tablename) -> Option<&Builtin> {
        if table.service.is_some() || table.modal.is_some() {
            return None;
        }
        self.builtins.get(table.table.as_str())
    }

    #[must_use]
    pub fn is_builtin(&self, table: &Tablename, arity: usize) -> bool {
        self.builtin(table)
            .is_some_and(|builtin| builtin.arity == arity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Builtin> {
        self.builtins.values()
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for builtin in STANDARD {
            registry.register(*builtin);
        }
        registry
    }
}
