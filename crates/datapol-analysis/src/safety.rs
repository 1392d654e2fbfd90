//! Semantic checks on compiled formulas
//!
//! Checks return every problem they find instead of stopping at the first,
//! so callers can report a whole policy at once.

use std::collections::BTreeSet;

use datapol_ast::{DatapolError, Formula, Literal, Rule, Theories};
use tracing::trace;

use crate::builtin::BUILTINS;

/// Modals allowed in rule heads unless configured otherwise
pub const PERMITTED_MODALS: &[&str] = &["execute"];

/// Predicate deciding whether a head literal may name a service
pub type PermitHead<'a> = &'a dyn Fn(&Literal) -> bool;

struct Reorder {
    safe_vars: BTreeSet<String>,
    pending: Vec<(Literal, BTreeSet<String>)>,
    body: Vec<Literal>,
}

impl Reorder {
    fn make_safe(&mut self, lit: Literal) {
        self.safe_vars.extend(lit.variable_names());
        self.body.push(lit);
    }

    /// Add `lit`, then every pending literal it unblocks, earliest first
    fn make_safe_plus(&mut self, lit: Literal) {
        self.make_safe(lit);
        while let Some(index) = self
            .pending
            .iter()
            .position(|(_, vars)| vars.is_subset(&self.safe_vars))
        {
            let (lit, _) = self.pending.remove(index);
            self.make_safe(lit);
        }
    }
}

/// Variables of `lit` that must be bound before it can be evaluated, or
/// `None` for literals that bind their own variables
fn required_variables(lit: &Literal) -> Option<BTreeSet<String>> {
    if lit.is_negated() {
        return Some(lit.variable_names());
    }
    if !BUILTINS.is_builtin(&lit.table, lit.arguments.len()) {
        return None;
    }
    let inputs = BUILTINS.builtin(&lit.table).map_or(0, |builtin| builtin.num_inputs);
    Some(
        lit.arguments
            .iter()
            .take(inputs)
            .filter_map(|arg| arg.variable_name().map(str::to_string))
            .collect(),
    )
}

/// Reorder the body so a left-to-right evaluation binds the variables of
/// every negative literal and every builtin input before reaching it.
/// A body that is already safe keeps its order.
///
/// # Errors
///
/// Returns a policy error naming each literal that can never be made safe
pub fn reorder_for_safety(rule: &Rule) -> Result<Rule, DatapolError> {
    let mut state = Reorder {
        safe_vars: BTreeSet::new(),
        pending: Vec::new(),
        body: Vec::with_capacity(rule.body.len()),
    };

    for lit in &rule.body {
        match required_variables(lit) {
            None => state.make_safe_plus(lit.clone()),
            Some(required) => {
                let unsafe_vars: BTreeSet<String> =
                    required.difference(&state.safe_vars).cloned().collect();
                if unsafe_vars.is_empty() {
                    state.make_safe_plus(lit.clone());
                } else {
                    state.pending.push((lit.clone(), unsafe_vars));
                }
            }
        }
    }

    if !state.pending.is_empty() {
        let lit_msgs = state
            .pending
            .iter()
            .map(|(lit, vars)| {
                let vars = vars.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
                format!("{lit} (vars {vars})")
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(DatapolError::policy_at(
            format!("Could not reorder rule {rule}.  Unsafe lits: {lit_msgs}"),
            rule.location,
        ));
    }

    let mut reordered = rule.clone();
    reordered.body = state.body;
    trace!(rule = %reordered, "reordered for safety");
    Ok(reordered)
}

/// Problems with a fact: negation, free variables, schema and service
pub fn fact_errors(
    atom: &Literal,
    theories: Option<&Theories>,
    theory: Option<&str>,
) -> Vec<DatapolError> {
    let mut errors = Vec::new();
    if atom.is_negated() {
        errors.push(DatapolError::policy_at(
            format!("Fact may not be negated: {atom}"),
            atom.location,
        ));
    }
    if !atom.is_ground() {
        errors.push(DatapolError::policy_at(
            format!("Fact not ground: {atom}"),
            atom.location,
        ));
    }
    errors.extend(literal_schema_consistency(atom, theories, theory));
    errors.extend(fact_has_no_theory(atom));
    errors
}

pub fn fact_has_no_theory(atom: &Literal) -> Vec<DatapolError> {
    match atom.table.service.as_deref() {
        None => Vec::new(),
        Some(service) => vec![DatapolError::policy_at(
            format!("Fact {atom} should not reference any policy: {service}"),
            atom.location,
        )],
    }
}

/// Every head variable must also occur in the body
pub fn rule_head_safety(rule: &Rule) -> Vec<DatapolError> {
    let body_vars: BTreeSet<_> = rule.body.iter().flat_map(Literal::variables).collect();
    rule.heads()
        .iter()
        .flat_map(Literal::variables)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|var| !body_vars.contains(var))
        .map(|var| {
            DatapolError::policy_at(
                format!("Variable {var} found in head but not in body, rule {rule}"),
                var.location(),
            )
        })
        .collect()
}

/// Heads may only use `permitted_modals` (case-insensitive), a modal head
/// must be the only head, and bodies may not use modals at all
pub fn rule_modal_safety<S: AsRef<str>>(rule: &Rule, permitted_modals: &[S]) -> Vec<DatapolError> {
    let mut errors = Vec::new();
    let mut modal_in_head = false;
    for head in rule.heads() {
        let Some(modal) = head.table.modal.as_deref() else {
            continue;
        };
        modal_in_head = true;
        let permitted = permitted_modals
            .iter()
            .any(|allowed| allowed.as_ref().eq_ignore_ascii_case(modal));
        if !permitted {
            let allowed = permitted_modals
                .iter()
                .map(|allowed| format!("'{}'", allowed.as_ref()))
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(DatapolError::policy_at(
                format!("Only {allowed} modal is allowed; found {modal} in head {head}"),
                head.location,
            ));
        }
    }

    if modal_in_head && rule.heads().len() > 1 {
        let heads = rule
            .heads()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(DatapolError::policy_at(
            format!("May not have multiple rule heads with a modal: {heads}"),
            rule.location,
        ));
    }

    for lit in &rule.body {
        if let Some(modal) = lit.table.modal.as_deref() {
            errors.push(DatapolError::policy_at(
                format!("Modals not allowed in the rule body; found {modal} in body literal {lit}"),
                lit.location,
            ));
        }
    }
    errors
}

/// Non-modal heads may not name a service unless `permit_head` allows it
pub fn rule_head_has_no_theory(rule: &Rule, permit_head: Option<PermitHead<'_>>) -> Vec<DatapolError> {
    rule.heads()
        .iter()
        .filter(|head| head.table.service.is_some() && head.table.modal.is_none())
        .filter(|head| !permit_head.is_some_and(|permit| permit(*head)))
        .map(|head| {
            DatapolError::policy_at(
                format!("Non-modal rule head {head} should not reference any policy: {rule}"),
                head.location,
            )
        })
        .collect()
}

/// Negative literals and builtin inputs must be bound by the body
pub fn rule_body_safety(rule: &Rule) -> Vec<DatapolError> {
    match reorder_for_safety(rule) {
        Ok(_) => Vec::new(),
        Err(err) => vec![err],
    }
}

pub fn rule_schema_consistency(
    rule: &Rule,
    theories: Option<&Theories>,
    theory: Option<&str>,
) -> Vec<DatapolError> {
    rule.body
        .iter()
        .flat_map(|lit| literal_schema_consistency(lit, theories, theory))
        .collect()
}

/// Check the literal's table and width against the schema of its service,
/// or of `theory` when it has none. Unknown theories and tables of
/// incomplete schemas pass.
pub fn literal_schema_consistency(
    literal: &Literal,
    theories: Option<&Theories>,
    theory: Option<&str>,
) -> Vec<DatapolError> {
    let Some(theories) = theories else {
        return Vec::new();
    };
    let Some(active) = literal.table.service.as_deref().or(theory) else {
        return Vec::new();
    };
    let Some(schema) = theories.get(active) else {
        return Vec::new();
    };

    let table = literal.table.table.as_str();
    let Some(arity) = schema.arity(table) else {
        if schema.complete {
            return vec![DatapolError::policy_at(
                format!("Literal {literal} uses unknown table {table} from policy {active}"),
                literal.location,
            )];
        }
        return Vec::new();
    };

    if arity > 0 && literal.arguments.len() != arity {
        return vec![DatapolError::policy_at(
            format!(
                "Literal {literal} contained {} arguments but only {arity} arguments are permitted",
                literal.arguments.len()
            ),
            literal.location,
        )];
    }
    Vec::new()
}

pub fn rule_errors(
    rule: &Rule,
    theories: Option<&Theories>,
    theory: Option<&str>,
) -> Vec<DatapolError> {
    Checker::new(theories, theory).rule_errors(rule)
}

pub fn formula_errors(
    formula: &Formula,
    theories: Option<&Theories>,
    theory: Option<&str>,
) -> Vec<DatapolError> {
    Checker::new(theories, theory).formula_errors(formula)
}

/// Checks with a fixed schema context and modal policy
#[derive(Debug, Clone)]
pub struct Checker<'a> {
    theories: Option<&'a Theories>,
    theory: Option<&'a str>,
    permitted_modals: Vec<String>,
}

impl<'a> Checker<'a> {
    #[must_use]
    pub fn new(theories: Option<&'a Theories>, theory: Option<&'a str>) -> Self {
        Self {
            theories,
            theory,
            permitted_modals: PERMITTED_MODALS.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_permitted_modals(mut self, modals: Vec<String>) -> Self {
        self.permitted_modals = modals;
        self
    }

    #[must_use]
    pub fn rule_errors(&self, rule: &Rule) -> Vec<DatapolError> {
        let mut errors = rule_head_safety(rule);
        errors.extend(rule_body_safety(rule));
        errors.extend(rule_schema_consistency(rule, self.theories, self.theory));
        errors.extend(rule_head_has_no_theory(rule, None));
        errors.extend(rule_modal_safety(rule, &self.permitted_modals));
        errors
    }

    #[must_use]
    pub fn formula_errors(&self, formula: &Formula) -> Vec<DatapolError> {
        match formula {
            Formula::Literal(lit) => fact_errors(lit, self.theories, self.theory),
            Formula::Rule(rule) => self.rule_errors(rule),
        }
    }
}
