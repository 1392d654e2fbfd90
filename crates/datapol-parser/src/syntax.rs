//! Conversion from the raw syntax tree to the internal representation
//!
//! Column references (`name=term`, `2=term`) are expanded into positional
//! arguments using the schema of the literal's service. Problems are
//! collected rather than returned so one pass reports all of them.

use std::collections::BTreeMap;

use datapol_ast::{
    DatapolError, Formula, Literal, Location, Rule, SourceMap, Span, Spanned, Tablename, Term,
    Theories, Value,
};
use datapol_lexer::Token;
use tracing::trace;

use crate::string_utils::{atom_str, string_value};
use crate::tree::{RawAtom, RawFormula, RawLiteral, RawParam, RawTerm};
use crate::variable_resolver::{fresh_variable, literal_variables, unused_variable_prefix};

pub struct SyntaxConverter<'a> {
    theories: &'a Theories,
    use_modules: bool,
    source_map: &'a SourceMap,
    source: &'a str,
    errors: Vec<DatapolError>,
}

impl<'a> SyntaxConverter<'a> {
    #[must_use]
    pub const fn new(
        theories: &'a Theories,
        use_modules: bool,
        source_map: &'a SourceMap,
        source: &'a str,
    ) -> Self {
        Self {
            theories,
            use_modules,
            source_map,
            source,
            errors: Vec::new(),
        }
    }

    /// Errors found so far
    #[must_use]
    pub fn errors(&self) -> &[DatapolError] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<DatapolError> {
        self.errors
    }

    /// Convert every statement of a program
    pub fn convert(&mut self, program: &[Spanned<RawFormula>]) -> Vec<Formula> {
        program
            .iter()
            .filter_map(|formula| self.convert_formula(formula))
            .collect()
    }

    pub fn convert_formula(&mut self, formula: &Spanned<RawFormula>) -> Option<Formula> {
        let original = self.source.get(formula.span.start..formula.span.end);
        match &formula.node {
            RawFormula::Fact(lit) => {
                let prefix = unused_variable_prefix(&literal_variables([lit]));
                let mut literal = self.create_literal(lit, 0, &prefix);
                if let Some(text) = original {
                    literal.set_original_str(text);
                }
                Some(Formula::Literal(literal))
            }
            RawFormula::Rule { heads, body } => {
                let mut rule = self.create_rule(heads, body, formula.span)?;
                if let Some(text) = original {
                    rule.set_original_str(text);
                }
                Some(Formula::Rule(rule))
            }
        }
    }

    fn create_rule(&mut self, heads: &[RawLiteral], body: &[RawLiteral], span: Span) -> Option<Rule> {
        let prefix = unused_variable_prefix(&literal_variables(heads.iter().chain(body)));
        // body literals are numbered after the heads so fresh variables stay distinct
        let head_lits: Vec<Literal> = heads
            .iter()
            .enumerate()
            .map(|(index, lit)| self.create_literal(lit, index, &prefix))
            .collect();
        let body_lits: Vec<Literal> = body
            .iter()
            .enumerate()
            .map(|(index, lit)| self.create_literal(lit, heads.len() + index, &prefix))
            .collect();
        match Rule::with_heads(head_lits, body_lits) {
            Ok(rule) => Some(rule.with_location(Some(self.location(span)))),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    fn create_literal(&mut self, lit: &RawLiteral, index: usize, prefix: &str) -> Literal {
        let table = self
            .create_tablename(&lit.atom)
            .with_modal(lit.modal.as_ref().map(|modal| modal.text.clone()));
        let arguments = self.create_atom_args(&lit.atom, &table, index, prefix);
        Literal::new(table, arguments)
            .with_negated(lit.negated)
            .with_location(Some(self.location(lit.atom.span)))
    }

    fn create_tablename(&self, atom: &RawAtom) -> Tablename {
        Tablename::create(&atom.relation.text(), self.use_modules)
    }

    /// Columns declared for `table`, looked up by its service
    fn columns(&self, table: &Tablename) -> Option<&'a [String]> {
        let service = table.service.as_deref()?;
        self.theories.get(service)?.columns(&table.table)
    }

    fn create_atom_args(&mut self, atom: &RawAtom, table: &Tablename, index: usize, prefix: &str) -> Vec<Term> {
        match self.columns(table) {
            Some(columns) => self.create_atom_arg_list(atom, index, prefix, columns),
            None if atom.has_named_param() => {
                self.errors.push(DatapolError::policy_at(
                    format!(
                        "Atom {} uses named parameters but the columns for table {} have not been declared.",
                        atom_str(atom),
                        table
                    ),
                    Some(self.location(atom.span)),
                ));
                Vec::new()
            }
            None => {
                let mut args = Vec::with_capacity(atom.params.len());
                for param in &atom.params {
                    if let RawParam::Positional(term) = param {
                        match self.create_term(term) {
                            Ok(term) => args.push(term),
                            Err(err) => self.errors.push(err),
                        }
                    }
                }
                args
            }
        }
    }

    /// Positional arguments for an atom whose table has known `columns`.
    /// Returns an empty list when any reference is invalid.
    fn create_atom_arg_list(
        &mut self,
        atom: &RawAtom,
        index: usize,
        prefix: &str,
        columns: &[String],
    ) -> Vec<Term> {
        let atomstr = atom_str(atom);
        let location = Some(self.location(atom.span));
        let policy = |message: String| DatapolError::policy_at(message, location);

        let split = atom
            .params
            .iter()
            .position(|param| matches!(param, RawParam::Named { .. }))
            .unwrap_or(atom.params.len());

        let mut errors = Vec::new();
        let mut position_args = Vec::with_capacity(columns.len().max(split));
        for param in &atom.params[..split] {
            if let RawParam::Positional(term) = param {
                match self.create_term(term) {
                    Ok(term) => position_args.push(term),
                    Err(err) => errors.push(err),
                }
            }
        }

        let mut names: BTreeMap<&str, Term> = BTreeMap::new();
        let mut numbers: BTreeMap<usize, Term> = BTreeMap::new();
        for param in &atom.params[split..] {
            let (column, term) = match param {
                RawParam::Positional(_) => {
                    errors.push(policy(format!(
                        "Atom {atomstr} has a positional parameter after a reference parameter"
                    )));
                    continue;
                }
                RawParam::Named { column, term } => (column, term),
            };
            let term = match self.create_term(term) {
                Ok(term) => term,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };

            if column.token == Token::Id {
                let name = column.text.as_str();
                if names.insert(name, term).is_some() {
                    errors.push(policy(format!(
                        "In atom {atomstr} two values for column name {name} were provided"
                    )));
                }
                match columns.iter().position(|col| col == name) {
                    None => errors.push(policy(format!(
                        "In atom {atomstr} column name {name} does not exist"
                    ))),
                    Some(number) if number < split => errors.push(policy(format!(
                        "In atom {atomstr} column name {name} references position {number}, \
                         which is already provided by position arguments."
                    ))),
                    Some(_) => {}
                }
                continue;
            }

            let Ok(number) = column.text.parse::<usize>() else {
                errors.push(policy(format!(
                    "In atom {atomstr} column number {} is too large. The permitted column numbers are 0..{} ",
                    column.text,
                    columns.len().saturating_sub(1)
                )));
                continue;
            };
            if numbers.insert(number, term).is_some() {
                errors.push(policy(format!(
                    "In atom {atomstr} two values for column number {number} were provided."
                )));
            }
            if number < split {
                errors.push(policy(format!(
                    "In atom {atomstr} column number {number} is already provided by position arguments."
                )));
            }
            if number >= columns.len() {
                errors.push(policy(format!(
                    "In atom {atomstr} column number {number} is too large. The permitted column numbers are 0..{} ",
                    columns.len().saturating_sub(1)
                )));
            }
        }
        if !errors.is_empty() {
            self.errors.extend(errors);
            return Vec::new();
        }

        for (number, column) in columns.iter().enumerate().skip(split) {
            match (names.remove(column.as_str()), numbers.remove(&number)) {
                (Some(_), Some(_)) => errors.push(policy(format!(
                    "In atom {atomstr} a column was given two values by reference parameters: \
                     one by name {column} and one by number {number}. "
                ))),
                (Some(term), None) | (None, Some(term)) => position_args.push(term),
                (None, None) => {
                    position_args.push(Term::variable(fresh_variable(prefix, index, number)));
                }
            }
        }
        if !errors.is_empty() {
            self.errors.extend(errors);
            return Vec::new();
        }
        trace!(atom = %atomstr, args = position_args.len(), "expanded column references");
        position_args
    }

    fn create_term(&self, term: &RawTerm) -> Result<Term, DatapolError> {
        let token = &term.0;
        let location = Some(self.location(token.span));
        let value = match token.token {
            Token::Integer => match token.text.parse::<i64>() {
                Ok(int) => Value::Int(int),
                // outside the i64 range
                Err(_) => token.text.parse::<f64>().map(Value::Float).map_err(|err| {
                    DatapolError::policy_at(format!("Invalid integer {}: {err}", token.text), location)
                })?,
            },
            Token::Float => token.text.parse::<f64>().map(Value::Float).map_err(|err| {
                DatapolError::policy_at(format!("Invalid float {}: {err}", token.text), location)
            })?,
            Token::String => string_value(token).map(Value::Str).map_err(|err| {
                DatapolError::policy_at(format!("Invalid string {}: {err}", token.text), location)
            })?,
            _ => return Ok(Term::variable(token.text.clone()).with_location(location)),
        };
        Ok(Term::object(value).with_location(location))
    }

    fn location(&self, span: Span) -> Location {
        self.source_map.position(span.start)
    }
}
