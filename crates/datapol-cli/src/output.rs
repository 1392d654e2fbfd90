//! Rendering of compiled policies for stdout

use std::collections::BTreeMap;

use datapol_ast::{Formula, Literal};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Format {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// One formula per line, or a JSON array
///
/// # Errors
///
/// Returns an error if JSON serialization fails
pub fn render_formulas(formulas: &[Formula], format: Format) -> serde_json::Result<String> {
    match format {
        Format::Text => Ok(formulas
            .iter()
            .map(|formula| format!("{formula}\n"))
            .collect()),
        Format::Json => {
            let values: Vec<Value> = formulas.iter().map(formula_to_json).collect();
            serde_json::to_string_pretty(&values).map(|s| s + "\n")
        }
    }
}

/// `table: stratum` lines, or a JSON object
///
/// # Errors
///
/// Returns an error if JSON serialization fails
pub fn render_strata(strata: &BTreeMap<String, usize>, format: Format) -> serde_json::Result<String> {
    match format {
        Format::Text => Ok(strata
            .iter()
            .map(|(table, stratum)| format!("{table}: {stratum}\n"))
            .collect()),
        Format::Json => serde_json::to_string_pretty(strata).map(|s| s + "\n"),
    }
}

fn formula_to_json(formula: &Formula) -> Value {
    match formula {
        Formula::Literal(lit) => json!({ "fact": lit.to_json() }),
        Formula::Rule(rule) => json!({
            "rule": {
                "heads": rule.heads().iter().map(Literal::to_json).collect::<Vec<_>>(),
                "body": rule.body.iter().map(Literal::to_json).collect::<Vec<_>>(),
            }
        }),
    }
}
