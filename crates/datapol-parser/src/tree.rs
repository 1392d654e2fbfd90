//! Raw syntax tree produced by the grammar, before conversion
//!
//! Nodes keep the original tokens so the converter can report positions
//! and resolve column references against schemas.

use datapol_ast::{Span, Spanned};
use datapol_lexer::{SpannedToken, Token};

#[derive(Debug, Clone)]
pub enum RawFormula {
    /// A single literal statement
    Fact(RawLiteral),
    /// `heads :- body`
    Rule {
        heads: Vec<RawLiteral>,
        body: Vec<RawLiteral>,
    },
}

#[derive(Debug, Clone)]
pub struct RawLiteral {
    pub negated: bool,
    pub modal: Option<SpannedToken>,
    pub atom: RawAtom,
    pub span: Span,
}

impl RawLiteral {
    #[must_use]
    pub fn new(negation: Option<SpannedToken>, modal: Option<SpannedToken>, atom: RawAtom, end: usize) -> Self {
        let start = negation
            .as_ref()
            .or(modal.as_ref())
            .map_or(atom.span.start, |token| token.span.start);
        Self {
            negated: negation.is_some(),
            modal,
            atom,
            span: Span::new(start, end),
        }
    }
}

/// Relation name pieces (`nova`, `servers`) plus an optional update sign
#[derive(Debug, Clone)]
pub struct RawRelation {
    pub pieces: Vec<SpannedToken>,
    pub sign: Option<SpannedToken>,
}

impl RawRelation {
    #[must_use]
    pub fn new(first: SpannedToken) -> Self {
        Self {
            pieces: vec![first],
            sign: None,
        }
    }

    #[must_use]
    pub fn push(mut self, piece: SpannedToken) -> Self {
        self.pieces.push(piece);
        self
    }

    #[must_use]
    pub fn with_sign(mut self, sign: Option<SpannedToken>) -> Self {
        self.sign = sign;
        self
    }

    /// Full table text, e.g. `nova:servers+`
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = self
            .pieces
            .iter()
            .map(|piece| piece.text.as_str())
            .collect::<Vec<_>>()
            .join(":");
        if let Some(sign) = &self.sign {
            text.push_str(&sign.text);
        }
        text
    }

    #[must_use]
    pub fn span(&self) -> Span {
        let start = self.pieces.first().map_or(0, |piece| piece.span.start);
        let end = self
            .sign
            .as_ref()
            .or(self.pieces.last())
            .map_or(start, |token| token.span.end);
        Span::new(start, end)
    }
}

#[derive(Debug, Clone)]
pub struct RawAtom {
    pub relation: RawRelation,
    pub params: Vec<RawParam>,
    pub span: Span,
}

impl RawAtom {
    #[must_use]
    pub fn new(relation: RawRelation, params: Vec<RawParam>, close: Option<SpannedToken>) -> Self {
        let relation_span = relation.span();
        let end = close.map_or(relation_span.end, |token| token.span.end);
        Self {
            relation,
            params,
            span: Span::new(relation_span.start, end),
        }
    }

    #[must_use]
    pub fn has_named_param(&self) -> bool {
        self.params
            .iter()
            .any(|param| matches!(param, RawParam::Named { .. }))
    }
}

#[derive(Debug, Clone)]
pub enum RawParam {
    Positional(RawTerm),
    /// `column=term`, where the column is a name or a number
    Named { column: SpannedToken, term: RawTerm },
}

/// Term token: identifier (variable), integer, float or string
#[derive(Debug, Clone)]
pub struct RawTerm(pub SpannedToken);

impl RawTerm {
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        (self.0.token == Token::Id).then_some(self.0.text.as_str())
    }
}

/// Printable node for debugging the raw parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    fn branch(label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }
}

/// Tree for a whole program, rooted at `THEORY`
#[must_use]
pub fn program_tree(formulas: &[Spanned<RawFormula>]) -> TreeNode {
    TreeNode::branch(
        "THEORY",
        formulas.iter().map(|formula| formula_tree(&formula.node)).collect(),
    )
}

fn formula_tree(formula: &RawFormula) -> TreeNode {
    match formula {
        RawFormula::Fact(lit) => literal_tree(lit),
        RawFormula::Rule { heads, body } => TreeNode::branch(
            "RULE",
            vec![
                TreeNode::branch("AND", heads.iter().map(literal_tree).collect()),
                TreeNode::branch("AND", body.iter().map(literal_tree).collect()),
            ],
        ),
    }
}

fn literal_tree(lit: &RawLiteral) -> TreeNode {
    let atom = atom_tree(&lit.atom);
    let modal_atom = match &lit.modal {
        Some(modal) => TreeNode::branch("MODAL", vec![TreeNode::leaf(modal.text.clone()), atom]),
        None => atom,
    };
    if lit.negated {
        TreeNode::branch("NOT", vec![modal_atom])
    } else {
        modal_atom
    }
}

fn atom_tree(atom: &RawAtom) -> TreeNode {
    let mut name_parts: Vec<TreeNode> = atom
        .relation
        .pieces
        .iter()
        .map(|piece| TreeNode::leaf(piece.text.clone()))
        .collect();
    if let Some(sign) = &atom.relation.sign {
        name_parts.push(TreeNode::leaf(sign.text.clone()));
    }
    let mut children = vec![TreeNode::branch("STRUCTURED_NAME", name_parts)];
    children.extend(atom.params.iter().map(|param| match param {
        RawParam::Positional(term) => term_tree(term),
        RawParam::Named { column, term } => {
            let kind = if column.token == Token::Integer {
                "COLUMN_NUMBER"
            } else {
                "COLUMN_NAME"
            };
            TreeNode::branch(
                "NAMED_PARAM",
                vec![
                    TreeNode::branch(kind, vec![TreeNode::leaf(column.text.clone())]),
                    term_tree(term),
                ],
            )
        }
    }));
    TreeNode::branch("ATOM", children)
}

fn term_tree(term: &RawTerm) -> TreeNode {
    let kind = match term.0.token {
        Token::Integer => "INTEGER_OBJ",
        Token::Float => "FLOAT_OBJ",
        Token::String => "STRING_OBJ",
        _ => "VARIABLE",
    };
    TreeNode::branch(kind, vec![TreeNode::leaf(term.0.text.clone())])
}

/// Render `tree` one label per line, each preceded by a line of `|`
/// marking its depth
#[must_use]
pub fn render_tree(tree: &TreeNode, indent: usize) -> String {
    let mut out = String::new();
    render_into(tree, indent, &mut out);
    out
}

fn render_into(tree: &TreeNode, indent: usize, out: &mut String) {
    out.push_str(&"|".repeat(indent));
    out.push('\n');
    out.push_str(&tree.label);
    out.push('\n');
    for child in &tree.children {
        render_into(child, indent + 1, out);
    }
}
