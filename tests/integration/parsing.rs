//! Integration tests for the lexer + parser + converter pipeline

use std::collections::BTreeMap;

use datapol_ast::{DatapolError, Formula, Schema, Term, Theories, Value, formulas_to_string};
use datapol_lexer::Token;
use datapol_parser::{Compiler, Parser, parse, parse1};
use proptest::prelude::*;

fn nova_theories() -> Theories {
    let mut schema = Schema::default();
    schema.insert("servers", vec!["id".into(), "name".into(), "status".into()]);
    let mut theories = BTreeMap::new();
    theories.insert("nova".to_string(), schema);
    theories
}

#[test]
fn test_lexer_feeds_parser() {
    let parser = Parser::new("p(x) :- q(x), not r(x) // done").unwrap();
    assert!(parser.tokens().iter().any(|t| t.token == Token::Negation));
    assert!(parser.tokens().iter().any(|t| t.token == Token::Comment));

    let program = parser.parse().unwrap();
    assert_eq!(program.len(), 1);
}

#[test]
fn test_policy_with_all_formula_kinds() {
    let policy = "\
        // ground facts\n\
        nova:servers(1, \"web\", \"ACTIVE\");\n\
        p+(1);\n\
        # rules\n\
        active(x) :- nova:servers(x, y, \"ACTIVE\").\n\
        execute[nova:pause(x)] :- active(x), not allowed(x);\n\
        a(x), b(x) :- c(x)\n";
    let formulas = parse(policy, &Theories::new(), true).unwrap();
    assert_eq!(formulas.len(), 5);

    assert!(formulas[0].is_atom());
    assert!(formulas[1].is_update());
    assert!(formulas[2].as_rule().is_some());
    assert_eq!(formulas[3].head().table.modal.as_deref(), Some("execute"));
    assert!(formulas[4].is_multi_rule());
}

#[test]
fn test_column_references_expand_against_schema() {
    let theories = nova_theories();
    let formula = parse1("p(x) :- nova:servers(status=x)", &theories, true).unwrap();
    let rule = formula.as_rule().unwrap();
    let body = &rule.body[0];
    assert_eq!(body.arguments.len(), 3);
    assert_eq!(body.arguments[2], Term::variable("x"));
    assert_eq!(body.arguments[0], Term::variable("_x_1_0"));

    let formula = parse1("p(x) :- nova:servers(1, 2=x)", &theories, true).unwrap();
    let body = &formula.as_rule().unwrap().body[0];
    assert_eq!(body.arguments[0], Term::object(Value::Int(1)));
    assert_eq!(body.arguments[1], Term::variable("_x_1_1"));
}

#[test]
fn test_compile_errors_collected_across_formulas() {
    let theories = nova_theories();
    let err = parse(
        "p(x) :- nova:servers(bogus=x)  q(x) :- nova:servers(9=x)",
        &theories,
        true,
    )
    .unwrap_err();
    match err {
        DatapolError::Compile { errors } => assert_eq!(errors.len(), 2),
        other => panic!("Expected compile errors, got {other}"),
    }
}

#[test]
fn test_modules_disabled_keeps_prefix_in_table() {
    let formula = parse1("nova:servers(1)", &Theories::new(), false).unwrap();
    let lit = formula.as_literal().unwrap();
    assert!(lit.table.service.is_none());
    assert_eq!(lit.table.table, "nova:servers");
}

#[test]
fn test_compiler_across_sources() {
    let mut compiler = Compiler::new();
    compiler
        .read_source("p(1)", "a.dl", &Theories::new(), true)
        .unwrap();
    compiler
        .read_source("q(x) :- p(x)", "b.dl", &Theories::new(), true)
        .unwrap();
    assert_eq!(compiler.theory.len(), 2);
    assert_eq!(compiler.to_string(), "**Theory**\np(1)\nq(x) :- p(x)");

    let err = compiler
        .read_source("q(x :- p(x)", "c.dl", &Theories::new(), true)
        .unwrap_err();
    assert!(err.to_string().starts_with("datapol:c.dl:1:"));
}

fn table_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,5}".prop_filter("keyword", |name| name != "not")
}

fn quoted(content: &str) -> String {
    let escaped = content
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t");
    format!("\"{escaped}\"")
}

fn term() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9]{0,3}".prop_filter("keyword", |name| name != "not"),
        any::<i64>().prop_map(|i| i.to_string()),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(|f| format!("{f:?}")),
        "[a-zA-Z \"\\\\\n\t]{0,6}".prop_map(|s| quoted(&s)),
    ]
}

fn atom() -> impl Strategy<Value = String> {
    (
        proptest::option::of(table_name()),
        table_name(),
        prop_oneof![Just(""), Just("+"), Just("-")],
        proptest::collection::vec(term(), 1..4),
    )
        .prop_map(|(service, table, sign, args)| {
            let table = service.map_or(table.clone(), |service| format!("{service}:{table}"));
            format!("{table}{sign}({})", args.join(", "))
        })
}

fn head() -> impl Strategy<Value = String> {
    (proptest::option::of(table_name()), atom()).prop_map(|(modal, atom)| match modal {
        Some(modal) => format!("{modal}[{atom}]"),
        None => atom,
    })
}

fn body_literal() -> impl Strategy<Value = String> {
    (prop_oneof![Just(""), Just("not "), Just("NOT "), Just("!")], atom())
        .prop_map(|(negation, atom)| format!("{negation}{atom}"))
}

fn formula() -> impl Strategy<Value = String> {
    prop_oneof![
        atom(),
        (
            proptest::collection::vec(head(), 1..3),
            proptest::collection::vec(body_literal(), 1..4),
        )
            .prop_map(|(heads, body)| format!("{} :- {}", heads.join(", "), body.join(", "))),
    ]
}

#[test]
fn test_escaped_strings_and_floats_round_trip() {
    let policy = format!("p({}, 2.5, 1e300, -0.0)", quoted("say \"hi\"\\\n\tnow"));
    let formulas = parse(&policy, &Theories::new(), true).unwrap();
    let lit = formulas[0].as_literal().unwrap();
    assert_eq!(lit.arguments[0], Term::object("say \"hi\"\\\n\tnow"));
    assert_eq!(parse(&formulas_to_string(&formulas), &Theories::new(), true).unwrap(), formulas);
}

proptest! {
    #[test]
    fn prop_display_round_trips(policy in proptest::collection::vec(formula(), 1..5)) {
        let source = policy.join(";\n");
        let formulas = parse(&source, &Theories::new(), true).unwrap();
        prop_assert_eq!(formulas.len(), policy.len());

        let displayed = formulas
            .iter()
            .map(Formula::to_string)
            .collect::<Vec<_>>()
            .join(";\n");
        let reparsed = parse(&displayed, &Theories::new(), true).unwrap();
        prop_assert_eq!(&reparsed, &formulas);

        // the space-separated form parses back as well
        let joined = parse(&formulas_to_string(&formulas), &Theories::new(), true).unwrap();
        prop_assert_eq!(joined, formulas);
    }
}
