//! Integration tests for compiled policies flowing into the analyses

use std::collections::BTreeSet;

use datapol_analysis::{
    BUILTINS, Checker, RuleDependencyGraph, Selection, find_subpolicy, formula_errors,
    is_recursive, reorder_for_safety, stratification,
};
use datapol_ast::{Event, Formula, Rule, Schema, Theories};
use datapol_parser::parse;

fn compile(policy: &str) -> Vec<Formula> {
    parse(policy, &Theories::new(), true).unwrap()
}

fn rules(policy: &str) -> Vec<Rule> {
    compile(policy)
        .iter()
        .filter_map(Formula::as_rule)
        .cloned()
        .collect()
}

fn names(tables: &[&str]) -> BTreeSet<String> {
    tables.iter().map(|t| (*t).to_string()).collect()
}

#[test]
fn test_safe_policy_has_no_errors() {
    let policy = compile(
        "servers(1, \"web\")\n\
         error(id) :- servers(id, name), not approved(id)\n\
         execute[nova:pause(id)] :- error(id)\n",
    );
    for formula in &policy {
        assert!(formula_errors(formula, None, None).is_empty(), "{formula}");
    }
}

#[test]
fn test_unsafe_policy_reports_each_problem() {
    let policy = compile(
        "p(x)\n\
         q(x) :- r(y)\n\
         s(x) :- t(x), not u(x, z)\n\
         alert[v(x)] :- t(x)\n",
    );
    let errors: Vec<String> = policy
        .iter()
        .flat_map(|formula| formula_errors(formula, None, None))
        .map(|err| err.to_string())
        .collect();
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(errors[0].starts_with("Fact not ground"));
    assert!(errors[3].contains("alert"));
}

#[test]
fn test_checker_uses_schema() {
    let mut nova = Schema::default();
    nova.insert("servers", vec!["id".into(), "name".into()]);
    nova.complete = true;
    let mut theories = Theories::new();
    theories.insert("nova".to_string(), nova);

    let policy = parse(
        "p(x) :- nova:servers(x, y)  q(x) :- nova:servers(x, y, z)  r(x) :- nova:ports(x)",
        &theories,
        true,
    )
    .unwrap();
    let checker = Checker::new(Some(&theories), None);
    let counts: Vec<usize> = policy
        .iter()
        .map(|formula| checker.formula_errors(formula).len())
        .collect();
    assert_eq!(counts, vec![0, 1, 1]);
}

#[test]
fn test_reorder_then_check_builtins() {
    let rule = &rules("p(z) :- lt(x, y), plus(x, y, z), q(x), r(y)")[0];
    let reordered = reorder_for_safety(rule).unwrap();
    assert_eq!(
        reordered.to_string(),
        "p(z) :- q(x), r(y), lt(x, y), plus(x, y, z)"
    );
    assert!(
        reordered
            .body
            .iter()
            .skip(2)
            .all(|lit| BUILTINS.is_builtin(&lit.table, lit.arguments.len()))
    );
}

#[test]
fn test_graph_tracks_policy_changes() {
    let policy = compile("p(x) :- q(x)  q(x) :- r(x)");
    let mut graph = RuleDependencyGraph::from_formulas(&policy, None, Selection::default(), true);
    assert!(!graph.has_cycle());

    let cycle = compile("r(x) :- p(x)");
    let changes = graph.formula_update(
        &[Event::new(cycle[0].clone(), true)],
        Selection::default(),
    );
    assert!(graph.has_cycle());

    graph.undo_changes(&changes);
    assert!(!graph.has_cycle());
    assert_eq!(graph.tables(), names(&["p", "q", "r"]));
}

#[test]
fn test_stratified_policy() {
    let policy = compile(
        "reachable(x, y) :- edge(x, y)\n\
         reachable(x, z) :- reachable(x, y), edge(y, z)\n\
         unreachable(x, y) :- node(x), node(y), not reachable(x, y)\n",
    );
    assert!(is_recursive(&policy));
    let strata = stratification(&policy).unwrap();
    assert!(strata["unreachable"] > strata["reachable"]);
}

#[test]
fn test_subpolicy_from_compiled_rules() {
    let policy = rules(
        "alarm(x) :- nova:servers(x), not ok(x)\n\
         alarm(x) :- audit(x)\n\
         audit(x) :- keystone:users(x)\n",
    );
    let subpolicy = find_subpolicy(
        &policy,
        &names(&["nova:servers"]),
        &names(&["keystone:users"]),
        &names(&["alarm"]),
    );
    assert_eq!(subpolicy.len(), 1);
    assert!(subpolicy.iter().all(|rule| rule.head().table.table == "alarm"));
}
