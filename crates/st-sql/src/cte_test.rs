use super::*;
use crate::ast::adapt_statement;
use crate::parser::SqlParser;

fn resolve(sql: &str) -> CteResolution {
    resolve_with(sql, &TableDefaults::default())
}

fn resolve_with(sql: &str, defaults: &TableDefaults) -> CteResolution {
    let stmt = SqlParser::bigquery().parse_single(sql).unwrap();
    CteResolution::resolve(&adapt_statement(&stmt), defaults)
}

fn bases(res: &CteResolution, name: &str) -> Vec<String> {
    res.bases(name)
        .unwrap()
        .iter()
        .map(|t| t.to_string())
        .collect()
}

#[test]
fn test_direct_bases() {
    let res = resolve("WITH a AS (SELECT * FROM t1 JOIN t2 ON t1.id = t2.id) SELECT * FROM a");
    assert_eq!(bases(&res, "a"), vec!["t1", "t2"]);
    assert!(res.cte_refs["a"].is_empty());
    assert!(res.cyclic.is_empty());
}

#[test]
fn test_cte_references_are_not_bases() {
    let res = resolve(
        "WITH a AS (SELECT * FROM t1), b AS (SELECT * FROM a JOIN t2 ON a.id = t2.id) \
         SELECT * FROM b",
    );
    assert_eq!(bases(&res, "a"), vec!["t1"]);
    assert_eq!(bases(&res, "b"), vec!["t1", "t2"]);
    assert!(res.cte_refs["b"].contains("a"));
}

#[test]
fn test_three_level_chain_closes() {
    let res = resolve(
        "WITH c AS (SELECT * FROM t1), b AS (SELECT * FROM c), a AS (SELECT * FROM b) \
         SELECT * FROM a",
    );
    assert_eq!(bases(&res, "a"), vec!["t1"]);
    assert_eq!(bases(&res, "b"), vec!["t1"]);
    assert_eq!(res.single_base("a").unwrap().as_str(), "t1");
}

#[test]
fn test_case_insensitive_cte_names() {
    let res = resolve("WITH Recent AS (SELECT * FROM t1) SELECT * FROM recent");
    assert!(res.is_cte("RECENT"));
    assert_eq!(res.cte_name("recent").unwrap().as_str(), "Recent");
    assert_eq!(res.summary().keys().next().unwrap(), "Recent");
}

#[test]
fn test_recursive_cte_is_flagged_and_terminates() {
    let res = resolve(
        "WITH RECURSIVE r AS (SELECT id FROM seeds UNION ALL SELECT id FROM r) SELECT * FROM r",
    );
    assert_eq!(bases(&res, "r"), vec!["seeds"]);
    assert!(res.is_cyclic("r"));
}

#[test]
fn test_multi_base_cte_has_no_single_base() {
    let res = resolve("WITH a AS (SELECT * FROM t1, t2) SELECT * FROM a");
    assert!(res.single_base("a").is_none());
    assert_eq!(res.bases("a").unwrap().len(), 2);
}

#[test]
fn test_defaults_qualify_bases() {
    let defaults = TableDefaults {
        project: Some("acme".to_string()),
        dataset: Some("sales".to_string()),
    };
    let res = resolve_with(
        "WITH a AS (SELECT * FROM orders JOIN crm.customers c ON orders.cid = c.id) SELECT * FROM a",
        &defaults,
    );
    assert_eq!(
        bases(&res, "a"),
        vec!["acme.crm.customers", "acme.sales.orders"]
    );
}

#[test]
fn test_no_ctes() {
    let res = resolve("SELECT * FROM t1");
    assert!(res.is_empty());
    assert!(!res.is_cte("t1"));
}
