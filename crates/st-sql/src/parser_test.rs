use super::*;

#[test]
fn test_parse_select() {
    let parser = SqlParser::bigquery();
    let stmts = parser
        .parse("SELECT id, name FROM users WHERE id = 1")
        .unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_parse_multiple_statements() {
    let parser = SqlParser::bigquery();
    let stmts = parser.parse("SELECT 1; SELECT 2;").unwrap();
    assert_eq!(stmts.len(), 2);
}

#[test]
fn test_parse_single_takes_first() {
    let parser = SqlParser::bigquery();
    let stmt = parser.parse_single("SELECT a FROM t1; SELECT b FROM t2").unwrap();
    assert!(stmt.to_string().contains("t1"));
}

#[test]
fn test_parse_empty() {
    let parser = SqlParser::default();
    assert!(matches!(parser.parse("   "), Err(LineageError::EmptySql)));
}

#[test]
fn test_parse_error() {
    let parser = SqlParser::bigquery();
    let result = parser.parse("SELECT (a FROM t");
    assert!(matches!(result, Err(LineageError::ParseError { .. })));
}

#[test]
fn test_from_dialect_name() {
    let parser = SqlParser::from_dialect_name("bigquery").unwrap();
    assert_eq!(parser.dialect_name(), "bigquery");

    let parser = SqlParser::from_dialect_name("DuckDB").unwrap();
    assert_eq!(parser.dialect_name(), "duckdb");

    let result = SqlParser::from_dialect_name("unknown");
    assert!(matches!(result, Err(LineageError::UnknownDialect(_))));
}
