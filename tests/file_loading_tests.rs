use std::fs;

use sqlgrader::{
    db::{QueryExecutor, SqliteExecutor},
    grade::{DeductionCode, DeductionTable, GradescopeSubmission},
    spec::{Assignment, ProcedurePolicy, TestKind},
    style::{StyleDeductions, StyleViolation},
};

const ASSIGNMENT: &str = r#"{
  "name": "hw4",
  "problems": [
    {
      "number": "1",
      "points": 3,
      "keywords": ["GROUP BY"],
      "tests": [{ "type": "select", "points": 3, "query": "SELECT 1", "ordered": true }]
    },
    {
      "number": "2a",
      "points": 2,
      "setup-queries": ["1"],
      "tests": [
        { "type": "insert", "points": 1, "query": "INSERT INTO t VALUES (1)", "table": "t" },
        { "type": "create", "points": 1 }
      ]
    },
    {
      "number": "3",
      "points": 2,
      "tests": [
        {
          "type": "stored-procedure",
          "points": 1,
          "query": "CALL raise()",
          "table": "emp",
          "policy": "require-change"
        },
        { "type": "function", "points": 1, "query": "SELECT f()", "expected": "7" }
      ]
    }
  ]
}"#;

#[test]
fn assignment_file_loads_every_test_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("hw4.json");
    fs::write(&path, ASSIGNMENT).expect("write");

    let assignment = Assignment::load(&path).expect("load");
    assert_eq!(assignment.name, "hw4");
    assert_eq!(assignment.points(), 7.0);

    let kinds: Vec<&str> = assignment
        .problems
        .iter()
        .flat_map(|p| p.tests.iter().map(|t| t.kind.name()))
        .collect();
    assert_eq!(kinds, ["select", "insert", "create", "stored-procedure", "function"]);

    match &assignment.problems[2].tests[0].kind {
        TestKind::StoredProcedure(t) => assert_eq!(t.policy, ProcedurePolicy::RequireChange),
        other => panic!("unexpected kind {}", other.name()),
    }
    assert_eq!(
        assignment.problems[1].setup_queries.as_deref(),
        Some(&["1".to_string()][..])
    );
}

#[test]
fn assignment_with_unknown_dependency_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{ "problems": [{ "number": "1", "points": 1, "setup-queries": ["9"] }] }"#,
    )
    .expect("write");

    assert!(Assignment::load(&path).is_err());
}

#[test]
fn deduction_overrides_keep_other_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("deductions.json");
    fs::write(
        &path,
        r#"{ "ORDER_BY": { "points": 0.5, "description": "Sort your rows" } }"#,
    )
    .expect("write");

    let table = DeductionTable::load(&path).expect("load");
    let order_by = table.resolve(DeductionCode::OrderBy).expect("order by");
    assert_eq!(order_by.points, 0.5);
    assert_eq!(order_by.description, "Sort your rows");

    let default = DeductionTable::default();
    assert_eq!(
        table.resolve(DeductionCode::ColumnOrder).expect("column order"),
        default.resolve(DeductionCode::ColumnOrder).expect("column order")
    );
}

#[test]
fn style_overrides_replace_single_kinds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("style.json");
    fs::write(&path, r#"{ "used-tabs": 2.0 }"#).expect("write");

    let style = StyleDeductions::load(&path).expect("load");
    assert_eq!(style.points(StyleViolation::UsedTabs), 2.0);
    assert_eq!(
        style.points(StyleViolation::Spacing),
        StyleDeductions::default().points(StyleViolation::Spacing)
    );
}

#[test]
fn file_database_survives_reconnect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("grading.db");

    let mut db = SqliteExecutor::open(&path).expect("open");
    db.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
        .expect("seed");
    db.reconnect().expect("reconnect");

    let x = db.execute("SELECT x FROM t", None, None).expect("query");
    assert_eq!(x.scalar().map(ToString::to_string).as_deref(), Some("7"));
}

#[test]
fn memory_database_is_reset_on_reconnect() {
    let mut db = SqliteExecutor::memory()
        .expect("open")
        .with_init_script("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
        .expect("schema");
    db.execute_batch("INSERT INTO t VALUES (2);").expect("insert");
    db.reconnect().expect("reconnect");

    assert_eq!(db.snapshot("t").expect("snapshot").len(), 1);
}

#[test]
fn gradescope_report_is_written_as_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("results.json");

    let mut db = SqliteExecutor::memory().expect("open");
    let assignment = Assignment::from_json(
        r#"{ "name": "hw5", "problems": [{ "number": "1", "points": 2,
             "tests": [{ "type": "select", "points": 2, "query": "SELECT 1 + 1" }] }] }"#,
    )
    .expect("assignment");
    let graded = sqlgrader::grade_text(
        &assignment,
        &DeductionTable::default(),
        None,
        "c.sql",
        "-- [Problem 1]\nSELECT 2;\n",
        &mut db,
    )
    .expect("grade");

    GradescopeSubmission::from_graded(&graded, 0.999)
        .write(&path)
        .expect("write");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
    assert_eq!(json["score"], 2.0);
    assert_eq!(json["tests"][0]["name"], "Problem 1");
    assert_eq!(json["tests"][0]["status"], "passed");
}
