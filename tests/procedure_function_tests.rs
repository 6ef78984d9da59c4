use sqlgrader::{
    db::{DbError, QueryExecutor, SqliteExecutor},
    grade::{GradeError, function, procedure},
    response::Response,
    spec::{FunctionTest, ProcedurePolicy, ProcedureTest},
};

const SCHEMA: &str = "
CREATE TABLE emp (id INTEGER PRIMARY KEY, name TEXT NOT NULL, dept TEXT, salary INTEGER);
CREATE TABLE audit (emp_id INTEGER);
INSERT INTO emp VALUES (1, 'Ann', 'eng', 100), (2, 'Bob', 'ops', 80), (3, 'Cid', 'eng', 120);
";

fn db() -> SqliteExecutor {
    SqliteExecutor::memory()
        .expect("open")
        .with_init_script(SCHEMA)
        .expect("schema")
}

fn function_test(query: &str, expected: &str) -> FunctionTest {
    FunctionTest {
        query: query.to_string(),
        expected: expected.to_string(),
        ..FunctionTest::default()
    }
}

fn procedure_test(query: &str, table: &str) -> ProcedureTest {
    ProcedureTest {
        query: query.to_string(),
        table: table.to_string(),
        ..ProcedureTest::default()
    }
}

#[test]
fn function_matching_scalar_passes() {
    let mut db = db();
    let outcome = function::grade(
        &function_test("SELECT 40 + 2", "42"),
        1.0,
        &Response::default(),
        &mut db,
    )
    .expect("grade");

    assert!(outcome.success);
    assert_eq!(outcome.lost, 0.0);
}

#[test]
fn function_different_scalar_fails() {
    let mut db = db();
    let outcome = function::grade(
        &function_test("SELECT 40 + 2", "43"),
        1.0,
        &Response::default(),
        &mut db,
    )
    .expect("grade");

    assert!(!outcome.success);
    assert_eq!(outcome.lost, 1.0);
    assert_eq!(outcome.expected.as_deref(), Some("43"));
    assert_eq!(outcome.actual.as_deref(), Some("42"));
}

#[test]
fn function_without_rows_fails_with_a_message() {
    let mut db = db();
    let outcome = function::grade(
        &function_test("SELECT salary FROM emp WHERE id = 99", "1"),
        2.0,
        &Response::default(),
        &mut db,
    )
    .expect("grade");

    assert_eq!(outcome.lost, 2.0);
    assert_eq!(outcome.errors.len(), 1);
}

#[test]
fn function_runs_the_submission_first_when_asked() {
    let mut db = db();
    let spec = FunctionTest {
        run_query: true,
        ..function_test("SELECT total FROM payroll", "300")
    };
    let outcome = function::grade(
        &spec,
        2.0,
        &Response::new("CREATE VIEW payroll AS SELECT SUM(salary) AS total FROM emp;"),
        &mut db,
    )
    .expect("grade");

    assert!(outcome.success);
}

#[test]
fn procedure_diff_shows_removed_and_added_rows() {
    let mut db = db();
    let outcome = procedure::grade(
        &procedure_test("UPDATE emp SET salary = salary + 10 WHERE dept = 'eng'", "emp"),
        3.0,
        &Response::default(),
        &mut db,
    )
    .expect("grade");

    assert!(outcome.success);
    assert_eq!(outcome.lost, 0.0);
    let removed = outcome.expected.expect("removed rows");
    let added = outcome.actual.expect("added rows");
    assert!(removed.contains("100") && removed.contains("120"));
    assert!(added.contains("110") && added.contains("130"));
    assert!(!removed.contains("Bob"));
}

#[test]
fn lenient_procedure_without_changes_still_passes() {
    let mut db = db();
    let outcome = procedure::grade(
        &procedure_test("UPDATE emp SET salary = 0 WHERE id = 99", "emp"),
        3.0,
        &Response::default(),
        &mut db,
    )
    .expect("grade");

    assert!(outcome.success);
    assert_eq!(outcome.expected.as_deref(), Some(""));
    assert_eq!(outcome.actual.as_deref(), Some(""));
}

#[test]
fn strict_procedure_without_changes_loses_its_points() {
    let mut db = db();
    let spec = ProcedureTest {
        policy: ProcedurePolicy::RequireChange,
        ..procedure_test("UPDATE emp SET salary = 0 WHERE id = 99", "emp")
    };
    let outcome = procedure::grade(&spec, 3.0, &Response::default(), &mut db).expect("grade");

    assert!(!outcome.success);
    assert_eq!(outcome.lost, 3.0);
    assert_eq!(outcome.errors.len(), 1);
}

#[test]
fn procedure_uses_submitted_definition() {
    let mut db = db();
    let spec = ProcedureTest {
        run_query: true,
        policy: ProcedurePolicy::RequireChange,
        ..procedure_test("UPDATE emp SET salary = 90 WHERE id = 2", "audit")
    };
    let response = Response::new(
        "CREATE TRIGGER log_raise AFTER UPDATE ON emp BEGIN INSERT INTO audit VALUES (NEW.id); END;",
    );
    let outcome = procedure::grade(&spec, 3.0, &response, &mut db).expect("grade");

    assert!(outcome.success);
    assert!(outcome.actual.expect("added rows").contains('2'));
}

#[test]
fn solution_call_runs_even_if_the_submission_fails() {
    let mut db = db();
    let spec = ProcedureTest {
        run_query: true,
        ..procedure_test("UPDATE emp SET salary = 1 WHERE id = 1", "emp")
    };
    let err = procedure::grade(&spec, 3.0, &Response::new("CREATE TRIGGR broken"), &mut db)
        .expect_err("syntax error");
    assert!(matches!(err, GradeError::Db(_)));

    let salary = db
        .execute("SELECT salary FROM emp WHERE id = 1", None, None)
        .expect("query");
    assert_eq!(salary.scalar().map(ToString::to_string).as_deref(), Some("1"));
}

#[test]
fn blank_submission_is_reported_as_a_query_error() {
    let mut db = db();
    let spec = FunctionTest {
        run_query: true,
        ..function_test("SELECT 1", "1")
    };
    let err = function::grade(&spec, 1.0, &Response::new(""), &mut db).expect_err("blank");
    assert!(matches!(err, GradeError::Db(DbError::Query(_))));

    for blank in ["   ", ";", "-- just a note"] {
        let err = db.execute(blank, None, None).expect_err("blank statement");
        assert!(!err.needs_reconnect(), "{blank:?} gave {err:?}");
    }
}
