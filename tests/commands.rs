//! End-to-end scenarios through the command language.

use schemadb::{Database, DbError, ErrorKind, Value};

fn run(db: &mut Database, lines: &[&str]) {
    for line in lines {
        db.execute(line)
            .unwrap_or_else(|e| panic!("{line}: {e}"));
    }
}

fn count(db: &Database, line: &str) -> usize {
    db.query(line).unwrap().rows.len()
}

// ─── Test 1 : AND binds tighter than OR ───
#[test]
fn test_filter_precedence() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create T { a: { type: "bool" }, b: { type: "bool" }, c: { type: "bool" } }"#,
            r#"insert T { "a": true, "b": false, "c": false }"#,
            r#"insert T { "a": false, "b": true, "c": true }"#,
            r#"insert T { "a": false, "b": true, "c": false }"#,
        ],
    );

    let result = db.query("search T (a=true OR b=true AND c=true)").unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0][0], Value::Bool(true));
    assert_eq!(result.rows[1][2], Value::Bool(true));

    assert_eq!(count(&db, "search T ((a=true OR b=true) AND c=true)"), 1);
}

// ─── Test 2 : include on string lists ───
#[test]
fn test_include_semantics() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create Dev { name: {}, skills: { type: "list_string" } }"#,
            r#"insert Dev { "name": "a", "skills": ["Java", "Rust"] }"#,
            r#"insert Dev { "name": "b", "skills": ["Go"] }"#,
            r#"insert Dev { "name": "c" }"#,
        ],
    );

    assert_eq!(count(&db, r#"search Dev (skills include "Rust")"#), 1);
    assert_eq!(count(&db, r#"search Dev (skills INCLUDE "rust")"#), 0);
    assert_eq!(count(&db, r#"search Dev (skills include "Go" or skills include "Java")"#), 2);

    let err = db.execute(r#"search Dev (name include "a")"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Filter);
}

// ─── Test 3 : type and field names ignore case ───
#[test]
fn test_case_insensitive_identity() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create User { "id": { "type": "int", "required": true, "unique": true } }"#,
            r#"insert User {"ID": 1}"#,
        ],
    );

    assert_eq!(count(&db, "search user (id = 1)"), 1);
    assert_eq!(count(&db, "SEARCH USER (Id = 1)"), 1);
    assert_eq!(
        db.execute(r#"create USER { x: {} }"#).unwrap_err(),
        DbError::TypeAlreadyExists("USER".into())
    );
    assert_eq!(
        db.execute(r#"insert user {"id": 1}"#).unwrap_err(),
        DbError::UniqueViolation("id".into())
    );
}

// ─── Test 4 : timestamps compare chronologically ───
#[test]
fn test_time_filter() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create T { id: { type: "int", required: true, unique: true }, at: { type: "time", required: true } }"#,
            r#"insert T { "id": 1, "at": "2025-01-01T10:00:00" }"#,
            r#"insert T { "id": 2, "at": "2025-01-01T12:00:00" }"#,
        ],
    );

    let result = db.query(r#"search T (at > "2025-01-01T11:00:00")"#).unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], Value::Int(2));

    assert_eq!(count(&db, "search T (at <= 2025-01-01T10:00:00)"), 1);

    let err = db
        .execute(r#"insert T { "id": 3, "at": "01/01/2025" }"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

// ─── Test 5 : deleting twice is a no-op ───
#[test]
fn test_idempotent_delete() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create T { id: { type: "int", required: true, unique: true } }"#,
            r#"insert T { "id": 1 }"#,
            r#"insert T { "id": 2 }"#,
        ],
    );

    assert_eq!(db.execute("delete T (id = 1)").unwrap(), "1 instances deleted.");
    assert_eq!(db.execute("search T (id = 1)").unwrap(), "No results found.");
    assert_eq!(db.execute("delete T (id = 1)").unwrap(), "0 instances deleted.");
    assert_eq!(count(&db, "search T"), 1);
}

// ─── Test 6 : omitted optional fields read back as defaults ───
#[test]
fn test_round_trip_defaults() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create D { key: { required: true }, s: {}, i: { type: "int" }, f: { type: "dbl" }, b: { type: "boolean" }, t: { type: "time" }, l: { type: "arr_string" } }"#,
            r#"insert D { "key": "k" }"#,
        ],
    );

    let result = db.query("search D").unwrap();
    let row = &result.rows[0];
    assert_eq!(row[1], Value::Text("".into()));
    assert_eq!(row[2], Value::Int(0));
    assert_eq!(row[3], Value::Float(0.0));
    assert_eq!(row[4], Value::Bool(false));
    assert_eq!(row[5].to_string(), "1970-01-01T00:00:00");
    assert_eq!(row[6], Value::TextList(Vec::new()));
}

// ─── Test 7 : rejected commands change nothing ───
#[test]
fn test_required_and_unique_enforcement() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create P { id: { type: "int", required: true, unique: true }, email: { unique: true } }"#,
            r#"insert P { "id": 1, "email": "a@x" }"#,
            r#"insert P { "id": 2, "email": "b@x" }"#,
        ],
    );

    let err = db.execute(r#"insert P { "email": "c@x" }"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);

    let err = db
        .execute(r#"update P (id = 2) { "email": "a@x" }"#)
        .unwrap_err();
    assert_eq!(err, DbError::UniqueViolation("email".into()));
    assert_eq!(count(&db, r#"search P (email = "b@x")"#), 1);

    // the freed value becomes available once its holder changes
    run(
        &mut db,
        &[
            r#"update P (id = 1) { "email": "z@x" }"#,
            r#"update P (id = 2) { "email": "a@x" }"#,
        ],
    );
    assert_eq!(count(&db, r#"search P (email = "a@x" AND id = 2)"#), 1);
    assert!(db.get_table("p").unwrap().indexes_consistent());
}

// ─── Test 8 : syntax errors are reported as such ───
#[test]
fn test_syntax_errors() {
    let mut db = Database::new();
    run(&mut db, &[r#"create T { id: { type: "int" } }"#]);

    for line in [
        "",
        "drop T",
        "insert T",
        r#"insert T { "id": 1"#,
        "search T (id = 1",
        "search T (id == 1)",
        "search T (id = \"1)",
        "delete T (id = 1) trailing",
    ] {
        let err = db.execute(line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax, "line: {line:?} gave {err}");
    }
    assert_eq!(count(&db, "search T"), 0);
}

// ─── Test 9 : filter literals decode the same escapes as payloads ───
#[test]
fn test_filter_escapes_match_stored_values() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create T { name: {} }"#,
            r#"insert T { "name": "x\by" }"#,
            r#"insert T { "name": "Z" }"#,
            r#"insert T { "name": "tab\there" }"#,
            r#"insert T { "name": "a/b\f" }"#,
        ],
    );

    assert_eq!(count(&db, r#"search T (name = "x\by")"#), 1);
    assert_eq!(count(&db, r#"search T (name = "Z")"#), 1);
    assert_eq!(count(&db, r#"search T (name = "tab\there")"#), 1);
    assert_eq!(count(&db, r#"search T (name = "a\/b\f")"#), 1);
}

// ─── Test 10 : -0.0 and 0.0 are one value for filters and unique checks ───
#[test]
fn test_negative_zero_is_zero() {
    let mut db = Database::new();
    run(
        &mut db,
        &[
            r#"create F { s: { type: "double", unique: true } }"#,
            r#"insert F { "s": -0.0 }"#,
        ],
    );

    assert_eq!(
        db.execute(r#"insert F { "s": 0.0 }"#).unwrap_err(),
        DbError::UniqueViolation("s".into())
    );
    assert_eq!(count(&db, "search F (s = 0.0)"), 1);
    assert_eq!(count(&db, "search F (s >= 0)"), 1);
    assert_eq!(count(&db, "search F (s != 0.0)"), 0);
}

// ─── Test 11 : undeclared filter fields fail even on an empty type ───
#[test]
fn test_unknown_filter_field_without_records() {
    let mut db = Database::new();
    run(&mut db, &[r#"create E { id: { type: "int" } }"#]);

    let err = db.execute("search E (ghost = 1)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Filter);
    assert_eq!(err.to_string(), "Invalid filter: unknown field in filter: ghost");
}
