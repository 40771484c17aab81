//! Cross-adapter equivalence
//!
//! Every filter below is compiled by both adapters and evaluated over the
//! same tasks/projects dataset: document predicates with the reference
//! matcher, relational predicates with the three-valued evaluator and by
//! executing the rendered SQL in DuckDB. All three must agree with the
//! expected ids.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use duckdb::Connection;
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde_json::{Map, Value as JsonValue, json};

use super::relational::{RenderedSql, SqlValue, WhereClause};
use super::test_support::{Cell, SqlRow, eval_where, matches_document};
use super::{DocumentAdapter, RelationalAdapter};
use crate::dates::FixedClock;
use crate::filter::{CompileOptions, Filter, FilterCompiler};
use crate::schema::{Attribute, InMemorySchemaStore, ReferenceKind, Schema, SchemaStore};
use crate::sql::Backend;
use crate::utils::time::to_iso_millis;

// === Dataset ===

struct Project {
    id: &'static str,
    name: Option<&'static str>,
    status: &'static str,
}

struct Task {
    id: &'static str,
    title: Option<&'static str>,
    priority: Option<&'static str>,
    budget: Option<f64>,
    done: Option<bool>,
    due: Option<&'static str>,
    created_at: Option<&'static str>,
    tags: Option<&'static [&'static str]>,
    parent: Option<&'static str>,
}

const PROJECTS: &[Project] = &[
    Project {
        id: "p1",
        name: Some("Operations"),
        status: "active",
    },
    Project {
        id: "p2",
        name: Some("Research"),
        status: "archived",
    },
    Project {
        id: "p3",
        name: None,
        status: "active",
    },
];

const TASKS: &[Task] = &[
    Task {
        id: "t1",
        title: Some("Write report"),
        priority: Some("high"),
        budget: Some(150.5),
        done: Some(true),
        due: Some("2025-01-15"),
        created_at: Some("2025-01-15T08:30:00Z"),
        tags: Some(&["urgent", "writing"]),
        parent: Some("p1"),
    },
    Task {
        id: "t2",
        title: Some("Review 100% coverage"),
        priority: Some("low"),
        budget: Some(99.0),
        done: Some(false),
        due: Some("2025-01-16"),
        created_at: Some("2025-01-14T23:59:59.999Z"),
        tags: Some(&["review"]),
        parent: Some("p2"),
    },
    Task {
        id: "t3",
        title: Some("report_final"),
        priority: Some("high"),
        budget: None,
        done: None,
        due: Some("2025-01-31"),
        created_at: Some("2024-12-31T15:00:00Z"),
        tags: None,
        parent: Some("p1"),
    },
    Task {
        id: "t4",
        title: None,
        priority: None,
        budget: Some(0.0),
        done: Some(false),
        due: None,
        created_at: None,
        tags: Some(&[]),
        parent: None,
    },
    Task {
        id: "t5",
        title: Some("Plan Q2"),
        priority: Some("low"),
        budget: Some(1200.0),
        done: Some(true),
        due: Some("2024-04-01"),
        created_at: Some("2025-03-31T23:59:59.999Z"),
        tags: Some(&["planning", "urgent"]),
        parent: Some("p2"),
    },
    Task {
        id: "t6",
        title: Some("ship release"),
        priority: None,
        budget: Some(45.0),
        done: None,
        due: Some("2025-01-20"),
        created_at: Some("2025-01-16T00:00:00Z"),
        tags: Some(&["release"]),
        parent: Some("p3"),
    },
];

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn project(id: &str) -> &'static Project {
    PROJECTS.iter().find(|p| p.id == id).unwrap()
}

fn schemas() -> Arc<InMemorySchemaStore> {
    let tasks = Schema::new("tasks", "id", "title")
        .with_attribute("id", Attribute::Id {
            reference: ReferenceKind::String,
        })
        .with_attribute("title", Attribute::String)
        .with_attribute("priority", Attribute::choice(["high", "low"]))
        .with_attribute("budget", Attribute::Money)
        .with_attribute("done", Attribute::Boolean)
        .with_attribute("due", Attribute::date())
        .with_attribute("created_at", Attribute::datetime())
        .with_attribute(
            "tags",
            Attribute::choices(["urgent", "writing", "review", "planning", "release"]),
        )
        .with_attribute("parent", Attribute::lookup("projects", ReferenceKind::String));
    let projects = Schema::new("projects", "id", "name")
        .with_attribute("id", Attribute::Id {
            reference: ReferenceKind::String,
        })
        .with_attribute("name", Attribute::String)
        .with_attribute("status", Attribute::choice(["active", "archived"]));
    Arc::new(InMemorySchemaStore::from_schemas([tasks, projects]).unwrap())
}

// === Document representation ===

fn project_document(project: &Project) -> JsonValue {
    let mut doc = Map::new();
    doc.insert("id".into(), json!(project.id));
    if let Some(name) = project.name {
        doc.insert("name".into(), json!(name));
    }
    doc.insert("status".into(), json!(project.status));
    JsonValue::Object(doc)
}

/// Missing fields are absent, except `done` which is stored as null
fn task_document(task: &Task) -> JsonValue {
    let mut doc = Map::new();
    doc.insert("id".into(), json!(task.id));
    if let Some(title) = task.title {
        doc.insert("title".into(), json!(title));
    }
    if let Some(priority) = task.priority {
        doc.insert("priority".into(), json!(priority));
    }
    if let Some(budget) = task.budget {
        doc.insert("budget".into(), json!(budget));
    }
    doc.insert("done".into(), json!(task.done));
    if let Some(due) = task.due {
        let midnight = day(due).and_hms_opt(0, 0, 0).unwrap().and_utc();
        doc.insert("due".into(), json!({ "$date": to_iso_millis(midnight) }));
    }
    if let Some(created_at) = task.created_at {
        doc.insert(
            "created_at".into(),
            json!({ "$date": to_iso_millis(instant(created_at)) }),
        );
    }
    if let Some(tags) = task.tags {
        doc.insert("tags".into(), json!(tags));
    }
    if let Some(parent) = task.parent {
        doc.insert("parent".into(), json!(parent));
        doc.insert(
            "@expand".into(),
            json!({ "parent": project_document(project(parent)) }),
        );
    }
    JsonValue::Object(doc)
}

// === Relational representation ===

fn text_cell(value: Option<&str>) -> Cell {
    value.map_or(Cell::Null, |v| Cell::Value(SqlValue::Text(v.to_string())))
}

fn task_row(task: &Task) -> SqlRow {
    let mut row = SqlRow::default();
    row.set("tasks", "id", text_cell(Some(task.id)));
    row.set("tasks", "title", text_cell(task.title));
    row.set("tasks", "priority", text_cell(task.priority));
    row.set(
        "tasks",
        "budget",
        task.budget.map_or(Cell::Null, |b| Cell::Value(SqlValue::Float(b))),
    );
    row.set(
        "tasks",
        "done",
        task.done.map_or(Cell::Null, |b| Cell::Value(SqlValue::Bool(b))),
    );
    row.set(
        "tasks",
        "due",
        task.due
            .map_or(Cell::Null, |d| Cell::Value(SqlValue::Date(day(d)))),
    );
    row.set(
        "tasks",
        "created_at",
        task.created_at
            .map_or(Cell::Null, |t| Cell::Value(SqlValue::Timestamp(instant(t)))),
    );
    row.set(
        "tasks",
        "tags",
        task.tags.map_or(Cell::Null, |tags| {
            Cell::Array(tags.iter().map(|t| SqlValue::Text(t.to_string())).collect())
        }),
    );
    row.set("tasks", "parent", text_cell(task.parent));
    if let Some(parent) = task.parent {
        let project = project(parent);
        row.set("parent_projects", "id", text_cell(Some(project.id)));
        row.set("parent_projects", "name", text_cell(project.name));
        row.set("parent_projects", "status", text_cell(Some(project.status)));
    }
    row
}

// === DuckDB oracle ===

fn sql_text(value: Option<&str>) -> String {
    value.map_or("NULL".to_string(), |v| format!("'{}'", v.replace('\'', "''")))
}

fn duckdb_fixture() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE projects (id VARCHAR, name VARCHAR, status VARCHAR);
         CREATE TABLE tasks (
             id VARCHAR, title VARCHAR, priority VARCHAR, budget DOUBLE, done BOOLEAN,
             due DATE, created_at TIMESTAMP, tags VARCHAR[], parent VARCHAR
         );",
    )
    .unwrap();

    for project in PROJECTS {
        conn.execute_batch(&format!(
            "INSERT INTO projects VALUES ({}, {}, {});",
            sql_text(Some(project.id)),
            sql_text(project.name),
            sql_text(Some(project.status)),
        ))
        .unwrap();
    }

    for task in TASKS {
        let tags = match task.tags {
            None => "NULL".to_string(),
            Some([]) => "[]::VARCHAR[]".to_string(),
            Some(tags) => format!(
                "[{}]",
                tags.iter()
                    .map(|t| sql_text(Some(*t)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        conn.execute_batch(&format!(
            "INSERT INTO tasks VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {});",
            sql_text(Some(task.id)),
            sql_text(task.title),
            sql_text(task.priority),
            task.budget.map_or("NULL".to_string(), |b| b.to_string()),
            task.done.map_or("NULL".to_string(), |b| b.to_string()),
            task.due.map_or("NULL".to_string(), |d| format!("DATE '{}'", d)),
            task.created_at.map_or("NULL".to_string(), |t| {
                format!("TIMESTAMP '{}'", instant(t).format("%Y-%m-%d %H:%M:%S%.3f"))
            }),
            tags,
            sql_text(task.parent),
        ))
        .unwrap();
    }
    conn
}

fn duck_value(value: &SqlValue) -> DuckValue {
    match value {
        SqlValue::Text(s) => DuckValue::Text(s.clone()),
        SqlValue::Integer(i) => DuckValue::BigInt(*i),
        SqlValue::Float(f) => DuckValue::Double(*f),
        SqlValue::Bool(b) => DuckValue::Boolean(*b),
        SqlValue::Timestamp(t) => DuckValue::Timestamp(TimeUnit::Microsecond, t.timestamp_micros()),
        SqlValue::Date(d) => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            DuckValue::Date32((*d - epoch).num_days() as i32)
        }
    }
}

fn duckdb_ids(conn: &Connection, predicate: Option<&WhereClause>) -> Vec<String> {
    let rendered = match predicate {
        Some(clause) => RenderedSql::render(clause, Backend::Duckdb.dialect()),
        None => RenderedSql {
            sql: "1=1".to_string(),
            params: Vec::new(),
        },
    };
    let sql = format!(
        r#"SELECT "tasks"."id" FROM tasks
           LEFT JOIN projects AS "parent_projects" ON "parent_projects"."id" = "tasks"."parent"
           WHERE {}
           ORDER BY 1"#,
        rendered.sql
    );
    let mut stmt = conn
        .prepare(&sql)
        .unwrap_or_else(|e| panic!("{}: {}", sql, e));
    let params: Vec<DuckValue> = rendered.params.iter().map(duck_value).collect();
    stmt.query_map(duckdb::params_from_iter(params), |row| row.get::<_, String>(0))
        .unwrap_or_else(|e| panic!("{}: {}", sql, e))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

// === Harness ===

fn now() -> DateTime<Utc> {
    instant("2025-01-15T20:00:00Z")
}

fn document_compiler(store: Arc<InMemorySchemaStore>) -> FilterCompiler<DocumentAdapter> {
    FilterCompiler::new(DocumentAdapter::new(), store).with_clock(Arc::new(FixedClock(now())))
}

fn relational_compiler(
    store: Arc<InMemorySchemaStore>,
    backend: Backend,
) -> FilterCompiler<RelationalAdapter> {
    FilterCompiler::new(RelationalAdapter::for_backend(backend), store)
        .with_clock(Arc::new(FixedClock(now())))
}

fn check(conn: &Connection, timezone: &str, filter: JsonValue, expected: &[&str]) {
    let store = schemas();
    let schema = store.get_schema("tasks").unwrap();
    let filter: Filter = serde_json::from_value(filter.clone())
        .unwrap_or_else(|e| panic!("{}: {}", filter, e));
    let options = CompileOptions::new(timezone);

    let document = document_compiler(store.clone())
        .compile_filter(&filter, &schema, &options)
        .unwrap();
    let mut document_ids: Vec<&str> = TASKS
        .iter()
        .filter(|task| match &document {
            Some(predicate) => matches_document(&task_document(task), predicate),
            None => true,
        })
        .map(|task| task.id)
        .collect();
    document_ids.sort();

    let relational = relational_compiler(store.clone(), Backend::Postgres)
        .compile_filter(&filter, &schema, &options)
        .unwrap();
    let relational_ids: Vec<&str> = TASKS
        .iter()
        .filter(|task| match &relational {
            Some(clause) => eval_where(&task_row(task), clause) == Some(true),
            None => true,
        })
        .map(|task| task.id)
        .collect();

    let duckdb = relational_compiler(store, Backend::Duckdb)
        .compile_filter(&filter, &schema, &options)
        .unwrap();
    let duckdb_ids = duckdb_ids(conn, duckdb.as_ref());

    let context = format!("{} ({})", serde_json::to_string(&filter).unwrap(), timezone);
    assert_eq!(document_ids, expected, "document: {} => {:?}", context, document);
    assert_eq!(relational_ids, expected, "relational: {} => {:?}", context, relational);
    assert_eq!(duckdb_ids, expected, "duckdb: {}", context);
}

fn condition(field: &str, operator: &str, value: JsonValue) -> JsonValue {
    json!({ "conditions": [{ "field": field, "operator": operator, "value": value }] })
}

const ALL: &[&str] = &["t1", "t2", "t3", "t4", "t5", "t6"];

// === Equivalence ===

#[test]
fn test_string_operators() {
    let conn = duckdb_fixture();
    let cases: &[(&str, JsonValue, &[&str])] = &[
        ("like", json!("report"), &["t1", "t3"]),
        ("like", json!("0%"), &["t2"]),
        ("like", json!("t_f"), &["t3"]),
        ("eq", json!("WRITE REPORT"), &["t1"]),
        ("ne", json!("write report"), &["t2", "t3", "t4", "t5", "t6"]),
        ("not-like", json!("report"), &["t2", "t5", "t6"]),
        ("begins-with", json!("re"), &["t2", "t3"]),
        ("ends-with", json!("RELEASE"), &["t6"]),
        ("not-begin-with", json!("re"), &["t1", "t5", "t6"]),
        ("not-end-with", json!("report"), &["t2", "t3", "t5", "t6"]),
        ("null", JsonValue::Null, &["t4"]),
        ("not-null", JsonValue::Null, &["t1", "t2", "t3", "t5", "t6"]),
        ("between", json!(["a", "z"]), ALL),
    ];
    for (operator, value, expected) in cases {
        check(&conn, "UTC", condition("title", operator, value.clone()), expected);
    }
}

#[test]
fn test_choice_and_numeric_operators() {
    let conn = duckdb_fixture();
    let cases: &[(&str, &str, JsonValue, &[&str])] = &[
        ("priority", "eq", json!("high"), &["t1", "t3"]),
        ("priority", "ne", json!("high"), &["t2", "t4", "t5", "t6"]),
        ("priority", "in", json!(["low"]), &["t2", "t5"]),
        ("priority", "not-in", json!(["low"]), &["t1", "t3", "t4", "t6"]),
        ("priority", "eq", JsonValue::Null, &["t4", "t6"]),
        ("priority", "ne", JsonValue::Null, &["t1", "t2", "t3", "t5"]),
        ("budget", "gt", json!(99), &["t1", "t5"]),
        ("budget", "lte", json!("99"), &["t2", "t4", "t6"]),
        ("budget", "between", json!([45, 150.5]), &["t1", "t2", "t6"]),
        ("budget", "null", JsonValue::Null, &["t3"]),
        ("budget", "ne", json!(0), &["t1", "t2", "t3", "t5", "t6"]),
        ("budget", "in", json!([0, 45]), &["t4", "t6"]),
    ];
    for (field, operator, value, expected) in cases {
        check(&conn, "UTC", condition(field, operator, value.clone()), expected);
    }
}

#[test]
fn test_boolean_tri_state() {
    let conn = duckdb_fixture();
    let cases: &[(&str, JsonValue, &[&str])] = &[
        ("in", json!([false]), &["t2", "t3", "t4", "t6"]),
        ("in", json!([true]), &["t1", "t5"]),
        ("not-in", json!([false]), &["t1", "t5"]),
        ("not-in", json!([true]), &["t2", "t3", "t4", "t6"]),
        ("in", json!([true, false]), ALL),
        ("in", json!(["false"]), &["t2", "t3", "t4", "t6"]),
        ("eq", json!(true), &["t1", "t5"]),
        ("eq", json!(false), &["t2", "t4"]),
    ];
    for (operator, value, expected) in cases {
        check(&conn, "UTC", condition("done", operator, value.clone()), expected);
    }
}

#[test]
fn test_date_only_operators() {
    let conn = duckdb_fixture();
    let cases: &[(&str, JsonValue, &[&str])] = &[
        ("on", json!("2025-01-16"), &["t2"]),
        ("today", JsonValue::Null, &["t1"]),
        ("tomorrow", JsonValue::Null, &["t2"]),
        ("next-seven-days", JsonValue::Null, &["t1", "t2", "t6"]),
        ("this-month", JsonValue::Null, &["t1", "t2", "t3", "t6"]),
        ("on-or-before", json!("2025-01-16"), &["t1", "t2", "t5"]),
        ("on-or-after", json!("2025-01-20"), &["t3", "t6"]),
        ("this-fiscal-year", JsonValue::Null, &["t1", "t2", "t3", "t5", "t6"]),
        ("last-fiscal-year", JsonValue::Null, &[]),
        ("in-fiscal-year", json!(2024), &["t1", "t2", "t3", "t5", "t6"]),
        ("between", json!(["2025-01-15", "2025-01-20"]), &["t1", "t2", "t6"]),
        ("next-x-days", json!(2), &["t2"]),
        ("gte", json!("2025-01-20"), &["t3", "t6"]),
        ("null", JsonValue::Null, &["t4"]),
    ];
    for (operator, value, expected) in cases {
        check(&conn, "UTC", condition("due", operator, value.clone()), expected);
    }
}

#[test]
fn test_datetime_operators() {
    let conn = duckdb_fixture();
    let cases: &[(&str, JsonValue, &[&str])] = &[
        ("yesterday", JsonValue::Null, &["t2"]),
        ("today", JsonValue::Null, &["t1"]),
        ("on", json!("2025-01-15"), &["t1"]),
        ("on-or-before", json!("2025-01-14"), &["t2", "t3"]),
        ("on-or-after", json!("2025-01-16"), &["t5", "t6"]),
        ("last-x-hours", json!(12), &["t1"]),
        ("last-seven-days", JsonValue::Null, &["t1", "t2"]),
        ("olderthan-x-days", json!(10), &["t3"]),
        ("between", json!(["2025-01-14", "2025-01-15"]), &["t1", "t2"]),
        (
            "between",
            json!(["2025-01-14T00:00:00Z", "2025-01-16T00:00:00Z"]),
            &["t1", "t2", "t6"],
        ),
        ("this-fiscal-year", JsonValue::Null, &["t1", "t2", "t3", "t5", "t6"]),
        ("next-fiscal-year", JsonValue::Null, &[]),
        ("lt", json!("2025-01-15T08:30:00Z"), &["t2", "t3"]),
    ];
    for (operator, value, expected) in cases {
        check(&conn, "UTC", condition("created_at", operator, value.clone()), expected);
    }
}

#[test]
fn test_timezone_shifts_datetime_but_not_date_only() {
    let conn = duckdb_fixture();
    // 2025-01-15T20:00Z is already 2025-01-16 in Tokyo
    check(&conn, "Asia/Tokyo", condition("created_at", "today", JsonValue::Null), &["t6"]);
    check(
        &conn,
        "Asia/Tokyo",
        condition("created_at", "yesterday", JsonValue::Null),
        &["t1", "t2"],
    );
    check(&conn, "Asia/Tokyo", condition("due", "today", JsonValue::Null), &["t1"]);
    // Panama is UTC-5; the local day 2025-01-14 ends at 2025-01-15T05:00Z
    check(
        &conn,
        "America/Panama",
        condition("created_at", "on", json!("2025-01-14")),
        &["t2"],
    );
    check(
        &conn,
        "America/Panama",
        condition("created_at", "on", json!("2025-01-15")),
        &["t1", "t6"],
    );
}

#[test]
fn test_multi_valued_choices() {
    let conn = duckdb_fixture();
    let cases: &[(&str, JsonValue, &[&str])] = &[
        ("eq", json!("urgent"), &["t1", "t5"]),
        ("ne", json!("urgent"), &["t2", "t3", "t4", "t6"]),
        ("in", json!(["review", "release"]), &["t2", "t6"]),
        ("not-in", json!(["urgent"]), &["t2", "t3", "t4", "t6"]),
        ("null", JsonValue::Null, &["t3"]),
    ];
    for (operator, value, expected) in cases {
        check(&conn, "UTC", condition("tags", operator, value.clone()), expected);
    }
}

#[test]
fn test_extended_key_dereference() {
    let conn = duckdb_fixture();
    let deref = |key: &str, operator: &str, value: JsonValue| {
        json!({
            "conditions": [
                { "field": "parent", "extendedKey": key, "operator": operator, "value": value }
            ]
        })
    };
    check(&conn, "UTC", deref("name", "begins-with", json!("op")), &["t1", "t3"]);
    check(&conn, "UTC", deref("status", "eq", json!("archived")), &["t2", "t5"]);
    check(&conn, "UTC", deref("name", "null", JsonValue::Null), &["t4", "t6"]);
    check(
        &conn,
        "UTC",
        deref("status", "ne", json!("archived")),
        &["t1", "t3", "t4", "t6"],
    );
}

#[test]
fn test_composition() {
    let conn = duckdb_fixture();

    let nested = json!({
        "type": "or",
        "conditions": [{ "field": "title", "operator": "begins-with", "value": "ship" }],
        "filters": [{
            "conditions": [
                { "field": "done", "operator": "in", "value": [true] },
                { "field": "budget", "operator": "gt", "value": 1000 }
            ]
        }]
    });
    check(&conn, "UTC", nested, &["t5", "t6"]);

    let dropped = json!({
        "conditions": [
            { "field": "title", "operator": "between", "value": ["a", "m"] },
            { "field": "title", "operator": "fuzzy", "value": "x" },
            { "field": "priority", "operator": "eq", "value": "low" }
        ]
    });
    check(&conn, "UTC", dropped, &["t2", "t5"]);

    let with_relation = json!({
        "type": "and",
        "filters": [
            {
                "type": "or",
                "conditions": [
                    {
                        "field": "parent",
                        "extendedKey": "name",
                        "operator": "eq",
                        "value": "operations"
                    },
                    { "field": "tags", "operator": "in", "value": ["planning"] }
                ]
            },
            { "conditions": [{ "field": "due", "operator": "this-fiscal-year" }] }
        ]
    });
    check(&conn, "UTC", with_relation, &["t1", "t3", "t5"]);

    check(&conn, "UTC", json!({}), ALL);
    check(&conn, "UTC", json!({ "type": "or", "filters": [{}, {}] }), ALL);
}
