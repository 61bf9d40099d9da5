//! Eager loading of associations against in-memory SQLite.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use relmap::association::eager::{load, preload_query};
use relmap::association::{resolve, AssociationIntent, ResolvedAssociation};
use relmap::catalog::CatalogReader;
use relmap::gateway::SqliteGateway;
use relmap::observer::{QueryEvent, QueryKind, QueryObserver};
use relmap::query::{QueryExecutor, SelectQuery, SortDir, Tuple};
use relmap::schema::{QualifiedName, SchemaInferrer};
use relmap::Dialect;

#[derive(Default)]
struct SelectCounter {
    selects: Mutex<Vec<String>>,
}

impl QueryObserver for SelectCounter {
    fn on_query(&self, event: &QueryEvent<'_>) {
        if event.kind == QueryKind::Select {
            self.selects.lock().unwrap().push(event.sql.to_string());
        }
    }
}

async fn setup(ddl: &str, intent: AssociationIntent) -> (SqliteGateway, ResolvedAssociation) {
    let gateway = SqliteGateway::open_in_memory().unwrap();
    gateway.execute_batch(ddl).unwrap();

    let tables = gateway.list_tables().await.unwrap();
    let schemas = SchemaInferrer::default()
        .infer_all(&gateway, &tables)
        .await
        .unwrap();
    let assoc = resolve(&schemas, &[intent]).unwrap().remove(0);
    (gateway, assoc)
}

async fn all(executor: &dyn QueryExecutor, relation: &str, attributes: &[&str]) -> Vec<Tuple> {
    let mut query = SelectQuery::new().from(relation, None);
    for attribute in attributes {
        query = query.column(QualifiedName::new(relation, *attribute));
    }
    let query = query.order_by(QualifiedName::new(relation, "id"), SortDir::Asc);
    executor.fetch(&query, &[]).await.unwrap()
}

const EANS: &str = r#"
    CREATE TABLE eans (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE ean_stats (id INTEGER PRIMARY KEY, ean_id INTEGER NOT NULL);
    CREATE TABLE contract_ean_stats (
        id INTEGER PRIMARY KEY,
        contract_id INTEGER NOT NULL,
        ean_stat_id INTEGER NOT NULL
    );
    CREATE TABLE contracts (id INTEGER PRIMARY KEY, title TEXT NOT NULL);

    INSERT INTO eans (id, name) VALUES (1, 'ean 1'), (2, 'ean 2');
    INSERT INTO ean_stats (id, ean_id) VALUES (1, 2);
    INSERT INTO contracts (id, title) VALUES (1, 'Contract 1');
    INSERT INTO contract_ean_stats (id, contract_id, ean_stat_id) VALUES (1, 1, 1);
"#;

const STAFF: &str = r#"
    CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE positions (
        id INTEGER PRIMARY KEY,
        manager_id INTEGER NOT NULL REFERENCES employees(id),
        participant_id INTEGER NOT NULL REFERENCES employees(id)
    );

    INSERT INTO employees (id, name) VALUES (1, 'Jane'), (2, 'Fred');
    INSERT INTO positions (id, manager_id, participant_id) VALUES (1, 1, 2);
"#;

const BLOG: &str = r#"
    CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY,
        user_id INTEGER REFERENCES users(id),
        title TEXT NOT NULL
    );

    INSERT INTO users (id, name) VALUES (1, 'ada'), (2, 'bob'), (3, 'cy');
    INSERT INTO posts (id, user_id, title) VALUES
        (10, 1, 'first'), (11, 1, 'second'), (12, 2, 'third'), (13, NULL, 'orphan');
"#;

#[tokio::test]
async fn test_eans_through_two_hops() {
    let intent =
        AssociationIntent::has_many_through("eans", "contracts", &["ean_stats", "contract_ean_stats"]);
    let (gateway, assoc) = setup(EANS, intent).await;

    let parents = all(&gateway, "eans", &["id", "name"]).await;
    let loaded = load(&gateway, &assoc, parents).await.unwrap();

    assert_eq!(
        Value::Array(loaded.into_iter().map(Value::Object).collect()),
        json!([
            {"id": 1, "name": "ean 1", "contracts": []},
            {"id": 2, "name": "ean 2", "contracts": [{"id": 1, "title": "Contract 1", "ean_id": 2}]},
        ])
    );
}

#[tokio::test]
async fn test_self_referential_subordinates() {
    let intent = AssociationIntent::has_many_through("employees", "employees", &["positions"])
        .alias("subordinates")
        .foreign_key("participant_id");
    let (gateway, assoc) = setup(STAFF, intent).await;

    let parents = all(&gateway, "employees", &["id", "name"]).await;
    let loaded = load(&gateway, &assoc, parents).await.unwrap();

    assert_eq!(loaded[0]["name"], json!("Jane"));
    assert_eq!(loaded[0]["subordinates"], json!([]));
    assert_eq!(loaded[1]["name"], json!("Fred"));
    assert_eq!(
        loaded[1]["subordinates"],
        json!([{"id": 1, "name": "Jane", "participant_id": 2}])
    );
}

#[tokio::test]
async fn test_has_many_runs_one_query() {
    let (gateway, assoc) = setup(BLOG, AssociationIntent::has_many("users", "posts")).await;
    let counter = Arc::new(SelectCounter::default());
    let gateway = gateway.with_observer(counter.clone());

    let parents = all(&gateway, "users", &["id", "name"]).await;
    counter.selects.lock().unwrap().clear();

    let loaded = load(&gateway, &assoc, parents).await.unwrap();

    assert_eq!(counter.selects.lock().unwrap().len(), 1);
    let titles: Vec<&Value> = loaded[0]["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| &post["title"])
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&&json!("first")));
    assert!(titles.contains(&&json!("second")));
    assert_eq!(loaded[1]["posts"].as_array().unwrap().len(), 1);
    assert_eq!(loaded[2]["posts"], json!([]));
}

#[tokio::test]
async fn test_belongs_to_nests_single_tuple_or_null() {
    let intent = AssociationIntent::belongs_to("posts", "users").alias("author");
    let (gateway, assoc) = setup(BLOG, intent).await;

    let parents = all(&gateway, "posts", &["id", "user_id", "title"]).await;
    let loaded = load(&gateway, &assoc, parents).await.unwrap();

    assert_eq!(loaded[0]["author"], json!({"id": 1, "name": "ada"}));
    assert_eq!(loaded[2]["author"], json!({"id": 2, "name": "bob"}));
    assert_eq!(loaded[3]["author"], Value::Null);
}

#[tokio::test]
async fn test_no_keys_skips_query() {
    let (gateway, assoc) = setup(BLOG, AssociationIntent::has_many("users", "posts")).await;
    let counter = Arc::new(SelectCounter::default());
    let gateway = gateway.with_observer(counter.clone());

    let loaded = load(&gateway, &assoc, Vec::new()).await.unwrap();

    assert!(loaded.is_empty());
    assert!(counter.selects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_preload_sql_uses_dialect_placeholders() {
    let intent =
        AssociationIntent::has_many_through("eans", "contracts", &["ean_stats", "contract_ean_stats"]);
    let (_, assoc) = setup(EANS, intent).await;

    let preload = preload_query(&assoc, 2).unwrap();
    assert_eq!(preload.parent_key, "id");
    assert_eq!(preload.child_key, "ean_id");

    let sql = preload.query.to_sql(Dialect::Postgres);
    assert!(sql.ends_with(r#"WHERE "ean_stats"."ean_id" IN ($1, $2)"#));
    assert!(preload.query.to_sql(Dialect::Oracle).ends_with("IN (:1, :2)"));
}
