//! Association resolution over inferred schemas.

use std::collections::HashSet;

use relmap::association::{resolve, AssociationIntent, AssociationKind, RelationGraph};
use relmap::gateway::SqliteGateway;
use relmap::schema::{Attribute, QualifiedName, Schema, SchemaInferrer, SchemaSet};
use relmap::types::{AttributeType, BaseType, TypeTag};
use relmap::Error;

fn int() -> AttributeType {
    AttributeType::Required(BaseType::new(TypeTag::Integer))
}

fn staff() -> SchemaSet {
    [
        Schema::new(
            "employees",
            vec![
                Attribute::new("id", int()).primary_key(),
                Attribute::new("name", AttributeType::Required(BaseType::new(TypeTag::String))),
            ],
        ),
        Schema::new(
            "positions",
            vec![
                Attribute::new("id", int()).primary_key(),
                Attribute::new("manager_id", int()).foreign_key("employees"),
                Attribute::new("participant_id", int()).foreign_key("employees"),
            ],
        ),
    ]
    .into_iter()
    .collect()
}

fn blog() -> SchemaSet {
    [
        Schema::new("users", vec![Attribute::new("id", int()).primary_key()]),
        Schema::new(
            "posts",
            vec![
                Attribute::new("id", int()).primary_key(),
                Attribute::new("user_id", int()).foreign_key("users"),
            ],
        ),
        Schema::new(
            "comments",
            vec![
                Attribute::new("id", int()).primary_key(),
                Attribute::new("post_id", int()).foreign_key("posts"),
            ],
        ),
    ]
    .into_iter()
    .collect()
}

fn roles() -> SchemaSet {
    [
        Schema::new("employees", vec![Attribute::new("id", int()).primary_key()]),
        Schema::new(
            "positions",
            vec![
                Attribute::new("id", int()).primary_key(),
                Attribute::new("employee_id", int()).foreign_key("employees"),
                Attribute::new("manager_id", int()).foreign_key("employees"),
            ],
        ),
    ]
    .into_iter()
    .collect()
}

fn tagging() -> SchemaSet {
    [
        Schema::new("users", vec![Attribute::new("id", int()).primary_key()]),
        Schema::new("tags", vec![Attribute::new("id", int()).primary_key()]),
        Schema::new("orgs", vec![Attribute::new("id", int()).primary_key()]),
        Schema::new(
            "taggings",
            vec![
                Attribute::new("id", int()).primary_key(),
                Attribute::new("user_id", int()).foreign_key("users"),
                Attribute::new("tag_id", int()).foreign_key("tags"),
                Attribute::new("org_id", int()).foreign_key("orgs"),
            ],
        ),
    ]
    .into_iter()
    .collect()
}

fn subordinates() -> AssociationIntent {
    AssociationIntent::has_many_through("employees", "employees", &["positions"]).alias("subordinates")
}

#[test]
fn test_self_referential_through_is_ambiguous_without_override() {
    let err = resolve(&staff(), &[subordinates()]).unwrap_err();
    match err {
        Error::AmbiguousAssociation {
            association,
            relation,
            candidates,
        } => {
            assert_eq!(association, "employees.subordinates");
            assert_eq!(relation, "positions");
            assert_eq!(candidates, vec!["manager_id", "participant_id"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_override_disambiguates_self_reference() {
    let intent = subordinates().foreign_key("participant_id");
    let resolved = resolve(&staff(), &[intent]).unwrap();
    let assoc = &resolved[0];

    assert_eq!(assoc.name, "subordinates");
    assert_eq!(assoc.kind, AssociationKind::HasManyThrough);
    assert!(assoc.is_through());
    assert_eq!(assoc.target.name(), "employees_1");

    let keys: Vec<String> = assoc.join_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "employees.id = positions.participant_id",
            "positions.manager_id = employees_1.id",
        ]
    );

    let names: HashSet<&QualifiedName> = assoc
        .join_keys()
        .into_iter()
        .flat_map(|k| [&k.left, &k.right])
        .collect();
    assert_eq!(names.len(), 4);
}

#[test]
fn test_convention_key_does_not_hide_second_candidate() {
    let intent = AssociationIntent::has_many_through("employees", "employees", &["positions"]);
    let err = resolve(&roles(), &[intent]).unwrap_err();
    match err {
        Error::AmbiguousAssociation {
            relation, candidates, ..
        } => {
            assert_eq!(relation, "positions");
            assert_eq!(candidates, vec!["employee_id", "manager_id"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    let intent = AssociationIntent::has_many_through("employees", "employees", &["positions"])
        .foreign_key("employee_id");
    let resolved = resolve(&roles(), &[intent]).unwrap();
    let keys: Vec<String> = resolved[0].join_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "employees.id = positions.employee_id",
            "positions.manager_id = employees_1.id",
        ]
    );
}

#[test]
fn test_join_relation_needs_exactly_two_foreign_keys() {
    let intent = AssociationIntent::has_many_through("users", "tags", &["taggings"]);
    let err = resolve(&tagging(), &[intent.clone()]).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidAssociation { ref association, ref message }
            if association == "users.tags" && message.contains("3 foreign keys")
    ));
    assert!(err.is_configuration_error());

    let err = resolve(&tagging(), &[intent.clone().foreign_key("user_id")]).unwrap_err();
    assert!(matches!(err, Error::InvalidAssociation { .. }));

    let resolved = resolve(&tagging(), &[intent.foreign_key("user_id").target_key("tag_id")]).unwrap();
    let keys: Vec<String> = resolved[0].join_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        vec!["users.id = taggings.user_id", "taggings.tag_id = tags.id"]
    );
}

#[test]
fn test_far_side_override() {
    let intent = subordinates().target_key("participant_id");
    let resolved = resolve(&staff(), &[intent]).unwrap();
    let keys: Vec<String> = resolved[0].join_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "employees.id = positions.manager_id",
            "positions.participant_id = employees_1.id",
        ]
    );
}

#[test]
fn test_order_follows_intents_for_every_permutation() {
    let schemas = blog();
    let intents = [
        AssociationIntent::has_many("users", "posts"),
        AssociationIntent::belongs_to("posts", "users").alias("author"),
        AssociationIntent::has_many("posts", "comments"),
    ];
    let permutations = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in permutations {
        let input: Vec<AssociationIntent> = order.iter().map(|&i| intents[i].clone()).collect();
        let resolved = resolve(&schemas, &input).unwrap();

        let expected: Vec<String> = input.iter().map(|i| i.label()).collect();
        let actual: Vec<String> = resolved
            .iter()
            .map(|a| format!("{}.{}", a.source.relation, a.name))
            .collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_first_failure_aborts_resolution() {
    let intents = [
        AssociationIntent::has_many("users", "posts"),
        AssociationIntent::belongs_to("comments", "users"),
    ];
    let err = resolve(&blog(), &intents).unwrap_err();
    assert!(matches!(
        err,
        Error::ForeignKeyNotFound { ref relation, ref attribute, .. }
            if relation == "comments" && attribute == "user_id"
    ));
    assert!(err.is_configuration_error());
}

#[test]
fn test_relation_graph() {
    let graph = RelationGraph::from_schemas(&staff());
    assert_eq!(graph.references("positions", "employees"), vec!["manager_id", "participant_id"]);
    assert!(graph.references("employees", "positions").is_empty());
    assert_eq!(graph.relation_count(), 2);
    assert_eq!(graph.reference_count(), 2);
}

#[tokio::test]
async fn test_two_hop_chain_from_sqlite() {
    let gateway = SqliteGateway::open_in_memory().unwrap();
    gateway
        .execute_batch(
            r#"
            CREATE TABLE eans (id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE ean_stats (id INTEGER PRIMARY KEY, ean_id INTEGER);
            CREATE TABLE contract_ean_stats (
                id INTEGER PRIMARY KEY,
                contract_id INTEGER,
                ean_stat_id INTEGER
            );
            CREATE TABLE contracts (id INTEGER PRIMARY KEY, title TEXT);
            "#,
        )
        .unwrap();

    let tables: Vec<String> = ["eans", "ean_stats", "contract_ean_stats", "contracts"]
        .iter()
        .map(|t| t.to_string())
        .collect();
    let schemas = SchemaInferrer::default()
        .infer_all(&gateway, &tables)
        .await
        .unwrap();

    let intent =
        AssociationIntent::has_many_through("eans", "contracts", &["ean_stats", "contract_ean_stats"]);
    let resolved = resolve(&schemas, &[intent]).unwrap();
    let assoc = &resolved[0];

    let keys: Vec<String> = assoc.join_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "eans.id = ean_stats.ean_id",
            "ean_stats.id = contract_ean_stats.ean_stat_id",
            "contract_ean_stats.contract_id = contracts.id",
        ]
    );
    assert_eq!(assoc.through.len(), 2);
    assert_eq!(assoc.target_schema.relation(), "contracts");
}
