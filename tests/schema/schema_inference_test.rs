//! Schema inference over a live SQLite catalog.

use relmap::gateway::SqliteGateway;
use relmap::schema::{AttributeOverrides, SchemaInferrer};
use relmap::types::{BaseType, FallbackPolicy, TypeMapper, TypeTag};
use relmap::Error;

fn library() -> SqliteGateway {
    let gateway = SqliteGateway::open_in_memory().unwrap();
    gateway
        .execute_batch(
            r#"
            CREATE TABLE authors (
                id INTEGER PRIMARY KEY,
                name VARCHAR(80) NOT NULL,
                born DATE,
                profile
            );
            CREATE TABLE books (
                id INTEGER PRIMARY KEY,
                author_id INTEGER NOT NULL REFERENCES authors(id),
                title TEXT NOT NULL,
                price DECIMAL(8,2),
                published BOOLEAN DEFAULT 0
            );
            CREATE INDEX books_author_idx ON books(author_id);
            "#,
        )
        .unwrap();
    gateway
}

#[tokio::test]
async fn test_infer_typed_schema() {
    let gateway = library();
    let schema = SchemaInferrer::default().infer(&gateway, "books").await.unwrap();

    let names: Vec<_> = schema.names().collect();
    assert_eq!(names, vec!["id", "author_id", "title", "price", "published"]);

    let id = schema.attribute("id").unwrap();
    assert!(id.is_primary_key());
    assert!(!id.ty.is_nullable());
    assert_eq!(id.ty.tag(), &TypeTag::Integer);

    let author_id = schema.attribute("author_id").unwrap();
    assert!(author_id.references("authors"));
    assert!(author_id.meta.indexed);

    let price = schema.attribute("price").unwrap();
    assert!(price.ty.is_nullable());
    assert_eq!(price.ty.tag(), &TypeTag::Decimal);
    assert_eq!(price.ty.base().constraints.precision, Some(8));

    let published = schema.attribute("published").unwrap();
    assert_eq!(published.ty.tag(), &TypeTag::Boolean);
    assert_eq!(published.meta.default.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_untyped_sqlite_column() {
    let gateway = library();
    let schema = SchemaInferrer::default().infer(&gateway, "authors").await.unwrap();

    let profile = schema.attribute("profile").unwrap();
    assert_eq!(profile.ty.tag(), &TypeTag::Any);
    assert!(profile.ty.base().is_untyped());
}

#[tokio::test]
async fn test_reinference_is_identical() {
    let gateway = library();
    let inferrer = SchemaInferrer::default();

    let first = inferrer.infer(&gateway, "books").await.unwrap();
    let second = inferrer.infer(&gateway, "books").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.fingerprint().len(), 64);
}

#[tokio::test]
async fn test_fingerprint_changes_after_alter_table() {
    let gateway = library();
    let inferrer = SchemaInferrer::default();

    let before = inferrer.infer(&gateway, "books").await.unwrap();
    gateway
        .execute_batch("ALTER TABLE books ADD COLUMN isbn VARCHAR(13)")
        .unwrap();
    let after = inferrer.infer(&gateway, "books").await.unwrap();

    assert_ne!(before.fingerprint(), after.fingerprint());
    let isbn = after.attribute("isbn").unwrap();
    assert_eq!(isbn.ty.base().constraints.max_length, Some(13));
    assert!(isbn.ty.is_nullable());
}

#[tokio::test]
async fn test_infer_all_reads_every_table() {
    let gateway = library();
    let tables = vec!["authors".to_string(), "books".to_string()];

    let schemas = SchemaInferrer::default()
        .infer_all(&gateway, &tables)
        .await
        .unwrap();

    assert_eq!(schemas.len(), 2);
    assert_eq!(
        schemas.get("books").unwrap().foreign_keys_to("authors").len(),
        1
    );
}

#[tokio::test]
async fn test_missing_table_fails() {
    let gateway = library();
    let tables = vec!["authors".to_string(), "reviews".to_string()];

    let err = SchemaInferrer::default()
        .infer_all(&gateway, &tables)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaNotFound { relation } if relation == "reviews"));
}

#[tokio::test]
async fn test_overrides_replace_inferred_type() {
    let gateway = library();
    let overrides =
        AttributeOverrides::new().with("authors", "profile", BaseType::new(TypeTag::Json));

    let schema = SchemaInferrer::new(TypeMapper::new(FallbackPolicy::Fail))
        .with_overrides(overrides)
        .infer(&gateway, "authors")
        .await
        .unwrap();

    let profile = schema.attribute("profile").unwrap();
    assert_eq!(profile.ty.tag(), &TypeTag::Json);
    assert!(profile.ty.is_nullable());
}
