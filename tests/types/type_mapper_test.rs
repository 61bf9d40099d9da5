//! Type mapper behaviour across dialects.

use relmap::catalog::ColumnDescriptor;
use relmap::types::{Annotation, AttributeType, FallbackPolicy, TypeMapper, TypeTag};
use relmap::{Dialect, Error};

/// Native types every dialect below knows how to map.
const KNOWN: &[(Dialect, &[&str])] = &[
    (
        Dialect::Postgres,
        &[
            "integer",
            "bigint",
            "character varying(80)",
            "numeric(10,2)",
            "jsonb",
            "integer[]",
            "timestamp with time zone",
            "uuid",
            "boolean",
            "bytea",
        ],
    ),
    (
        Dialect::MySql,
        &[
            "int(11)",
            "int(10) unsigned",
            "varchar(255)",
            "tinyint(1)",
            "datetime",
            "longtext",
            "enum('draft','published')",
            "json",
        ],
    ),
    (
        Dialect::Sqlite,
        &["INTEGER", "TEXT", "REAL", "BLOB", "VARCHAR(40)", "BOOLEAN", "DATETIME"],
    ),
    (
        Dialect::Oracle,
        &["NUMBER(10)", "NUMBER(12,2)", "VARCHAR2(20 BYTE)", "DATE", "CLOB", "RAW(16)"],
    ),
];

fn column(native: &str, nullable: bool) -> ColumnDescriptor {
    ColumnDescriptor::new("value", native).nullable(nullable)
}

fn map(native: &str, dialect: Dialect) -> AttributeType {
    TypeMapper::default().map(&column(native, false), dialect).unwrap()
}

#[test]
fn test_nullable_wraps_required() {
    let mapper = TypeMapper::default();
    for (dialect, natives) in KNOWN {
        for native in *natives {
            let nullable = mapper.map(&column(native, true), *dialect).unwrap();
            let required = mapper.map(&column(native, false), *dialect).unwrap();

            assert!(nullable.is_nullable(), "{dialect} {native}");
            assert!(!required.is_nullable(), "{dialect} {native}");
            assert_eq!(nullable.non_null(), required, "{dialect} {native}");
            assert_eq!(required.optional(), nullable, "{dialect} {native}");
        }
    }
}

#[test]
fn test_mapping_is_pure() {
    for policy in [FallbackPolicy::Fail, FallbackPolicy::Untyped] {
        let mapper = TypeMapper::new(policy);
        for (dialect, natives) in KNOWN {
            for native in *natives {
                let c = column(native, true);
                assert_eq!(
                    mapper.map(&c, *dialect).unwrap(),
                    mapper.map(&c, *dialect).unwrap(),
                    "{dialect} {native}"
                );
            }
        }
    }
}

#[test]
fn test_postgres_types() {
    let varchar = map("character varying(80)", Dialect::Postgres);
    assert_eq!(varchar.tag(), &TypeTag::String);
    assert_eq!(varchar.base().constraints.max_length, Some(80));

    let numeric = map("numeric(10,2)", Dialect::Postgres);
    assert_eq!(numeric.tag(), &TypeTag::Decimal);
    assert_eq!(numeric.base().constraints.precision, Some(10));
    assert_eq!(numeric.base().constraints.scale, Some(2));

    let ids = map("integer[]", Dialect::Postgres);
    assert_eq!(ids.tag(), &TypeTag::Integer);
    assert!(ids.base().has(&Annotation::Array));

    let doc = map("jsonb", Dialect::Postgres);
    assert_eq!(doc.tag(), &TypeTag::Json);
    assert!(doc.base().has(&Annotation::Jsonb));

    assert_eq!(
        map("timestamp with time zone", Dialect::Postgres).tag(),
        &TypeTag::Timestamp
    );
    assert_eq!(
        map("uuid", Dialect::Postgres).tag(),
        &TypeTag::Custom("uuid".to_string())
    );
}

#[test]
fn test_mysql_types() {
    assert_eq!(map("tinyint(1)", Dialect::MySql).tag(), &TypeTag::Boolean);
    assert_eq!(map("tinyint(4)", Dialect::MySql).tag(), &TypeTag::Integer);

    let unsigned = map("int(10) unsigned", Dialect::MySql);
    assert_eq!(unsigned.tag(), &TypeTag::Integer);
    assert!(unsigned.base().has(&Annotation::Unsigned));

    let status = map("enum('draft','published')", Dialect::MySql);
    assert_eq!(status.tag(), &TypeTag::String);
    assert!(status.base().has(&Annotation::Enum));
}

#[test]
fn test_oracle_types() {
    assert_eq!(map("NUMBER(10)", Dialect::Oracle).tag(), &TypeTag::Integer);
    assert_eq!(map("NUMBER(12,2)", Dialect::Oracle).tag(), &TypeTag::Decimal);
    assert_eq!(map("DATE", Dialect::Oracle).tag(), &TypeTag::Timestamp);

    let name = map("VARCHAR2(20 BYTE)", Dialect::Oracle);
    assert_eq!(name.tag(), &TypeTag::String);
    assert_eq!(name.base().constraints.max_length, Some(20));
}

#[test]
fn test_same_native_type_differs_by_dialect() {
    assert_eq!(map("DATE", Dialect::Postgres).tag(), &TypeTag::Date);
    assert_eq!(map("DATE", Dialect::Oracle).tag(), &TypeTag::Timestamp);
}

#[test]
fn test_sqlite_untyped_column_is_any() {
    let untyped = ColumnDescriptor {
        native_type: None,
        ..column("", true)
    };
    let ty = TypeMapper::default().map(&untyped, Dialect::Sqlite).unwrap();
    assert_eq!(ty.tag(), &TypeTag::Any);
    assert!(ty.base().is_untyped());
    assert!(ty.is_nullable());
}

#[test]
fn test_fallback_policy_is_explicit() {
    let geometry = column("geometry", false);

    let err = TypeMapper::new(FallbackPolicy::Fail)
        .map_in("parcels", &geometry, Dialect::Postgres)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnknownNativeType { ref relation, ref native_type, .. }
            if relation == "parcels" && native_type == "geometry"
    ));
    assert!(err.is_configuration_error());

    let ty = TypeMapper::new(FallbackPolicy::Untyped)
        .map(&geometry, Dialect::Postgres)
        .unwrap();
    assert_eq!(ty.tag(), &TypeTag::Any);
    assert!(ty.base().is_untyped());
    assert!(ty.base().has(&Annotation::Native("geometry".to_string())));
}
