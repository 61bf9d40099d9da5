//! PostgreSQL catalog reader over sqlx.
//!
//! Columns come from `pg_attribute` with `format_type`, so native types carry
//! their modifiers (`character varying(80)`, `numeric(10,2)`, `integer[]`).
//! Keys and indexes come from `pg_constraint` and `pg_index`. Every query is
//! bound by schema and table name.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::catalog::{CatalogReader, ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, TableDescriptor};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::observer::{default_observer, QueryEvent, QueryKind, QueryObserver};

const COLUMNS_QUERY: &str = r#"
    SELECT
        a.attname::text,
        pg_catalog.format_type(a.atttypid, a.atttypmod),
        NOT a.attnotnull,
        pg_catalog.pg_get_expr(d.adbin, d.adrelid)
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class t ON t.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
    WHERE n.nspname = $1
      AND t.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT a.attname::text
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
    WHERE n.nspname = $1
      AND t.relname = $2
      AND c.contype = 'p'
      AND a.attnum = ANY(c.conkey)
    ORDER BY array_position(c.conkey, a.attnum)
"#;

// conkey and confkey are unnested together so each column pairs with its
// referenced column by position.
const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        array_agg(a.attname::text ORDER BY k.ord),
        rt.relname::text,
        array_agg(ra.attname::text ORDER BY k.ord)
    FROM pg_catalog.pg_constraint c
    JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
    CROSS JOIN unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.refnum
    WHERE n.nspname = $1
      AND t.relname = $2
      AND c.contype = 'f'
    GROUP BY c.oid, c.conname, rt.relname
    ORDER BY c.conname
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        i.relname::text,
        ix.indisunique,
        array_agg(a.attname::text ORDER BY array_position(ix.indkey, a.attnum))
    FROM pg_catalog.pg_index ix
    JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
    JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
    JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
    WHERE n.nspname = $1
      AND t.relname = $2
      AND NOT ix.indisprimary
    GROUP BY i.relname, ix.indisunique
    ORDER BY i.relname
"#;

const TABLES_QUERY: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1
      AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

/// Catalog reader for a PostgreSQL schema.
pub struct PgGateway {
    pool: PgPool,
    schema: String,
    observer: Arc<dyn QueryObserver>,
}

impl PgGateway {
    /// Connect to `url`, reading tables from the `public` schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await
            .map_err(Error::connection)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema: "public".to_string(),
            observer: default_observer(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    async fn catalog_rows(&self, sql: &str, table: Option<&str>) -> Result<Vec<PgRow>> {
        let started = Instant::now();

        let mut query = sqlx::query(sql).bind(&self.schema);
        if let Some(table) = table {
            query = query.bind(table);
        }
        let result = query.fetch_all(&self.pool).await;

        self.observer.on_query(&QueryEvent {
            dialect: Dialect::Postgres,
            kind: QueryKind::Catalog,
            sql,
            elapsed: started.elapsed(),
            rows: result.as_ref().ok().map(Vec::len),
            failed: result.is_err(),
        });

        result.map_err(Error::connection)
    }
}

#[async_trait]
impl CatalogReader for PgGateway {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn read(&self, table: &str) -> Result<TableDescriptor> {
        let rows = self.catalog_rows(COLUMNS_QUERY, Some(table)).await?;
        if rows.is_empty() {
            return Err(Error::SchemaNotFound {
                relation: table.to_string(),
            });
        }

        let primary_key = self
            .catalog_rows(PRIMARY_KEY_QUERY, Some(table))
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>(0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::connection)?;

        let columns = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get(0)?;
                Ok(ColumnDescriptor {
                    primary_key: primary_key.contains(&name),
                    native_type: row.try_get(1)?,
                    nullable: row.try_get(2)?,
                    default: row.try_get(3)?,
                    name,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::connection)?;

        let foreign_keys = self
            .catalog_rows(FOREIGN_KEYS_QUERY, Some(table))
            .await?
            .iter()
            .map(|row| {
                Ok(ForeignKeyDescriptor {
                    columns: row.try_get(0)?,
                    referenced_table: row.try_get(1)?,
                    referenced_columns: row.try_get(2)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::connection)?;

        let indexes = self
            .catalog_rows(INDEXES_QUERY, Some(table))
            .await?
            .iter()
            .map(|row| {
                Ok(IndexDescriptor {
                    name: row.try_get(0)?,
                    unique: row.try_get(1)?,
                    columns: row.try_get(2)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::connection)?;

        Ok(TableDescriptor {
            name: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.catalog_rows(TABLES_QUERY, None)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>(0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::connection)
    }
}
