//! SQLite gateway over rusqlite.
//!
//! Catalog metadata comes from `PRAGMA table_info`, `PRAGMA foreign_key_list`,
//! `PRAGMA index_list` and `PRAGMA index_info`. The single connection is
//! guarded by a mutex; no lock is held across an await point.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, Params, Row};
use serde_json::Value;

use crate::catalog::{CatalogReader, ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, TableDescriptor};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::observer::{default_observer, QueryEvent, QueryKind, QueryObserver};
use crate::query::{QueryExecutor, SelectQuery, Tuple};

/// Catalog reader and query executor for a SQLite database.
pub struct SqliteGateway {
    conn: Mutex<Connection>,
    observer: Arc<dyn QueryObserver>,
}

impl SqliteGateway {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).map_err(Error::connection)?;
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(Error::connection)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            observer: default_observer(),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run a batch of statements, e.g. DDL and seed data.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql).map_err(Error::query)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::connection("sqlite connection mutex poisoned"))
    }

    /// Run `sql` and map every row, reporting the execution to the observer.
    fn query_rows<T, P: Params>(
        &self,
        conn: &Connection,
        kind: QueryKind,
        sql: &str,
        params: P,
        f: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> rusqlite::Result<Vec<T>> {
        let started = Instant::now();
        let result = conn.prepare(sql).and_then(|mut stmt| {
            let rows = stmt.query_map(params, f)?;
            rows.collect::<rusqlite::Result<Vec<T>>>()
        });

        self.observer.on_query(&QueryEvent {
            dialect: Dialect::Sqlite,
            kind,
            sql,
            elapsed: started.elapsed(),
            rows: result.as_ref().ok().map(Vec::len),
            failed: result.is_err(),
        });

        result
    }

    fn read_table(&self, table: &str) -> Result<TableDescriptor> {
        let conn = self.lock()?;
        let quoted = Dialect::Sqlite.quote_identifier(table);

        // (cid, name, type, notnull, dflt_value, pk)
        let rows = self
            .query_rows(
                &conn,
                QueryKind::Catalog,
                &format!("PRAGMA table_info({})", quoted),
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .map_err(Error::connection)?;

        if rows.is_empty() {
            return Err(Error::SchemaNotFound {
                relation: table.to_string(),
            });
        }

        let mut key_order: Vec<(i64, String)> = rows
            .iter()
            .filter(|(_, _, _, _, pk)| *pk > 0)
            .map(|(name, _, _, _, pk)| (*pk, name.clone()))
            .collect();
        key_order.sort();
        let primary_key: Vec<String> = key_order.into_iter().map(|(_, name)| name).collect();

        let columns: Vec<ColumnDescriptor> = rows
            .into_iter()
            .map(|(name, native, notnull, default, pk)| {
                // INTEGER PRIMARY KEY aliases the rowid and can never be NULL
                let rowid_alias =
                    pk > 0 && primary_key.len() == 1 && native.eq_ignore_ascii_case("integer");
                ColumnDescriptor {
                    name,
                    native_type: (!native.trim().is_empty()).then_some(native),
                    nullable: !(notnull || rowid_alias),
                    default,
                    primary_key: pk > 0,
                }
            })
            .collect();

        let mut foreign_keys = self.read_foreign_keys(&conn, &quoted)?;
        foreign_keys.sort_by_key(|fk| {
            fk.columns
                .first()
                .and_then(|c| columns.iter().position(|col: &ColumnDescriptor| &col.name == c))
        });
        let indexes = self.read_indexes(&conn, &quoted)?;

        Ok(TableDescriptor {
            name: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
            indexes,
        })
    }

    fn read_foreign_keys(&self, conn: &Connection, quoted: &str) -> Result<Vec<ForeignKeyDescriptor>> {
        // (id, seq, table, from, to)
        let rows = self
            .query_rows(
                conn,
                QueryKind::Catalog,
                &format!("PRAGMA foreign_key_list({})", quoted),
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .map_err(Error::connection)?;

        let mut grouped: BTreeMap<i64, Vec<(i64, String, String, Option<String>)>> = BTreeMap::new();
        for (id, seq, table, from, to) in rows {
            grouped.entry(id).or_default().push((seq, table, from, to));
        }

        let foreign_keys = grouped
            .into_values()
            .map(|mut parts| {
                parts.sort_by_key(|(seq, ..)| *seq);
                ForeignKeyDescriptor {
                    referenced_table: parts[0].1.clone(),
                    columns: parts.iter().map(|(_, _, from, _)| from.clone()).collect(),
                    referenced_columns: parts.iter().filter_map(|(_, _, _, to)| to.clone()).collect(),
                }
            })
            .collect();

        Ok(foreign_keys)
    }

    fn read_indexes(&self, conn: &Connection, quoted: &str) -> Result<Vec<IndexDescriptor>> {
        // (seq, name, unique)
        let listed = self
            .query_rows(
                conn,
                QueryKind::Catalog,
                &format!("PRAGMA index_list({})", quoted),
                [],
                |row| Ok((row.get::<_, String>(1)?, row.get::<_, bool>(2)?)),
            )
            .map_err(Error::connection)?;

        let mut indexes = Vec::with_capacity(listed.len());
        for (name, unique) in listed {
            // (seqno, cid, name); expression columns have no name
            let mut parts = self
                .query_rows(
                    conn,
                    QueryKind::Catalog,
                    &format!("PRAGMA index_info({})", Dialect::Sqlite.quote_identifier(&name)),
                    [],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(2)?)),
                )
                .map_err(Error::connection)?;
            parts.sort_by_key(|(seq, _)| *seq);

            indexes.push(IndexDescriptor {
                name,
                columns: parts.into_iter().filter_map(|(_, column)| column).collect(),
                unique,
            });
        }
        indexes.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(indexes)
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        self.query_rows(
            &conn,
            QueryKind::Catalog,
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            [],
            |row| row.get::<_, String>(0),
        )
        .map_err(Error::connection)
    }

    fn select(&self, query: &SelectQuery, params: &[Value]) -> Result<Vec<Tuple>> {
        if params.len() != query.param_count() {
            return Err(Error::Query {
                message: format!(
                    "expected {} bind parameters, got {}",
                    query.param_count(),
                    params.len()
                ),
                source: None,
            });
        }

        let sql = query.to_sql(Dialect::Sqlite);
        let bound: Vec<SqlValue> = params.iter().map(to_sql_value).collect();

        let conn = self.lock()?;
        self.query_rows(
            &conn,
            QueryKind::Select,
            &sql,
            rusqlite::params_from_iter(bound),
            row_to_tuple,
        )
        .map_err(Error::query)
    }
}

#[async_trait]
impl CatalogReader for SqliteGateway {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn read(&self, table: &str) -> Result<TableDescriptor> {
        self.read_table(table)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.table_names()
    }
}

#[async_trait]
impl QueryExecutor for SqliteGateway {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch(&self, query: &SelectQuery, params: &[Value]) -> Result<Vec<Tuple>> {
        self.select(query, params)
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

fn row_to_tuple(row: &Row<'_>) -> rusqlite::Result<Tuple> {
    let stmt = row.as_ref();
    let mut tuple = Tuple::new();
    for idx in 0..stmt.column_count() {
        let name = stmt.column_name(idx)?.to_string();
        tuple.insert(name, from_sql_value(row.get_ref(idx)?));
    }
    Ok(tuple)
}
