//! SQL dialects and their catalog conventions.
//!
//! Dialects form a closed set. Each one contributes:
//!
//! - identifier quoting: `"` (PostgreSQL/SQLite/Oracle), `` ` `` (MySQL)
//! - bind placeholders: `$n` (PostgreSQL), `?` (MySQL/SQLite), `:n` (Oracle)
//! - a native type override table, consulted by the
//!   [`TypeMapper`](crate::types::TypeMapper) before the shared default table
//!
//! Adding a dialect means adding a variant and its override module.

pub mod helpers;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{BaseType, NativeType};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    #[serde(alias = "mariadb")]
    MySql,
    #[serde(alias = "sqlite3")]
    Sqlite,
    Oracle,
}

impl Dialect {
    /// Parse dialect from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "sqlite" | "sqlite3" => Some(Dialect::Sqlite),
            "oracle" => Some(Dialect::Oracle),
            _ => None,
        }
    }

    /// Dialect name for display/logging.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Oracle => "oracle",
        }
    }

    /// Quote an identifier (table, column, alias).
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => helpers::quote_backtick(ident),
            Dialect::Postgres | Dialect::Sqlite | Dialect::Oracle => helpers::quote_double(ident),
        }
    }

    /// Render the bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::Oracle => format!(":{}", index),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Dialect-specific mapping for a native type.
    ///
    /// Returns `None` to defer to the shared default table.
    pub fn override_type(&self, native: &NativeType) -> Option<BaseType> {
        match self {
            Dialect::Postgres => postgres::override_type(native),
            Dialect::MySql => mysql::override_type(native),
            Dialect::Sqlite => sqlite::override_type(native),
            Dialect::Oracle => oracle::override_type(native),
        }
    }

    /// Mapping for a column the catalog reports without any type.
    ///
    /// Only SQLite allows untyped columns; they accept any value.
    pub fn untyped_column(&self) -> Option<BaseType> {
        match self {
            Dialect::Sqlite => Some(BaseType::any()),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
