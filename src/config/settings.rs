//! TOML settings for relmap.
//!
//! Example configuration:
//! ```toml
//! [connection]
//! dialect = "sqlite"
//! url = "${DATABASE_URL}"
//!
//! [inference]
//! unknown_types = "untyped"   # or "fail"
//!
//! [relations.eans]
//! associations = [
//!   { kind = "has_many_through", target = "contracts", through = ["ean_stats", "contract_ean_stats"] },
//! ]
//!
//! [relations.eans.attributes]
//! name = "string"
//! barcode = "custom:gtin"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::association::{AssociationIntent, AssociationKind};
use crate::dialect::Dialect;
use crate::schema::AttributeOverrides;
use crate::types::{BaseType, FallbackPolicy, TypeTag};

/// `${VAR}` or `$VAR`.
static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("env var pattern is valid")
});

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Database to read catalogs from.
    pub connection: Option<ConnectionSettings>,

    pub inference: InferenceSettings,

    /// Per-relation associations and attribute overrides, keyed by relation name.
    pub relations: BTreeMap<String, RelationSettings>,
}

/// Connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSettings {
    /// postgres, mysql, sqlite or oracle.
    pub dialect: String,

    /// Connection URL or SQLite path (supports `${ENV_VAR}` expansion).
    pub url: String,
}

impl ConnectionSettings {
    pub fn dialect(&self) -> Result<Dialect, SettingsError> {
        Dialect::from_str(&self.dialect)
            .ok_or_else(|| SettingsError::UnsupportedDialect(self.dialect.clone()))
    }

    /// The URL with environment variables expanded.
    pub fn resolved_url(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.url)
    }
}

/// Type inference settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceSettings {
    /// What to do with native types that have no mapping.
    pub unknown_types: FallbackPolicy,
}

/// Settings for one relation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationSettings {
    /// Declared associations, in declaration order.
    pub associations: Vec<AssociationSettings>,

    /// Attribute type overrides (`attribute = "type"`).
    pub attributes: BTreeMap<String, String>,
}

/// One declared association; the source is the enclosing relation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssociationSettings {
    pub kind: AssociationKind,
    pub target: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub target_key: Option<String>,
    #[serde(default)]
    pub through: Vec<String>,
}

impl AssociationSettings {
    fn to_intent(&self, source: &str) -> AssociationIntent {
        AssociationIntent {
            source: source.to_string(),
            kind: self.kind,
            target: self.target.clone(),
            alias: self.alias.clone(),
            foreign_key: self.foreign_key.clone(),
            target_key: self.target_key.clone(),
            through: self.through.clone(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from `RELMAP_CONFIG`, else `./relmap.toml`, else defaults.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("RELMAP_CONFIG") {
            return Self::from_file(path);
        }

        let local = PathBuf::from("relmap.toml");
        if local.exists() {
            return Self::from_file(local);
        }

        Ok(Settings::default())
    }

    /// Association intents in declaration order, relations sorted by name.
    pub fn intents(&self) -> Vec<AssociationIntent> {
        self.relations
            .iter()
            .flat_map(|(source, relation)| {
                relation
                    .associations
                    .iter()
                    .map(move |assoc| assoc.to_intent(source))
            })
            .collect()
    }

    /// Attribute type overrides for schema inference.
    pub fn overrides(&self) -> Result<AttributeOverrides, SettingsError> {
        let mut overrides = AttributeOverrides::new();
        for (relation, settings) in &self.relations {
            for (attribute, ty) in &settings.attributes {
                let tag = TypeTag::parse(ty).ok_or_else(|| {
                    SettingsError::InvalidConfig(format!(
                        "unknown type '{}' for attribute {}.{} (use a portable type or custom:<name>)",
                        ty, relation, attribute
                    ))
                })?;
                overrides.insert(relation, attribute, BaseType::new(tag));
            }
        }
        Ok(overrides)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut missing = None;

    let expanded = ENV_VAR.replace_all(s, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(SettingsError::MissingEnvVar(name)),
        None => Ok(expanded.into_owned()),
    }
}
