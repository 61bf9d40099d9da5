//! Configuration-time orchestration.
//!
//! [`Setup::configure`] infers every relation the declared associations
//! mention, then resolves all of them. Nothing is deferred: a bad declaration
//! fails here, before any query runs.

use tracing::{debug, info};

use crate::association::{resolve, AssociationIntent, ResolvedAssociation};
use crate::catalog::CatalogReader;
use crate::config::{Settings, SettingsError};
use crate::error::Result;
use crate::gateway;
use crate::schema::{SchemaInferrer, SchemaSet};
use crate::types::TypeMapper;

/// Inference settings plus declared associations.
#[derive(Debug, Clone, Default)]
pub struct Setup {
    inferrer: SchemaInferrer,
    intents: Vec<AssociationIntent>,
}

/// Result of a successful setup: inferred schemas and resolved associations.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub schemas: SchemaSet,
    /// In declaration order.
    pub associations: Vec<ResolvedAssociation>,
}

impl Configuration {
    /// Look up an association by `source.name`.
    pub fn association(&self, label: &str) -> Option<&ResolvedAssociation> {
        let (source, name) = label.split_once('.')?;
        self.associations
            .iter()
            .find(|assoc| assoc.source.relation == source && assoc.name == name)
    }
}

impl Setup {
    pub fn new(inferrer: SchemaInferrer, intents: Vec<AssociationIntent>) -> Self {
        Self { inferrer, intents }
    }

    /// Build a setup from loaded settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mapper = TypeMapper::new(settings.inference.unknown_types);
        let inferrer = SchemaInferrer::new(mapper).with_overrides(settings.overrides()?);
        Ok(Self::new(inferrer, settings.intents()))
    }

    /// Open the `[connection]` from `settings` and configure against it.
    ///
    /// The reader is handed back so callers can keep using the connection.
    pub async fn connect(settings: &Settings) -> Result<(Box<dyn CatalogReader>, Configuration)> {
        let connection = settings
            .connection
            .as_ref()
            .ok_or_else(|| SettingsError::InvalidConfig("missing [connection] section".into()))?;

        let setup = Self::from_settings(settings)?;
        let reader = gateway::connect(connection).await?;
        let config = setup.configure(reader.as_ref()).await?;
        Ok((reader, config))
    }

    pub fn intents(&self) -> &[AssociationIntent] {
        &self.intents
    }

    /// Every relation named by an intent, in first-mention order.
    pub fn relations(&self) -> Vec<String> {
        let mut relations: Vec<String> = Vec::new();
        for intent in &self.intents {
            let names = std::iter::once(&intent.source)
                .chain(&intent.through)
                .chain(std::iter::once(&intent.target));
            for name in names {
                if !relations.contains(name) {
                    relations.push(name.clone());
                }
            }
        }
        relations
    }

    /// Infer the referenced schemas and resolve every association.
    pub async fn configure(&self, reader: &dyn CatalogReader) -> Result<Configuration> {
        let relations = self.relations();
        debug!(
            dialect = %reader.dialect(),
            relations = relations.len(),
            "inferring schemas"
        );

        let schemas = self.inferrer.infer_all(reader, &relations).await?;
        let associations = resolve(&schemas, &self.intents)?;

        info!(
            schemas = schemas.len(),
            associations = associations.len(),
            "configuration complete"
        );

        Ok(Configuration {
            schemas,
            associations,
        })
    }
}
