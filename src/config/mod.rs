//! Configuration: connection, inference policy, declared associations and
//! attribute overrides, loaded from `relmap.toml`.

mod settings;

pub use settings::{
    expand_env_vars, AssociationSettings, ConnectionSettings, InferenceSettings, RelationSettings,
    Settings, SettingsError,
};
