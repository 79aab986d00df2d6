//! Core engine for typed data-extension providers.
//! Extensions publish facts about players, groups and the server; this crate
//! validates, gathers and persists them.

pub mod builtin;
pub mod config;
pub mod db;
pub mod extension;
pub mod logging;
pub mod model;
pub mod repo;

pub use builtin::{default_builtins, BuiltinFactory};
pub use config::{ConfigError, PluginsConfig, PluginsConfigSection};
pub use extension::declaration::{
    DataExtension, ProviderCall, ProviderDeclaration, ProviderError, ProviderResult, TabInfo,
    Visibility,
};
pub use extension::extractor::{
    ExtensionExtractor, ExtractedExtension, ExtractionError, ExtractionWarning,
};
pub use extension::gatherer::{GatherReport, GatherSettings, ProviderValueGatherer};
pub use extension::service::{ExtensionService, RegistrationOutcome, UpdateSummary};
pub use logging::{default_log_level, init_logging, LoggingError};
pub use model::provider::{
    Color, Conditional, ElementOrder, Family, FormatType, Icon, ParamType, PluginInfo, ValueKind,
};
pub use model::subject::{Group, Subject, SubjectKey};
pub use model::value::ProviderValue;
pub use repo::extension_repo::{ExtensionStore, SqliteExtensionStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
