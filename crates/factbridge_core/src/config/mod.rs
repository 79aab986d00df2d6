//! Per-extension enable/disable configuration.
//!
//! # Responsibility
//! - Answer whether an extension has a config section and whether it is
//!   enabled.
//! - Create default-enabled sections for newly seen extensions.
//!
//! # Invariants
//! - A missing config file reads as an empty config.
//! - A created section is enabled until the operator edits it.
//! - File-backed sections are flushed before `create_section` returns `Ok`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Configuration collaborator consulted on registration.
pub trait PluginsConfig: Send + Sync {
    fn has_section(&self, plugin: &str) -> bool;

    /// Creates a default-enabled section for `plugin`.
    fn create_section(&self, plugin: &str) -> Result<(), ConfigError>;

    fn is_enabled(&self, plugin: &str) -> bool;
}

/// Errors from loading or persisting plugin configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "plugin config io error at `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "plugin config at `{}` is invalid: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SectionSettings {
    enabled: bool,
}

impl Default for SectionSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    plugins: BTreeMap<String, SectionSettings>,
}

/// `plugins` config section persisted as JSON, or kept in memory.
///
/// ```json
/// { "plugins": { "Host Process": { "enabled": true } } }
/// ```
pub struct PluginsConfigSection {
    path: Option<PathBuf>,
    document: Mutex<ConfigDocument>,
}

impl PluginsConfigSection {
    /// Config that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: Mutex::new(ConfigDocument::default()),
        }
    }

    /// Loads config from `path`; a missing file yields an empty config.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let document = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => ConfigDocument::default(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            document: Mutex::new(document),
        })
    }

    /// Enables or disables `plugin`, creating its section when missing.
    pub fn set_enabled(&self, plugin: &str, enabled: bool) -> Result<(), ConfigError> {
        let mut document = self.lock();
        document
            .plugins
            .insert(plugin.to_string(), SectionSettings { enabled });
        self.persist(&document)
    }

    /// Names of all configured sections, sorted.
    pub fn section_names(&self) -> Vec<String> {
        self.lock().plugins.keys().cloned().collect()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, ConfigDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, document: &ConfigDocument) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let raw = serde_json::to_string_pretty(document).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })
    }
}

impl PluginsConfig for PluginsConfigSection {
    fn has_section(&self, plugin: &str) -> bool {
        self.lock().plugins.contains_key(plugin)
    }

    fn create_section(&self, plugin: &str) -> Result<(), ConfigError> {
        let mut document = self.lock();
        if document.plugins.contains_key(plugin) {
            return Ok(());
        }
        document
            .plugins
            .insert(plugin.to_string(), SectionSettings::default());
        if let Err(err) = self.persist(&document) {
            document.plugins.remove(plugin);
            return Err(err);
        }
        Ok(())
    }

    fn is_enabled(&self, plugin: &str) -> bool {
        self.lock()
            .plugins
            .get(plugin)
            .is_some_and(|section| section.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::{PluginsConfig, PluginsConfigSection};

    #[test]
    fn created_sections_are_enabled() {
        let config = PluginsConfigSection::in_memory();
        assert!(!config.has_section("Shop"));
        assert!(!config.is_enabled("Shop"));

        config.create_section("Shop").expect("create section");
        assert!(config.has_section("Shop"));
        assert!(config.is_enabled("Shop"));
    }

    #[test]
    fn create_section_keeps_existing_setting() {
        let config = PluginsConfigSection::in_memory();
        config.set_enabled("Shop", false).expect("disable");
        config.create_section("Shop").expect("create section");
        assert!(!config.is_enabled("Shop"));
        assert_eq!(config.section_names(), vec!["Shop".to_string()]);
    }
}
