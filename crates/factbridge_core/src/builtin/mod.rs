//! Extensions shipped with the engine.
//!
//! Built-ins are registered by `ExtensionService::enable` through the same
//! path as host-supplied extensions. A factory reports
//! `ProviderError::DependencyMissing` when its backing component is absent;
//! the service skips it without failing.

pub mod process_info;

use crate::extension::declaration::{DataExtension, ProviderError};
use std::sync::Arc;

/// Constructor of one built-in extension.
pub type BuiltinFactory = fn() -> Result<Arc<dyn DataExtension>, ProviderError>;

/// Factories registered by default.
pub fn default_builtins() -> Vec<BuiltinFactory> {
    vec![process_info::factory]
}
