//! Process-wide access to the extension service.
//!
//! # Invariants
//! - The service is installed at most once per process.
//! - `get` never blocks and never creates a service.

use crate::extension::service::ExtensionService;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static SERVICE: OnceCell<Arc<ExtensionService>> = OnceCell::new();

/// Installs the process-wide service.
///
/// Returns the rejected instance when one is already installed.
pub fn install(service: Arc<ExtensionService>) -> Result<(), Arc<ExtensionService>> {
    SERVICE.set(service)
}

/// Returns the installed service, if any.
pub fn get() -> Option<Arc<ExtensionService>> {
    SERVICE.get().cloned()
}
