//! Extension registry and update fan-out.
//!
//! # Responsibility
//! - Register extensions: extract, consult config, build a gatherer and
//!   store static metadata.
//! - Run every registered gatherer for a subject without letting one
//!   extension affect another.
//!
//! # Invariants
//! - At most one gatherer per plugin name.
//! - Registrations are serialized from the duplicate check to the insert,
//!   so a rejected duplicate never writes metadata.
//! - Registration never returns an error; the outcome is reported and
//!   logged.
//! - Update passes run over a snapshot taken under the read lock; the lock
//!   is never held while a gatherer runs.

use crate::builtin::BuiltinFactory;
use crate::config::PluginsConfig;
use crate::extension::declaration::{DataExtension, ProviderError};
use crate::extension::extractor::{ExtensionExtractor, ExtractionError};
use crate::extension::gatherer::{GatherReport, GatherSettings, ProviderValueGatherer};
use crate::logging::panic_payload_summary;
use crate::model::subject::{Group, Subject};
use crate::repo::extension_repo::ExtensionStore;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use uuid::Uuid;

/// Result of one `register` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Gatherer created and inserted.
    Registered,
    /// Extraction found a hard failure.
    Rejected(ExtractionError),
    /// Operator disabled the extension in config.
    Disabled,
    /// Config section for a new extension could not be created.
    ConfigFailed,
    /// Another extension with the same plugin name is registered.
    AlreadyRegistered,
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

/// Per-subject totals of one update call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Gatherers that completed their pass.
    pub extensions: usize,
    /// Gatherers that panicked outside provider isolation.
    pub aborted: usize,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl UpdateSummary {
    fn add(&mut self, report: GatherReport) {
        self.extensions += 1;
        self.stored += report.stored;
        self.skipped += report.skipped;
        self.failed += report.failed;
    }
}

/// Registry of extension gatherers.
pub struct ExtensionService {
    config: Arc<dyn PluginsConfig>,
    store: Arc<dyn ExtensionStore>,
    settings: GatherSettings,
    builtins: Vec<BuiltinFactory>,
    gatherers: RwLock<BTreeMap<String, Arc<ProviderValueGatherer>>>,
    registration: Mutex<()>,
}

impl ExtensionService {
    pub fn new(config: Arc<dyn PluginsConfig>, store: Arc<dyn ExtensionStore>) -> Self {
        Self {
            config,
            store,
            settings: GatherSettings::default(),
            builtins: Vec::new(),
            gatherers: RwLock::new(BTreeMap::new()),
            registration: Mutex::new(()),
        }
    }

    /// Factories registered by `enable`.
    pub fn with_builtins(mut self, builtins: Vec<BuiltinFactory>) -> Self {
        self.builtins = builtins;
        self
    }

    /// Settings applied to gatherers created from now on.
    pub fn with_settings(mut self, settings: GatherSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers every configured built-in extension.
    ///
    /// Built-ins whose dependency is missing are skipped.
    pub fn enable(&self) {
        for factory in &self.builtins {
            match factory() {
                Ok(extension) => {
                    self.register(extension);
                }
                Err(ProviderError::DependencyMissing(reason)) => {
                    info!(
                        "event=builtin_skipped module=extension status=skipped reason=dependency_missing detail={reason}"
                    );
                }
                Err(err) => {
                    error!(
                        "event=builtin_skipped module=extension status=error error={err}"
                    );
                }
            }
        }
        info!(
            "event=extensions_enabled module=extension status=ok registered={}",
            self.len()
        );
    }

    /// Validates `extension` and, when usable and enabled, starts gathering
    /// its values.
    pub fn register(&self, extension: Arc<dyn DataExtension>) -> RegistrationOutcome {
        let extracted = match ExtensionExtractor::extract(extension.as_ref()) {
            Ok(extracted) => extracted,
            Err(err) => {
                error!(
                    "event=extension_register module=extension status=rejected type={} error={err}",
                    extension.type_name()
                );
                return RegistrationOutcome::Rejected(err);
            }
        };
        let name = extracted.name().to_string();

        if !self.config.has_section(&name) {
            if let Err(err) = self.config.create_section(&name) {
                error!(
                    "event=extension_register module=extension status=error extension={name} error_code=config_section_failed error={err}"
                );
                return RegistrationOutcome::ConfigFailed;
            }
        }
        if !self.config.is_enabled(&name) {
            debug!("event=extension_register module=extension status=disabled extension={name}");
            return RegistrationOutcome::Disabled;
        }

        let _registering = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.read_gatherers().contains_key(&name) {
            warn!(
                "event=extension_register module=extension status=duplicate extension={name}"
            );
            return RegistrationOutcome::AlreadyRegistered;
        }

        for warning in &extracted.warnings {
            warn!(
                "event=extension_warning module=extension status=warn extension={name} warning=\"{warning}\""
            );
        }

        let gatherer = Arc::new(ProviderValueGatherer::new(
            extracted,
            Arc::clone(&self.store),
            self.settings,
        ));
        if let Err(err) = gatherer.store_extension_information() {
            error!(
                "event=extension_metadata module=extension status=error extension={name} error={err}"
            );
        }

        self.write_gatherers().insert(name.clone(), gatherer);

        info!("event=extension_register module=extension status=ok extension={name}");
        RegistrationOutcome::Registered
    }

    /// Runs every registered gatherer for `subject`.
    pub fn update_subject(&self, subject: &Subject) -> UpdateSummary {
        let started_at = Instant::now();
        let mut summary = UpdateSummary::default();

        for gatherer in self.snapshot() {
            match catch_unwind(AssertUnwindSafe(|| gatherer.run(subject))) {
                Ok(report) => summary.add(report),
                Err(payload) => {
                    summary.aborted += 1;
                    error!(
                        "event=extension_update module=extension status=error extension={} subject={subject} error_code=gatherer_panicked payload={}",
                        gatherer.name(),
                        panic_payload_summary(payload.as_ref())
                    );
                }
            }
        }

        debug!(
            "event=extension_update module=extension status=ok subject={subject} extensions={} stored={} skipped={} failed={} aborted={} duration_ms={}",
            summary.extensions,
            summary.stored,
            summary.skipped,
            summary.failed,
            summary.aborted,
            started_at.elapsed().as_millis()
        );
        summary
    }

    pub fn update_player_values(&self, uuid: Uuid, name: &str) -> UpdateSummary {
        self.update_subject(&Subject::player(uuid, name))
    }

    pub fn update_server_values(&self) -> UpdateSummary {
        self.update_subject(&Subject::Server)
    }

    pub fn update_group_values(&self, group: &Group) -> UpdateSummary {
        self.update_subject(&Subject::Group(group.clone()))
    }

    /// Sorted plugin names of registered extensions.
    pub fn registered_names(&self) -> Vec<String> {
        self.read_gatherers().keys().cloned().collect()
    }

    pub fn gatherer(&self, name: &str) -> Option<Arc<ProviderValueGatherer>> {
        self.read_gatherers().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_gatherers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_gatherers().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<ProviderValueGatherer>> {
        self.read_gatherers().values().cloned().collect()
    }

    fn read_gatherers(
        &self,
    ) -> RwLockReadGuard<'_, BTreeMap<String, Arc<ProviderValueGatherer>>> {
        self.gatherers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_gatherers(
        &self,
    ) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<ProviderValueGatherer>>> {
        self.gatherers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
