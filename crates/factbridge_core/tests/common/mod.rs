#![allow(dead_code)]

use factbridge_core::db::open_db_in_memory;
use factbridge_core::model::provider::ExtensionMetadata;
use factbridge_core::{
    DataExtension, ExtensionStore, PluginInfo, ProviderDeclaration, ProviderValue,
    SqliteExtensionStore, StoreError, StoreResult, SubjectKey, TabInfo,
};
use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

type Declarations = Box<dyn Fn() -> Vec<ProviderDeclaration> + Send + Sync>;

/// Extension assembled from closures, for tests only.
pub struct TestExtension {
    info: Option<PluginInfo>,
    declarations: Declarations,
    tabs: Vec<TabInfo>,
    tab_order: Option<Vec<String>>,
}

impl TestExtension {
    pub fn named(
        name: &str,
        declarations: impl Fn() -> Vec<ProviderDeclaration> + Send + Sync + 'static,
    ) -> Self {
        Self {
            info: Some(PluginInfo::new(name)),
            declarations: Box::new(declarations),
            tabs: Vec::new(),
            tab_order: None,
        }
    }

    pub fn anonymous(
        declarations: impl Fn() -> Vec<ProviderDeclaration> + Send + Sync + 'static,
    ) -> Self {
        Self {
            info: None,
            declarations: Box::new(declarations),
            tabs: Vec::new(),
            tab_order: None,
        }
    }

    pub fn with_tabs(mut self, tabs: Vec<TabInfo>) -> Self {
        self.tabs = tabs;
        self
    }

    pub fn with_tab_order(mut self, order: &[&str]) -> Self {
        self.tab_order = Some(order.iter().map(|name| name.to_string()).collect());
        self
    }

    pub fn into_arc(self) -> Arc<dyn DataExtension> {
        Arc::new(self)
    }
}

impl DataExtension for TestExtension {
    fn plugin_info(&self) -> Option<PluginInfo> {
        self.info.clone()
    }

    fn providers(&self) -> Vec<ProviderDeclaration> {
        (self.declarations)()
    }

    fn tabs(&self) -> Vec<TabInfo> {
        self.tabs.clone()
    }

    fn tab_order(&self) -> Option<Vec<String>> {
        self.tab_order.clone()
    }
}

pub fn memory_store() -> Arc<SqliteExtensionStore> {
    let conn = open_db_in_memory().expect("in-memory db");
    Arc::new(SqliteExtensionStore::try_new(conn, Uuid::new_v4()).expect("store"))
}

/// Store wrapper whose value writes fail for selected provider names.
pub struct FlakyStore {
    pub inner: Arc<SqliteExtensionStore>,
    failing: BTreeSet<String>,
}

impl FlakyStore {
    pub fn failing_on(inner: Arc<SqliteExtensionStore>, providers: &[&str]) -> Self {
        Self {
            inner,
            failing: providers.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl ExtensionStore for FlakyStore {
    fn write_extension_metadata(&self, metadata: &ExtensionMetadata) -> StoreResult<()> {
        self.inner.write_extension_metadata(metadata)
    }

    fn write_value(
        &self,
        extension: &str,
        provider: &str,
        subject: &SubjectKey,
        value: &ProviderValue,
    ) -> StoreResult<()> {
        if self.failing.contains(provider) {
            return Err(StoreError::InvalidData(format!(
                "write to `{provider}` rejected"
            )));
        }
        self.inner.write_value(extension, provider, subject, value)
    }
}

/// Store wrapper that stalls every metadata write.
pub struct SlowMetadataStore {
    pub inner: Arc<SqliteExtensionStore>,
    delay: Duration,
}

impl SlowMetadataStore {
    pub fn new(inner: Arc<SqliteExtensionStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl ExtensionStore for SlowMetadataStore {
    fn write_extension_metadata(&self, metadata: &ExtensionMetadata) -> StoreResult<()> {
        std::thread::sleep(self.delay);
        self.inner.write_extension_metadata(metadata)
    }

    fn write_value(
        &self,
        extension: &str,
        provider: &str,
        subject: &SubjectKey,
        value: &ProviderValue,
    ) -> StoreResult<()> {
        self.inner.write_value(extension, provider, subject, value)
    }
}

struct CapturingLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let line = format!("{} {}", record.level(), record.args());
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }

    fn flush(&self) {}
}

static LOGGER: Lazy<CapturingLogger> = Lazy::new(|| CapturingLogger {
    lines: Mutex::new(Vec::new()),
});

/// Routes `log` records of this test binary into memory.
pub fn capture_logs() {
    if log::set_logger(&*LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
}

/// Captured lines containing every needle.
pub fn logged_lines(needles: &[&str]) -> Vec<String> {
    LOGGER
        .lines
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .filter(|line| needles.iter().all(|needle| line.contains(needle)))
        .cloned()
        .collect()
}
