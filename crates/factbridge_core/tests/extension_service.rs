mod common;

use common::{capture_logs, logged_lines, memory_store, SlowMetadataStore, TestExtension};
use factbridge_core::extension::holder;
use factbridge_core::{
    BuiltinFactory, ConfigError, DataExtension, ExtensionService, ExtractionError, PluginsConfig,
    PluginsConfigSection, ProviderDeclaration, ProviderError, ProviderValue,
    RegistrationOutcome, SqliteExtensionStore, Subject, SubjectKey,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn service_with(
    config: Arc<PluginsConfigSection>,
) -> (ExtensionService, Arc<SqliteExtensionStore>) {
    let store = memory_store();
    let service = ExtensionService::new(config, store.clone());
    (service, store)
}

fn service() -> (ExtensionService, Arc<SqliteExtensionStore>) {
    service_with(Arc::new(PluginsConfigSection::in_memory()))
}

fn healthy(name: &str, value: i64) -> Arc<dyn DataExtension> {
    TestExtension::named(name, move || {
        vec![
            ProviderDeclaration::number("score", move |_| Ok(value)).for_player(),
            ProviderDeclaration::boolean("isActive", |_| Ok(true)).for_player(),
        ]
    })
    .into_arc()
}

fn always_failing(name: &str) -> Arc<dyn DataExtension> {
    TestExtension::named(name, || {
        vec![
            ProviderDeclaration::number("brokenCounter", |_| {
                Err(ProviderError::failed("backend unavailable"))
            })
            .for_player(),
        ]
    })
    .into_arc()
}

#[test]
fn failing_extension_does_not_affect_the_others() {
    capture_logs();
    let (service, store) = service();
    assert!(service.register(healthy("Alpha", 7)).is_registered());
    assert!(service.register(always_failing("Beta")).is_registered());
    assert!(service.register(healthy("Gamma", 9)).is_registered());

    let player = Uuid::new_v4();
    let summary = service.update_player_values(player, "Steve");
    assert_eq!(summary.extensions, 3);
    assert_eq!(summary.aborted, 0);
    assert_eq!(summary.stored, 4);
    assert_eq!(summary.failed, 1);

    let key = SubjectKey::Player(player);
    for (name, score) in [("Alpha", 7), ("Gamma", 9)] {
        assert_eq!(
            store.read_value(name, "score", &key).unwrap(),
            Some(ProviderValue::Number(score))
        );
        assert_eq!(
            store.read_value(name, "isActive", &key).unwrap(),
            Some(ProviderValue::Boolean(true))
        );
    }
    assert_eq!(store.read_value("Beta", "brokenCounter", &key).unwrap(), None);

    let warnings = logged_lines(&[
        "event=provider_failed",
        "extension=Beta",
        "provider=brokenCounter",
    ]);
    assert!(!warnings.is_empty(), "failure of Beta must be logged");
    assert!(warnings[0].starts_with("WARN"));
}

#[test]
fn extension_without_providers_never_enters_the_registry() {
    let (service, store) = service();
    let outcome = service.register(TestExtension::named("Hollow", Vec::new).into_arc());

    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected(ExtractionError::NoProviders {
            extension: "Hollow".to_string()
        })
    );
    assert!(service.is_empty());
    assert!(service.gatherer("Hollow").is_none());
    assert!(store.plugin_names().unwrap().is_empty());
}

#[test]
fn extension_without_identity_is_rejected_without_metadata() {
    let (service, store) = service();
    let outcome = service.register(
        TestExtension::anonymous(|| {
            vec![ProviderDeclaration::number("count", |_| Ok(1))]
        })
        .into_arc(),
    );

    assert!(matches!(
        outcome,
        RegistrationOutcome::Rejected(ExtractionError::MissingPluginInfo { .. })
    ));
    assert_eq!(service.len(), 0);
    assert!(store.plugin_names().unwrap().is_empty());
}

#[test]
fn registration_stores_metadata_and_creates_enabled_section() {
    let config = Arc::new(PluginsConfigSection::in_memory());
    let (service, store) = service_with(config.clone());

    assert_eq!(
        service.register(healthy("Alpha", 1)),
        RegistrationOutcome::Registered
    );
    assert!(config.has_section("Alpha"));
    assert!(config.is_enabled("Alpha"));
    assert_eq!(store.plugin_names().unwrap(), vec!["Alpha".to_string()]);
    assert_eq!(store.list_providers("Alpha").unwrap().len(), 2);
    assert_eq!(service.registered_names(), vec!["Alpha".to_string()]);
}

#[test]
fn disabled_extension_is_not_registered() {
    let config = Arc::new(PluginsConfigSection::in_memory());
    config.set_enabled("Alpha", false).unwrap();
    let (service, store) = service_with(config);

    assert_eq!(
        service.register(healthy("Alpha", 1)),
        RegistrationOutcome::Disabled
    );
    assert!(service.is_empty());
    assert!(store.plugin_names().unwrap().is_empty());
}

struct BrokenConfig;

impl PluginsConfig for BrokenConfig {
    fn has_section(&self, _plugin: &str) -> bool {
        false
    }

    fn create_section(&self, _plugin: &str) -> Result<(), ConfigError> {
        Err(ConfigError::Io {
            path: PathBuf::from("/read-only/plugins.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn is_enabled(&self, _plugin: &str) -> bool {
        true
    }
}

#[test]
fn config_failure_aborts_registration() {
    let store = memory_store();
    let service = ExtensionService::new(Arc::new(BrokenConfig), store.clone());

    assert_eq!(
        service.register(healthy("Alpha", 1)),
        RegistrationOutcome::ConfigFailed
    );
    assert!(service.is_empty());
    assert!(store.plugin_names().unwrap().is_empty());
}

#[test]
fn second_extension_with_same_name_is_rejected() {
    let (service, store) = service();
    assert!(service.register(healthy("Alpha", 1)).is_registered());
    assert_eq!(
        service.register(healthy("Alpha", 2)),
        RegistrationOutcome::AlreadyRegistered
    );

    let player = Uuid::new_v4();
    service.update_player_values(player, "Steve");
    assert_eq!(
        store
            .read_value("Alpha", "score", &SubjectKey::Player(player))
            .unwrap(),
        Some(ProviderValue::Number(1))
    );
}

#[test]
fn concurrent_same_name_registrations_keep_the_winner_metadata() {
    let inner = memory_store();
    let store = Arc::new(SlowMetadataStore::new(
        inner.clone(),
        Duration::from_millis(200),
    ));
    let service = ExtensionService::new(Arc::new(PluginsConfigSection::in_memory()), store);
    let shop = |provider: &'static str| {
        TestExtension::named("Shop", move || {
            vec![ProviderDeclaration::number(provider, |_| Ok(5))]
        })
        .into_arc()
    };

    let outcomes = std::thread::scope(|scope| {
        let first = scope.spawn(|| service.register(shop("sales")));
        let second = scope.spawn(|| service.register(shop("refunds")));
        vec![first.join().unwrap(), second.join().unwrap()]
    });
    assert_eq!(
        outcomes.iter().filter(|outcome| outcome.is_registered()).count(),
        1
    );
    assert!(outcomes.contains(&RegistrationOutcome::AlreadyRegistered));

    let winner = service.gatherer("Shop").expect("registered gatherer");
    let winner_providers: Vec<String> = winner
        .extension()
        .providers
        .iter()
        .map(|provider| provider.descriptor.name.clone())
        .collect();
    let stored_providers: Vec<String> = inner
        .list_providers("Shop")
        .unwrap()
        .into_iter()
        .map(|provider| provider.name)
        .collect();
    assert_eq!(stored_providers, winner_providers);

    let summary = service.update_server_values();
    assert_eq!(summary.stored, 1);
    assert_eq!(summary.failed, 0);
}

fn missing_dependency() -> Result<Arc<dyn DataExtension>, ProviderError> {
    Err(ProviderError::dependency_missing("economy plugin not installed"))
}

fn server_counter() -> Result<Arc<dyn DataExtension>, ProviderError> {
    Ok(TestExtension::named("Counter", || {
        vec![ProviderDeclaration::number("ticks", |_| Ok(20))]
    })
    .into_arc())
}

#[test]
fn enable_registers_builtins_and_skips_missing_dependencies() {
    let store = memory_store();
    let builtins: Vec<BuiltinFactory> = vec![missing_dependency, server_counter];
    let service = ExtensionService::new(Arc::new(PluginsConfigSection::in_memory()), store.clone())
        .with_builtins(builtins);

    service.enable();
    assert_eq!(service.registered_names(), vec!["Counter".to_string()]);

    let summary = service.update_server_values();
    assert_eq!(summary.stored, 1);
    assert_eq!(
        store
            .read_value("Counter", "ticks", &SubjectKey::Server)
            .unwrap(),
        Some(ProviderValue::Number(20))
    );
}

#[test]
fn default_builtins_gather_server_values() {
    let store = memory_store();
    let service = ExtensionService::new(Arc::new(PluginsConfigSection::in_memory()), store.clone())
        .with_builtins(factbridge_core::default_builtins());

    service.enable();
    let summary = service.update_server_values();

    assert_eq!(summary.failed, 0);
    assert_eq!(summary.stored, 3);
    assert_eq!(
        store
            .read_value("Host Process", "operatingSystem", &SubjectKey::Server)
            .unwrap(),
        Some(ProviderValue::Text(std::env::consts::OS.to_string()))
    );
}

#[test]
fn updates_and_registrations_can_run_concurrently() {
    let (service, _store) = service();
    let calls = Arc::new(AtomicUsize::new(0));
    for index in 0..4 {
        let counter = calls.clone();
        let extension = TestExtension::named(&format!("Ext{index}"), move || {
            let counter = counter.clone();
            vec![ProviderDeclaration::number("visits", move |_| {
                Ok(i64::try_from(counter.fetch_add(1, Ordering::SeqCst)).unwrap_or(0))
            })
            .for_player()]
        });
        assert!(service.register(extension.into_arc()).is_registered());
    }

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    let summary = service.update_player_values(Uuid::new_v4(), "Steve");
                    assert_eq!(summary.failed, 0);
                }
            });
        }
        scope.spawn(|| {
            for index in 4..8 {
                service.register(healthy(&format!("Late{index}"), 1));
            }
        });
    });

    assert_eq!(calls.load(Ordering::SeqCst), 4 * 4 * 10);
    assert_eq!(service.len(), 8);
}

#[test]
fn holder_exposes_one_installed_service() {
    let first = Arc::new(service().0);
    let second = Arc::new(service().0);

    assert!(holder::install(first.clone()).is_ok());
    assert!(holder::install(second).is_err());
    let installed = holder::get().expect("installed service");
    assert!(Arc::ptr_eq(&installed, &first));
}

#[test]
fn subject_helpers_target_their_shapes() {
    let (service, store) = service();
    let extension = TestExtension::named("Shapes", || {
        vec![
            ProviderDeclaration::number("online", |_| Ok(3)),
            ProviderDeclaration::string("motto", |subject| {
                Ok(format!("{} rule", subject.group().map(|g| g.name()).unwrap_or("nobody")))
            })
            .for_group(),
        ]
    });
    assert!(service.register(extension.into_arc()).is_registered());

    let group = factbridge_core::Group::new("admins");
    assert_eq!(service.update_group_values(&group).stored, 1);
    assert_eq!(service.update_subject(&Subject::Server).stored, 1);
    assert_eq!(
        store
            .read_value("Shapes", "motto", &SubjectKey::Group("admins".to_string()))
            .unwrap(),
        Some(ProviderValue::Text("admins rule".to_string()))
    );
}
