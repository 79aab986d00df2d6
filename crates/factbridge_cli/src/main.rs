//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire config, SQLite store and extension service end to end.
//! - Run one server pass over the built-in extensions and print what was
//!   stored.
//!
//! Usage: `factbridge_cli [db_path] [config_path]`. Without `db_path` the
//! database lives in memory; without `config_path` so does the config.
//! `FACTBRIDGE_LOG_DIR` (absolute) enables file logging.

use factbridge_core::db::{open_db, open_db_in_memory};
use factbridge_core::{
    default_builtins, default_log_level, init_logging, ExtensionService, LoggingError,
    PluginsConfig, PluginsConfigSection, SqliteExtensionStore, SubjectKey,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("factbridge: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    init_logging_from(std::env::var("FACTBRIDGE_LOG_DIR").ok().as_deref())?;

    let mut args = std::env::args().skip(1);
    let conn = match args.next() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let config: Arc<dyn PluginsConfig> = match args.next() {
        Some(path) => Arc::new(PluginsConfigSection::load(path)?),
        None => Arc::new(PluginsConfigSection::in_memory()),
    };

    let store = Arc::new(SqliteExtensionStore::try_new(conn, Uuid::new_v4())?);
    let service =
        ExtensionService::new(config, store.clone()).with_builtins(default_builtins());
    service.enable();

    let summary = service.update_server_values();
    info!(
        "event=cli_pass module=cli status=ok extensions={} stored={}",
        summary.extensions, summary.stored
    );

    println!("factbridge_core version={}", factbridge_core::core_version());
    println!("server={}", store.server_uuid());
    for extension in store.plugin_names()? {
        println!("[{extension}]");
        for provider in store.list_providers(&extension)? {
            let value = store.read_value(&extension, &provider.name, &SubjectKey::Server)?;
            match value {
                Some(value) => println!("  {} = {value:?}", provider.text),
                None => println!("  {} = <none>", provider.text),
            }
        }
    }
    println!(
        "stored={} skipped={} failed={}",
        summary.stored, summary.skipped, summary.failed
    );
    Ok(())
}

/// Starts file logging when a directory is configured; `Ok(false)` otherwise.
fn init_logging_from(log_dir: Option<&str>) -> Result<bool, LoggingError> {
    let Some(log_dir) = log_dir else {
        return Ok(false);
    };
    init_logging(default_log_level(), log_dir)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::init_logging_from;
    use factbridge_core::LoggingError;

    #[test]
    fn logging_stays_off_without_a_directory() {
        assert!(!init_logging_from(None).unwrap());
    }

    #[test]
    fn relative_log_directory_fails_the_run() {
        let err = init_logging_from(Some("logs")).unwrap_err();
        assert!(matches!(err, LoggingError::RelativeDir(ref dir) if dir == "logs"));
    }

    #[test]
    fn configured_directory_starts_file_logging() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("cli-logs");
        let log_dir = log_dir.to_str().unwrap();

        assert!(init_logging_from(Some(log_dir)).unwrap());
        assert!(init_logging_from(Some(log_dir)).unwrap());
        assert!(dir.path().join("cli-logs").is_dir());
    }
}
