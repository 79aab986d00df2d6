//! Process-wide log sink for factbridge hosts.
//!
//! # Responsibility
//! - Route `log` records into size-rotated files under one directory.
//! - Report panics that reach the process hook as one `event=panic` line.
//! - Condense panic payloads for the gatherer and service failure logs.
//!
//! # Invariants
//! - The sink is configured at most once per process. Repeating the active
//!   level and directory is a no-op; any other pair is `AlreadyActive`.
//! - Setup reports every failure as a `LoggingError` and never panics.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "factbridge";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_PAYLOAD_MAX_CHARS: usize = 160;

static SINK: OnceCell<ActiveSink> = OnceCell::new();

struct ActiveSink {
    level: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

/// Failure to configure the log sink.
#[derive(Debug)]
pub enum LoggingError {
    /// Not a `log` level name, or `off`.
    UnknownLevel(String),
    /// Directory is empty or relative.
    RelativeDir(String),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// The sink already writes with another level or directory.
    AlreadyActive { level: LevelFilter, dir: PathBuf },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`; use trace, debug, info, warn or error"
            ),
            Self::RelativeDir(dir) => write!(f, "log directory `{dir}` is not absolute"),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "log backend failed to start: {err}"),
            Self::AlreadyActive { level, dir } => write!(
                f,
                "logging is already active at level {level} in `{}`",
                dir.display()
            ),
        }
    }
}

impl std::error::Error for LoggingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FlexiLoggerError> for LoggingError {
    fn from(err: FlexiLoggerError) -> Self {
        Self::Backend(err)
    }
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - `UnknownLevel` / `RelativeDir` for unusable arguments.
/// - `CreateDir` / `Backend` when the sink cannot start.
/// - `AlreadyActive` when an earlier call chose another level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let dir = absolute_dir(log_dir)?;

    let sink = SINK.get_or_try_init(|| start_sink(level, &dir))?;
    if sink.level != level || sink.dir != dir {
        return Err(LoggingError::AlreadyActive {
            level: sink.level,
            dir: sink.dir.clone(),
        });
    }
    Ok(())
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(raw: &str) -> Result<LevelFilter, LoggingError> {
    let raw = raw.trim();
    match raw.parse::<LevelFilter>() {
        Ok(LevelFilter::Off) | Err(_) => Err(LoggingError::UnknownLevel(raw.to_string())),
        Ok(level) => Ok(level),
    }
}

fn absolute_dir(raw: &str) -> Result<PathBuf, LoggingError> {
    let path = Path::new(raw.trim());
    if path.as_os_str().is_empty() || !path.is_absolute() {
        return Err(LoggingError::RelativeDir(raw.trim().to_string()));
    }
    Ok(path.to_path_buf())
}

fn start_sink(level: LevelFilter, dir: &Path) -> Result<ActiveSink, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::try_with_str(level.as_str().to_ascii_lowercase())?
        .log_to_file(
            FileSpec::default()
                .directory(dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()?;

    report_panics();
    info!(
        "event=logging_init module=logging status=ok level={level} log_dir={} version={} os={}",
        dir.display(),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveSink {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

// Runs once: only a successful sink start reaches it.
fn report_panics() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |location| format!("{}:{}", location.file(), location.line()),
        );
        error!(
            "event=panic module=logging status=error location={location} payload={}",
            panic_payload_summary(info.payload())
        );
        previous(info);
    }));
}

/// One-line, length-capped text of a panic payload.
///
/// Payloads may carry extension-controlled text.
pub(crate) fn panic_payload_summary(payload: &(dyn Any + Send)) -> String {
    let text = match (
        payload.downcast_ref::<&str>(),
        payload.downcast_ref::<String>(),
    ) {
        (Some(text), _) => *text,
        (None, Some(text)) => text.as_str(),
        (None, None) => return "non-string panic payload".to_string(),
    };

    let mut summary: String = text
        .chars()
        .take(PANIC_PAYLOAD_MAX_CHARS)
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect();
    if text.chars().nth(PANIC_PAYLOAD_MAX_CHARS).is_some() {
        summary.push_str("...");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::{
        absolute_dir, init_logging, panic_payload_summary, parse_level, LoggingError,
        PANIC_PAYLOAD_MAX_CHARS,
    };
    use log::LevelFilter;
    use std::any::Any;

    #[test]
    fn level_names_parse_case_insensitively() {
        assert_eq!(parse_level(" Warn ").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_level("TRACE").unwrap(), LevelFilter::Trace);
    }

    #[test]
    fn off_and_unknown_levels_are_rejected() {
        for raw in ["off", "loud", ""] {
            assert!(matches!(
                parse_level(raw),
                Err(LoggingError::UnknownLevel(_))
            ));
        }
    }

    #[test]
    fn relative_or_blank_directories_are_rejected() {
        for raw in ["logs/dev", "  "] {
            let err = absolute_dir(raw).unwrap_err();
            assert!(matches!(err, LoggingError::RelativeDir(_)));
            assert!(err.to_string().contains("not absolute"));
        }
    }

    #[test]
    fn payload_summary_flattens_and_caps_text() {
        let borrowed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_payload_summary(borrowed.as_ref()), "boom");

        let owned: Box<dyn Any + Send> = Box::new("line\r\nbreak".to_string());
        assert_eq!(panic_payload_summary(owned.as_ref()), "line  break");

        let long: Box<dyn Any + Send> = Box::new("x".repeat(PANIC_PAYLOAD_MAX_CHARS + 1));
        let summary = panic_payload_summary(long.as_ref());
        assert_eq!(summary.chars().count(), PANIC_PAYLOAD_MAX_CHARS + 3);
        assert!(summary.ends_with("..."));

        let exact: Box<dyn Any + Send> = Box::new("y".repeat(PANIC_PAYLOAD_MAX_CHARS));
        assert!(!panic_payload_summary(exact.as_ref()).ends_with("..."));

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(
            panic_payload_summary(other.as_ref()),
            "non-string panic payload"
        );
    }

    #[test]
    fn sink_accepts_its_own_settings_again_and_nothing_else() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("logs");
        let active_str = active.to_str().unwrap();
        let other = dir.path().join("elsewhere");

        init_logging("info", active_str).unwrap();
        init_logging(" INFO ", active_str).unwrap();
        assert!(active.is_dir());

        let err = init_logging("debug", active_str).unwrap_err();
        assert!(matches!(
            err,
            LoggingError::AlreadyActive { level: LevelFilter::Info, .. }
        ));
        let err = init_logging("info", other.to_str().unwrap()).unwrap_err();
        match err {
            LoggingError::AlreadyActive { dir, .. } => assert_eq!(dir, active),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!other.exists());
    }
}
