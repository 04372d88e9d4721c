//! Process-wide log setup for the Rapport binaries.
//!
//! # Responsibility
//! - Turn `AppConfig` log fields into validated [`LogSettings`].
//! - Start one rolling file logger per process, optionally echoed to stderr.
//!
//! # Invariants
//! - Lines are metadata-only (`event=... module=... status=...`); person
//!   names, notes and descriptions never reach a log line.
//! - A second init with identical settings is a no-op; different settings
//!   are rejected instead of silently reconfiguring.

use crate::config::AppConfig;
use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, FlexiLoggerError, LogSpecification, Logger,
    LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_FILE_BASENAME: &str = "rapport";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;
const PANIC_PAYLOAD_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Where log lines go besides the rolling file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogEcho {
    /// File only.
    #[default]
    None,
    /// Info and above are also written to stderr.
    Stderr,
}

/// Validated logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// Absolute directory holding `rapport*.log`.
    pub dir: PathBuf,
    pub echo: LogEcho,
}

impl LogSettings {
    pub fn new(level: &str, dir: impl AsRef<Path>, echo: LogEcho) -> Result<Self, LoggingError> {
        Ok(Self {
            level: parse_level(level)?,
            dir: absolute_dir(dir.as_ref())?,
            echo,
        })
    }

    /// Uses `RAPPORT_LOG_DIR` when configured, `fallback_dir` otherwise.
    pub fn from_config(
        config: &AppConfig,
        fallback_dir: &Path,
        echo: LogEcho,
    ) -> Result<Self, LoggingError> {
        let dir = config.log_dir.as_deref().unwrap_or(fallback_dir);
        Self::new(&config.log_level, dir, echo)
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    RelativeDir(PathBuf),
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    Start(FlexiLoggerError),
    /// Already running with other settings.
    Reconfigure {
        active: LogSettings,
        requested: LogSettings,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error|off"
            ),
            Self::RelativeDir(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDir { dir, source } => write!(
                f,
                "cannot create log directory `{}`: {source}",
                dir.display()
            ),
            Self::Start(err) => write!(f, "cannot start logger: {err}"),
            Self::Reconfigure { active, requested } => write!(
                f,
                "logging already runs at {} in `{}`; refusing {} in `{}`",
                active.level,
                active.dir.display(),
                requested.level,
                requested.dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Start(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts the rolling file logger, or confirms the running one matches.
pub fn init_logging(settings: &LogSettings) -> Result<(), LoggingError> {
    let active = ACTIVE.get_or_try_init(|| start(settings))?;
    if &active.settings != settings {
        return Err(LoggingError::Reconfigure {
            active: active.settings.clone(),
            requested: settings.clone(),
        });
    }
    Ok(())
}

/// Settings of the running logger, if any.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(settings: &LogSettings) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&settings.dir).map_err(|source| LoggingError::CreateDir {
        dir: settings.dir.clone(),
        source,
    })?;

    let echo = match settings.echo {
        LogEcho::None => Duplicate::None,
        LogEcho::Stderr => Duplicate::Info,
    };
    let handle = Logger::with(LogSpecification::builder().default(settings.level).build())
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .duplicate_to_stderr(echo)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Start)?;

    install_panic_hook();
    info!(
        "event=logging_init module=logging status=ok level={} echo={:?} version={}",
        settings.level,
        settings.echo,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let trimmed = level.trim();
    let canonical = if trimmed.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        trimmed
    };
    LevelFilter::from_str(canonical)
        .map_err(|_| LoggingError::UnsupportedLevel(trimmed.to_string()))
}

fn absolute_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDir(dir.to_path_buf()));
    }
    Ok(dir.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string payload".to_string());
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            one_line(&payload, PANIC_PAYLOAD_LIMIT)
        );
        previous(panic_info);
    }));
}

/// Flattens line breaks and caps the length; panic payloads may quote user text.
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut capped: String = flat.chars().take(max_chars).collect();
    capped.push_str("...");
    capped
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, one_line, parse_level, LogEcho, LogSettings, LoggingError,
    };
    use crate::config::AppConfig;
    use log::LevelFilter;
    use std::path::Path;

    #[test]
    fn level_accepts_warning_alias_and_rejects_unknown() {
        assert_eq!(parse_level(" INFO ").unwrap(), LevelFilter::Info);
        assert_eq!(parse_level("warning").unwrap(), LevelFilter::Warn);
        assert!(matches!(
            parse_level("verbose"),
            Err(LoggingError::UnsupportedLevel(level)) if level == "verbose"
        ));
    }

    #[test]
    fn settings_reject_relative_dir() {
        let err = LogSettings::new("info", "logs/dev", LogEcho::None).unwrap_err();
        assert!(matches!(err, LoggingError::RelativeDir(_)));
    }

    #[test]
    fn configured_dir_wins_over_fallback() {
        let configured = tempfile::tempdir().unwrap();
        let config = AppConfig {
            log_level: "debug".to_string(),
            log_dir: Some(configured.path().to_path_buf()),
            ..AppConfig::default()
        };
        let settings =
            LogSettings::from_config(&config, Path::new("/var/log/other"), LogEcho::Stderr)
                .unwrap();
        assert_eq!(settings.dir, configured.path());
        assert_eq!(settings.level, LevelFilter::Debug);

        let unset = AppConfig {
            log_dir: None,
            ..config
        };
        let settings =
            LogSettings::from_config(&unset, Path::new("/var/log/other"), LogEcho::None).unwrap();
        assert_eq!(settings.dir, Path::new("/var/log/other"));
    }

    #[test]
    fn one_line_flattens_and_caps() {
        assert_eq!(one_line("张三\n李四\r王五", 4), "张三 李...");
        assert_eq!(one_line("short", 10), "short");
    }

    #[test]
    fn init_is_idempotent_and_refuses_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let other_dir = tempfile::tempdir().unwrap();
        let settings = LogSettings::new("info", dir.path(), LogEcho::None).unwrap();

        init_logging(&settings).unwrap();
        init_logging(&settings).unwrap();

        let louder = LogSettings::new("debug", dir.path(), LogEcho::None).unwrap();
        assert!(matches!(
            init_logging(&louder),
            Err(LoggingError::Reconfigure { .. })
        ));
        let moved = LogSettings::new("info", other_dir.path(), LogEcho::None).unwrap();
        assert!(init_logging(&moved).is_err());

        assert_eq!(logging_status(), Some(settings));
    }
}
