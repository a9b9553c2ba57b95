//! Process-wide logging setup.
//!
//! [`init_logging`] wires `tracing` to a daily-rolling file (plus stderr on
//! request) and is safe to call from every entry point: the first caller
//! installs the subscriber, later callers just get the resolved log path
//! back. The non-blocking writer's guard is parked in a static so the sink
//! survives for the life of the process.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// What the first successful [`init_logging`] call left behind.
struct Installed {
    path: PathBuf,
    _guard: WorkerGuard,
}

static INSTALLED: OnceLock<Installed> = OnceLock::new();

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Text,
    Json,
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component; used for file names and the default
    /// log directory.
    pub app_name: &'static str,
    /// Explicit directory for log output. If `None`, `WEBPILOT_LOG_DIR` is
    /// consulted, then `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Duplicate events to `stderr` in addition to the file sink.
    pub emit_stderr: bool,
    /// Preferred log encoding.
    pub format: LogFormat,
    /// Filter applied when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "webpilot",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info",
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global `tracing` subscriber and return the path of today's
/// log file. Idempotent; repeat calls return the original path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(installed) = INSTALLED.get() {
        return Ok(installed.path.clone());
    }

    let dir = log_directory(&config);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let file_stem = format!("{}.log", config.app_name);
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_stem));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter));

    let mut layers: Vec<BoxedLayer> = vec![filter.boxed(), file_sink(config.format, writer)];
    if config.emit_stderr {
        layers.push(stderr_sink(config.format));
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let path = dir.join(rolled_file_name(&file_stem));
    let _ = INSTALLED.set(Installed {
        path: path.clone(),
        _guard: guard,
    });
    Ok(path)
}

fn file_sink(format: LogFormat, writer: NonBlocking) -> BoxedLayer {
    match format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    }
}

fn stderr_sink(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    }
}

/// The daily roller appends the date as a suffix, `<stem>.<YYYY-MM-DD>`.
fn rolled_file_name(stem: &str) -> String {
    format!("{stem}.{}", Local::now().format("%Y-%m-%d"))
}

/// Directory precedence: explicit config, `WEBPILOT_LOG_DIR`, then a
/// per-user data directory.
fn log_directory(config: &LogConfig) -> PathBuf {
    let chosen = config
        .log_dir
        .clone()
        .or_else(|| std::env::var_os("WEBPILOT_LOG_DIR").map(PathBuf::from));

    match chosen {
        Some(dir) => home_relative(&dir),
        None => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home)
                .join(".local")
                .join("share")
                .join(config.app_name),
            None => Path::new(".").join(config.app_name),
        },
    }
}

/// A leading `~` component resolves against `$HOME`; everything else
/// passes through untouched.
fn home_relative(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_dir(dir: Option<&str>) -> LogConfig {
        LogConfig {
            log_dir: dir.map(PathBuf::from),
            ..LogConfig::default()
        }
    }

    #[test]
    fn explicit_dir_wins_over_env() {
        temp_env::with_var("WEBPILOT_LOG_DIR", Some("/tmp/from-env"), || {
            let dir = log_directory(&config_with_dir(Some("/tmp/explicit")));
            assert_eq!(dir, PathBuf::from("/tmp/explicit"));
        });
    }

    #[test]
    fn env_dir_used_when_no_explicit() {
        temp_env::with_var("WEBPILOT_LOG_DIR", Some("/tmp/from-env"), || {
            let dir = log_directory(&config_with_dir(None));
            assert_eq!(dir, PathBuf::from("/tmp/from-env"));
        });
    }

    #[test]
    fn default_lands_in_the_user_data_dir() {
        temp_env::with_vars(
            [
                ("WEBPILOT_LOG_DIR", None::<&str>),
                ("HOME", Some("/home/pilot")),
            ],
            || {
                let dir = log_directory(&config_with_dir(None));
                assert_eq!(dir, PathBuf::from("/home/pilot/.local/share/webpilot"));
            },
        );
    }

    #[test]
    fn tilde_resolves_against_home() {
        temp_env::with_var("HOME", Some("/home/pilot"), || {
            assert_eq!(
                home_relative(Path::new("~/logs")),
                PathBuf::from("/home/pilot/logs")
            );
            assert_eq!(
                home_relative(Path::new("/var/log/webpilot")),
                PathBuf::from("/var/log/webpilot")
            );
        });
    }

    #[test]
    fn rolled_name_carries_the_date_suffix() {
        let name = rolled_file_name("webpilot.log");
        assert!(name.starts_with("webpilot.log."));
        assert_eq!(name.len(), "webpilot.log.".len() + 10);
    }
}
