use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "adaptive-tutor.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    /// Daily rolling log files are written here when set.
    pub file_dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn from_env(level: &str) -> Self {
        let enabled = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let file_dir = enabled.then(|| {
            PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()))
        });

        Self {
            level: level.to_string(),
            file_dir,
        }
    }
}

/// Flushes buffered file output when dropped; hold it for the process lifetime.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn init_tracing(config: &LogConfig) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match config.file_dir.as_deref().map(file_writer) {
        Some(Ok((writer, guard))) => {
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        Some(Err(err)) => {
            eprintln!("file logging disabled: {err}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    guard
}

fn file_writer(
    dir: &Path,
) -> std::io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}
