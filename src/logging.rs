//! Log sink setup: console plus an append-only file

use std::path::Path;

use anyhow::Context;
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bookshelf_server={}", config.level).into());
    let json = config.format.eq_ignore_ascii_case("json");

    let console = if json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let (file, guard) = match file_writer(&config.file)? {
        Some((writer, guard)) => {
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            let layer = if json { layer.json().boxed() } else { layer.boxed() };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Non-blocking writer appending to `path`; `None` when the path is empty
fn file_writer(path: &str) -> anyhow::Result<Option<(NonBlocking, WorkerGuard)>> {
    if path.trim().is_empty() {
        return Ok(None);
    }

    let path = Path::new(path);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy().into_owned())
        .build(directory)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok(Some(tracing_appender::non_blocking(appender)))
}
