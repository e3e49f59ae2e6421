//! Tracing subscriber setup: console output plus an optional log file.

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{BookingError, Result};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

fn fmt_layer<S, W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    match format {
        LogFormat::Default => layer.boxed(),
        LogFormat::Simple => layer.without_time().with_target(false).boxed(),
        LogFormat::Detailed => layer.with_file(true).with_line_number(true).boxed(),
    }
}

/// Build the env filter: `RUST_LOG` wins over the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "roombot={level},reqwest=warn,hyper=warn,hyper_util=warn"
        ))
    })
}

/// Install the global subscriber.
///
/// An empty `file` logs to the console only. The returned guard flushes the
/// file writer on drop and must be held for the lifetime of the process.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer<_>> = vec![fmt_layer(config.format, std::io::stderr, true)];

    let guard = match config.file_path() {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(
                path,
                config.add_date_to_filename,
            )?);
            layers.push(fmt_layer(config.format, writer, false));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(&config.level))
        .try_init()
        .map_err(|e| BookingError::Config(format!("cannot install logger: {e}")))?;

    Ok(guard)
}

/// Daily rolling (`roombot.log.2025-07-24`) or a single fixed file.
fn file_appender(
    path: &Path,
    add_date: bool,
) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| BookingError::Config(format!("log file {} has no name", path.display())))?;

    Ok(if add_date {
        tracing_appender::rolling::daily(dir, file_name)
    } else {
        tracing_appender::rolling::never(dir, file_name)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn file_appender_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("roombot.log");
        assert!(file_appender(&path, false).is_ok());
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn file_appender_rejects_nameless_path() {
        assert!(file_appender(Path::new("/"), true).is_err());
    }
}
