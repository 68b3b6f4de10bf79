use anyhow::{Context, Result};
use chrono::Local;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config;

const DEFAULT_FILTER: &str = "octofeed=info";

/// Initialize tracing. The TUI owns the terminal, so by default logs go to
/// a timestamp-named file under the data directory; `to_stderr` is for the
/// one-shot subcommands. The filter comes from `RUST_LOG`.
pub fn init_tracing(to_stderr: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if to_stderr {
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::Layer::default()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter);
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set tracing subscriber")?;
        return Ok(());
    }

    let log_dir = config::data_home().join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("cannot create {}", log_dir.display()))?;
    let file_name = format!("{}.log", Local::now().format("%Y%m%d_%H%M%S"));
    let file_appender = rolling::never(&log_dir, &file_name);

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::debug!(
        path = %log_dir.join(&file_name).display(),
        "tracing initialized with file output"
    );
    Ok(())
}
