use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hostwatch")
        .join("hostwatch.log")
}

/// Builds the filter from `RUST_LOG` when set, else from `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the process-wide subscriber. Logs go to a file because the
/// terminal belongs to the dashboard.
pub fn init(path: &Path, level: &str, format: LogFormat) -> Result<()> {
    ensure_parent_dir(path)?;
    let file = File::options().create(true).append(true).open(path)?;

    let builder = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(env_filter(level))
        .with_writer(Mutex::new(file));

    let result = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    result.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_path_is_named_after_crate() {
        let path = default_log_path();
        assert!(path.ends_with("hostwatch/hostwatch.log"));
    }

    #[test]
    fn explicit_level_builds_filter() {
        let filter = EnvFilter::new("hostwatch=debug");
        assert!(filter.to_string().contains("hostwatch=debug"));
        let _ = env_filter("info");
    }
}
