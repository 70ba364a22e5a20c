//! File logging setup
//!
//! Each process logs to its own file so a terminal front end can keep the
//! screen free of log output.

use crate::config::Settings;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Where logs go unless told otherwise
pub fn default_log_dir() -> PathBuf {
    Settings::project_dirs()
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("blockfall"))
}

/// Install the global subscriber writing to a fresh file under `dir`.
///
/// Keep the returned guard alive for as long as logs should be flushed.
/// `RUST_LOG` directives are honoured on top of `blockfall=debug`.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;
    let session_id: u32 = rand::random();
    let log_file = format!("{:08x}.log", session_id);

    let file_appender = tracing_appender::rolling::never(dir, &log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let directive: Directive = "blockfall=debug"
        .parse()
        .map_err(|e| Error::Logging(format!("bad directive: {}", e)))?;

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::info!(
        "blockfall logging started, session={:08x}, log={}",
        session_id,
        dir.join(&log_file).display()
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_log_dir_once() {
        let dir = std::env::temp_dir().join(format!("blockfall-log-test-{:08x}", rand::random::<u32>()));
        let guard = init(&dir).unwrap();
        assert!(dir.is_dir());

        // Only one global subscriber per process
        assert!(matches!(init(&dir), Err(Error::Logging(_))));

        drop(guard);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
