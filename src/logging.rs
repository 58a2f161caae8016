// src/logging.rs
//
// Log setup shared by both binaries: `tracing` records formatted with local
// `HH:MM:SS.mmm` timestamps on stderr, optionally teed to a log file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Global log file handle. When `Some`, every record is also written here.
pub(crate) static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// stderr plus the optional log file.
struct TeeWriter;

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write_all(buf)?;
        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(ref mut f) = *guard {
                let _ = f.write_all(buf);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(ref mut f) = *guard {
                let _ = f.flush();
            }
        }
        std::io::stderr().flush()
    }
}

/// Install the global subscriber. `RUST_LOG` wins unless `verbose` is set;
/// the fallback level is `info`. Calling this twice is harmless.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(false)
        .with_ansi(false)
        .with_writer(|| TeeWriter)
        .try_init();
}

/// Start teeing log output to a timestamped file in `reports_dir`.
/// Also points a `paddle.log` symlink at it (Unix only).
pub fn init_file_logging(reports_dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(reports_dir)?;

    let filename = chrono::Local::now()
        .format("%Y%m%d-%H%M%S-paddle.log")
        .to_string();
    let log_path = reports_dir.join(&filename);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Windows symlinks require elevated privileges
    #[cfg(unix)]
    {
        let symlink_path = reports_dir.join("paddle.log");
        let _ = std::fs::remove_file(&symlink_path);
        if let Err(e) = std::os::unix::fs::symlink(&filename, &symlink_path) {
            tracing::warn!("failed to create paddle.log symlink: {}", e);
        }
    }

    if let Ok(mut guard) = LOG_FILE.lock() {
        *guard = Some(file);
    }
    tracing::info!("file logging started: {}", log_path.display());
    Ok(log_path)
}

/// Stop file logging and close the log file.
pub fn stop_file_logging() {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if guard.take().is_some() {
            drop(guard);
            tracing::info!("file logging stopped");
        }
    }
}
