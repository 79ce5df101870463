//! Logging utilities
//!
//! Logger initialisation and standardized messages for file operations.

use std::path::Path;

/// Initialise `env_logger`, honouring `RUST_LOG` and falling back to `level`
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();
}

/// Log the start of a file operation
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log an operation completion with item count and optional elapsed time
pub fn log_operation_complete(
    operation: &str,
    path: &Path,
    items: usize,
    elapsed: Option<std::time::Duration>,
) {
    match elapsed {
        Some(duration) => log::info!(
            "Successfully {operation} {items} items at {} in {duration:?}",
            path.display()
        ),
        None => log::info!("Successfully {operation} {items} items at {}", path.display()),
    }
}

/// Log a warning, optionally tied to a path
pub fn log_warning(message: &str, path: Option<&Path>) {
    if let Some(path) = path {
        log::warn!("{}: {}", message, path.display());
    } else {
        log::warn!("{message}");
    }
}
