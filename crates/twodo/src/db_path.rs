//! Database path resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Database filename under the settings directory.
pub const DB_FILENAME: &str = "twodo.db";

/// Pick the database path: CLI flag, then `store.dbPath`, then
/// `~/.twodo/twodo.db`.
#[must_use]
pub fn resolve(cli: Option<PathBuf>, configured: &str, settings_dir: &Path) -> PathBuf {
    cli.or_else(|| (!configured.is_empty()).then(|| PathBuf::from(configured)))
        .unwrap_or_else(|| settings_dir.join(DB_FILENAME))
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}
