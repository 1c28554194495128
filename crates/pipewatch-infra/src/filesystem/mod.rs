//! Data directory layout for pipewatch.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   pipewatch.db
//!   workflows/**/*.{yaml,yml,json}
//! ```

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "PIPEWATCH_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PIPEWATCH_DATA_DIR` environment variable
/// 2. `~/.pipewatch`
/// 3. `./.pipewatch`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".pipewatch");
    }

    PathBuf::from(".pipewatch")
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Directory scanned for workflow definitions at start-up.
pub fn workflows_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("workflows")
}

/// File a registered definition is saved to: `workflows/{id}.yaml`.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced with `_` so the id cannot
/// escape the workflows directory.
pub fn workflow_file_path(data_dir: &Path, workflow_id: &str) -> PathBuf {
    let stem: String = workflow_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    let stem = if stem.is_empty() { "workflow" } else { stem };
    workflows_dir(data_dir).join(format!("{stem}.yaml"))
}

/// Create the data directory and its `workflows/` subdirectory.
pub async fn ensure_layout(data_dir: &Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(workflows_dir(data_dir)).await
}
