//! Centralized directory structure management for the roster service
//!
//! Directory layout:
//! ```text
//! roster_data/
//! ├── local/           # SQLite database
//! └── uploads/         # Proof-of-ID documents (local document backend)
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides the data root.
pub const ROOT_ENV: &str = "ROSTER_ROOT";

const DEFAULT_ROOT: &str = "roster_data";

/// Optional `config.json` under the user's config dir, written by operators.
#[derive(Deserialize, Debug)]
struct RosterConfig {
    roster_root: Option<PathBuf>,
}

/// Get the global configuration path
fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("staff_roster").join("config.json"))
}

/// Load the persistent root from config file
pub fn load_persistent_root() -> Option<PathBuf> {
    read_root_file(&get_config_path()?)
}

fn read_root_file(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<RosterConfig>(&content) {
            Ok(config) => config.roster_root,
            Err(e) => {
                warn!("Failed to parse config file at {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read config file at {:?}: {}", path, e);
            None
        }
    }
}

/// Get the data root from environment, persistent config, or default
pub fn roster_root() -> PathBuf {
    if let Ok(val) = std::env::var(ROOT_ENV) {
        return PathBuf::from(val);
    }

    if let Some(root) = load_persistent_root() {
        return root;
    }

    PathBuf::from(DEFAULT_ROOT)
}

/// Local data directory (SQLite)
pub fn local_dir_in(root: &Path) -> PathBuf {
    root.join("local")
}

/// Uploaded document directory
pub fn uploads_dir_in(root: &Path) -> PathBuf {
    root.join("uploads")
}

/// Database file path
pub fn db_path_in(root: &Path) -> PathBuf {
    local_dir_in(root).join("roster.sqlite")
}

/// Ensure a single directory exists
pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Initialize the complete directory structure under `root`.
/// Call this once at startup before opening the database.
pub fn init_structure(root: &Path) -> anyhow::Result<PathBuf> {
    ensure_dir(root)?;
    ensure_dir(&local_dir_in(root))?;
    ensure_dir(&uploads_dir_in(root))?;

    let canonical = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    info!("Roster directory structure initialized at: {:?}", canonical);

    Ok(canonical)
}
