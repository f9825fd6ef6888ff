//! Store dump/restore: keep the cache warm across restarts.
//!
//! The dump is a versioned JSON document holding all three tables. It is
//! written atomically (tmp file + rename) on daemon shutdown and read back at
//! boot. A missing dump means a cold start; a corrupt one is logged and
//! ignored, never fatal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CatalogItem, PositionRecord, Snapshot};
use crate::{HeimdallError, Result};

/// Current dump format version.
const DUMP_VERSION: u32 = 1;

/// Serializable copy of every table in a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDump {
    pub version: u32,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub positions: Vec<PositionRecord>,
    #[serde(default)]
    pub catalog: Vec<CatalogItem>,
}

impl StoreDump {
    pub fn new(
        snapshots: Vec<Snapshot>,
        positions: Vec<PositionRecord>,
        catalog: Vec<CatalogItem>,
    ) -> Self {
        Self {
            version: DUMP_VERSION,
            snapshots,
            positions,
            catalog,
        }
    }
}

/// Default dump location: `~/.cache/heimdall/store.json`.
pub fn default_dump_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("heimdall")
        .join("store.json")
}

fn parse_dump(json: &str) -> Result<StoreDump> {
    let dump: StoreDump = serde_json::from_str(json)
        .map_err(|e| HeimdallError::Storage(format!("failed to parse store dump: {e}")))?;
    if dump.version > DUMP_VERSION {
        return Err(HeimdallError::Storage(format!(
            "unsupported dump version {} (max supported: {DUMP_VERSION})",
            dump.version
        )));
    }
    Ok(dump)
}

/// Load a dump from disk.
///
/// Returns `None` on a missing or unreadable file (logs a warning unless the
/// file simply does not exist).
pub fn load_dump(path: &Path) -> Option<StoreDump> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read store dump");
            return None;
        }
    };
    match parse_dump(&content) {
        Ok(dump) => Some(dump),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt store dump");
            None
        }
    }
}

/// Write a dump to disk (atomic write via tmp + rename).
pub fn save_dump(path: &Path, dump: &StoreDump) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            HeimdallError::Storage(format!(
                "failed to create dump dir {}: {e}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string(dump)?;
    std::fs::write(&tmp_path, json).map_err(|e| {
        HeimdallError::Storage(format!(
            "failed to write dump file {}: {e}",
            tmp_path.display()
        ))
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        HeimdallError::Storage(format!(
            "failed to rename dump file {} → {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    Ok(())
}
