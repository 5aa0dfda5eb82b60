//! Caldir-specific remote configuration.
//!
//! famsync-core passes the `[backend]` table through untyped; this gives
//! the provider its typed view of it.

use std::path::PathBuf;

use anyhow::Result;
use famsync_core::config::expand_path;

#[derive(Debug, Clone)]
pub struct CaldirRemoteConfig {
    /// Directory holding one subdirectory per calendar
    pub caldir_path: PathBuf,
}

impl TryFrom<&serde_json::Map<String, serde_json::Value>> for CaldirRemoteConfig {
    type Error = anyhow::Error;

    fn try_from(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let caldir_path = map
            .get("caldir_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing required field: caldir_path"))?;

        Ok(Self {
            caldir_path: expand_path(caldir_path),
        })
    }
}
