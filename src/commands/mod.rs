pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use famsync_core::config::{LoadedConfig, default_config_path, load_config};
use famsync_core::remote::ProviderBackend;

/// Load the config file, warning once if it still uses the legacy `copy_all_from` map.
pub fn load(config_path: Option<PathBuf>) -> Result<LoadedConfig> {
    let path = match config_path {
        Some(path) => path,
        None => default_config_path()?,
    };

    let loaded = load_config(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if loaded.sync.children.is_empty() {
        anyhow::bail!(
            "No child calendars configured in {}.\n\n\
            Add one with:\n  \
            [[child]]\n  \
            entity_id = \"calendar.alice\"\n  \
            keywords = [\"alice\"]",
            path.display()
        );
    }

    if loaded.legacy_copy_all_from {
        tracing::warn!(
            config = %path.display(),
            "`copy_all_from = {{ entity_id = ... }}` is deprecated, use a list of calendar ids instead"
        );
    }

    Ok(loaded)
}

pub fn backend(loaded: &LoadedConfig) -> Result<ProviderBackend> {
    let config = loaded.backend.as_ref().context(
        "No [backend] configured.\n\n\
        Example:\n  \
        [backend]\n  \
        provider = \"caldir\"\n  \
        caldir_path = \"~/calendars\"",
    )?;

    Ok(ProviderBackend::from_config(config))
}
