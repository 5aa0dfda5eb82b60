//! Config file loading and normalization.
//!
//! Accepts the user-facing schema (lists or single values, and the legacy
//! map form of `copy_all_from`) and produces a normalized `SyncConfig`.

use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use crate::config::{BackendConfig, ChildConfig, EngineSettings, SyncConfig, SyncOptions};
use crate::error::{SyncError, SyncResult};
use crate::event::CalendarId;

/// Config file location: ~/.config/famsync/config.toml
pub fn default_config_path() -> SyncResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
        .join("famsync");

    Ok(config_dir.join("config.toml"))
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// A config file after normalization.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub sync: SyncConfig,
    pub backend: Option<BackendConfig>,
    pub engine: EngineSettings,
    /// Set when any child still uses `copy_all_from: {entity_id: ...}`.
    pub legacy_copy_all_from: bool,
}

/// Load and normalize a config file. Format is picked from the extension.
pub fn load_config(path: &Path) -> SyncResult<LoadedConfig> {
    if !path.exists() {
        return Err(SyncError::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let raw: RawConfig = Config::builder()
        .add_source(File::from(path))
        .build()
        .map_err(|e| SyncError::Config(e.to_string()))?
        .try_deserialize()
        .map_err(|e| SyncError::Config(e.to_string()))?;

    raw.normalize()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// `copy_all_from` as written by users. The list form must come first:
/// a one-element list would otherwise deserialize as the legacy struct.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCopyAllFrom {
    List(OneOrMany<String>),
    Legacy { entity_id: OneOrMany<String> },
}

#[derive(Debug, Deserialize)]
struct RawParent {
    entity_id: String,
}

#[derive(Debug, Deserialize)]
struct RawChild {
    entity_id: String,
    #[serde(default)]
    keywords: Option<OneOrMany<String>>,
    #[serde(default)]
    copy_all_from: Option<RawCopyAllFrom>,
}

/// The config file schema before normalization.
#[derive(Debug, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    options: SyncOptions,
    #[serde(default)]
    parent: Option<OneOrMany<RawParent>>,
    #[serde(default)]
    child: Option<OneOrMany<RawChild>>,
    #[serde(default)]
    backend: Option<BackendConfig>,
    #[serde(default)]
    engine: EngineSettings,
}

impl RawConfig {
    pub fn normalize(self) -> SyncResult<LoadedConfig> {
        let mut parents: Vec<CalendarId> = Vec::new();
        for parent in self.parent.map(OneOrMany::into_vec).unwrap_or_default() {
            let id = entity_id(&parent.entity_id, "parent")?;
            if !parents.contains(&id) {
                parents.push(id);
            }
        }

        let mut legacy_copy_all_from = false;
        let mut children = Vec::new();

        for child in self.child.map(OneOrMany::into_vec).unwrap_or_default() {
            let id = entity_id(&child.entity_id, "child")?;

            let copy_all_from = match child.copy_all_from {
                None => Vec::new(),
                Some(RawCopyAllFrom::List(ids)) => ids.into_vec(),
                Some(RawCopyAllFrom::Legacy { entity_id }) => {
                    legacy_copy_all_from = true;
                    entity_id.into_vec()
                }
            };

            let mut normalized: Vec<CalendarId> = Vec::new();
            for parent in copy_all_from {
                let parent = entity_id(&parent, "copy_all_from")?;
                if !normalized.contains(&parent) {
                    normalized.push(parent);
                }
            }

            children.push(ChildConfig {
                id,
                keywords: child.keywords.map(OneOrMany::into_vec).unwrap_or_default(),
                copy_all_from: normalized,
            });
        }

        Ok(LoadedConfig {
            sync: SyncConfig {
                options: self.options,
                parents,
                children,
            },
            backend: self.backend,
            engine: self.engine,
            legacy_copy_all_from,
        })
    }
}

fn entity_id(value: &str, field: &str) -> SyncResult<CalendarId> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::Config(format!("Empty entity_id in '{field}'")));
    }
    Ok(CalendarId::new(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str, extension: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_toml_config() {
        let file = write_config(
            r#"
[options]
days_to_sync = 14
days_to_sync_past = 2
ignore_event_if_title_starts_with = "Private:"

[[parent]]
entity_id = "calendar.family"

[[parent]]
entity_id = "calendar.work"

[[child]]
entity_id = "calendar.alice"
keywords = ["alice", "soccer"]
copy_all_from = ["calendar.work"]

[[child]]
entity_id = "calendar.bob"
keywords = "bob"

[backend]
provider = "caldir"
caldir_path = "~/calendars"

[engine]
max_in_flight = 2
"#,
            ".toml",
        );

        let loaded = load_config(file.path()).unwrap();

        assert_eq!(loaded.sync.options.days_to_sync, 14);
        assert_eq!(loaded.sync.options.days_to_sync_past, 2);
        assert_eq!(loaded.sync.options.ignore_title_prefix, "Private:");
        assert_eq!(
            loaded.sync.parents,
            vec![CalendarId::new("calendar.family"), CalendarId::new("calendar.work")]
        );
        assert_eq!(loaded.sync.children.len(), 2);
        assert_eq!(loaded.sync.children[0].keywords, vec!["alice", "soccer"]);
        assert_eq!(
            loaded.sync.children[0].copy_all_from,
            vec![CalendarId::new("calendar.work")]
        );
        assert_eq!(loaded.sync.children[1].keywords, vec!["bob"]);
        assert!(loaded.sync.children[1].copy_all_from.is_empty());
        assert!(!loaded.legacy_copy_all_from);

        let backend = loaded.backend.unwrap();
        assert_eq!(backend.provider, "caldir");
        assert_eq!(
            backend.settings.get("caldir_path").and_then(|v| v.as_str()),
            Some("~/calendars")
        );
        assert_eq!(loaded.engine.max_in_flight, 2);
        assert_eq!(loaded.engine.max_concurrent_children, 4);
    }

    #[test]
    fn test_options_default_when_missing() {
        let file = write_config(
            r#"
[[parent]]
entity_id = "calendar.family"

[[child]]
entity_id = "calendar.alice"
keywords = []
"#,
            ".toml",
        );

        let loaded = load_config(file.path()).unwrap();
        assert_eq!(loaded.sync.options, SyncOptions::default());
        assert!(loaded.backend.is_none());
    }

    #[test]
    fn test_legacy_copy_all_from_map_is_normalized_and_flagged() {
        let file = write_config(
            r#"
[[parent]]
entity_id = "calendar.napoleon"

[[child]]
entity_id = "calendar.alice"
keywords = ["alice"]
copy_all_from = { entity_id = "calendar.napoleon" }
"#,
            ".toml",
        );

        let loaded = load_config(file.path()).unwrap();
        assert!(loaded.legacy_copy_all_from);
        assert_eq!(
            loaded.sync.children[0].copy_all_from,
            vec![CalendarId::new("calendar.napoleon")]
        );
    }

    #[test]
    fn test_single_element_list_is_not_legacy() {
        let file = write_config(
            r#"
[[parent]]
entity_id = "calendar.napoleon"

[[child]]
entity_id = "calendar.alice"
keywords = ["alice"]
copy_all_from = ["calendar.napoleon"]
"#,
            ".toml",
        );

        let loaded = load_config(file.path()).unwrap();
        assert!(!loaded.legacy_copy_all_from);
        assert_eq!(loaded.sync.children[0].copy_all_from.len(), 1);
    }

    #[test]
    fn test_yaml_config_is_accepted() {
        let file = write_config(
            r#"
options:
  days_to_sync: 3
parent:
  - entity_id: calendar.family
child:
  - entity_id: calendar.alice
    keywords: alice
    copy_all_from: calendar.family
"#,
            ".yaml",
        );

        let loaded = load_config(file.path()).unwrap();
        assert_eq!(loaded.sync.options.days_to_sync, 3);
        assert_eq!(loaded.sync.children[0].keywords, vec!["alice"]);
        assert_eq!(
            loaded.sync.children[0].copy_all_from,
            vec![CalendarId::new("calendar.family")]
        );
    }

    #[test]
    fn test_negative_days_are_rejected() {
        let file = write_config(
            r#"
[options]
days_to_sync = -1

[[parent]]
entity_id = "calendar.family"

[[child]]
entity_id = "calendar.alice"
keywords = []
"#,
            ".toml",
        );

        assert!(matches!(load_config(file.path()), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_empty_entity_id_is_rejected() {
        let file = write_config(
            r#"
[[parent]]
entity_id = "  "

[[child]]
entity_id = "calendar.alice"
keywords = []
"#,
            ".toml",
        );

        assert!(matches!(load_config(file.path()), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let result = load_config(Path::new("/nonexistent/famsync/config.toml"));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
