//! Configuration types for famsync.
//!
//! `SyncConfig` is the normalized shape the engine consumes. The `file`
//! module turns a user-written config file into it.

mod file;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::CalendarId;

pub use file::{LoadedConfig, RawConfig, default_config_path, expand_path, load_config};

pub const DEFAULT_DAYS_TO_SYNC: u32 = 7;
pub const DEFAULT_DAYS_TO_SYNC_PAST: u32 = 0;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
pub const DEFAULT_MAX_CONCURRENT_CHILDREN: usize = 4;

/// Process-wide options shared by all children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    #[serde(default = "default_days_to_sync")]
    pub days_to_sync: u32,
    #[serde(default)]
    pub days_to_sync_past: u32,
    /// Events whose title starts with this are never synced (when non-empty)
    #[serde(default, rename = "ignore_event_if_title_starts_with")]
    pub ignore_title_prefix: String,
}

fn default_days_to_sync() -> u32 {
    DEFAULT_DAYS_TO_SYNC
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            days_to_sync: DEFAULT_DAYS_TO_SYNC,
            days_to_sync_past: DEFAULT_DAYS_TO_SYNC_PAST,
            ignore_title_prefix: String::new(),
        }
    }
}

/// A destination calendar and what it should receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildConfig {
    pub id: CalendarId,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub copy_all_from: Vec<CalendarId>,
}

impl ChildConfig {
    pub fn new(id: impl Into<CalendarId>) -> Self {
        ChildConfig {
            id: id.into(),
            keywords: Vec::new(),
            copy_all_from: Vec::new(),
        }
    }

    pub fn with_keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn copying_all_from<P: Into<CalendarId>>(
        mut self,
        parents: impl IntoIterator<Item = P>,
    ) -> Self {
        self.copy_all_from = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Whether events from `parent` can reach this child's desired set.
    pub fn draws_from(&self, parent: &CalendarId) -> bool {
        if parent == &self.id {
            return false;
        }
        self.copy_all_from.contains(parent)
            || self.keywords.iter().any(|keyword| !keyword.trim().is_empty())
    }
}

/// Normalized configuration handed to the engine. Treated as already validated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub options: SyncOptions,
    pub parents: Vec<CalendarId>,
    pub children: Vec<ChildConfig>,
}

impl SyncConfig {
    pub fn is_parent(&self, id: &CalendarId) -> bool {
        self.parents.contains(id)
    }
}

/// Which backend adapter to use, plus its provider-specific settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub provider: String,
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

/// Limits on how hard one pass may hit the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_max_concurrent_children")]
    pub max_concurrent_children: usize,
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_max_concurrent_children() -> usize {
    DEFAULT_MAX_CONCURRENT_CHILDREN
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_concurrent_children: DEFAULT_MAX_CONCURRENT_CHILDREN,
        }
    }
}
