//! Backend-neutral event types.
//!
//! Adapters convert whatever their calendar store holds into these types.
//! The engine only ever works with them: `SourceEvent` is read from a
//! parent, `SyncedEvent` is what the engine materializes in a child.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::{Fingerprint, fingerprint};

/// Opaque calendar handle (e.g. `calendar.family`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarId(String);

impl CalendarId {
    pub fn new(id: impl Into<String>) -> Self {
        CalendarId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalendarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CalendarId {
    fn from(id: &str) -> Self {
        CalendarId::new(id)
    }
}

impl From<String> for CalendarId {
    fn from(id: String) -> Self {
        CalendarId(id)
    }
}

/// An event as read from a parent calendar.
///
/// Times are normalized to UTC by the adapter at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEvent {
    /// Unique within the parent and stable across reads
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Identifies which parent event a synced event was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMarker {
    pub parent: CalendarId,
    pub source_event_id: String,
    pub fingerprint: Fingerprint,
}

impl OriginMarker {
    pub fn key(&self) -> EventKey {
        EventKey::new(self.parent.clone(), &self.source_event_id)
    }
}

/// An event materialized in a child calendar by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedEvent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    pub origin: OriginMarker,
}

impl SyncedEvent {
    /// Build the child copy of `event`, stamping a fresh fingerprint.
    pub fn from_source(parent: &CalendarId, event: &SourceEvent) -> Self {
        SyncedEvent {
            title: event.title.clone(),
            description: event.description.clone(),
            start: event.start,
            end: event.end,
            location: event.location.clone(),
            origin: OriginMarker {
                parent: parent.clone(),
                source_event_id: event.id.clone(),
                fingerprint: fingerprint(parent, &event.id, &event.title, event.start, event.end),
            },
        }
    }

    pub fn key(&self) -> EventKey {
        self.origin.key()
    }

    /// Whether the fields outside the fingerprint differ from `other`.
    pub fn display_fields_differ(&self, other: &SyncedEvent) -> bool {
        self.description != other.description || self.location != other.location
    }
}

/// A synced event as currently stored in a child, with the backend's handle for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedEvent {
    pub backend_id: String,
    pub event: SyncedEvent,
}

/// Identity of a source event across all parents: (parent, source-event id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub parent: CalendarId,
    pub source_event_id: String,
}

impl EventKey {
    pub fn new(parent: CalendarId, source_event_id: &str) -> Self {
        EventKey {
            parent,
            source_event_id: source_event_id.to_string(),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.parent, self.source_event_id)
    }
}

impl fmt::Display for SourceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

impl fmt::Display for SyncedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}
