//! Desired-set construction for one child.
//!
//! A child wants every event from its copy-all parents plus every event
//! from any configured parent that matches one of its keywords. Both paths
//! go through the same window and ignore-prefix filter, and the union is
//! keyed by (parent, source-event id) so nothing appears twice.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{ChildConfig, SyncConfig, SyncOptions};
use crate::error::{SyncError, SyncResult};
use crate::event::{CalendarId, EventKey, SourceEvent};
use crate::matcher;
use crate::window::{EventFilter, SyncWindow};

/// Snapshot of every readable parent for one pass, shared by all children.
pub type ParentEvents = HashMap<CalendarId, Arc<Vec<SourceEvent>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredEvent {
    pub parent: CalendarId,
    pub event: SourceEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredSet(BTreeMap<EventKey, DesiredEvent>);

impl DesiredSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &EventKey) -> Option<&DesiredEvent> {
        self.0.get(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, EventKey, DesiredEvent> {
        self.0.iter()
    }

    fn insert(&mut self, parent: &CalendarId, event: &SourceEvent) {
        self.0
            .entry(EventKey::new(parent.clone(), &event.id))
            .or_insert_with(|| DesiredEvent {
                parent: parent.clone(),
                event: event.clone(),
            });
    }
}

/// Reject children whose copy-all list points at something that is not a
/// configured parent (or at the child itself).
pub fn check_child(child: &ChildConfig, config: &SyncConfig) -> SyncResult<()> {
    for parent in &child.copy_all_from {
        if !config.is_parent(parent) || parent == &child.id {
            return Err(SyncError::ConfigurationInconsistency {
                child: child.id.clone(),
                parent: parent.clone(),
            });
        }
    }
    Ok(())
}

pub fn build(
    child: &ChildConfig,
    parent_events: &ParentEvents,
    options: &SyncOptions,
    now: DateTime<Utc>,
) -> DesiredSet {
    let filter = EventFilter::new(
        SyncWindow::from_options(now, options),
        &options.ignore_title_prefix,
    );
    build_filtered(child, parent_events, &filter)
}

/// Parents missing from `parent_events` are skipped.
pub fn build_filtered(
    child: &ChildConfig,
    parent_events: &ParentEvents,
    filter: &EventFilter<'_>,
) -> DesiredSet {
    let mut desired = DesiredSet::default();

    for parent in &child.copy_all_from {
        let Some(events) = parent_events.get(parent) else {
            continue;
        };
        for event in events.iter().filter(|e| filter.admits(e)) {
            desired.insert(parent, event);
        }
    }

    for (parent, events) in parent_events {
        // A child never feeds itself
        if parent == &child.id {
            continue;
        }
        for event in events
            .iter()
            .filter(|e| filter.admits(e) && matcher::matches(e, &child.keywords))
        {
            desired.insert(parent, event);
        }
    }

    desired
}
