use std::fmt;

use crate::diff::DiffKind;
use crate::event::{EventKey, OwnedEvent, SyncedEvent};

/// One write needed to bring a child event in line with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDiff {
    Create {
        new: SyncedEvent,
    },
    Update {
        old: OwnedEvent,
        new: SyncedEvent,
    },
    Delete {
        old: OwnedEvent,
    },
}

impl fmt::Display for EventDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind().symbol(), self.event())
    }
}

impl EventDiff {
    /// Compare what the child holds with what it should hold.
    ///
    /// An existing event is only rewritten when its fingerprint moved or a
    /// field outside the fingerprint (description, location) drifted.
    pub fn get_diff(old: Option<OwnedEvent>, new: Option<SyncedEvent>) -> Option<EventDiff> {
        match (old, new) {
            (None, Some(new)) => Some(EventDiff::Create { new }),
            (Some(old), None) => Some(EventDiff::Delete { old }),
            (Some(old), Some(new)) => {
                let fingerprint_changed = old.event.origin.fingerprint != new.origin.fingerprint;

                if fingerprint_changed || old.event.display_fields_differ(&new) {
                    Some(EventDiff::Update { old, new })
                } else {
                    None
                }
            }
            (None, None) => None,
        }
    }

    pub fn kind(&self) -> DiffKind {
        match self {
            EventDiff::Create { .. } => DiffKind::Create,
            EventDiff::Update { .. } => DiffKind::Update,
            EventDiff::Delete { .. } => DiffKind::Delete,
        }
    }

    /// The event this diff is about (the new version where there is one).
    pub fn event(&self) -> &SyncedEvent {
        match self {
            EventDiff::Create { new } | EventDiff::Update { new, .. } => new,
            EventDiff::Delete { old } => &old.event,
        }
    }

    pub fn key(&self) -> EventKey {
        self.event().key()
    }

    pub fn backend_id(&self) -> Option<&str> {
        match self {
            EventDiff::Create { .. } => None,
            EventDiff::Update { old, .. } | EventDiff::Delete { old } => Some(&old.backend_id),
        }
    }
}
