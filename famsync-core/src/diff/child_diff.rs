//! The full set of writes for one child calendar.

use crate::diff::{DiffKind, EventDiff};
use crate::event::CalendarId;

/// Differences between a child's synced events and its desired set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDiff {
    pub child: CalendarId,
    pub diffs: Vec<EventDiff>,
    /// Desired events already present and up to date
    pub unchanged: usize,
}

impl ChildDiff {
    pub fn new(child: &CalendarId) -> Self {
        ChildDiff {
            child: child.clone(),
            diffs: Vec::new(),
            unchanged: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// (created, updated, deleted)
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut created = 0;
        let mut updated = 0;
        let mut deleted = 0;

        for diff in &self.diffs {
            match diff.kind() {
                DiffKind::Create => created += 1,
                DiffKind::Update => updated += 1,
                DiffKind::Delete => deleted += 1,
            }
        }

        (created, updated, deleted)
    }
}
