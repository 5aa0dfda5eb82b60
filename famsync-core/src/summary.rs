//! Per-child and per-pass results.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::diff::{DiffKind, EventDiff};
use crate::error::SyncError;
use crate::event::CalendarId;

/// A single thing that went wrong, with enough context to diagnose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub child: CalendarId,
    pub parent: Option<CalendarId>,
    pub source_event_id: Option<String>,
    pub operation: Option<DiffKind>,
    pub error: SyncError,
}

impl SyncFailure {
    pub fn for_child(child: &CalendarId, error: SyncError) -> Self {
        SyncFailure {
            child: child.clone(),
            parent: None,
            source_event_id: None,
            operation: None,
            error,
        }
    }

    pub fn for_parent(child: &CalendarId, parent: &CalendarId, error: SyncError) -> Self {
        SyncFailure {
            parent: Some(parent.clone()),
            ..Self::for_child(child, error)
        }
    }

    pub fn for_diff(child: &CalendarId, diff: &EventDiff, error: SyncError) -> Self {
        let origin = &diff.event().origin;
        SyncFailure {
            child: child.clone(),
            parent: Some(origin.parent.clone()),
            source_event_id: Some(origin.source_event_id.clone()),
            operation: Some(diff.kind()),
            error,
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.child)?;
        if let Some(operation) = self.operation {
            write!(f, " {operation}")?;
        }
        match (&self.parent, &self.source_event_id) {
            (Some(parent), Some(id)) => write!(f, " {parent}/{id}")?,
            (Some(parent), None) => write!(f, " {parent}")?,
            _ => {}
        }
        write!(f, ": {}", self.error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Completed,
    CompletedWithErrors,
    /// Not processed because its configuration is inconsistent
    Skipped,
    /// Could not be processed at all (e.g. child calendar unreachable)
    Failed,
    /// The pass was cancelled before or while this child was processed
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSummary {
    pub child: CalendarId,
    pub status: ChildStatus,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failures: Vec<SyncFailure>,
}

impl ChildSummary {
    pub fn new(child: &CalendarId) -> Self {
        ChildSummary {
            child: child.clone(),
            status: ChildStatus::Completed,
            created: 0,
            updated: 0,
            deleted: 0,
            unchanged: 0,
            failures: Vec::new(),
        }
    }

    pub fn skipped(child: &CalendarId, failure: SyncFailure) -> Self {
        ChildSummary {
            status: ChildStatus::Skipped,
            failures: vec![failure],
            ..Self::new(child)
        }
    }

    pub fn failed(child: &CalendarId, failures: Vec<SyncFailure>) -> Self {
        ChildSummary {
            status: ChildStatus::Failed,
            failures,
            ..Self::new(child)
        }
    }

    pub fn cancelled(child: &CalendarId) -> Self {
        ChildSummary {
            status: ChildStatus::Cancelled,
            ..Self::new(child)
        }
    }

    pub fn record(&mut self, kind: DiffKind) {
        match kind {
            DiffKind::Create => self.created += 1,
            DiffKind::Update => self.updated += 1,
            DiffKind::Delete => self.deleted += 1,
        }
    }

    pub fn operations(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    pub fn errors(&self) -> usize {
        self.failures.len()
    }

    /// Settle the status of a child that was processed.
    pub fn finish(&mut self, cancelled: bool) {
        self.status = if cancelled {
            ChildStatus::Cancelled
        } else if self.failures.is_empty() {
            ChildStatus::Completed
        } else {
            ChildStatus::CompletedWithErrors
        };
    }
}

/// Result of one sync pass across all children.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub now: DateTime<Utc>,
    pub children: Vec<ChildSummary>,
    pub cancelled: bool,
}

impl PassSummary {
    pub fn child(&self, id: &CalendarId) -> Option<&ChildSummary> {
        self.children.iter().find(|c| &c.child == id)
    }

    /// Total (created, updated, deleted) across all children.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.children.iter().fold((0, 0, 0), |(c, u, d), child| {
            (c + child.created, u + child.updated, d + child.deleted)
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncFailure> {
        self.children.iter().flat_map(|c| &c.failures)
    }

    pub fn error_count(&self) -> usize {
        self.children.iter().map(ChildSummary::errors).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}
