//! Converging one child onto its desired set.
//!
//! `plan` is pure: it compares the desired set with the child's owned
//! events and produces a `ChildDiff`. `apply` performs those writes one at
//! a time, recording failures instead of stopping at them.

use std::collections::{HashMap, HashSet};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::backend::CalendarBackend;
use crate::desired::DesiredSet;
use crate::diff::{ChildDiff, EventDiff};
use crate::error::{SyncError, SyncResult};
use crate::event::{CalendarId, EventKey, OwnedEvent, SyncedEvent};
use crate::summary::{ChildSummary, SyncFailure};

/// Compute the writes needed for `child`.
///
/// Only owned events whose origin parent is in `managed_parents` are ever
/// touched. Those from `frozen_parents` (parents that could not be read
/// this pass) are left exactly as they are.
pub fn plan(
    child: &CalendarId,
    desired: &DesiredSet,
    current: Vec<OwnedEvent>,
    managed_parents: &HashSet<CalendarId>,
    frozen_parents: &HashSet<CalendarId>,
) -> ChildDiff {
    let mut diff = ChildDiff::new(child);
    let mut current_by_key: HashMap<EventKey, OwnedEvent> = HashMap::new();

    for owned in current {
        let parent = &owned.event.origin.parent;
        if !managed_parents.contains(parent) || frozen_parents.contains(parent) {
            continue;
        }

        let key = owned.event.key();
        if current_by_key.contains_key(&key) {
            // Duplicate copy of the same source event: keep the first one
            debug!(child = %child, key = %key, backend_id = %owned.backend_id, "Removing duplicate synced event");
            diff.diffs.push(EventDiff::Delete { old: owned });
        } else {
            current_by_key.insert(key, owned);
        }
    }

    let mut upserts = Vec::new();
    for (key, wanted) in desired.iter() {
        let new = SyncedEvent::from_source(&wanted.parent, &wanted.event);
        match EventDiff::get_diff(current_by_key.remove(key), Some(new)) {
            Some(event_diff) => upserts.push(event_diff),
            None => diff.unchanged += 1,
        }
    }

    let mut deletes: Vec<EventDiff> = current_by_key
        .into_values()
        .filter_map(|old| EventDiff::get_diff(Some(old), None))
        .collect();

    // Sort by event start time (ascending)
    let sort_by_start = |a: &EventDiff, b: &EventDiff| a.event().start.cmp(&b.event().start);
    upserts.sort_by(sort_by_start);
    deletes.sort_by(sort_by_start);

    diff.diffs.extend(upserts);
    diff.diffs.extend(deletes);
    diff
}

/// Apply a child's diff through `backend`, one write at a time.
///
/// Every write waits for a permit from `limiter`. Cancellation is checked
/// before each write, never during one. Returns true if it stopped early
/// because of cancellation.
pub async fn apply<B: CalendarBackend + ?Sized>(
    diff: &ChildDiff,
    backend: &B,
    limiter: &Semaphore,
    cancel: &CancellationToken,
    summary: &mut ChildSummary,
) -> bool {
    for event_diff in &diff.diffs {
        if cancel.is_cancelled() {
            return true;
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return true,
            permit = limiter.acquire() => permit,
        };
        let Ok(_permit) = permit else {
            let error = SyncError::unavailable(&diff.child, "backend limiter closed");
            summary
                .failures
                .push(SyncFailure::for_diff(&diff.child, event_diff, error));
            continue;
        };

        match apply_one(&diff.child, event_diff, backend).await {
            Ok(()) => {
                debug!(child = %diff.child, key = %event_diff.key(), op = %event_diff.kind(), "Applied");
                summary.record(event_diff.kind());
            }
            Err(error) => {
                warn!(
                    child = %diff.child,
                    key = %event_diff.key(),
                    op = %event_diff.kind(),
                    %error,
                    "Write failed"
                );
                summary
                    .failures
                    .push(SyncFailure::for_diff(&diff.child, event_diff, error));
            }
        }
    }

    false
}

async fn apply_one<B: CalendarBackend + ?Sized>(
    child: &CalendarId,
    event_diff: &EventDiff,
    backend: &B,
) -> SyncResult<()> {
    match event_diff {
        EventDiff::Create { new } => backend.create_event(child, new).await.map(|_| ()),
        EventDiff::Update { old, new } => backend.update_event(child, &old.backend_id, new).await,
        EventDiff::Delete { old } => backend.delete_event(child, &old.backend_id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::desired::{ParentEvents, build};
    use crate::config::{ChildConfig, SyncOptions};
    use crate::diff::DiffKind;
    use crate::event::SourceEvent;
    use crate::summary::ChildStatus;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap()
    }

    fn work() -> CalendarId {
        CalendarId::new("calendar.work")
    }

    fn alice() -> CalendarId {
        CalendarId::new("calendar.alice")
    }

    fn event(id: &str, title: &str) -> SourceEvent {
        let start = now() + Duration::days(2);
        SourceEvent {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            start,
            end: start + Duration::hours(1),
            location: None,
        }
    }

    fn owned(backend_id: &str, parent: &CalendarId, event: &SourceEvent) -> OwnedEvent {
        OwnedEvent {
            backend_id: backend_id.to_string(),
            event: SyncedEvent::from_source(parent, event),
        }
    }

    fn desired(events: Vec<SourceEvent>) -> DesiredSet {
        let parent_events: ParentEvents = [(work(), Arc::new(events))].into_iter().collect();
        let child = ChildConfig::new(alice()).copying_all_from([work()]);
        build(&child, &parent_events, &SyncOptions::default(), now())
    }

    fn managed() -> HashSet<CalendarId> {
        [work()].into_iter().collect()
    }

    fn kinds(diff: &ChildDiff) -> Vec<DiffKind> {
        diff.diffs.iter().map(EventDiff::kind).collect()
    }

    #[test]
    fn test_plan_creates_missing_events() {
        let diff = plan(&alice(), &desired(vec![event("e1", "Team sync")]), vec![], &managed(), &HashSet::new());
        assert_eq!(kinds(&diff), vec![DiffKind::Create]);
        assert_eq!(diff.unchanged, 0);
    }

    #[test]
    fn test_plan_is_noop_when_in_sync() {
        let e1 = event("e1", "Team sync");
        let diff = plan(
            &alice(),
            &desired(vec![e1.clone()]),
            vec![owned("b1", &work(), &e1)],
            &managed(),
            &HashSet::new(),
        );
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged, 1);
    }

    #[test]
    fn test_plan_updates_changed_and_deletes_vanished() {
        let e1 = event("e1", "Team sync");
        let e2 = event("e2", "Retro");
        let renamed = event("e1", "Team standup");

        let diff = plan(
            &alice(),
            &desired(vec![renamed]),
            vec![owned("b1", &work(), &e1), owned("b2", &work(), &e2)],
            &managed(),
            &HashSet::new(),
        );

        assert_eq!(kinds(&diff), vec![DiffKind::Update, DiffKind::Delete]);
        assert_eq!(diff.diffs[0].backend_id(), Some("b1"));
        assert_eq!(diff.diffs[1].backend_id(), Some("b2"));
    }

    #[test]
    fn test_plan_ignores_events_from_unmanaged_parents() {
        let stray = owned("b9", &CalendarId::new("calendar.removed"), &event("x1", "Old"));
        let diff = plan(&alice(), &DesiredSet::default(), vec![stray], &managed(), &HashSet::new());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_plan_freezes_unavailable_parents() {
        let e1 = event("e1", "Team sync");
        let frozen: HashSet<CalendarId> = [work()].into_iter().collect();

        let diff = plan(&alice(), &DesiredSet::default(), vec![owned("b1", &work(), &e1)], &managed(), &frozen);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_plan_removes_duplicate_copies() {
        let e1 = event("e1", "Team sync");
        let diff = plan(
            &alice(),
            &desired(vec![e1.clone()]),
            vec![owned("b1", &work(), &e1), owned("b2", &work(), &e1)],
            &managed(),
            &HashSet::new(),
        );

        assert_eq!(kinds(&diff), vec![DiffKind::Delete]);
        assert_eq!(diff.diffs[0].backend_id(), Some("b2"));
        assert_eq!(diff.unchanged, 1);
    }

    #[tokio::test]
    async fn test_apply_continues_past_rejected_write() {
        let backend = MemoryBackend::new();
        backend.add_calendar(alice());
        backend.reject_writes_titled("Broken");

        let diff = plan(
            &alice(),
            &desired(vec![event("e1", "Broken"), event("e2", "Fine"), event("e3", "Also fine")]),
            vec![],
            &managed(),
            &HashSet::new(),
        );

        let mut summary = ChildSummary::new(&alice());
        let cancelled = apply(&diff, &backend, &Semaphore::new(1), &CancellationToken::new(), &mut summary).await;
        summary.finish(cancelled);

        assert!(!cancelled);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].source_event_id.as_deref(), Some("e1"));
        assert_eq!(summary.failures[0].operation, Some(DiffKind::Create));
        assert_eq!(summary.status, ChildStatus::CompletedWithErrors);
        assert_eq!(backend.owned_events(&alice()).len(), 2);
    }

    #[tokio::test]
    async fn test_apply_stops_between_writes_when_cancelled() {
        let backend = MemoryBackend::new();
        backend.add_calendar(alice());

        let diff = plan(&alice(), &desired(vec![event("e1", "Team sync")]), vec![], &managed(), &HashSet::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut summary = ChildSummary::new(&alice());
        let cancelled = apply(&diff, &backend, &Semaphore::new(1), &cancel, &mut summary).await;

        assert!(cancelled);
        assert_eq!(summary.operations(), 0);
        assert!(backend.writes().is_empty());
    }
}
