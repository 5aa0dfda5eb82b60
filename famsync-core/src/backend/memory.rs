//! In-memory backend.
//!
//! Holds calendars in a mutex-guarded map. Used by the engine's tests and
//! by embedders that want a pass without a provider. It can simulate
//! unreachable calendars, rejected writes, slow calls and a cancel arriving
//! between writes.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::backend::CalendarBackend;
use crate::diff::DiffKind;
use crate::error::{SyncError, SyncResult};
use crate::event::{CalendarId, OwnedEvent, SourceEvent, SyncedEvent};
use crate::window::SyncWindow;

/// A successful write, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub calendar: CalendarId,
    pub kind: DiffKind,
    pub backend_id: String,
}

#[derive(Debug, Default)]
struct MemoryCalendar {
    /// Events created outside the engine (what `list_events` returns)
    events: Vec<SourceEvent>,
    /// Engine-owned events keyed by backend id
    owned: BTreeMap<String, SyncedEvent>,
}

#[derive(Debug, Default)]
struct MemoryState {
    calendars: BTreeMap<CalendarId, MemoryCalendar>,
    unavailable: HashSet<CalendarId>,
    rejected_titles: HashSet<String>,
    writes: Vec<WriteRecord>,
    next_id: usize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MemoryState {
    fn record_write(&mut self, calendar: &CalendarId, kind: DiffKind, backend_id: &str) {
        self.writes.push(WriteRecord {
            calendar: calendar.clone(),
            kind,
            backend_id: backend_id.to_string(),
        });
        if let Some((limit, token)) = &self.cancel_after {
            if self.writes.len() >= *limit {
                token.cancel();
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call, so that concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_calendar(&self, calendar: impl Into<CalendarId>) {
        self.state().calendars.entry(calendar.into()).or_default();
    }

    /// Add or replace (by id) an event not owned by the engine.
    pub fn put_event(&self, calendar: impl Into<CalendarId>, event: SourceEvent) {
        let mut state = self.state();
        let events = &mut state.calendars.entry(calendar.into()).or_default().events;
        match events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event,
            None => events.push(event),
        }
    }

    pub fn remove_event(&self, calendar: &CalendarId, event_id: &str) {
        if let Some(cal) = self.state().calendars.get_mut(calendar) {
            cal.events.retain(|e| e.id != event_id);
        }
    }

    /// Place an owned event directly, bypassing the write log.
    pub fn put_owned(&self, calendar: impl Into<CalendarId>, owned: OwnedEvent) {
        self.state()
            .calendars
            .entry(calendar.into())
            .or_default()
            .owned
            .insert(owned.backend_id, owned.event);
    }

    pub fn events(&self, calendar: &CalendarId) -> Vec<SourceEvent> {
        self.state()
            .calendars
            .get(calendar)
            .map(|c| c.events.clone())
            .unwrap_or_default()
    }

    pub fn owned_events(&self, calendar: &CalendarId) -> Vec<OwnedEvent> {
        self.state()
            .calendars
            .get(calendar)
            .map(|c| {
                c.owned
                    .iter()
                    .map(|(id, event)| OwnedEvent {
                        backend_id: id.clone(),
                        event: event.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_unavailable(&self, calendar: impl Into<CalendarId>, unavailable: bool) {
        let calendar = calendar.into();
        let mut state = self.state();
        if unavailable {
            state.unavailable.insert(calendar);
        } else {
            state.unavailable.remove(&calendar);
        }
    }

    /// Reject every create/update of an event with this title.
    pub fn reject_writes_titled(&self, title: &str) {
        self.state().rejected_titles.insert(title.to_string());
    }

    /// Cancel `token` once `writes` successful writes have been recorded.
    pub fn cancel_after_writes(&self, writes: usize, token: CancellationToken) {
        self.state().cancel_after = Some((writes, token));
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_observed_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_available(state: &MemoryState, calendar: &CalendarId) -> SyncResult<()> {
        if state.unavailable.contains(calendar) {
            return Err(SyncError::unavailable(calendar, "calendar unreachable"));
        }
        if !state.calendars.contains_key(calendar) {
            return Err(SyncError::unavailable(calendar, "calendar does not exist"));
        }
        Ok(())
    }

    fn check_payload(state: &MemoryState, event: &SyncedEvent) -> SyncResult<()> {
        if state.rejected_titles.contains(&event.title) {
            return Err(SyncError::rejected(format!("'{}' refused", event.title)));
        }
        Ok(())
    }

    fn list_events_now(
        &self,
        calendar: &CalendarId,
        window: &SyncWindow,
    ) -> SyncResult<Vec<SourceEvent>> {
        let state = self.state();
        Self::check_available(&state, calendar)?;
        Ok(state.calendars[calendar]
            .events
            .iter()
            .filter(|e| window.contains(e.start))
            .cloned()
            .collect())
    }

    fn list_owned_now(&self, calendar: &CalendarId) -> SyncResult<Vec<OwnedEvent>> {
        Self::check_available(&self.state(), calendar)?;
        Ok(self.owned_events(calendar))
    }

    fn create_now(&self, calendar: &CalendarId, event: &SyncedEvent) -> SyncResult<String> {
        let mut state = self.state();
        Self::check_available(&state, calendar)?;
        Self::check_payload(&state, event)?;

        state.next_id += 1;
        let backend_id = format!("mem-{}", state.next_id);

        if let Some(cal) = state.calendars.get_mut(calendar) {
            cal.owned.insert(backend_id.clone(), event.clone());
        }
        state.record_write(calendar, DiffKind::Create, &backend_id);
        Ok(backend_id)
    }

    fn update_now(
        &self,
        calendar: &CalendarId,
        backend_id: &str,
        event: &SyncedEvent,
    ) -> SyncResult<()> {
        let mut state = self.state();
        Self::check_available(&state, calendar)?;
        Self::check_payload(&state, event)?;

        let slot = state
            .calendars
            .get_mut(calendar)
            .and_then(|c| c.owned.get_mut(backend_id))
            .ok_or_else(|| SyncError::rejected(format!("no event with id '{backend_id}'")))?;
        *slot = event.clone();

        state.record_write(calendar, DiffKind::Update, backend_id);
        Ok(())
    }

    fn delete_now(&self, calendar: &CalendarId, backend_id: &str) -> SyncResult<()> {
        let mut state = self.state();
        Self::check_available(&state, calendar)?;

        if let Some(cal) = state.calendars.get_mut(calendar) {
            cal.owned.remove(backend_id);
        }
        state.record_write(calendar, DiffKind::Delete, backend_id);
        Ok(())
    }
}

#[async_trait]
impl CalendarBackend for MemoryBackend {
    async fn list_events(
        &self,
        calendar: &CalendarId,
        window: &SyncWindow,
    ) -> SyncResult<Vec<SourceEvent>> {
        self.enter().await;
        let result = self.list_events_now(calendar, window);
        self.leave();
        result
    }

    async fn list_owned_events(&self, calendar: &CalendarId) -> SyncResult<Vec<OwnedEvent>> {
        self.enter().await;
        let result = self.list_owned_now(calendar);
        self.leave();
        result
    }

    async fn create_event(
        &self,
        calendar: &CalendarId,
        event: &SyncedEvent,
    ) -> SyncResult<String> {
        self.enter().await;
        let result = self.create_now(calendar, event);
        self.leave();
        result
    }

    async fn update_event(
        &self,
        calendar: &CalendarId,
        backend_id: &str,
        event: &SyncedEvent,
    ) -> SyncResult<()> {
        self.enter().await;
        let result = self.update_now(calendar, backend_id, event);
        self.leave();
        result
    }

    async fn delete_event(&self, calendar: &CalendarId, backend_id: &str) -> SyncResult<()> {
        self.enter().await;
        let result = self.delete_now(calendar, backend_id);
        self.leave();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    fn synced(title: &str) -> SyncedEvent {
        let start = Utc.with_ymd_and_hms(2025, 3, 22, 9, 0, 0).unwrap();
        let source = SourceEvent {
            id: "e1".to_string(),
            title: title.to_string(),
            description: None,
            start,
            end: start + ChronoDuration::hours(1),
            location: None,
        };
        SyncedEvent::from_source(&CalendarId::new("calendar.work"), &source)
    }

    #[tokio::test]
    async fn test_create_update_delete_roundtrip() {
        let backend = MemoryBackend::new();
        let child = CalendarId::new("calendar.alice");
        backend.add_calendar(child.clone());

        let id = backend.create_event(&child, &synced("Team sync")).await.unwrap();
        assert_eq!(backend.owned_events(&child).len(), 1);

        backend
            .update_event(&child, &id, &synced("Team standup"))
            .await
            .unwrap();
        assert_eq!(backend.owned_events(&child)[0].event.title, "Team standup");

        backend.delete_event(&child, &id).await.unwrap();
        assert!(backend.owned_events(&child).is_empty());

        let kinds: Vec<_> = backend.writes().into_iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![DiffKind::Create, DiffKind::Update, DiffKind::Delete]);
    }

    #[tokio::test]
    async fn test_missing_calendar_is_unavailable() {
        let backend = MemoryBackend::new();
        let result = backend
            .list_owned_events(&CalendarId::new("calendar.nobody"))
            .await;
        assert!(matches!(result, Err(SyncError::SourceUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_rejected_title_is_write_rejected() {
        let backend = MemoryBackend::new();
        let child = CalendarId::new("calendar.alice");
        backend.add_calendar(child.clone());
        backend.reject_writes_titled("Broken");

        let result = backend.create_event(&child, &synced("Broken")).await;
        assert!(matches!(result, Err(SyncError::WriteRejected(_))));
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_is_rejected() {
        let backend = MemoryBackend::new();
        let child = CalendarId::new("calendar.alice");
        backend.add_calendar(child.clone());

        let result = backend.update_event(&child, "mem-99", &synced("x")).await;
        assert!(matches!(result, Err(SyncError::WriteRejected(_))));
    }
}
