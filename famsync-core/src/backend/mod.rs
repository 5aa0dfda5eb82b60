//! Calendar backend adapters.
//!
//! The engine never talks to a calendar store directly. Everything goes
//! through `CalendarBackend`, which a host implements for its store (or
//! uses `ProviderBackend` to delegate to a provider binary).

mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::event::{CalendarId, OwnedEvent, SourceEvent, SyncedEvent};
use crate::window::SyncWindow;

pub use memory::{MemoryBackend, WriteRecord};

#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Events of `calendar` in the window, times normalized to UTC.
    ///
    /// Fails with `SourceUnavailable` if the calendar cannot be reached or does not exist.
    async fn list_events(
        &self,
        calendar: &CalendarId,
        window: &SyncWindow,
    ) -> SyncResult<Vec<SourceEvent>>;

    /// Only events carrying an origin marker.
    async fn list_owned_events(&self, calendar: &CalendarId) -> SyncResult<Vec<OwnedEvent>>;

    /// Returns the backend's id for the new event.
    async fn create_event(&self, calendar: &CalendarId, event: &SyncedEvent)
    -> SyncResult<String>;

    async fn update_event(
        &self,
        calendar: &CalendarId,
        backend_id: &str,
        event: &SyncedEvent,
    ) -> SyncResult<()>;

    async fn delete_event(&self, calendar: &CalendarId, backend_id: &str) -> SyncResult<()>;
}

#[async_trait]
impl<B: CalendarBackend + ?Sized> CalendarBackend for Arc<B> {
    async fn list_events(
        &self,
        calendar: &CalendarId,
        window: &SyncWindow,
    ) -> SyncResult<Vec<SourceEvent>> {
        (**self).list_events(calendar, window).await
    }

    async fn list_owned_events(&self, calendar: &CalendarId) -> SyncResult<Vec<OwnedEvent>> {
        (**self).list_owned_events(calendar).await
    }

    async fn create_event(
        &self,
        calendar: &CalendarId,
        event: &SyncedEvent,
    ) -> SyncResult<String> {
        (**self).create_event(calendar, event).await
    }

    async fn update_event(
        &self,
        calendar: &CalendarId,
        backend_id: &str,
        event: &SyncedEvent,
    ) -> SyncResult<()> {
        (**self).update_event(calendar, backend_id, event).await
    }

    async fn delete_event(&self, calendar: &CalendarId, backend_id: &str) -> SyncResult<()> {
        (**self).delete_event(calendar, backend_id).await
    }
}
