pub mod protocol;
pub mod provider;

use async_trait::async_trait;

use crate::backend::CalendarBackend;
use crate::config::BackendConfig;
use crate::error::SyncResult;
use crate::event::{CalendarId, OwnedEvent, SourceEvent, SyncedEvent};
use crate::remote::protocol::{
    CreateEvent, DeleteEvent, ListEvents, ListOwnedEvents, UpdateEvent,
};
use crate::remote::provider::Provider;
use crate::window::SyncWindow;

/// Backend that delegates every call to a provider binary.
#[derive(Debug, Clone)]
pub struct ProviderBackend {
    provider: Provider,
    remote_config: serde_json::Map<String, serde_json::Value>,
}

impl ProviderBackend {
    pub fn new(provider: Provider, remote_config: serde_json::Map<String, serde_json::Value>) -> Self {
        ProviderBackend {
            provider,
            remote_config,
        }
    }

    /// Build from the `[backend]` table: `provider` picks the binary, every
    /// other key is passed through to it.
    pub fn from_config(config: &BackendConfig) -> Self {
        let remote_config = config
            .settings
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::new(Provider::from_name(&config.provider), remote_config)
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    fn remote_config(&self) -> serde_json::Map<String, serde_json::Value> {
        self.remote_config.clone()
    }
}

#[async_trait]
impl CalendarBackend for ProviderBackend {
    async fn list_events(
        &self,
        calendar: &CalendarId,
        window: &SyncWindow,
    ) -> SyncResult<Vec<SourceEvent>> {
        self.provider
            .call(
                calendar,
                ListEvents {
                    remote_config: self.remote_config(),
                    calendar_id: calendar.to_string(),
                    from: window.start_rfc3339(),
                    to: window.end_rfc3339(),
                },
            )
            .await
    }

    async fn list_owned_events(&self, calendar: &CalendarId) -> SyncResult<Vec<OwnedEvent>> {
        self.provider
            .call(
                calendar,
                ListOwnedEvents {
                    remote_config: self.remote_config(),
                    calendar_id: calendar.to_string(),
                },
            )
            .await
    }

    async fn create_event(
        &self,
        calendar: &CalendarId,
        event: &SyncedEvent,
    ) -> SyncResult<String> {
        self.provider
            .call(
                calendar,
                CreateEvent {
                    remote_config: self.remote_config(),
                    calendar_id: calendar.to_string(),
                    event: event.clone(),
                },
            )
            .await
    }

    async fn update_event(
        &self,
        calendar: &CalendarId,
        backend_id: &str,
        event: &SyncedEvent,
    ) -> SyncResult<()> {
        self.provider
            .call(
                calendar,
                UpdateEvent {
                    remote_config: self.remote_config(),
                    calendar_id: calendar.to_string(),
                    backend_id: backend_id.to_string(),
                    event: event.clone(),
                },
            )
            .await
    }

    async fn delete_event(&self, calendar: &CalendarId, backend_id: &str) -> SyncResult<()> {
        self.provider
            .call(
                calendar,
                DeleteEvent {
                    remote_config: self.remote_config(),
                    calendar_id: calendar.to_string(),
                    backend_id: backend_id.to_string(),
                },
            )
            .await
    }
}
