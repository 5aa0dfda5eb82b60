//! Defines the JSON protocol used for communication between famsync
//! and provider binaries over stdin/stdout.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::SyncError;
use crate::event::{OwnedEvent, SourceEvent, SyncedEvent};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListEvents,
    ListOwnedEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
}

/// Request sent from famsync to provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// How the engine should treat a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The calendar could not be reached; retried next pass
    #[default]
    Unavailable,
    /// This particular write was refused
    Rejected,
}

/// Response sent from provider to famsync.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        #[serde(default)]
        kind: ErrorKind,
    },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        serde_json::to_string(&Response::Success { data }).unwrap()
    }
}

impl Response<()> {
    pub fn error(kind: ErrorKind, msg: &str) -> String {
        serde_json::to_string(&Response::<()>::Error {
            error: msg.to_string(),
            kind,
        })
        .unwrap()
    }

    /// Encode an engine error with the matching kind.
    pub fn from_sync_error(error: &SyncError) -> String {
        let kind = match error {
            SyncError::WriteRejected(_) => ErrorKind::Rejected,
            _ => ErrorKind::Unavailable,
        };
        Self::error(kind, &error.to_string())
    }
}

/// List events of a calendar that start within a time range.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    /// Provider-specific config (e.g. caldir_path)
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub from: String,
    pub to: String,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<SourceEvent>;
    fn command() -> Command {
        Command::ListEvents
    }
}

/// List the events of a calendar that carry an origin marker.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListOwnedEvents {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
}

impl ProviderCommand for ListOwnedEvents {
    type Response = Vec<OwnedEvent>;
    fn command() -> Command {
        Command::ListOwnedEvents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub event: SyncedEvent,
}

impl ProviderCommand for CreateEvent {
    type Response = String; // Backend id of the new event
    fn command() -> Command {
        Command::CreateEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub backend_id: String,
    pub event: SyncedEvent,
}

impl ProviderCommand for UpdateEvent {
    type Response = ();
    fn command() -> Command {
        Command::UpdateEvent
    }
}

/// Delete an event by backend id. Deleting an event that is already gone succeeds.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub backend_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}
