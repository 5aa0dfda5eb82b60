//! famsync-provider-caldir - local .ics directory provider for famsync
//!
//! This binary implements the famsync provider protocol, communicating
//! with famsync via JSON over stdin/stdout. Each calendar is a directory
//! of .ics files under `caldir_path`.

mod ics;
mod remote_config;
mod store;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use famsync_core::error::SyncError;
use famsync_core::event::CalendarId;
use famsync_core::remote::protocol::{
    Command, CreateEvent, DeleteEvent, ErrorKind, ListEvents, ListOwnedEvents, Request, Response,
    UpdateEvent,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::remote_config::CaldirRemoteConfig;
use crate::store::CalendarStore;

#[tokio::main]
async fn main() {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Failed to read stdin: {}", e);
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request).await,
            Err(e) => Response::error(
                ErrorKind::Unavailable,
                &format!("Failed to parse request: {}", e),
            ),
        };

        if writeln!(stdout, "{}", response)
            .and_then(|_| stdout.flush())
            .is_err()
        {
            break;
        }
    }
}

async fn handle_request(request: Request) -> String {
    match request.command {
        Command::ListEvents => respond(parse_params(request.params).and_then(handle_list_events)),
        Command::ListOwnedEvents => {
            respond(parse_params(request.params).and_then(handle_list_owned_events))
        }
        Command::CreateEvent => respond(parse_params(request.params).and_then(handle_create_event)),
        Command::UpdateEvent => respond(parse_params(request.params).and_then(handle_update_event)),
        Command::DeleteEvent => respond(parse_params(request.params).and_then(handle_delete_event)),
    }
}

fn parse_params<P: DeserializeOwned>(params: serde_json::Value) -> Result<P> {
    serde_json::from_value(params).context("Invalid params")
}

/// Encode a handler result; engine errors keep their kind, anything else
/// means the calendar could not be reached.
fn respond<T: Serialize>(result: Result<T>) -> String {
    match result {
        Ok(data) => Response::success(data),
        Err(e) => {
            let kind = match e.downcast_ref::<SyncError>() {
                Some(SyncError::WriteRejected(_)) => ErrorKind::Rejected,
                _ => ErrorKind::Unavailable,
            };
            Response::error(kind, &format!("{:#}", e))
        }
    }
}

fn open_store(remote_config: &serde_json::Map<String, serde_json::Value>) -> Result<CalendarStore> {
    let config = CaldirRemoteConfig::try_from(remote_config)?;
    Ok(CalendarStore::new(config.caldir_path))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid time '{value}'"))?
        .with_timezone(&Utc))
}

fn handle_list_events(cmd: ListEvents) -> Result<Vec<famsync_core::SourceEvent>> {
    let store = open_store(&cmd.remote_config)?;
    let from = parse_time(&cmd.from)?;
    let to = parse_time(&cmd.to)?;
    Ok(store.list_events(&CalendarId::new(cmd.calendar_id), from, to)?)
}

fn handle_list_owned_events(cmd: ListOwnedEvents) -> Result<Vec<famsync_core::OwnedEvent>> {
    let store = open_store(&cmd.remote_config)?;
    Ok(store.list_owned_events(&CalendarId::new(cmd.calendar_id))?)
}

fn handle_create_event(cmd: CreateEvent) -> Result<String> {
    let store = open_store(&cmd.remote_config)?;
    Ok(store.create_event(&CalendarId::new(cmd.calendar_id), &cmd.event)?)
}

fn handle_update_event(cmd: UpdateEvent) -> Result<()> {
    let store = open_store(&cmd.remote_config)?;
    Ok(store.update_event(&CalendarId::new(cmd.calendar_id), &cmd.backend_id, &cmd.event)?)
}

fn handle_delete_event(cmd: DeleteEvent) -> Result<()> {
    let store = open_store(&cmd.remote_config)?;
    Ok(store.delete_event(&CalendarId::new(cmd.calendar_id), &cmd.backend_id)?)
}
