//! Calendars as directories of .ics files.
//!
//! Calendar `<id>` lives in `<root>/<id>/`. Each synced event is one file
//! named after its backend id; every other file belongs to the user and is
//! only ever read.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use famsync_core::error::{SyncError, SyncResult};
use famsync_core::event::{CalendarId, OwnedEvent, SourceEvent, SyncedEvent};
use uuid::Uuid;

use crate::ics;

pub struct CalendarStore {
    root: PathBuf,
}

impl CalendarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CalendarStore { root: root.into() }
    }

    fn calendar_dir(&self, calendar: &CalendarId) -> SyncResult<PathBuf> {
        let id = calendar.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(SyncError::unavailable(calendar, "not a valid calendar directory name"));
        }

        let dir = self.root.join(id);
        if !dir.is_dir() {
            return Err(SyncError::unavailable(
                calendar,
                format!("{} does not exist", dir.display()),
            ));
        }
        Ok(dir)
    }

    /// Backend ids come from the engine; refuse anything that is not a plain file stem.
    fn event_path(dir: &Path, backend_id: &str) -> SyncResult<PathBuf> {
        if backend_id.is_empty() || backend_id.contains(['/', '\\', '.']) {
            return Err(SyncError::rejected(format!("invalid backend id '{backend_id}'")));
        }
        Ok(dir.join(format!("{backend_id}.ics")))
    }

    /// (file stem, content) of every .ics file in the calendar
    fn read_files(&self, calendar: &CalendarId) -> SyncResult<Vec<(String, String)>> {
        let dir = self.calendar_dir(calendar)?;
        let entries = fs::read_dir(&dir)
            .map_err(|e| SyncError::unavailable(calendar, format!("failed to read {}: {e}", dir.display())))?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "ics") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(content) => files.push((stem.to_string(), content)),
                Err(e) => eprintln!("Skipping unreadable {}: {e}", path.display()),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Events not written by famsync, starting within `[from, to]`.
    pub fn list_events(
        &self,
        calendar: &CalendarId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SyncResult<Vec<SourceEvent>> {
        Ok(self
            .read_files(calendar)?
            .iter()
            .flat_map(|(_, content)| ics::parse_source_events(content))
            .filter(|event| from <= event.start && event.start <= to)
            .collect())
    }

    pub fn list_owned_events(&self, calendar: &CalendarId) -> SyncResult<Vec<OwnedEvent>> {
        Ok(self
            .read_files(calendar)?
            .into_iter()
            .filter_map(|(backend_id, content)| {
                ics::parse_synced_event(&content).map(|event| OwnedEvent { backend_id, event })
            })
            .collect())
    }

    pub fn create_event(&self, calendar: &CalendarId, event: &SyncedEvent) -> SyncResult<String> {
        validate(event)?;
        let dir = self.calendar_dir(calendar)?;
        let backend_id = Uuid::new_v4().to_string();
        write_event(calendar, &Self::event_path(&dir, &backend_id)?, &backend_id, event)?;
        Ok(backend_id)
    }

    /// Only files that already hold a synced event can be updated.
    pub fn update_event(
        &self,
        calendar: &CalendarId,
        backend_id: &str,
        event: &SyncedEvent,
    ) -> SyncResult<()> {
        validate(event)?;
        let dir = self.calendar_dir(calendar)?;
        let path = Self::event_path(&dir, backend_id)?;

        let existing = fs::read_to_string(&path)
            .map_err(|_| SyncError::rejected(format!("no event with id '{backend_id}'")))?;
        if ics::parse_synced_event(&existing).is_none() {
            return Err(SyncError::rejected(format!(
                "event '{backend_id}' was not created by famsync"
            )));
        }

        write_event(calendar, &path, backend_id, event)
    }

    /// Deleting an event that is already gone succeeds.
    pub fn delete_event(&self, calendar: &CalendarId, backend_id: &str) -> SyncResult<()> {
        let dir = self.calendar_dir(calendar)?;
        let path = Self::event_path(&dir, backend_id)?;

        let Ok(existing) = fs::read_to_string(&path) else {
            return Ok(());
        };
        if ics::parse_synced_event(&existing).is_none() {
            return Err(SyncError::rejected(format!(
                "event '{backend_id}' was not created by famsync"
            )));
        }

        fs::remove_file(&path).map_err(|e| {
            SyncError::unavailable(calendar, format!("failed to delete {}: {e}", path.display()))
        })
    }
}

fn validate(event: &SyncedEvent) -> SyncResult<()> {
    if event.title.trim().is_empty() {
        return Err(SyncError::rejected("event has an empty title"));
    }
    if event.end < event.start {
        return Err(SyncError::rejected("event ends before it starts"));
    }
    Ok(())
}

fn write_event(
    calendar: &CalendarId,
    path: &Path,
    backend_id: &str,
    event: &SyncedEvent,
) -> SyncResult<()> {
    let content = ics::generate_ics(backend_id, event);
    fs::write(path, content).map_err(|e| {
        SyncError::unavailable(calendar, format!("failed to write {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn alice() -> CalendarId {
        CalendarId::new("calendar.alice")
    }

    fn setup() -> (TempDir, CalendarStore) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("calendar.alice")).unwrap();
        fs::create_dir(tmp.path().join("calendar.work")).unwrap();
        let store = CalendarStore::new(tmp.path());
        (tmp, store)
    }

    fn synced(title: &str) -> SyncedEvent {
        let start = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();
        let source = SourceEvent {
            id: "e1".to_string(),
            title: title.to_string(),
            description: None,
            start,
            end: start + Duration::hours(1),
            location: None,
        };
        SyncedEvent::from_source(&CalendarId::new("calendar.work"), &source)
    }

    #[test]
    fn test_create_list_update_delete() {
        let (_tmp, store) = setup();

        let id = store.create_event(&alice(), &synced("Team sync")).unwrap();
        let owned = store.list_owned_events(&alice()).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].backend_id, id);
        assert_eq!(owned[0].event, synced("Team sync"));

        store.update_event(&alice(), &id, &synced("Team standup")).unwrap();
        assert_eq!(
            store.list_owned_events(&alice()).unwrap()[0].event.title,
            "Team standup"
        );

        store.delete_event(&alice(), &id).unwrap();
        assert!(store.list_owned_events(&alice()).unwrap().is_empty());

        // Already gone
        store.delete_event(&alice(), &id).unwrap();
    }

    #[test]
    fn test_missing_calendar_is_unavailable() {
        let (_tmp, store) = setup();
        let result = store.list_owned_events(&CalendarId::new("calendar.nobody"));
        assert!(matches!(result, Err(SyncError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_user_files_are_listed_but_never_owned() {
        let (tmp, store) = setup();
        fs::write(
            tmp.path().join("calendar.work/standup.ics"),
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:test\r\nBEGIN:VEVENT\r\nUID:e1\r\n\
             SUMMARY:Team sync\r\nDTSTART:20250320T150000Z\r\nDTEND:20250320T160000Z\r\n\
             END:VEVENT\r\nEND:VCALENDAR\r\n",
        )
        .unwrap();

        let work = CalendarId::new("calendar.work");
        let from = Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap();
        let events = store.list_events(&work, from, from + Duration::days(7)).unwrap();
        assert_eq!(events.len(), 1);
        assert!(store.list_owned_events(&work).unwrap().is_empty());

        // Outside the window
        let later = from + Duration::days(1);
        assert!(store.list_events(&work, later, later + Duration::days(7)).unwrap().is_empty());

        // A user file cannot be deleted through the provider
        let result = store.delete_event(&work, "standup");
        assert!(matches!(result, Err(SyncError::WriteRejected(_))));
        assert!(tmp.path().join("calendar.work/standup.ics").exists());
    }

    #[test]
    fn test_invalid_payloads_are_rejected() {
        let (_tmp, store) = setup();

        let result = store.create_event(&alice(), &synced("  "));
        assert!(matches!(result, Err(SyncError::WriteRejected(_))));

        let mut backwards = synced("Team sync");
        backwards.end = backwards.start - Duration::hours(1);
        let result = store.create_event(&alice(), &backwards);
        assert!(matches!(result, Err(SyncError::WriteRejected(_))));

        let result = store.delete_event(&alice(), "../calendar.work/x");
        assert!(matches!(result, Err(SyncError::WriteRejected(_))));
    }
}
