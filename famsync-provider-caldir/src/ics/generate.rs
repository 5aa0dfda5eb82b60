//! ICS file generation.

use chrono::{DateTime, Utc};
use famsync_core::event::SyncedEvent;
use icalendar::{Calendar, Component, EventLike};

use super::{PROP_FINGERPRINT, PROP_PARENT, PROP_SOURCE_ID};

fn format_utc(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Generate .ics content for a synced event, origin marker included.
///
/// The backend id doubles as the UID.
pub fn generate_ics(backend_id: &str, event: &SyncedEvent) -> String {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(backend_id);
    ics_event.summary(&event.title);
    ics_event.add_property("DTSTAMP", format_utc(&Utc::now()));
    ics_event.add_property("DTSTART", format_utc(&event.start));
    ics_event.add_property("DTEND", format_utc(&event.end));

    if let Some(ref desc) = event.description {
        ics_event.description(desc);
    }

    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }

    let origin = &event.origin;
    ics_event.add_property(PROP_PARENT, origin.parent.as_str());
    ics_event.add_property(PROP_SOURCE_ID, &origin.source_event_id);
    ics_event.add_property(PROP_FINGERPRINT, origin.fingerprint.as_str());

    let mut cal = Calendar::new();
    cal.push(ics_event.done());

    strip_ics_bloat(&cal.done().to_string())
}

/// Replace the icalendar crate's PRODID and drop CALSCALE:GREGORIAN (the default)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:FAMSYNC\r\n");
            continue;
        }
        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
