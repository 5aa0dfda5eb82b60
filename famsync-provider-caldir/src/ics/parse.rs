//! ICS file parsing using the icalendar crate's parser.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use famsync_core::event::{CalendarId, OriginMarker, SourceEvent, SyncedEvent};
use famsync_core::fingerprint::Fingerprint;
use icalendar::parser::{Component, read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};

use super::{PROP_FINGERPRINT, PROP_PARENT, PROP_SOURCE_ID};

/// Parse every VEVENT in an ICS document that was not written by famsync.
///
/// Events without a UID or a usable DTSTART are skipped.
pub fn parse_source_events(content: &str) -> Vec<SourceEvent> {
    let unfolded = unfold(content);
    let Ok(calendar) = read_calendar(&unfolded) else {
        return Vec::new();
    };

    calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter(|c| c.find_prop(PROP_PARENT).is_none())
        .filter_map(to_source_event)
        .collect()
}

/// Parse the synced event stored in an ICS document, if it carries an origin marker.
pub fn parse_synced_event(content: &str) -> Option<SyncedEvent> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;
    let vevent = calendar.components.iter().find(|c| c.name == "VEVENT")?;

    let origin = OriginMarker {
        parent: CalendarId::new(vevent.find_prop(PROP_PARENT)?.val.to_string()),
        source_event_id: vevent.find_prop(PROP_SOURCE_ID)?.val.to_string(),
        fingerprint: Fingerprint::from_raw(vevent.find_prop(PROP_FINGERPRINT)?.val.to_string()),
    };
    let (start, end) = event_times(vevent)?;

    Some(SyncedEvent {
        title: text_prop(vevent, "SUMMARY").unwrap_or_default(),
        description: text_prop(vevent, "DESCRIPTION"),
        start,
        end,
        location: text_prop(vevent, "LOCATION"),
        origin,
    })
}

fn to_source_event(vevent: &Component) -> Option<SourceEvent> {
    let uid = vevent.find_prop("UID")?.val.to_string();

    // Overrides of a recurring event share the master's UID
    let id = match vevent.find_prop("RECURRENCE-ID") {
        Some(recurrence_id) => format!("{uid}#{}", recurrence_id.val.as_ref()),
        None => uid,
    };
    let (start, end) = event_times(vevent)?;

    Some(SourceEvent {
        id,
        title: text_prop(vevent, "SUMMARY").unwrap_or_default(),
        description: text_prop(vevent, "DESCRIPTION"),
        start,
        end,
        location: text_prop(vevent, "LOCATION"),
    })
}

fn text_prop(vevent: &Component, name: &str) -> Option<String> {
    vevent.find_prop(name).map(|p| p.val.to_string())
}

/// DTSTART and DTEND in UTC. A missing DTEND means a zero-length event,
/// or a single day for all-day events.
fn event_times(vevent: &Component) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?;
    let all_day = matches!(start, DatePerhapsTime::Date(_));
    let start = to_utc(start)?;

    let end = match vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
    {
        Some(end) => to_utc(end)?,
        None if all_day => start + Duration::days(1),
        None => start,
    };

    Some((start, end))
}

/// Normalize an ICS time to UTC.
///
/// All-day dates become midnight UTC. Floating times, and times in a zone
/// chrono-tz does not know, are read as UTC.
pub fn to_utc(time: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match time {
        DatePerhapsTime::Date(date) => Some(date.and_hms_opt(0, 0, 0)?.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Some(naive.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(tz) => tz
                    .from_local_datetime(&date_time)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc)),
                Err(_) => Some(date_time.and_utc()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ics(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:test\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn test_parse_utc_event() {
        let content = ics(
            "BEGIN:VEVENT\r\nUID:e1\r\nSUMMARY:Team sync\r\nDESCRIPTION:Weekly\r\n\
             LOCATION:Room 4\r\nDTSTART:20250320T150000Z\r\nDTEND:20250320T160000Z\r\nEND:VEVENT\r\n",
        );

        let events = parse_source_events(&content);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id, "e1");
        assert_eq!(event.title, "Team sync");
        assert_eq!(event.description.as_deref(), Some("Weekly"));
        assert_eq!(event.location.as_deref(), Some("Room 4"));
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 3, 20, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_zoned_time_is_normalized_to_utc() {
        let content = ics(
            "BEGIN:VEVENT\r\nUID:e2\r\nSUMMARY:Dentist\r\n\
             DTSTART;TZID=Europe/Amsterdam:20250320T100000\r\n\
             DTEND;TZID=Europe/Amsterdam:20250320T110000\r\nEND:VEVENT\r\n",
        );

        let events = parse_source_events(&content);
        // CET is UTC+1 in March before the DST switch
        assert_eq!(events[0].start, Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap());
        assert_eq!(events[0].end, Utc.with_ymd_and_hms(2025, 3, 20, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_all_day_event_starts_at_midnight_utc() {
        let content = ics(
            "BEGIN:VEVENT\r\nUID:e3\r\nSUMMARY:Holiday\r\nDTSTART;VALUE=DATE:20250321\r\nEND:VEVENT\r\n",
        );

        let events = parse_source_events(&content);
        assert_eq!(events[0].start, Utc.with_ymd_and_hms(2025, 3, 21, 0, 0, 0).unwrap());
        assert_eq!(events[0].end, Utc.with_ymd_and_hms(2025, 3, 22, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_recurrence_override_gets_distinct_id() {
        let content = ics(
            "BEGIN:VEVENT\r\nUID:weekly\r\nSUMMARY:Piano\r\nDTSTART:20250320T150000Z\r\n\
             DTEND:20250320T160000Z\r\nEND:VEVENT\r\n\
             BEGIN:VEVENT\r\nUID:weekly\r\nRECURRENCE-ID:20250327T150000Z\r\nSUMMARY:Piano (moved)\r\n\
             DTSTART:20250328T150000Z\r\nDTEND:20250328T160000Z\r\nEND:VEVENT\r\n",
        );

        let ids: Vec<String> = parse_source_events(&content).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["weekly", "weekly#20250327T150000Z"]);
    }

    #[test]
    fn test_synced_events_are_not_source_events() {
        let content = ics(
            "BEGIN:VEVENT\r\nUID:x\r\nSUMMARY:Copy\r\nDTSTART:20250320T150000Z\r\n\
             DTEND:20250320T160000Z\r\nX-FAMSYNC-PARENT:calendar.work\r\n\
             X-FAMSYNC-SOURCE-ID:e1\r\nX-FAMSYNC-FINGERPRINT:8df445c6\r\nEND:VEVENT\r\n",
        );

        assert!(parse_source_events(&content).is_empty());
        let synced = parse_synced_event(&content).unwrap();
        assert_eq!(synced.origin.parent, CalendarId::new("calendar.work"));
        assert_eq!(synced.origin.fingerprint.as_str(), "8df445c6");
    }

    #[test]
    fn test_foreign_event_has_no_origin() {
        let content = ics(
            "BEGIN:VEVENT\r\nUID:e1\r\nSUMMARY:Mine\r\nDTSTART:20250320T150000Z\r\nEND:VEVENT\r\n",
        );
        assert!(parse_synced_event(&content).is_none());
    }
}
