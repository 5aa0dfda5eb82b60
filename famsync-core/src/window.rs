//! Sync window and title-prefix filtering.
//!
//! Every candidate event must pass both predicates before it can enter a
//! desired set, whichever path (copy-all or keyword) brought it there.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::SyncOptions;
use crate::event::SourceEvent;

/// Inclusive range of event start times considered by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Bounds past the representable range saturate at the earliest or latest instant.
    pub fn new(now: DateTime<Utc>, days_to_sync: u32, days_to_sync_past: u32) -> Self {
        let start = Duration::try_days(i64::from(days_to_sync_past))
            .and_then(|past| now.checked_sub_signed(past))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = Duration::try_days(i64::from(days_to_sync))
            .and_then(|ahead| now.checked_add_signed(ahead))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        SyncWindow { start, end }
    }

    pub fn from_options(now: DateTime<Utc>, options: &SyncOptions) -> Self {
        Self::new(now, options.days_to_sync, options.days_to_sync_past)
    }

    /// Both boundaries are inclusive.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Query bounds for providers, clamped to four-digit years so RFC 3339 parsers accept them.
    pub fn start_rfc3339(&self) -> String {
        self.start.clamp(wire_min(), wire_max()).to_rfc3339()
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.clamp(wire_min(), wire_max()).to_rfc3339()
    }
}

fn wire_min() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn wire_max() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn in_window(
    event: &SourceEvent,
    now: DateTime<Utc>,
    days_to_sync: u32,
    days_to_sync_past: u32,
) -> bool {
    SyncWindow::new(now, days_to_sync, days_to_sync_past).contains(event.start)
}

/// Exact, case-sensitive prefix test. An empty prefix lets everything through.
pub fn passes_ignore_filter(event: &SourceEvent, ignore_prefix: &str) -> bool {
    ignore_prefix.is_empty() || !event.title.starts_with(ignore_prefix)
}

/// The window and ignore-prefix predicates bundled for one pass.
#[derive(Debug, Clone)]
pub struct EventFilter<'a> {
    pub window: SyncWindow,
    pub ignore_prefix: &'a str,
}

impl<'a> EventFilter<'a> {
    pub fn new(window: SyncWindow, ignore_prefix: &'a str) -> Self {
        EventFilter {
            window,
            ignore_prefix,
        }
    }

    pub fn admits(&self, event: &SourceEvent) -> bool {
        self.window.contains(event.start) && passes_ignore_filter(event, self.ignore_prefix)
    }
}
