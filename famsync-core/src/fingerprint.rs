//! Short deterministic identity hashes for synced events.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::event::CalendarId;

/// Number of hex characters kept from the digest.
pub const HASH_LENGTH: usize = 8;

/// Field separator in the hashed projection (ASCII unit separator).
const SEPARATOR: &str = "\u{1f}";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a fingerprint read back from a backend.
    pub fn from_raw(value: impl Into<String>) -> Self {
        Fingerprint(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash the identity-relevant fields of a source event.
///
/// Description and location are not part of the projection.
pub fn fingerprint(
    parent: &CalendarId,
    source_event_id: &str,
    title: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Fingerprint {
    let projection = [
        parent.as_str(),
        source_event_id,
        title,
        &start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        &end.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    ]
    .join(SEPARATOR);

    let digest = Sha256::digest(projection.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LENGTH);
    Fingerprint(hex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap()
    }

    fn fp(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Fingerprint {
        fingerprint(&CalendarId::new("calendar.work"), "e1", title, start, end)
    }

    #[test]
    fn test_fingerprint_is_eight_hex_chars() {
        let value = fp("Team sync", start(), start() + Duration::hours(1));
        assert_eq!(value.as_str().len(), HASH_LENGTH);
        assert!(value.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_is_stable_across_runs() {
        // Pinned value: must never change between releases, or every synced
        // event would be rewritten on upgrade.
        let value = fp("Team sync", start(), start() + Duration::hours(1));
        assert_eq!(value.as_str(), "8df445c6");
        assert_eq!(value, fp("Team sync", start(), start() + Duration::hours(1)));
    }

    #[test]
    fn test_fingerprint_changes_with_identity_fields() {
        let end = start() + Duration::hours(1);
        let base = fp("Team sync", start(), end);

        assert_ne!(base, fp("Team standup", start(), end));
        assert_ne!(base, fp("Team sync", start() + Duration::minutes(30), end));
        assert_ne!(base, fp("Team sync", start(), end + Duration::minutes(30)));
        assert_ne!(
            base,
            fingerprint(&CalendarId::new("calendar.home"), "e1", "Team sync", start(), end)
        );
        assert_ne!(
            base,
            fingerprint(&CalendarId::new("calendar.work"), "e2", "Team sync", start(), end)
        );
    }

    #[test]
    fn test_fingerprint_fields_cannot_bleed_into_each_other() {
        let end = start() + Duration::hours(1);
        let a = fingerprint(&CalendarId::new("a"), "bc", "x", start(), end);
        let b = fingerprint(&CalendarId::new("ab"), "c", "x", start(), end);
        assert_ne!(a, b);
    }
}
