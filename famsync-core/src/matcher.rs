//! Keyword matching between source events and children.
//!
//! Matching is an OR of plain, case-insensitive substrings. There is no
//! ranking and no regex support.

use crate::event::SourceEvent;

/// Which event fields a keyword is searched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    TitleOnly,
    TitleAndDescription,
    TitleDescriptionLocation,
}

/// Scope used by the engine when building desired sets.
pub const DEFAULT_MATCH_SCOPE: MatchScope = MatchScope::TitleAndDescription;

/// Returns true if any keyword occurs in the event's title or description.
pub fn matches(event: &SourceEvent, keywords: &[String]) -> bool {
    matches_in(event, keywords, DEFAULT_MATCH_SCOPE)
}

pub fn matches_in(event: &SourceEvent, keywords: &[String], scope: MatchScope) -> bool {
    let haystack = searchable_text(event, scope);

    keywords
        .iter()
        .filter(|keyword| !keyword.trim().is_empty())
        .any(|keyword| haystack.contains(&keyword.to_lowercase()))
}

/// Lowercased fields joined by newlines so a keyword never spans two fields.
fn searchable_text(event: &SourceEvent, scope: MatchScope) -> String {
    let mut parts = vec![event.title.as_str()];

    if scope != MatchScope::TitleOnly {
        parts.extend(event.description.as_deref());
    }

    if scope == MatchScope::TitleDescriptionLocation {
        parts.extend(event.location.as_deref());
    }

    parts.join("\n").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(title: &str, description: Option<&str>, location: Option<&str>) -> SourceEvent {
        let start = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();
        SourceEvent {
            id: "e1".to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            start,
            end: start,
            location: location.map(str::to_string),
        }
    }

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_matches_title_case_insensitively() {
        let e = event("Team Sync", None, None);
        assert!(matches(&e, &keywords(&["team"])));
        assert!(matches(&e, &keywords(&["SYNC"])));
    }

    #[test]
    fn test_matches_description() {
        let e = event("Dentist", Some("Bring Alice along"), None);
        assert!(matches(&e, &keywords(&["alice"])));
    }

    #[test]
    fn test_any_keyword_is_enough() {
        let e = event("Soccer practice", None, None);
        assert!(matches(&e, &keywords(&["piano", "soccer"])));
        assert!(!matches(&e, &keywords(&["piano", "swim"])));
    }

    #[test]
    fn test_empty_keyword_set_matches_nothing() {
        assert!(!matches(&event("Anything", Some("at all"), None), &[]));
    }

    #[test]
    fn test_blank_keywords_never_match() {
        let e = event("Team sync", Some("weekly"), None);
        assert!(!matches(&e, &keywords(&["", "   ", "\t"])));
    }

    #[test]
    fn test_keyword_is_plain_substring_not_regex() {
        let e = event("Team sync", None, None);
        assert!(!matches(&e, &keywords(&["t.am"])));
        assert!(matches(&event("Budget (Q1)", None, None), &keywords(&["(q1)"])));
    }

    #[test]
    fn test_keyword_does_not_span_title_and_description() {
        let e = event("Team", Some("sync"), None);
        assert!(!matches(&e, &keywords(&["teamsync"])));
    }

    #[test]
    fn test_title_only_scope_ignores_description() {
        let e = event("Dentist", Some("Bring Alice along"), None);
        assert!(!matches_in(&e, &keywords(&["alice"]), MatchScope::TitleOnly));
        assert!(matches_in(&e, &keywords(&["dentist"]), MatchScope::TitleOnly));
    }

    #[test]
    fn test_location_only_searched_when_in_scope() {
        let e = event("Practice", None, Some("Riverside Pool"));
        assert!(!matches(&e, &keywords(&["pool"])));
        assert!(matches_in(
            &e,
            &keywords(&["pool"]),
            MatchScope::TitleDescriptionLocation
        ));
    }
}
