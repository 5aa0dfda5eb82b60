//! ICS file generation and parsing.
//!
//! Synced events carry their origin marker as X- properties on the VEVENT.

mod generate;
mod parse;

pub use generate::generate_ics;
pub use parse::{parse_source_events, parse_synced_event};

pub const PROP_PARENT: &str = "X-FAMSYNC-PARENT";
pub const PROP_SOURCE_ID: &str = "X-FAMSYNC-SOURCE-ID";
pub const PROP_FINGERPRINT: &str = "X-FAMSYNC-FINGERPRINT";
