//! Domain models for the blood-bank system.

mod donation;
mod event;
mod member;
mod reference;
mod request;
mod unit;

pub use donation::*;
pub use event::*;
pub use member::*;
pub use reference::*;
pub use request::*;
pub use unit::*;

use chrono::{DateTime, SecondsFormat, Utc};

/// Format an instant as a fixed-width RFC 3339 UTC timestamp.
///
/// Second precision with a `Z` suffix keeps lexical and chronological order
/// identical, which the SQL expiry filters rely on.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as a stored timestamp.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a stored timestamp.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
