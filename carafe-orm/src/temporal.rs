//! # Temporal Type Conversion Module
//!
//! Driver-specific handling for timestamp values. PostgreSQL and SQLite take
//! RFC 3339 text for `TIMESTAMPTZ`-style columns, while MySQL expects the
//! `DATETIME` literal format without a zone suffix.

use chrono::{DateTime, Utc};

use crate::database::Drivers;
use crate::errors::Error;

/// Converts a `DateTime<Utc>` to the format expected by a specific driver.
pub fn format_datetime_for_driver(value: &DateTime<Utc>, driver: Drivers) -> String {
    match driver {
        Drivers::Postgres | Drivers::SQLite => value.to_rfc3339(),
        Drivers::MySQL => value.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
    }
}

/// Parses a stored string back into a `DateTime<Utc>`.
///
/// RFC 3339 is tried first, then the zone-less MySQL literal format
/// (interpreted as UTC, which is how [`format_datetime_for_driver`] wrote it).
pub fn parse_datetime_utc(value: &str) -> Result<DateTime<Utc>, Error> {
    if let Ok(parsed) = value.parse::<DateTime<Utc>>() {
        return Ok(parsed);
    }
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Conversion(format!("Failed to parse DateTime<Utc>: {e}")))
}
