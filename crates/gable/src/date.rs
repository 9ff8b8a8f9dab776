// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP date-header formatting.
//!
//! Date-bearing headers use the fixed pattern `D, d-M-Y H:i:s e`
//! rendered in UTC, e.g. `Thu, 01-Jan-1970 00:00:00 UTC`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// The header pattern, in chrono strftime form.
const HEADER_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S UTC";

/// A date value accepted by the date-header setters.
///
/// Setters take anything convertible into this union: epoch seconds, an
/// ISO-ish date string, or a structured [`DateTime`].
#[derive(Debug, Clone)]
pub enum HttpDate {
    /// Epoch seconds.
    Timestamp(i64),
    /// A textual date, parsed leniently.
    Text(String),
    /// A structured UTC datetime.
    DateTime(DateTime<Utc>),
}

impl From<i64> for HttpDate {
    fn from(timestamp: i64) -> Self {
        HttpDate::Timestamp(timestamp)
    }
}

impl From<&str> for HttpDate {
    fn from(text: &str) -> Self {
        HttpDate::Text(text.to_string())
    }
}

impl From<String> for HttpDate {
    fn from(text: String) -> Self {
        HttpDate::Text(text)
    }
}

impl From<DateTime<Utc>> for HttpDate {
    fn from(datetime: DateTime<Utc>) -> Self {
        HttpDate::DateTime(datetime)
    }
}

impl HttpDate {
    /// Normalizes the value to epoch seconds.
    ///
    /// Text accepts RFC 3339, RFC 2822, `YYYY-MM-DD HH:MM:SS` and bare
    /// `YYYY-MM-DD` forms. Unparseable text collapses to epoch 0.
    pub fn timestamp(&self) -> i64 {
        match self {
            HttpDate::Timestamp(timestamp) => *timestamp,
            HttpDate::DateTime(datetime) => datetime.timestamp(),
            HttpDate::Text(text) => parse_text(text).unwrap_or(0),
        }
    }
}

fn parse_text(text: &str) -> Option<i64> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc2822(text) {
        return Some(datetime.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

/// Formats epoch seconds per the HTTP-date header pattern, in UTC.
pub fn format_utc(timestamp: i64) -> String {
    let datetime = Utc
        .timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_default();

    datetime.format(HEADER_FORMAT).to_string()
}
