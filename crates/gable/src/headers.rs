// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Insertion-ordered HTTP header map.
//!
//! Header names are matched case-insensitively, but the name used on
//! first insertion is the one emitted on the wire. A header may carry
//! multiple values; they serialize as a single `Name: v1, v2` line.

use std::fmt;

/// A single header with one or more values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// The header name as first inserted.
    pub name: String,
    /// The header values, in insertion order.
    pub values: Vec<String>,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.values.join(", "))
    }
}

/// An insertion-ordered, case-insensitive header map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    headers: Vec<Header>,
}

impl HeaderMap {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the header entry for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&Header> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Returns the joined header value for `name`, if present.
    pub fn value(&self, name: &str) -> Option<String> {
        self.get(name).map(|h| h.values.join(", "))
    }

    /// Determines whether a header is set.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces the values of `name`, keeping its insertion slot, or
    /// appends a new entry when absent.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self
            .headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&name))
        {
            Some(header) => header.values = values,
            None => self.headers.push(Header { name, values }),
        }
    }

    /// Sets a header to a single value.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, vec![value.into()]);
    }

    /// Appends a value to a header, creating it when absent.
    pub fn append_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self
            .headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&name))
        {
            Some(header) => header.values.push(value.into()),
            None => self.headers.push(Header {
                name,
                values: vec![value.into()],
            }),
        }
    }

    /// Removes a header entirely.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|h| !h.name.eq_ignore_ascii_case(name));
    }

    /// Iterates headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.headers.iter()
    }

    /// Returns the number of distinct headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true when no headers are set.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
