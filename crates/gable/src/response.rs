// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Immutable response builder.
//!
//! [`ClientResponse`] composes status, headers, cookies and body through
//! copy-on-write setters: every mutator returns a new instance and the
//! receiver stays observable by other holders. [`ClientResponse::send`]
//! is the terminal operation, serializing the status line, headers,
//! cookies and body to a transport.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::debug;

use crate::cookie::{Cookie, CookieKey, CookieOptions};
use crate::date::HttpDate;
use crate::date::format_utc;
use crate::headers::HeaderMap;
use crate::status::reason_phrase;

const CRLF: &str = "\r\n";

/// The HTTP protocol version carried on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    /// HTTP/1.0
    V1_0,
    /// HTTP/1.1
    #[default]
    V1_1,
}

impl HttpVersion {
    /// Parses a `SERVER_PROTOCOL`-style string; anything unrecognized
    /// defaults to HTTP/1.1.
    pub fn parse(protocol: &str) -> Self {
        match protocol.trim() {
            "HTTP/1.0" | "1.0" => HttpVersion::V1_0,
            _ => HttpVersion::V1_1,
        }
    }

    /// The version number as written on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::V1_0 => "1.0",
            HttpVersion::V1_1 => "1.1",
        }
    }

    /// True for HTTP/1.1 and later.
    pub fn at_least_1_1(&self) -> bool {
        matches!(self, HttpVersion::V1_1)
    }
}

/// An immutable, copy-on-write HTTP response.
///
/// # Example
///
/// ```rust
/// use gable::ClientResponse;
///
/// let response = ClientResponse::new()
///     .set_status(201)
///     .set_json(&serde_json::json!({ "created": true }));
///
/// let mut wire = Vec::new();
/// response.send(&mut wire).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ClientResponse {
    status_code: u16,
    protocol_version: HttpVersion,
    headers: HeaderMap,
    cookies: BTreeMap<CookieKey, Cookie>,
    body: Vec<u8>,
}

impl Default for ClientResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientResponse {
    /// Creates a response with the default content-type and
    /// cache-control headers.
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.set_value("Content-Type", "text/html; charset=UTF-8");
        headers.set(
            "Cache-Control",
            vec!["no-store".into(), "max-age=0".into(), "no-cache".into()],
        );

        Self {
            status_code: 200,
            protocol_version: HttpVersion::default(),
            headers,
            cookies: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// The response status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The protocol version.
    pub fn protocol_version(&self) -> HttpVersion {
        self.protocol_version
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The joined value of a header, if set.
    pub fn header_value(&self, name: &str) -> Option<String> {
        self.headers.value(name)
    }

    /// The response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Sets the status code.
    pub fn set_status(&self, code: u16) -> Self {
        let mut next = self.clone();
        next.status_code = code;
        next
    }

    /// Sets the protocol version.
    pub fn set_protocol_version(&self, version: HttpVersion) -> Self {
        let mut next = self.clone();
        next.protocol_version = version;
        next
    }

    /// Sets a header to a single value.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.headers.set_value(name, value);
        next
    }

    /// Sets a header to multiple values (`Name: v1, v2` on the wire).
    pub fn set_header_values(&self, name: impl Into<String>, values: Vec<String>) -> Self {
        let mut next = self.clone();
        next.headers.set(name, values);
        next
    }

    /// Appends a value to a header, creating it when absent.
    pub fn append_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.headers.append_value(name, value);
        next
    }

    /// Sets the content-type header with a charset.
    pub fn set_content_type(&self, mime_type: &str, charset: &str) -> Self {
        self.set_header("Content-Type", format!("{}; charset={}", mime_type, charset))
    }

    /// Replaces the body.
    pub fn set_body(&self, body: impl Into<Vec<u8>>) -> Self {
        let mut next = self.clone();
        next.body = body.into();
        next
    }

    /// Sets headers to prevent browser caching.
    pub fn no_cache(&self) -> Self {
        self.set_header_values(
            "Cache-Control",
            vec!["no-store".into(), "max-age=0".into(), "no-cache".into()],
        )
    }

    /// Sets a cookie. A relative `expires` offset in seconds is added
    /// to the current time. Cookies are keyed by (name, domain, path):
    /// the same triple replaces, distinct triples coexist.
    pub fn set_cookie(&self, name: &str, value: &str, options: &CookieOptions) -> Self {
        let expires_at = options
            .expires
            .map(|offset| chrono::Utc::now().timestamp() + offset);

        let cookie = Cookie::new(name, value, expires_at, options);

        let mut next = self.clone();
        next.cookies.insert(cookie.key(), cookie);
        next
    }

    /// Sets an already-expired cookie under the same identity triple,
    /// instructing the client to purge it.
    pub fn delete_cookie(&self, name: &str, options: &CookieOptions) -> Self {
        let cookie = Cookie::new(name, "", Some(1), options);

        let mut next = self.clone();
        next.cookies.insert(cookie.key(), cookie);
        next
    }

    /// Returns the first cookie with the given name, if any.
    pub fn get_cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.values().find(|cookie| cookie.name() == name)
    }

    /// Determines whether a cookie with the given name has been set.
    pub fn has_cookie(&self, name: &str) -> bool {
        self.get_cookie(name).is_some()
    }

    /// All cookies, in identity order.
    pub fn cookies(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    /// Sets a pretty-printed, key-ordered JSON body and the matching
    /// content type.
    pub fn set_json(&self, data: &serde_json::Value) -> Self {
        let body = serde_json::to_string_pretty(data).unwrap_or_else(|_| "null".to_string());

        self.set_content_type("application/json", "UTF-8")
            .set_body(body)
    }

    /// Sets a serialized XML tree as the body and the matching content
    /// type. Serialization belongs to the caller's XML collaborator.
    pub fn set_xml(&self, xml: impl Into<String>) -> Self {
        self.set_content_type("application/xml", "UTF-8")
            .set_body(xml.into())
    }

    /// Sets the `Date` header from a timestamp, date string or datetime.
    pub fn set_date(&self, date: impl Into<HttpDate>) -> Self {
        self.set_header("Date", format_utc(date.into().timestamp()))
    }

    /// Sets the `Last-Modified` header from a timestamp, date string or
    /// datetime.
    pub fn set_last_modified(&self, date: impl Into<HttpDate>) -> Self {
        self.set_header("Last-Modified", format_utc(date.into().timestamp()))
    }

    /// Serializes the status line, headers, cookies and body to the
    /// transport. Does not mutate the response; invoke once per logical
    /// response (headers-already-sent semantics belong to the
    /// transport).
    pub fn send(&self, transport: &mut dyn Write) -> std::io::Result<()> {
        let reason = reason_phrase(self.status_code);

        if reason.is_empty() {
            write!(
                transport,
                "HTTP/{} {}{}",
                self.protocol_version.as_str(),
                self.status_code,
                CRLF
            )?;
        } else {
            write!(
                transport,
                "HTTP/{} {} {}{}",
                self.protocol_version.as_str(),
                self.status_code,
                reason,
                CRLF
            )?;
        }

        for header in self.headers.iter() {
            write!(transport, "{}{}", header, CRLF)?;
        }

        for cookie in self.cookies.values() {
            write!(transport, "{}{}", cookie.header_string(), CRLF)?;
        }

        write!(transport, "{}", CRLF)?;

        if !self.body.is_empty() {
            transport.write_all(&self.body)?;
        }

        debug!(status = self.status_code, bytes = self.body.len(), "response sent");

        Ok(())
    }
}
