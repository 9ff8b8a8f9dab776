// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Response cookie value and `Set-Cookie` serialization.
//!
//! A cookie is identified by the (name, domain, path) triple: setting a
//! cookie with the same triple replaces the prior entry, while distinct
//! domain/path combinations for the same name coexist.

use serde::Deserialize;

use crate::date::format_utc;

/// Cookie SameSite attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SameSite {
    /// Sent only in a first-party context.
    Strict,
    /// Sent on top-level navigations.
    Lax,
    /// Sent in all contexts (requires Secure).
    None,
}

impl SameSite {
    /// Returns the attribute's wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes applied when setting or deleting a cookie.
///
/// `expires` is a *relative* offset in seconds from the current time;
/// the response builder converts it to an absolute timestamp.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CookieOptions {
    /// Lifetime in seconds, relative to now.
    pub expires: Option<i64>,
    /// Cookie domain.
    pub domain: Option<String>,
    /// Cookie path.
    pub path: Option<String>,
    /// Only send over secure transports.
    #[serde(default)]
    pub secure: bool,
    /// Hide from client-side scripts.
    #[serde(default)]
    pub http_only: bool,
    /// SameSite attribute.
    pub same_site: Option<SameSite>,
}

/// Identity of a cookie within a response: (name, domain, path).
pub type CookieKey = (String, String, String);

/// An HTTP response cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    /// Absolute expiry as epoch seconds. `None` means a session cookie.
    expires: Option<i64>,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl Cookie {
    /// Creates a cookie from a name, value and attributes.
    ///
    /// `expires_at` is an absolute epoch timestamp; relative offsets are
    /// resolved by the caller.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        expires_at: Option<i64>,
        options: &CookieOptions,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: expires_at,
            domain: options.domain.clone().unwrap_or_default(),
            path: options.path.clone().unwrap_or_else(|| "/".to_string()),
            secure: options.secure,
            http_only: options.http_only,
            same_site: options.same_site,
        }
    }

    /// The cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The cookie domain ("" when unset).
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The cookie path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The absolute expiry timestamp, if any.
    pub fn expires(&self) -> Option<i64> {
        self.expires
    }

    /// The (name, domain, path) identity triple.
    pub fn key(&self) -> CookieKey {
        (self.name.clone(), self.domain.clone(), self.path.clone())
    }

    /// Determines whether the cookie's expiry lies in the past.
    pub fn is_expired(&self) -> bool {
        match self.expires {
            Some(expires) => expires <= chrono::Utc::now().timestamp(),
            None => false,
        }
    }

    /// Serializes the cookie as a `Set-Cookie` header line.
    pub fn header_string(&self) -> String {
        let mut parts = vec![format!("{}={}", self.name, self.value)];

        if let Some(expires) = self.expires {
            parts.push(format!("Expires={}", format_utc(expires)));
        }
        if !self.domain.is_empty() {
            parts.push(format!("Domain={}", self.domain));
        }
        parts.push(format!("Path={}", self.path));
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={}", same_site.as_str()));
        }

        format!("Set-Cookie: {}", parts.join("; "))
    }
}
