// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Redirect responses.

use std::io::Write;

use tracing::debug;

use crate::error::{Result, ServerError};
use crate::response::{ClientResponse, HttpVersion};

/// A response that redirects the client to another URI.
///
/// When no status code is given, one is chosen from the request
/// context: HTTP/1.1 clients get `303 See Other` after a non-GET
/// request and `307 Temporary Redirect` after a GET, older clients get
/// `302 Found`. An explicit code is used verbatim.
///
/// The body is fixed (empty); [`RedirectResponse::set_body`] always
/// fails.
#[derive(Debug, Clone)]
pub struct RedirectResponse {
    inner: ClientResponse,
}

impl RedirectResponse {
    /// Builds a redirect to `uri`.
    pub fn new(
        uri: &str,
        code: Option<u16>,
        method: &str,
        protocol_version: HttpVersion,
    ) -> Self {
        let code = code.unwrap_or_else(|| {
            if protocol_version.at_least_1_1() {
                if method.eq_ignore_ascii_case("GET") {
                    307
                } else {
                    303
                }
            } else {
                302
            }
        });

        debug!(uri, code, "building redirect");

        let inner = ClientResponse::new()
            .set_protocol_version(protocol_version)
            .set_status(code)
            .set_header("Location", uri);

        Self { inner }
    }

    /// The redirect target.
    pub fn location(&self) -> Option<String> {
        self.inner.header_value("Location")
    }

    /// The underlying response.
    pub fn response(&self) -> &ClientResponse {
        &self.inner
    }

    /// The status code.
    pub fn status_code(&self) -> u16 {
        self.inner.status_code()
    }

    /// Returns a new redirect with a header set.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            inner: self.inner.set_header(name, value),
        }
    }

    /// Redirect bodies are fixed; this always fails with
    /// [`ServerError::UnsupportedSetBody`].
    pub fn set_body(&self, _body: &[u8]) -> Result<Self> {
        Err(ServerError::UnsupportedSetBody)
    }

    /// Writes the redirect to a transport.
    pub fn send(&self, transport: &mut dyn Write) -> std::io::Result<()> {
        self.inner.send(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_code_used_verbatim() {
        let redirect = RedirectResponse::new("/next", Some(301), "POST", HttpVersion::V1_1);
        assert_eq!(redirect.status_code(), 301);
    }

    #[test]
    fn test_http11_get_upgrades_to_307() {
        let redirect = RedirectResponse::new("/next", None, "GET", HttpVersion::V1_1);
        assert_eq!(redirect.status_code(), 307);
    }

    #[test]
    fn test_http11_post_upgrades_to_303() {
        let redirect = RedirectResponse::new("/next", None, "POST", HttpVersion::V1_1);
        assert_eq!(redirect.status_code(), 303);
    }

    #[test]
    fn test_http10_falls_back_to_302() {
        let redirect = RedirectResponse::new("/next", None, "GET", HttpVersion::V1_0);
        assert_eq!(redirect.status_code(), 302);
    }

    #[test]
    fn test_location_header() {
        let redirect = RedirectResponse::new("https://example.com/", Some(302), "GET", HttpVersion::V1_1);
        assert_eq!(redirect.location().as_deref(), Some("https://example.com/"));
    }

    #[test]
    fn test_set_body_rejected() {
        let redirect = RedirectResponse::new("/next", None, "GET", HttpVersion::V1_1);
        assert!(matches!(
            redirect.set_body(b"nope"),
            Err(ServerError::UnsupportedSetBody)
        ));
    }

    #[test]
    fn test_wire_form() {
        let redirect = RedirectResponse::new("/next", Some(302), "GET", HttpVersion::V1_1);
        let mut wire = Vec::new();
        redirect.send(&mut wire).unwrap();
        let text = String::from_utf8(wire).unwrap();

        assert!(text.starts_with("HTTP/1.1 302 Found\r\n"));
        assert!(text.contains("Location: /next\r\n"));
    }
}
