// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # Gable
//!
//! Platform-agnostic server request/response abstraction with
//! copy-on-write semantics.
//!
//! Gable wraps the raw data a gateway hands an application (query
//! string, posted form, cookies, uploaded files, server metadata, JSON
//! body) behind an immutable [`ServerRequest`], and builds outgoing
//! responses through the immutable [`ClientResponse`] family. Every
//! mutator returns a new instance, so requests and responses can be
//! shared freely across handlers without defensive copying.
//!
//! ## Quick Start
//!
//! ```rust
//! use gable::{ClientResponse, ServerRequest, ServerRequestOptions};
//!
//! let request = ServerRequest::new(
//!     ServerRequestOptions::default()
//!         .with_global("get", serde_json::json!({ "page": "2" })),
//! );
//! let page = request.get_query(Some("page"));
//!
//! let response = ClientResponse::new()
//!     .set_status(200)
//!     .set_json(&serde_json::json!({ "page": page }));
//! ```

/// Set-Cookie values and construction options.
pub mod cookie;
/// Header date formatting.
pub mod date;
/// File download responses.
pub mod download;
/// Error types.
pub mod error;
/// Insertion-ordered HTTP header map.
pub mod headers;
/// Accept-header negotiation.
pub mod negotiate;
/// Redirect responses.
pub mod redirect;
/// Server request wrapper.
pub mod request;
/// Client response builder.
pub mod response;
/// Status code reason phrases.
pub mod status;
/// Uploaded file handling.
pub mod upload;
/// Opaque user-agent holder.
pub mod useragent;

pub use cookie::{Cookie, CookieKey, CookieOptions, SameSite};
pub use date::HttpDate;
pub use download::{DownloadOptions, DownloadResponse};
pub use error::{Result, ServerError};
pub use headers::{Header, HeaderMap};
pub use redirect::RedirectResponse;
pub use request::{
    string_cast, Filter, Global, NegotiationKind, ServerRequest, ServerRequestOptions,
};
pub use response::{ClientResponse, HttpVersion};
pub use upload::{FileValue, UploadedFile};
pub use useragent::UserAgent;
