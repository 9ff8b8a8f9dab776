// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Immutable server request wrapper.
//!
//! [`ServerRequest`] normalizes access to environment-provided input:
//! query parameters, posted form fields, cookies, uploaded files,
//! server metadata and the JSON body. Each category is a *bucket*,
//! loaded at most once per request and addressable with dot-path keys.
//!
//! Mutators (`set_locale`, `set_param`, `set_global`) are copy-on-write:
//! they return a new instance sharing the unmodified buckets, so a base
//! request can be read concurrently by multiple downstream consumers.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, ServerError};
use crate::negotiate;
use crate::response::HttpVersion;
use crate::upload::{build_files, normalize_files, FileValue};
use crate::useragent::UserAgent;
use crate::headers::HeaderMap;

/// The closed set of global data buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Global {
    /// Request cookies.
    Cookie,
    /// Uploaded files.
    File,
    /// Query-string parameters.
    Get,
    /// Decoded JSON body.
    Json,
    /// Posted form fields.
    Post,
    /// Combined query and post data.
    Request,
    /// Server and gateway metadata.
    Server,
}

impl Global {
    const COUNT: usize = 7;

    /// Parses a bucket name. Names outside the closed set yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cookie" => Some(Global::Cookie),
            "file" => Some(Global::File),
            "get" => Some(Global::Get),
            "json" => Some(Global::Json),
            "post" => Some(Global::Post),
            "request" => Some(Global::Request),
            "server" => Some(Global::Server),
            _ => None,
        }
    }

    /// Whether dot-path keys split into nested lookups for this bucket.
    fn splits_paths(&self) -> bool {
        matches!(self, Global::File | Global::Get | Global::Json | Global::Post)
    }
}

/// The negotiation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationKind {
    /// `Accept` media types.
    Content,
    /// `Accept-Encoding` content codings.
    Encoding,
    /// `Accept-Language` language tags.
    Language,
}

impl NegotiationKind {
    /// Parses a negotiation kind name.
    ///
    /// Fails with [`ServerError::InvalidNegotiationType`] for anything
    /// outside the closed set.
    pub fn parse(kind: &str) -> Result<Self> {
        match kind {
            "content" => Ok(NegotiationKind::Content),
            "encoding" => Ok(NegotiationKind::Encoding),
            "language" => Ok(NegotiationKind::Language),
            other => Err(ServerError::InvalidNegotiationType(other.to_string())),
        }
    }
}

/// A loaded bucket: structured data, or the uploaded-files tree.
#[derive(Debug, Clone)]
enum Bucket {
    Data(Value),
    Files(FileValue),
}

/// Per-bucket memoization cells. Clones share the cells, so a bucket
/// loaded through any copy-on-write clone is loaded for all of them;
/// `set_global` swaps in a fresh, pre-filled cell.
#[derive(Debug, Clone)]
struct GlobalStore {
    cells: [Arc<OnceLock<Bucket>>; Global::COUNT],
}

impl GlobalStore {
    fn new() -> Self {
        Self {
            cells: std::array::from_fn(|_| Arc::new(OnceLock::new())),
        }
    }

    fn cell(&self, global: Global) -> &OnceLock<Bucket> {
        &self.cells[global as usize]
    }

    fn replace(&mut self, global: Global, bucket: Bucket) {
        let cell = OnceLock::new();
        let _ = cell.set(bucket);
        self.cells[global as usize] = Arc::new(cell);
    }
}

/// Construction options for a [`ServerRequest`].
///
/// `globals` overrides the environment sources per bucket name; names
/// outside the closed set are silently ignored. Explicit `headers`
/// override headers derived from the server bucket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerRequestOptions {
    /// Fallback locale when none is negotiated.
    pub default_locale: Option<String>,
    /// Ordered set of locales the application supports.
    pub supported_locales: Vec<String>,
    /// Per-bucket data overrides, keyed by bucket name.
    pub globals: HashMap<String, Value>,
    /// Explicit request method (defaults to server `REQUEST_METHOD`).
    pub method: Option<String>,
    /// Explicit headers, merged over the server-derived ones.
    pub headers: HashMap<String, String>,
    /// Raw request body.
    pub body: Option<String>,
    /// Base URI prepended to the request path.
    pub base_uri: Option<String>,
}

impl ServerRequestOptions {
    /// Adds a bucket override.
    pub fn with_global(mut self, name: impl Into<String>, data: Value) -> Self {
        self.globals.insert(name.into(), data);
        self
    }

    /// Adds an explicit header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the raw body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Sets the supported locales.
    pub fn with_supported_locales(mut self, locales: Vec<String>) -> Self {
        self.supported_locales = locales;
        self
    }

    /// Sets the default locale.
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }
}

/// A value filter applied to fetched bucket leaves.
pub type Filter<'a> = &'a dyn Fn(&Value) -> Value;

/// The default filter: casts scalar leaves to strings
/// (`true` → `"1"`, `false` and `null` → `""`).
pub fn string_cast(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.clone()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(true) => Value::String("1".to_string()),
        Value::Bool(false) | Value::Null => Value::String(String::new()),
        nested => nested.clone(),
    }
}

/// An immutable, copy-on-write server request.
///
/// # Example
///
/// ```rust
/// use gable::{ServerRequest, ServerRequestOptions};
///
/// let request = ServerRequest::new(
///     ServerRequestOptions::default()
///         .with_global("get", serde_json::json!({ "page": "1" })),
/// );
///
/// assert_eq!(request.get_query(Some("page")), Some("1".into()));
/// ```
#[derive(Debug, Clone)]
pub struct ServerRequest {
    method: String,
    path: String,
    query_string: String,
    protocol_version: HttpVersion,
    headers: HeaderMap,
    body: String,
    default_locale: String,
    locale: Option<String>,
    supported_locales: Vec<String>,
    params: HashMap<String, Value>,
    user_agent: UserAgent,
    raw_globals: Arc<HashMap<Global, Value>>,
    globals: GlobalStore,
}

impl Default for ServerRequest {
    fn default() -> Self {
        Self::new(ServerRequestOptions::default())
    }
}

impl ServerRequest {
    /// Constructs a request from raw environment data.
    pub fn new(options: ServerRequestOptions) -> Self {
        let mut raw_globals = HashMap::new();

        for (name, data) in options.globals {
            match Global::from_name(&name) {
                Some(global) => {
                    raw_globals.insert(global, data);
                }
                None => debug!(bucket = %name, "ignoring unknown global bucket"),
            }
        }

        let server = raw_globals
            .get(&Global::Server)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut headers = build_headers(&server);
        for (name, value) in options.headers {
            headers.set_value(name, value);
        }

        let method = options
            .method
            .or_else(|| server_string(&server, "REQUEST_METHOD"))
            .unwrap_or_else(|| "GET".to_string())
            .to_uppercase();

        let base_uri = options.base_uri.unwrap_or_default();
        let request_uri = server_string(&server, "REQUEST_URI").unwrap_or_default();
        let path = format!(
            "{}{}",
            base_uri.trim_end_matches('/'),
            request_uri.split('?').next().unwrap_or("")
        );

        let query_string = server_string(&server, "QUERY_STRING").unwrap_or_default();

        let protocol_version = server_string(&server, "SERVER_PROTOCOL")
            .map(|p| HttpVersion::parse(&p))
            .unwrap_or_default();

        let user_agent = UserAgent::new(headers.value("User-Agent").unwrap_or_default());

        let globals = GlobalStore::new();
        // The server bucket is consumed during construction; memoize it
        // up front so later fetches observe the same data.
        let _ = globals.cell(Global::Server).set(Bucket::Data(server));

        let mut request = Self {
            method,
            path,
            query_string,
            protocol_version,
            headers,
            body: options.body.unwrap_or_default(),
            default_locale: options
                .default_locale
                .unwrap_or_else(|| "en".to_string()),
            locale: None,
            supported_locales: options.supported_locales,
            params: HashMap::new(),
            user_agent,
            raw_globals: Arc::new(raw_globals),
            globals,
        };

        if !request.supported_locales.is_empty() && request.has_header("Accept-Language") {
            let supported = request.supported_locales.clone();
            request.locale = Some(request.negotiate_kind(NegotiationKind::Language, &supported, false));
        }

        request
    }

    /// The request method, uppercased.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request path (base URI plus the path portion of the URI).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// The protocol version.
    pub fn protocol_version(&self) -> HttpVersion {
        self.protocol_version
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The joined value of a header, if present.
    pub fn header_value(&self, name: &str) -> Option<String> {
        self.headers.value(name)
    }

    /// Determines whether a header is present.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// The raw request body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The user agent.
    pub fn user_agent(&self) -> &UserAgent {
        &self.user_agent
    }

    // --- Bucket accessors ---

    /// Fetches from the cookie bucket.
    pub fn get_cookie(&self, key: Option<&str>) -> Option<Value> {
        self.fetch_global(Global::Cookie, key)
    }

    /// Fetches from the query-string bucket.
    pub fn get_query(&self, key: Option<&str>) -> Option<Value> {
        self.fetch_global(Global::Get, key)
    }

    /// Fetches from the posted-form bucket.
    pub fn get_post(&self, key: Option<&str>) -> Option<Value> {
        self.fetch_global(Global::Post, key)
    }

    /// Fetches from the decoded JSON body.
    pub fn get_json(&self, key: Option<&str>) -> Option<Value> {
        self.fetch_global(Global::Json, key)
    }

    /// Fetches from the combined request bucket.
    pub fn get_request(&self, key: Option<&str>) -> Option<Value> {
        self.fetch_global(Global::Request, key)
    }

    /// Fetches from the server metadata bucket.
    pub fn get_server(&self, key: Option<&str>) -> Option<Value> {
        self.fetch_global(Global::Server, key)
    }

    /// Fetches the JSON body when the request declares
    /// `Content-Type: application/json`, otherwise the post bucket.
    pub fn get_data(&self, key: Option<&str>) -> Option<Value> {
        self.get_data_filtered(key, &string_cast)
    }

    /// Fetches a process environment variable, filtered.
    pub fn get_env(&self, key: &str) -> Option<Value> {
        self.get_env_filtered(key, &string_cast)
    }

    /// Fetches from the cookie bucket through a custom filter.
    pub fn get_cookie_filtered(&self, key: Option<&str>, filter: Filter<'_>) -> Option<Value> {
        self.fetch_global_filtered(Global::Cookie, key, filter)
    }

    /// Fetches from the query-string bucket through a custom filter.
    pub fn get_query_filtered(&self, key: Option<&str>, filter: Filter<'_>) -> Option<Value> {
        self.fetch_global_filtered(Global::Get, key, filter)
    }

    /// Fetches from the posted-form bucket through a custom filter.
    pub fn get_post_filtered(&self, key: Option<&str>, filter: Filter<'_>) -> Option<Value> {
        self.fetch_global_filtered(Global::Post, key, filter)
    }

    /// Fetches from the decoded JSON body through a custom filter.
    pub fn get_json_filtered(&self, key: Option<&str>, filter: Filter<'_>) -> Option<Value> {
        self.fetch_global_filtered(Global::Json, key, filter)
    }

    /// Fetches from the combined request bucket through a custom filter.
    pub fn get_request_filtered(&self, key: Option<&str>, filter: Filter<'_>) -> Option<Value> {
        self.fetch_global_filtered(Global::Request, key, filter)
    }

    /// Fetches from the server metadata bucket through a custom filter.
    pub fn get_server_filtered(&self, key: Option<&str>, filter: Filter<'_>) -> Option<Value> {
        self.fetch_global_filtered(Global::Server, key, filter)
    }

    /// Fetches the content-negotiated data bucket through a custom
    /// filter.
    pub fn get_data_filtered(&self, key: Option<&str>, filter: Filter<'_>) -> Option<Value> {
        if self.header_value("Content-Type").as_deref() == Some("application/json") {
            self.get_json_filtered(key, filter)
        } else {
            self.get_post_filtered(key, filter)
        }
    }

    /// Fetches a process environment variable through a custom filter.
    pub fn get_env_filtered(&self, key: &str, filter: Filter<'_>) -> Option<Value> {
        std::env::var(key)
            .ok()
            .map(|value| filter(&Value::String(value)))
    }

    /// Fetches an uploaded file or group of files.
    ///
    /// Dot-path keys walk nested groups and lists; the value is
    /// returned unfiltered.
    pub fn get_file(&self, key: Option<&str>) -> Option<FileValue> {
        let bucket = self.load_global(Global::File);
        let Bucket::Files(files) = bucket else {
            return None;
        };

        match key {
            None => Some(files.clone()),
            Some(key) => {
                let mut current = files;
                for segment in key.split('.') {
                    current = current.get(segment)?;
                }
                Some(current.clone())
            }
        }
    }

    /// Fetches a bucket value with the default string-cast filter.
    pub fn fetch_global(&self, global: Global, key: Option<&str>) -> Option<Value> {
        self.fetch_global_filtered(global, key, &string_cast)
    }

    /// Fetches a bucket value through a custom filter.
    ///
    /// With no key, the whole bucket is returned. Dot-path keys split
    /// for the file/get/json/post buckets and walk nested maps and
    /// lists; other buckets treat the key as a single literal. The
    /// filter recurses element-wise over collections so every leaf is
    /// filtered.
    pub fn fetch_global_filtered(
        &self,
        global: Global,
        key: Option<&str>,
        filter: Filter<'_>,
    ) -> Option<Value> {
        if global == Global::File {
            // The file bucket carries UploadedFile values, not Values.
            return None;
        }

        let bucket = self.load_global(global);
        let Bucket::Data(data) = bucket else {
            return None;
        };

        let mut value = data;

        if let Some(key) = key {
            if global.splits_paths() {
                for segment in key.split('.') {
                    value = walk(value, segment)?;
                }
            } else {
                value = value.as_object()?.get(key)?;
            }
        }

        Some(apply_filter(value, filter))
    }

    // --- Negotiation ---

    /// Negotiates a value from the request's accept headers.
    ///
    /// `kind` must name one of the closed set (`content`, `encoding`,
    /// `language`); anything else fails with
    /// [`ServerError::InvalidNegotiationType`]. The strict flag applies
    /// to content negotiation only.
    pub fn negotiate(&self, kind: &str, supported: &[String], strict: bool) -> Result<String> {
        let kind = NegotiationKind::parse(kind)?;
        Ok(self.negotiate_kind(kind, supported, strict))
    }

    /// Negotiates a value for an already-validated kind.
    pub fn negotiate_kind(
        &self,
        kind: NegotiationKind,
        supported: &[String],
        strict: bool,
    ) -> String {
        match kind {
            NegotiationKind::Content => {
                let accepted = self.header_value("Accept").unwrap_or_default();
                negotiate::content(&accepted, supported, strict)
            }
            NegotiationKind::Encoding => {
                let accepted = self.header_value("Accept-Encoding").unwrap_or_default();
                negotiate::encoding(&accepted, supported)
            }
            NegotiationKind::Language => {
                let accepted = self.header_value("Accept-Language").unwrap_or_default();
                negotiate::language(&accepted, supported)
            }
        }
    }

    // --- Locale ---

    /// The configured default locale.
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// The current locale: negotiated or explicitly set, falling back
    /// to the default locale.
    pub fn locale(&self) -> &str {
        self.locale.as_deref().unwrap_or(&self.default_locale)
    }

    /// The ordered set of supported locales.
    pub fn supported_locales(&self) -> &[String] {
        &self.supported_locales
    }

    /// Returns a new request with the locale overridden.
    ///
    /// Fails with [`ServerError::UnsupportedLocale`] when the locale is
    /// not in the supported set. Already-loaded buckets are unaffected.
    pub fn set_locale(&self, locale: &str) -> Result<Self> {
        if !self.supported_locales.iter().any(|l| l == locale) {
            return Err(ServerError::UnsupportedLocale(locale.to_string()));
        }

        let mut next = self.clone();
        next.locale = Some(locale.to_string());
        Ok(next)
    }

    // --- Params ---

    /// A request-scoped parameter, if set.
    pub fn get_param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Returns a new request with a parameter set.
    pub fn set_param(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.params.insert(key.into(), value);
        next
    }

    /// Returns a new request with a bucket's data replaced.
    ///
    /// Names outside the closed set are ignored: the clone is returned
    /// unchanged.
    pub fn set_global(&self, name: &str, data: Value) -> Self {
        let mut next = self.clone();

        match Global::from_name(name) {
            Some(Global::File) => {
                let files = build_files(&normalize_files(&data));
                next.globals.replace(Global::File, Bucket::Files(files));
            }
            Some(global) => {
                next.globals.replace(global, Bucket::Data(data));
            }
            None => warn!(bucket = %name, "set_global ignoring unknown bucket"),
        }

        next
    }

    // --- Predicates ---

    /// Determines whether the request was made using AJAX
    /// (`X-Requested-With: XMLHttpRequest`).
    pub fn is_ajax(&self) -> bool {
        self.header_value("X-Requested-With")
            .map(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
            .unwrap_or(false)
    }

    /// Determines whether the request originated outside a gateway:
    /// true when the server bucket carries no `REQUEST_METHOD`.
    pub fn is_cli(&self) -> bool {
        self.get_server(Some("REQUEST_METHOD")).is_none()
    }

    /// Determines whether the request is using HTTPS, checking the
    /// `HTTPS` flag, then `X-Forwarded-Proto`, then `Front-End-Https`.
    pub fn is_secure(&self) -> bool {
        if let Some(Value::String(https)) = self.get_server(Some("HTTPS")) {
            if !https.is_empty() && !https.eq_ignore_ascii_case("off") {
                return true;
            }
        }

        if let Some(proto) = self.header_value("X-Forwarded-Proto") {
            if proto.eq_ignore_ascii_case("https") {
                return true;
            }
        }

        self.header_value("Front-End-Https")
            .map(|v| !v.is_empty() && !v.eq_ignore_ascii_case("off"))
            .unwrap_or(false)
    }

    // --- Loading ---

    /// Loads a bucket at most once, from the construction override or
    /// the derived environment source.
    fn load_global(&self, global: Global) -> &Bucket {
        self.globals.cell(global).get_or_init(|| {
            debug!(bucket = ?global, "loading global bucket");
            self.load_bucket(global)
        })
    }

    fn load_bucket(&self, global: Global) -> Bucket {
        let raw = self.raw_globals.get(&global).cloned();

        match global {
            Global::File => {
                let raw = raw.unwrap_or_else(|| Value::Object(Map::new()));
                Bucket::Files(build_files(&normalize_files(&raw)))
            }
            Global::Json => Bucket::Data(raw.unwrap_or_else(|| decode_json(&self.body))),
            Global::Get => Bucket::Data(
                raw.unwrap_or_else(|| decode_form(self.query_string.as_bytes())),
            ),
            Global::Post => Bucket::Data(raw.unwrap_or_else(|| {
                let is_form = self
                    .header_value("Content-Type")
                    .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
                    .unwrap_or(false);

                if is_form {
                    decode_form(self.body.as_bytes())
                } else {
                    Value::Object(Map::new())
                }
            })),
            Global::Request => Bucket::Data(raw.unwrap_or_else(|| self.merged_request_data())),
            Global::Cookie | Global::Server => {
                Bucket::Data(raw.unwrap_or_else(|| Value::Object(Map::new())))
            }
        }
    }

    /// The combined bucket: query data merged with post data, post
    /// winning per key.
    fn merged_request_data(&self) -> Value {
        let mut merged = Map::new();

        for global in [Global::Get, Global::Post] {
            if let Bucket::Data(Value::Object(data)) = self.load_global(global) {
                for (key, value) in data {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }

        Value::Object(merged)
    }
}

/// Walks one dot-path segment into a map or list. Returns `None` when
/// the segment is absent or the value is not a collection.
fn walk<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Applies a filter element-wise: collections recurse, leaves filter.
fn apply_filter(value: &Value, filter: Filter<'_>) -> Value {
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| apply_filter(item, filter)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), apply_filter(item, filter)))
                .collect(),
        ),
        leaf => filter(leaf),
    }
}

/// Decodes the request body as an order-preserving JSON map; an empty
/// or invalid body yields an empty map, never an error.
fn decode_json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// Decodes form-urlencoded bytes into a string map; later duplicate
/// keys win.
fn decode_form(bytes: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in form_urlencoded::parse(bytes) {
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Value::Object(map)
}

/// Derives request headers from server metadata: `CONTENT_TYPE` becomes
/// `Content-Type`, and every `HTTP_FOO_BAR` key becomes `Foo-Bar`.
fn build_headers(server: &Value) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let Some(data) = server.as_object() else {
        return headers;
    };

    if let Some(content_type) = data.get("CONTENT_TYPE").and_then(Value::as_str) {
        headers.set_value("Content-Type", content_type);
    }

    for (key, value) in data {
        let Some(name) = key.strip_prefix("HTTP_") else {
            continue;
        };
        let Some(value) = value.as_str() else {
            continue;
        };

        let name = name
            .split('_')
            .map(|word| {
                let word = word.to_lowercase();
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => word,
                }
            })
            .collect::<Vec<_>>()
            .join("-");

        headers.set_value(name, value);
    }

    headers
}

fn server_string(server: &Value, key: &str) -> Option<String> {
    server
        .as_object()?
        .get(key)?
        .as_str()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_server(server: Value) -> ServerRequest {
        ServerRequest::new(ServerRequestOptions::default().with_global("server", server))
    }

    #[test]
    fn test_unknown_bucket_option_ignored() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_global("session", json!({ "a": "1" })),
        );

        assert_eq!(request.get_query(Some("a")), None);
    }

    #[test]
    fn test_query_fetch() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_global("get", json!({ "page": "1" })),
        );

        assert_eq!(request.get_query(Some("page")), Some(json!("1")));
        assert_eq!(request.get_query(Some("missing")), None);
        assert_eq!(request.get_query(None), Some(json!({ "page": "1" })));
    }

    #[test]
    fn test_query_derived_from_query_string() {
        let request = with_server(json!({ "QUERY_STRING": "a=1&b=hello%20world" }));

        assert_eq!(request.get_query(Some("a")), Some(json!("1")));
        assert_eq!(request.get_query(Some("b")), Some(json!("hello world")));
    }

    #[test]
    fn test_dot_path_nested_map() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_global("post", json!({ "a": { "b": "v" } })),
        );

        assert_eq!(request.get_post(Some("a.b")), Some(json!("v")));
        assert_eq!(request.get_post(Some("a.c")), None);
    }

    #[test]
    fn test_dot_path_on_scalar_returns_none() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_global("post", json!({ "a": "scalar" })),
        );

        assert_eq!(request.get_post(Some("a.b")), None);
        assert_eq!(request.get_post(Some("a.b.c")), None);
    }

    #[test]
    fn test_dot_path_list_index() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_global("get", json!({ "items": ["x", "y"] })),
        );

        assert_eq!(request.get_query(Some("items.1")), Some(json!("y")));
        assert_eq!(request.get_query(Some("items.2")), None);
    }

    #[test]
    fn test_server_bucket_uses_literal_keys() {
        let request = with_server(json!({ "a.b": "literal" }));

        assert_eq!(request.get_server(Some("a.b")), Some(json!("literal")));
    }

    #[test]
    fn test_default_filter_string_casts_leaves() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_global("get", json!({ "n": 5, "flag": true, "list": [1, 2] })),
        );

        assert_eq!(request.get_query(Some("n")), Some(json!("5")));
        assert_eq!(request.get_query(Some("flag")), Some(json!("1")));
        assert_eq!(request.get_query(Some("list")), Some(json!(["1", "2"])));
    }

    #[test]
    fn test_custom_filter() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_global("get", json!({ "n": "5" })),
        );

        let doubled = request.fetch_global_filtered(Global::Get, Some("n"), &|v| {
            let n: i64 = v.as_str().and_then(|s| s.parse().ok()).unwrap_or(0);
            json!(n * 2)
        });

        assert_eq!(doubled, Some(json!(10)));
    }

    #[test]
    fn test_json_bucket_from_body() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_body(r#"{"user":{"name":"ada"}}"#),
        );

        assert_eq!(request.get_json(Some("user.name")), Some(json!("ada")));
    }

    #[test]
    fn test_invalid_json_body_yields_empty_map() {
        let request =
            ServerRequest::new(ServerRequestOptions::default().with_body("not json"));

        assert_eq!(request.get_json(None), Some(json!({})));
        assert_eq!(request.get_json(Some("a")), None);
    }

    #[test]
    fn test_post_bucket_from_urlencoded_body() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_header("Content-Type", "application/x-www-form-urlencoded")
                .with_body("name=ada&job=engineer"),
        );

        assert_eq!(request.get_post(Some("name")), Some(json!("ada")));
        assert_eq!(request.get_post(Some("job")), Some(json!("engineer")));
    }

    #[test]
    fn test_get_data_switches_on_content_type() {
        let json_request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_header("Content-Type", "application/json")
                .with_body(r#"{"k":"from-json"}"#)
                .with_global("post", json!({ "k": "from-post" })),
        );
        assert_eq!(json_request.get_data(Some("k")), Some(json!("from-json")));

        let form_request = ServerRequest::new(
            ServerRequestOptions::default().with_global("post", json!({ "k": "from-post" })),
        );
        assert_eq!(form_request.get_data(Some("k")), Some(json!("from-post")));
    }

    #[test]
    fn test_request_bucket_merges_get_and_post() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_global("get", json!({ "a": "g", "shared": "g" }))
                .with_global("post", json!({ "b": "p", "shared": "p" })),
        );

        assert_eq!(request.get_request(Some("a")), Some(json!("g")));
        assert_eq!(request.get_request(Some("b")), Some(json!("p")));
        assert_eq!(request.get_request(Some("shared")), Some(json!("p")));
    }

    #[test]
    fn test_file_bucket_dot_path() {
        let request = ServerRequest::new(ServerRequestOptions::default().with_global(
            "file",
            json!({
                "test": {
                    "tmp_name": { "a": "/tmp/tempname" },
                    "name": { "a": "test.txt" },
                    "type": { "a": "text/plain" },
                    "size": { "a": 1 },
                    "error": { "a": 0 },
                },
            }),
        ));

        let file = request.get_file(Some("test.a")).unwrap();
        let file = file.as_file().unwrap();
        assert_eq!(file.client_name(), "test.txt");

        assert!(request.get_file(Some("invalid")).is_none());
    }

    #[test]
    fn test_memoization_survives_set_global_on_clone() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_global("get", json!({ "a": "1" })),
        );

        let first = request.get_query(Some("a"));
        let modified = request.set_global("get", json!({ "a": "2" }));

        assert_eq!(request.get_query(Some("a")), first);
        assert_eq!(modified.get_query(Some("a")), Some(json!("2")));
    }

    #[test]
    fn test_headers_built_from_server_data() {
        let request = with_server(json!({
            "CONTENT_TYPE": "text/plain",
            "HTTP_ACCEPT_LANGUAGE": "en-gb",
            "HTTP_X_REQUESTED_WITH": "XMLHttpRequest",
        }));

        assert_eq!(
            request.header_value("Content-Type").as_deref(),
            Some("text/plain")
        );
        assert_eq!(
            request.header_value("Accept-Language").as_deref(),
            Some("en-gb")
        );
        assert!(request.is_ajax());
    }

    #[test]
    fn test_explicit_headers_override_server_derived() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_global("server", json!({ "HTTP_ACCEPT": "text/html" }))
                .with_header("Accept", "application/json"),
        );

        assert_eq!(
            request.header_value("Accept").as_deref(),
            Some("application/json")
        );
    }

    #[test]
    fn test_method_and_uri_from_server() {
        let request = with_server(json!({
            "REQUEST_METHOD": "post",
            "REQUEST_URI": "/users/42?tab=profile",
            "QUERY_STRING": "tab=profile",
        }));

        assert_eq!(request.method(), "POST");
        assert_eq!(request.path(), "/users/42");
        assert_eq!(request.query_string(), "tab=profile");
    }

    #[test]
    fn test_negotiate_encoding() {
        let request = with_server(json!({ "HTTP_ACCEPT_ENCODING": "gzip,deflate" }));

        let result = request
            .negotiate("encoding", &["deflate".into(), "gzip".into()], false)
            .unwrap();
        assert_eq!(result, "gzip");
    }

    #[test]
    fn test_negotiate_language() {
        let request = with_server(json!({ "HTTP_ACCEPT_LANGUAGE": "en-gb,en;q=0.5" }));

        let result = request
            .negotiate("language", &["en-gb".into()], false)
            .unwrap();
        assert_eq!(result, "en-gb");
    }

    #[test]
    fn test_negotiate_content() {
        let request = with_server(json!({
            "HTTP_ACCEPT": "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        }));

        let result = request
            .negotiate(
                "content",
                &["application/xml".into(), "text/html".into()],
                false,
            )
            .unwrap();
        assert_eq!(result, "text/html");
    }

    #[test]
    fn test_negotiate_invalid_kind() {
        let request = ServerRequest::default();
        let err = request.negotiate("invalid", &[], false).unwrap_err();
        assert!(matches!(err, ServerError::InvalidNegotiationType(_)));
    }

    #[test]
    fn test_locale_defaults() {
        let request = ServerRequest::new(
            ServerRequestOptions::default().with_default_locale("de"),
        );

        assert_eq!(request.locale(), "de");
        assert_eq!(request.default_locale(), "de");
    }

    #[test]
    fn test_locale_negotiated_at_construction() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_global("server", json!({ "HTTP_ACCEPT_LANGUAGE": "en-gb,en;q=0.5" }))
                .with_supported_locales(vec!["en-gb".into(), "de".into()]),
        );

        assert_eq!(request.locale(), "en-gb");
    }

    #[test]
    fn test_locale_not_negotiated_without_header() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_supported_locales(vec!["en-gb".into()])
                .with_default_locale("en"),
        );

        assert_eq!(request.locale(), "en");
    }

    #[test]
    fn test_set_locale() {
        let request = ServerRequest::new(
            ServerRequestOptions::default()
                .with_supported_locales(vec!["en".into(), "fr".into()])
                .with_default_locale("en"),
        );

        let french = request.set_locale("fr").unwrap();
        assert_eq!(french.locale(), "fr");
        assert_eq!(request.locale(), "en");

        let err = request.set_locale("ja").unwrap_err();
        assert!(matches!(err, ServerError::UnsupportedLocale(_)));
    }

    #[test]
    fn test_params_copy_on_write() {
        let request = ServerRequest::default();
        let routed = request.set_param("id", json!(42));

        assert_eq!(routed.get_param("id"), Some(&json!(42)));
        assert_eq!(request.get_param("id"), None);
    }

    #[test]
    fn test_is_secure_signals() {
        assert!(with_server(json!({ "HTTPS": "on" })).is_secure());
        assert!(!with_server(json!({ "HTTPS": "off" })).is_secure());
        assert!(with_server(json!({ "HTTP_X_FORWARDED_PROTO": "https" })).is_secure());
        assert!(!with_server(json!({ "HTTP_X_FORWARDED_PROTO": "http" })).is_secure());
        assert!(with_server(json!({ "HTTP_FRONT_END_HTTPS": "on" })).is_secure());
        assert!(!with_server(json!({ "HTTP_FRONT_END_HTTPS": "off" })).is_secure());
        assert!(!ServerRequest::default().is_secure());
    }

    #[test]
    fn test_is_cli() {
        assert!(ServerRequest::default().is_cli());
        assert!(!with_server(json!({ "REQUEST_METHOD": "GET" })).is_cli());
    }

    #[test]
    fn test_user_agent_captured() {
        let request = with_server(json!({ "HTTP_USER_AGENT": "test-browser/1.0" }));
        assert_eq!(request.user_agent().as_str(), "test-browser/1.0");
    }
}
