// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Integration tests for the request/response lifecycle.
//!
//! These tests drive a full cycle the way a gateway adapter would:
//! build a request from raw server data, inspect it, and produce a
//! response on a byte transport.

use serde_json::json;

use gable::{
    ClientResponse, CookieOptions, DownloadOptions, DownloadResponse, HttpVersion,
    RedirectResponse, ServerError, ServerRequest, ServerRequestOptions,
};

/// Routes `tracing` output through the test harness capture.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn gateway_request() -> ServerRequest {
    init_tracing();
    ServerRequest::new(
        ServerRequestOptions::default()
            .with_global(
                "server",
                json!({
                    "REQUEST_METHOD": "POST",
                    "REQUEST_URI": "/articles?sort=date",
                    "QUERY_STRING": "sort=date",
                    "SERVER_PROTOCOL": "HTTP/1.1",
                    "HTTPS": "on",
                    "HTTP_ACCEPT": "application/json;q=0.9,text/html",
                    "HTTP_ACCEPT_LANGUAGE": "de,en;q=0.7",
                    "HTTP_USER_AGENT": "gateway-test/1.0",
                    "HTTP_X_REQUESTED_WITH": "XMLHttpRequest",
                    "CONTENT_TYPE": "application/x-www-form-urlencoded",
                }),
            )
            .with_supported_locales(vec!["en".into(), "de".into()])
            .with_default_locale("en")
            .with_body("title=First+post&draft=1"),
    )
}

#[test]
fn test_request_built_from_server_data() {
    let request = gateway_request();

    assert_eq!(request.method(), "POST");
    assert_eq!(request.path(), "/articles");
    assert_eq!(request.query_string(), "sort=date");
    assert_eq!(request.protocol_version(), HttpVersion::V1_1);
    assert!(request.is_secure());
    assert!(request.is_ajax());
    assert!(!request.is_cli());
    assert_eq!(request.user_agent().as_str(), "gateway-test/1.0");
    assert_eq!(request.locale(), "de");
}

#[test]
fn test_buckets_loaded_from_derived_sources() {
    let request = gateway_request();

    assert_eq!(request.get_query(Some("sort")), Some(json!("date")));
    assert_eq!(request.get_post(Some("title")), Some(json!("First post")));
    assert_eq!(request.get_request(Some("sort")), Some(json!("date")));
    assert_eq!(request.get_request(Some("title")), Some(json!("First post")));
    assert_eq!(request.get_data(Some("draft")), Some(json!("1")));
}

#[test]
fn test_copy_on_write_request_chain() {
    let base = gateway_request();
    let routed = base
        .set_param("controller", json!("articles"))
        .set_global("get", json!({ "sort": "title" }));

    assert_eq!(routed.get_query(Some("sort")), Some(json!("title")));
    assert_eq!(base.get_query(Some("sort")), Some(json!("date")));
    assert!(base.get_param("controller").is_none());
}

#[test]
fn test_negotiated_json_response_on_transport() {
    let request = gateway_request();

    let content = request
        .negotiate(
            "content",
            &["text/html".into(), "application/json".into()],
            true,
        )
        .unwrap();
    assert_eq!(content, "text/html");

    let response = ClientResponse::new()
        .set_status(201)
        .set_json(&json!({ "created": true }))
        .set_cookie(
            "session",
            "abc123",
            &CookieOptions {
                expires: Some(3600),
                http_only: true,
                ..CookieOptions::default()
            },
        );

    let mut wire = Vec::new();
    response.send(&mut wire).unwrap();
    let text = String::from_utf8(wire).unwrap();

    assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(text.contains("Content-Type: application/json; charset=UTF-8\r\n"));
    assert!(text.contains("Set-Cookie: session=abc123;"));
    assert!(text.contains("HttpOnly"));
    assert!(text.ends_with("\"created\": true\n}"));
}

#[test]
fn test_redirect_upgrades_from_request_context() {
    let request = gateway_request();

    let redirect = RedirectResponse::new(
        "/articles/1",
        None,
        request.method(),
        request.protocol_version(),
    );

    assert_eq!(redirect.status_code(), 303);
    assert_eq!(redirect.location().as_deref(), Some("/articles/1"));
}

#[test]
fn test_download_round_trip() {
    init_tracing();
    let download = DownloadResponse::from_binary(
        b"id,title\n1,First post\n",
        DownloadOptions::default()
            .with_filename("articles.csv")
            .with_mime_type("text/csv"),
    )
    .unwrap();

    let mut wire = Vec::new();
    download.send(&mut wire).unwrap();
    let text = String::from_utf8(wire).unwrap();

    assert!(text.contains("Content-Disposition: attachment; filename=\"articles.csv\"\r\n"));
    assert!(text.contains("Content-Type: text/csv\r\n"));
    assert!(text.ends_with("id,title\n1,First post\n"));
}

#[test]
fn test_uploaded_file_moved_through_request() {
    init_tracing();
    let source = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(source.path(), b"avatar bytes").unwrap();
    let destination = tempfile::tempdir().unwrap();

    let request = ServerRequest::new(ServerRequestOptions::default().with_global(
        "file",
        json!({
            "avatar": {
                "tmp_name": source.path().to_string_lossy(),
                "name": "avatar.png",
                "type": "image/png",
                "size": 12,
                "error": 0,
            },
        }),
    ));

    let files = request.get_file(Some("avatar")).unwrap();
    let file = files.as_file().unwrap().clone();
    assert!(file.is_valid());

    let moved_to = file.move_to(destination.path(), None).unwrap();
    assert!(moved_to.exists());
    assert!(file.has_moved());

    // A second move through any handle fails.
    let again = file.move_to(destination.path(), Some("copy.png"));
    assert!(matches!(again, Err(ServerError::UploadAlreadyMoved(_))));
}

#[test]
fn test_locale_override_survives_only_on_the_clone() {
    let request = gateway_request();
    let english = request.set_locale("en").unwrap();

    assert_eq!(english.locale(), "en");
    assert_eq!(request.locale(), "de");

    let err = request.set_locale("fr").unwrap_err();
    assert!(matches!(err, ServerError::UnsupportedLocale(_)));
}
