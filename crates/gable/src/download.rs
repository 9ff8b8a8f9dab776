// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! File download responses.
//!
//! A [`DownloadResponse`] serves a file from disk as an attachment,
//! streaming the contents at send time rather than buffering them in
//! the response body. [`DownloadResponse::from_binary`] spills
//! in-memory data to a temporary file first, so both paths share the
//! same streaming send.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::response::ClientResponse;

/// Construction options for a [`DownloadResponse`].
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// The filename offered to the client; defaults to the file's own
    /// name on disk.
    pub filename: Option<String>,
    /// Explicit MIME type; defaults to one guessed from the extension.
    pub mime_type: Option<String>,
    /// Delete the source file after a successful send.
    pub delete_after: bool,
}

impl DownloadOptions {
    /// Sets the offered filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Deletes the source file after sending.
    pub fn with_delete_after(mut self, delete_after: bool) -> Self {
        self.delete_after = delete_after;
        self
    }
}

/// A response that serves a file as an attachment.
///
/// The body is the file itself; [`DownloadResponse::set_body`] always
/// fails.
#[derive(Debug, Clone)]
pub struct DownloadResponse {
    inner: ClientResponse,
    path: PathBuf,
    delete_after: bool,
    // Keeps a from_binary spill file alive for the response's lifetime.
    temp: Option<Arc<NamedTempFile>>,
}

impl DownloadResponse {
    /// Builds a download for an existing file.
    ///
    /// Fails with [`ServerError::MissingFile`] when the path does not
    /// exist.
    pub fn new(path: impl Into<PathBuf>, options: DownloadOptions) -> Result<Self> {
        let path = path.into();

        if !path.is_file() {
            return Err(ServerError::MissingFile(path));
        }

        let size = fs::metadata(&path)?.len();

        let filename = options.filename.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        // A derived default gets a charset; an explicit MIME type is
        // used verbatim.
        let mime_type = options
            .mime_type
            .clone()
            .unwrap_or_else(|| format!("{}; charset=UTF-8", mime_from_path(&path)));

        debug!(path = %path.display(), %filename, size, "building download");

        let inner = ClientResponse::new()
            .set_header("Content-Type", mime_type)
            .set_header(
                "Content-Disposition",
                format!("attachment; filename=\"{filename}\""),
            )
            .set_header("Content-Length", size.to_string())
            .set_header("Content-Transfer-Encoding", "binary")
            .set_header("Expires", "0")
            .set_header_values(
                "Cache-Control",
                vec![
                    "private".into(),
                    "no-transform".into(),
                    "no-store".into(),
                    "must-revalidate".into(),
                ],
            );

        Ok(Self {
            inner,
            path,
            delete_after: options.delete_after,
            temp: None,
        })
    }

    /// Builds a download from in-memory data, spilled to a temporary
    /// file that lives as long as the response.
    pub fn from_binary(data: &[u8], options: DownloadOptions) -> Result<Self> {
        let mut temp = NamedTempFile::new()?;
        temp.write_all(data)?;
        temp.flush()?;

        let mut download = Self::new(temp.path().to_path_buf(), options)?;
        download.temp = Some(Arc::new(temp));
        Ok(download)
    }

    /// The file backing this download.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The filename offered to the client.
    pub fn filename(&self) -> Option<String> {
        self.inner
            .header_value("Content-Disposition")
            .and_then(|disposition| {
                let name = disposition.split("filename=\"").nth(1)?;
                Some(name.trim_end_matches('"').to_string())
            })
    }

    /// The underlying response.
    pub fn response(&self) -> &ClientResponse {
        &self.inner
    }

    /// The status code.
    pub fn status_code(&self) -> u16 {
        self.inner.status_code()
    }

    /// Returns a new download with a header set.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            inner: self.inner.set_header(name, value),
            path: self.path.clone(),
            delete_after: self.delete_after,
            temp: self.temp.clone(),
        }
    }

    /// Download bodies come from the backing file; this always fails
    /// with [`ServerError::UnsupportedSetBody`].
    pub fn set_body(&self, _body: &[u8]) -> Result<Self> {
        Err(ServerError::UnsupportedSetBody)
    }

    /// Writes the headers and streams the file to a transport.
    pub fn send(&self, transport: &mut dyn Write) -> io::Result<()> {
        self.inner.send(transport)?;

        let mut file = fs::File::open(&self.path)?;
        io::copy(&mut file, transport)?;

        if self.delete_after && self.temp.is_none() {
            fs::remove_file(&self.path)?;
        }

        Ok(())
    }
}

/// Guesses a MIME type from a file extension. Unknown extensions fall
/// back to `application/octet-stream`.
fn mime_from_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
