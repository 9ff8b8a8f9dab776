// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for the server request/response layer.
//!
//! This module defines [`ServerError`], the main error enum.
//!
//! # Error Categories
//!
//! - **Negotiation errors**: Unknown negotiation kind requested
//! - **Locale errors**: Locale outside the configured supported set
//! - **Response errors**: Body mutation on a body-less response variant,
//!   or a download built over a missing file
//! - **Upload errors**: Moving an already-moved or invalid upload
//! - **I/O errors**: Filesystem or transport failures surfaced verbatim
//!
//! All variants are contract violations surfaced synchronously at the
//! point of misuse; absent keys and malformed optional data degrade to
//! `None`/empty values instead of erroring.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for server request/response operations.
#[derive(Error, Debug)]
pub enum ServerError {
    /// An unknown negotiation kind was requested.
    #[error("Invalid negotiation type: {0}")]
    InvalidNegotiationType(String),

    /// A download response was constructed over a nonexistent path.
    #[error("Download file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    /// A locale outside the configured supported set was requested.
    #[error("Locale not supported: {0}")]
    UnsupportedLocale(String),

    /// The response variant does not carry an entity body.
    #[error("Response body not supported.")]
    UnsupportedSetBody,

    /// A second move was attempted on the same upload.
    #[error("Upload already moved: {0}")]
    UploadAlreadyMoved(String),

    /// A move was attempted on a file that failed upload validation.
    #[error("Upload is not valid: {0}")]
    UploadInvalid(String),

    /// Filesystem or transport I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results with [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;
