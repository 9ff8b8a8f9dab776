// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Uploaded-file handles and upload-array normalization.
//!
//! Upload records arrive as parallel field arrays: one `tmp_name` tree,
//! one `name` tree, and so on, all sharing the same nesting. The
//! normalizer walks the `tmp_name` tree as the template and zips the
//! sibling fields at each leaf into a single record; the builder then
//! turns every record into an [`UploadedFile`], preserving the group
//! structure (lists of files, named sub-groups, arbitrary depth).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, ServerError};

/// Upload completed successfully.
pub const UPLOAD_ERR_OK: u8 = 0;
/// No file was uploaded for the field.
pub const UPLOAD_ERR_NO_FILE: u8 = 4;

/// One segment of a traversal path into a field tree.
enum Segment {
    Key(String),
    Index(usize),
}

/// A node in the uploaded-files bucket: a file, a list of nodes, or a
/// named group of nodes.
#[derive(Debug, Clone)]
pub enum FileValue {
    /// A single uploaded file.
    File(UploadedFile),
    /// An ordered list of nodes (`field[]` style uploads).
    List(Vec<FileValue>),
    /// A named group of nodes.
    Map(BTreeMap<String, FileValue>),
}

impl FileValue {
    /// Returns the uploaded file when this node is a leaf.
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            FileValue::File(file) => Some(file),
            _ => None,
        }
    }

    /// Returns the list elements when this node is a list.
    pub fn as_list(&self) -> Option<&[FileValue]> {
        match self {
            FileValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the group map when this node is a group.
    pub fn as_map(&self) -> Option<&BTreeMap<String, FileValue>> {
        match self {
            FileValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Walks one path segment: a key into a group, or an index into a
    /// list (the segment must parse as a number).
    pub fn get(&self, segment: &str) -> Option<&FileValue> {
        match self {
            FileValue::Map(map) => map.get(segment),
            FileValue::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            FileValue::File(_) => None,
        }
    }
}

/// A validated transient-file handle for one uploaded file.
///
/// The moved flag is shared across clones: bucket accessors hand out
/// clones, and the false→true transition must be observed once per
/// logical upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    tmp_path: PathBuf,
    original_name: String,
    mime_type: Option<String>,
    size: u64,
    error: u8,
    moved: Arc<AtomicBool>,
}

impl UploadedFile {
    /// Creates an uploaded file from one normalized record.
    ///
    /// Missing fields fall back to defaults: empty name, no MIME type,
    /// size 0, error 0.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        Self {
            tmp_path: PathBuf::from(
                record
                    .get("tmp_name")
                    .and_then(Value::as_str)
                    .unwrap_or(""),
            ),
            original_name: record
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            mime_type: record
                .get("type")
                .and_then(Value::as_str)
                .map(|s| s.to_string()),
            size: record.get("size").and_then(Value::as_u64).unwrap_or(0),
            // Codes outside u8 range must not wrap back into OK.
            error: record
                .get("error")
                .and_then(Value::as_u64)
                .map(|code| u8::try_from(code).unwrap_or(u8::MAX))
                .unwrap_or(UPLOAD_ERR_OK),
            moved: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The backing temp path.
    pub fn path(&self) -> &Path {
        &self.tmp_path
    }

    /// The filename declared by the client.
    pub fn client_name(&self) -> &str {
        &self.original_name
    }

    /// The extension of the client filename, without the dot.
    pub fn client_extension(&self) -> &str {
        Path::new(&self.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }

    /// The MIME type declared by the client, if any.
    pub fn client_mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// The declared size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The upload error code (0 = OK).
    pub fn error(&self) -> u8 {
        self.error
    }

    /// Determines whether the upload has been moved.
    pub fn has_moved(&self) -> bool {
        self.moved.load(Ordering::Acquire)
    }

    /// Determines whether the upload is valid: the backing temp path
    /// exists and no upload error was recorded.
    pub fn is_valid(&self) -> bool {
        self.error == UPLOAD_ERR_OK && self.tmp_path.exists()
    }

    /// Moves the upload to `destination`, creating the directory when
    /// absent, and returns the final path.
    ///
    /// Fails with [`ServerError::UploadAlreadyMoved`] on a second call
    /// and [`ServerError::UploadInvalid`] when validation fails; a
    /// failed relocation surfaces the underlying I/O error.
    pub fn move_to(&self, destination: impl AsRef<Path>, name: Option<&str>) -> Result<PathBuf> {
        if self.has_moved() {
            return Err(ServerError::UploadAlreadyMoved(self.original_name.clone()));
        }

        if !self.is_valid() {
            return Err(ServerError::UploadInvalid(self.original_name.clone()));
        }

        let destination = destination.as_ref();
        fs::create_dir_all(destination)?;

        let target = destination.join(name.unwrap_or(&self.original_name));

        // Rename when possible; cross-device moves need copy + remove.
        if fs::rename(&self.tmp_path, &target).is_err() {
            fs::copy(&self.tmp_path, &target)?;
            fs::remove_file(&self.tmp_path)?;
        }

        self.moved.store(true, Ordering::Release);
        debug!(from = %self.tmp_path.display(), to = %target.display(), "upload moved");

        Ok(target)
    }
}

/// Normalizes a raw upload bucket into one record tree per field name.
///
/// Input shape mirrors the environment: each entry carries parallel
/// `tmp_name`/`name`/`type`/`size`/`error` trees. Output shape: a tree
/// whose leaves are flat records with all five fields. Entries without
/// a `tmp_name` field are dropped.
pub fn normalize_files(files: &Value) -> Value {
    let Some(entries) = files.as_object() else {
        return Value::Object(Map::new());
    };

    let mut results = Map::new();

    for (name, fields) in entries {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        let Some(template) = fields.get("tmp_name") else {
            continue;
        };

        let mut path = Vec::new();
        results.insert(name.clone(), zip_fields(template, fields, &mut path));
    }

    Value::Object(results)
}

/// Walks the `tmp_name` template, zipping sibling fields at each leaf.
fn zip_fields(template: &Value, fields: &Map<String, Value>, path: &mut Vec<Segment>) -> Value {
    match template {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    path.push(Segment::Index(index));
                    let zipped = zip_fields(item, fields, path);
                    path.pop();
                    zipped
                })
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    path.push(Segment::Key(key.clone()));
                    let zipped = zip_fields(item, fields, path);
                    path.pop();
                    (key.clone(), zipped)
                })
                .collect(),
        ),
        leaf => {
            let mut record = Map::new();
            record.insert("tmp_name".to_string(), leaf.clone());

            for field in ["name", "type", "size", "error"] {
                if let Some(value) = fields.get(field).and_then(|v| lookup(v, path)) {
                    record.insert(field.to_string(), value.clone());
                }
            }

            Value::Object(record)
        }
    }
}

/// Resolves a sibling field value at the template's current path.
/// Returns None when the sibling does not share the template's shape.
fn lookup<'a>(mut value: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    for segment in path {
        value = match segment {
            Segment::Key(key) => value.as_object()?.get(key)?,
            Segment::Index(index) => value.as_array()?.get(*index)?,
        };
    }

    if value.is_array() || value.is_object() {
        return None;
    }

    Some(value)
}

/// Builds the uploaded-files tree from a normalized record tree.
///
/// A map carrying a `tmp_name` key is a leaf record; everything else
/// recurses, preserving the nested group structure.
pub fn build_files(normalized: &Value) -> FileValue {
    match normalized {
        Value::Object(map) if map.contains_key("tmp_name") => {
            FileValue::File(UploadedFile::from_record(map))
        }
        Value::Object(map) => FileValue::Map(
            map.iter()
                .map(|(key, value)| (key.clone(), build_files(value)))
                .collect(),
        ),
        Value::Array(items) => FileValue::List(items.iter().map(build_files).collect()),
        _ => FileValue::Map(BTreeMap::new()),
    }
}
