//! `multipart/form-data` body assembly.
//!
//! # Design
//! The whole body is assembled in memory; uploads stream it to the transport
//! from there. Each form gets a random boundary so part contents cannot
//! collide with it in practice.

use std::fs;
use std::io;
use std::path::Path;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::encoding::form_components;

const DEFAULT_MIME: &str = "application/octet-stream";

/// MIME type for a file extension, `application/octet-stream` when unknown.
pub fn mime_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => DEFAULT_MIME,
    }
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Builder for a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("httpreq.boundary.{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append a plain form field.
    pub fn append(&mut self, data: impl Into<Vec<u8>>, name: &str) -> &mut Self {
        self.parts.push(Part {
            name: name.to_string(),
            file_name: None,
            content_type: None,
            data: data.into(),
        });
        self
    }

    /// Append file contents under `name`.
    pub fn append_file(
        &mut self,
        data: impl Into<Vec<u8>>,
        name: &str,
        file_name: &str,
        content_type: &str,
    ) -> &mut Self {
        self.parts.push(Part {
            name: name.to_string(),
            file_name: Some(file_name.to_string()),
            content_type: Some(content_type.to_string()),
            data: data.into(),
        });
        self
    }

    /// Read `path` and append it, deriving file name and MIME type from the path.
    pub fn append_path(&mut self, path: &Path, name: &str) -> io::Result<&mut Self> {
        let data = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mime = path
            .extension()
            .map(|ext| mime_type_for_extension(&ext.to_string_lossy()))
            .unwrap_or(DEFAULT_MIME);
        Ok(self.append_file(data, name, &file_name, mime))
    }

    /// Append each flattened key/value pair of `params` as a text field.
    pub fn append_fields(&mut self, params: &Map<String, Value>) -> &mut Self {
        for (key, value) in form_components(params) {
            self.append(value.into_bytes(), &key);
        }
        self
    }

    /// Serialize all parts with the closing boundary.
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", escape(&part.name));
            if let Some(file_name) = &part.file_name {
                disposition.push_str(&format!("; filename=\"{}\"", escape(file_name)));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        body
    }
}

fn escape(value: &str) -> String {
    value.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}
