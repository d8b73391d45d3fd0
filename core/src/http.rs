//! HTTP transport types shared by the executor, the transports and FFI hosts.
//!
//! # Design
//! These types describe requests and responses as plain data. The executor
//! builds `HttpRequest` values and classifies `TransportOutcome` values; a
//! `Transport` (or a host across FFI) performs the actual I/O in between.
//!
//! All fields use owned types so values can move onto worker threads and
//! across the FFI boundary without lifetime concerns.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NetworkCause;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods whose form parameters travel in the query string.
    pub fn encodes_in_url(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// First header value whose name matches `name` exactly.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Status line and headers of a response, before any body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")?.trim().parse().ok()
    }
}

/// An HTTP response described as plain data.
///
/// `body` is `None` when the response carried no bytes at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpResponse {
    /// Build a response, treating a zero-length body as absent.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status,
            headers: Vec::new(),
            body: (!body.is_empty()).then_some(body),
        }
    }

    pub fn without_body(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }
}

/// What a transport hands back after a round-trip.
///
/// A present `response` always wins over `error` during classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOutcome {
    pub response: Option<HttpResponse>,
    pub error: Option<NetworkCause>,
}

impl TransportOutcome {
    pub fn completed(response: HttpResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(cause: NetworkCause) -> Self {
        Self {
            response: None,
            error: Some(cause),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Transfer progress for uploads and downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: u64,
    /// Total expected bytes, when the size is known up front.
    pub total: Option<u64>,
}

impl Progress {
    /// Completed share in `0.0..=1.0`, if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.completed as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}
