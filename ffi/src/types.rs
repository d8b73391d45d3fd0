//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer plus length instead of
//! `Vec<u8>`, and tagged enums with explicit discriminants. Conversions live
//! here so `lib.rs` stays focused on the `extern "C"` surface.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use httpreq_core::locale;
use httpreq_core::{
    ClientConfig, EncodingCause, ErrorKind, HttpMethod, HttpRequest, HttpResponse, NetworkCause,
    NetworkFailureKind, Outcome, ParameterEncoding, RequestExecutor, RequestHandle,
    TransportOutcome,
};
use serde_json::Value;

/// Opaque handle to a `RequestExecutor`.
pub struct FfiExecutor {
    pub(crate) inner: RequestExecutor,
}

/// Receives the outcome of an asynchronous request on a worker thread.
///
/// The callee owns the outcome and frees it with `httpreq_free_outcome`.
pub type FfiOutcomeCallback = extern "C" fn(outcome: *mut FfiOutcome, user_data: *mut c_void);

/// Caller context handed back to the callback untouched.
pub(crate) struct UserData(*mut c_void);

// The host promises `user_data` may be used from the worker thread.
unsafe impl Send for UserData {}

impl UserData {
    pub(crate) fn new(ptr: *mut c_void) -> Self {
        UserData(ptr)
    }

    pub(crate) fn into_raw(self) -> *mut c_void {
        self.0
    }
}

/// Opaque handle to one in-flight request.
pub struct FfiRequestHandle {
    pub(crate) inner: RequestHandle,
}

// ---------------------------------------------------------------------------
// Strings and byte buffers
// ---------------------------------------------------------------------------

/// Heap C string owned by the caller. Interior NULs are dropped.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    let c = CString::new(s).unwrap_or_else(|err| {
        let mut bytes = err.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    c.into_raw()
}

/// Borrow a caller string; `None` when null or not UTF-8.
///
/// # Safety
/// `s` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

/// Hand a byte buffer to C as pointer plus `size_t` length.
pub(crate) fn bytes_into_raw(bytes: Vec<u8>) -> (*mut u8, usize) {
    if bytes.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let len = bytes.len();
    (Box::into_raw(bytes.into_boxed_slice()) as *mut u8, len)
}

/// # Safety
/// `data`/`len` must come from `bytes_into_raw`.
pub(crate) unsafe fn free_bytes(data: *mut u8, len: usize) {
    if !data.is_null() {
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)) });
    }
}

pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Patch = 3,
    Delete = 4,
    Head = 5,
    Options = 6,
}

impl From<FfiHttpMethod> for HttpMethod {
    fn from(m: FfiHttpMethod) -> Self {
        match m {
            FfiHttpMethod::Get => HttpMethod::Get,
            FfiHttpMethod::Post => HttpMethod::Post,
            FfiHttpMethod::Put => HttpMethod::Put,
            FfiHttpMethod::Patch => HttpMethod::Patch,
            FfiHttpMethod::Delete => HttpMethod::Delete,
            FfiHttpMethod::Head => HttpMethod::Head,
            FfiHttpMethod::Options => HttpMethod::Options,
        }
    }
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Patch => FfiHttpMethod::Patch,
            HttpMethod::Delete => FfiHttpMethod::Delete,
            HttpMethod::Head => FfiHttpMethod::Head,
            HttpMethod::Options => FfiHttpMethod::Options,
        }
    }
}

/// Parameter placement as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiParameterEncoding {
    UrlQuery = 0,
    FormBody = 1,
    JsonBody = 2,
}

impl From<FfiParameterEncoding> for ParameterEncoding {
    fn from(e: FfiParameterEncoding) -> Self {
        match e {
            FfiParameterEncoding::UrlQuery => ParameterEncoding::UrlQuery,
            FfiParameterEncoding::FormBody => ParameterEncoding::FormBody,
            FfiParameterEncoding::JsonBody => ParameterEncoding::JsonBody,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A prepared request for hosts that perform the round-trip themselves.
///
/// Built by `httpreq_build_request`; freed with `httpreq_free_request`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: usize,
    /// Null when the request has no body.
    pub body: *mut u8,
    pub body_len: usize,
    pub timeout_ms: u64,
    /// Whether the adapted options ask for the activity indicator.
    pub show_activity: bool,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: HttpRequest, show_activity: bool) -> *mut Self {
        let headers: Box<[FfiHeader]> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: c_string(k),
                value: c_string(v),
            })
            .collect();
        let headers_len = headers.len();
        let headers = if headers.is_empty() {
            ptr::null_mut()
        } else {
            Box::into_raw(headers) as *mut FfiHeader
        };
        let (body, body_len) = bytes_into_raw(req.body.unwrap_or_default());

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: c_string(req.url),
            headers,
            headers_len,
            body,
            body_len,
            timeout_ms: req.timeout.as_millis() as u64,
            show_activity,
        }))
    }

    /// # Safety
    /// `self` must come from `from_core` and not have been freed.
    pub(crate) unsafe fn free_fields(&self) {
        free_c_string(self.url);
        unsafe { free_bytes(self.body, self.body_len) };
        if !self.headers.is_null() {
            let headers = unsafe {
                Box::from_raw(ptr::slice_from_raw_parts_mut(
                    self.headers,
                    self.headers_len,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// What a host's own transport produced.
///
/// `status == 0` means no HTTP response arrived. `error_domain == null`
/// means the transport reported no error. The FFI layer reads but does not
/// free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const u8,
    pub body_len: usize,
    pub error_domain: *const c_char,
    pub error_code: i64,
}

impl FfiHttpResponse {
    /// # Safety
    /// Pointers must be null or valid for their stated lengths.
    pub(crate) unsafe fn to_core(&self) -> TransportOutcome {
        let response = (self.status != 0).then(|| {
            let body = if self.body.is_null() || self.body_len == 0 {
                Vec::new()
            } else {
                unsafe { std::slice::from_raw_parts(self.body, self.body_len) }.to_vec()
            };
            HttpResponse::new(self.status, body)
        });
        let error = unsafe { read_str(self.error_domain) }
            .map(|domain| NetworkCause::new(domain, self.error_code, ""));
        TransportOutcome { response, error }
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Outcome category, one per `ErrorKind` plus FFI-only failures.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    EmptyBody = 1,
    EmptyResponse = 2,
    BodyNotJson = 3,
    HttpStatus = 4,
    NetworkFailure = 5,
    EncodingFailure = 6,
    Destination = 7,
    NullArg = 8,
    Panic = 9,
}

/// Sub-classification of a network failure.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiNetworkKind {
    None = 0,
    TimedOut = 1,
    NotConnected = 2,
    ConnectionLost = 3,
    DnsFailed = 4,
    HostUnreachable = 5,
    CellularDataDisabled = 6,
    Other = 7,
}

impl From<NetworkFailureKind> for FfiNetworkKind {
    fn from(kind: NetworkFailureKind) -> Self {
        match kind {
            NetworkFailureKind::TimedOut => FfiNetworkKind::TimedOut,
            NetworkFailureKind::NotConnected => FfiNetworkKind::NotConnected,
            NetworkFailureKind::ConnectionLost => FfiNetworkKind::ConnectionLost,
            NetworkFailureKind::DnsFailed => FfiNetworkKind::DnsFailed,
            NetworkFailureKind::HostUnreachable => FfiNetworkKind::HostUnreachable,
            NetworkFailureKind::CellularDataDisabled => FfiNetworkKind::CellularDataDisabled,
            NetworkFailureKind::Other => FfiNetworkKind::Other,
        }
    }
}

/// Why a request could not be encoded.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiEncodingCause {
    None = 0,
    UnsupportedParameters = 1,
    Json = 2,
    Multipart = 3,
    InvalidUrl = 4,
}

impl From<&EncodingCause> for FfiEncodingCause {
    fn from(cause: &EncodingCause) -> Self {
        match cause {
            EncodingCause::UnsupportedParameters { .. } => FfiEncodingCause::UnsupportedParameters,
            EncodingCause::Json(_) => FfiEncodingCause::Json,
            EncodingCause::Multipart(_) => FfiEncodingCause::Multipart,
            EncodingCause::InvalidUrl(_) => FfiEncodingCause::InvalidUrl,
        }
    }
}

/// Result envelope for classification and asynchronous requests.
///
/// On success `error_code` is `Ok` and `json` holds the serialized body
/// (or `body` the raw bytes, for data requests).
/// On failure `description` is the localized message, `escalate` tells
/// whether the host should show it as an alert, and `body` carries the raw
/// bytes of a `BodyNotJson` response.
#[repr(C)]
pub struct FfiOutcome {
    pub error_code: FfiErrorCode,
    pub http_status: u16,
    pub network_kind: FfiNetworkKind,
    /// `domain-code` of a network failure, null otherwise.
    pub network_tag: *mut c_char,
    pub encoding_cause: FfiEncodingCause,
    pub escalate: bool,
    pub description: *mut c_char,
    pub json: *mut c_char,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiOutcome {
    fn empty(error_code: FfiErrorCode) -> Self {
        FfiOutcome {
            error_code,
            http_status: 0,
            network_kind: FfiNetworkKind::None,
            network_tag: ptr::null_mut(),
            encoding_cause: FfiEncodingCause::None,
            escalate: false,
            description: ptr::null_mut(),
            json: ptr::null_mut(),
            body: ptr::null_mut(),
            body_len: 0,
        }
    }

    pub(crate) fn from_outcome(outcome: Outcome<Value>, config: &ClientConfig) -> *mut Self {
        let result = match outcome {
            Ok(value) => FfiOutcome {
                json: c_string(value.to_string()),
                ..FfiOutcome::empty(FfiErrorCode::Ok)
            },
            Err(kind) => Self::from_error(kind, config),
        };
        Box::into_raw(Box::new(result))
    }

    /// Raw bytes of a successful data request travel in `body`.
    pub(crate) fn from_data(outcome: Outcome<Vec<u8>>, config: &ClientConfig) -> *mut Self {
        let result = match outcome {
            Ok(bytes) => {
                let (body, body_len) = bytes_into_raw(bytes);
                FfiOutcome {
                    body,
                    body_len,
                    ..FfiOutcome::empty(FfiErrorCode::Ok)
                }
            }
            Err(kind) => Self::from_error(kind, config),
        };
        Box::into_raw(Box::new(result))
    }

    fn from_error(kind: ErrorKind, config: &ClientConfig) -> Self {
        let description = locale::describe(&kind, config.message_language(), &config.app_display_name);
        let mut result = FfiOutcome {
            escalate: kind.should_escalate(),
            description: c_string(description),
            ..FfiOutcome::empty(FfiErrorCode::Ok)
        };
        result.error_code = match kind {
            ErrorKind::EmptyBody => FfiErrorCode::EmptyBody,
            ErrorKind::EmptyResponse => FfiErrorCode::EmptyResponse,
            ErrorKind::BodyNotJson(bytes) => {
                let (body, body_len) = bytes_into_raw(bytes);
                result.body = body;
                result.body_len = body_len;
                FfiErrorCode::BodyNotJson
            }
            ErrorKind::HttpStatus(status) => {
                result.http_status = status;
                FfiErrorCode::HttpStatus
            }
            ErrorKind::NetworkFailure(cause) => {
                result.network_kind = cause.kind().into();
                result.network_tag = c_string(cause.tag());
                FfiErrorCode::NetworkFailure
            }
            ErrorKind::EncodingFailure(cause) => {
                result.encoding_cause = FfiEncodingCause::from(&cause);
                FfiErrorCode::EncodingFailure
            }
            ErrorKind::Destination { .. } => FfiErrorCode::Destination,
        };
        result
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiOutcome {
            description: c_string(format!("null argument: {name}")),
            ..FfiOutcome::empty(FfiErrorCode::NullArg)
        }))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiOutcome {
            description: c_string(msg),
            ..FfiOutcome::empty(FfiErrorCode::Panic)
        }))
    }

    /// # Safety
    /// `self` must come from one of the constructors above.
    pub(crate) unsafe fn free_fields(&self) {
        free_c_string(self.network_tag);
        free_c_string(self.description);
        free_c_string(self.json);
        unsafe { free_bytes(self.body, self.body_len) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_buffers_keep_their_full_length() {
        let bytes: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
        let (data, len) = bytes_into_raw(bytes.clone());
        assert_eq!(len, bytes.len());
        assert_eq!(unsafe { std::slice::from_raw_parts(data, len) }, bytes.as_slice());
        unsafe { free_bytes(data, len) };
    }

    #[test]
    fn empty_byte_buffer_is_null() {
        let (data, len) = bytes_into_raw(Vec::new());
        assert!(data.is_null());
        assert_eq!(len, 0);
        unsafe { free_bytes(data, len) };
    }
}
