//! C-ABI wrapper around `httpreq-core`.
//!
//! # Overview
//! Exposes the request façade through `extern "C"` functions in two styles:
//! hosts that own their networking stack build requests with
//! `httpreq_build_request` and classify what came back with
//! `httpreq_classify_response`; hosts that do not can let the bundled
//! transport run the request and receive the outcome through a callback.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Parameters and headers cross as JSON text, so the C surface stays small
//!   while the core keeps its typed `Parameters`.
//! - A single `FfiOutcome` envelope carries successes and every `ErrorKind`,
//!   already localized and marked for escalation.
//! - The C caller owns all returned pointers and must call the matching
//!   `httpreq_free_*` function to release them. Callbacks own the outcome
//!   they receive.

pub mod types;

use std::collections::BTreeMap;
use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::time::Duration;

use httpreq_core::{
    classify, ClientConfig, HttpMethod, Parameters, RequestExecutor, RequestOptions, ResponseHead,
    UreqTransport,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use types::*;

/// Caller-supplied request arguments, decoded from C.
struct Call {
    url: String,
    options: RequestOptions,
    params: Parameters,
}

/// Decode the shared request arguments.
///
/// `None` when `url` is null or either JSON argument is malformed. A null
/// `params_json` means no parameters; a zero `timeout_ms` keeps the default.
///
/// # Safety
/// String arguments must be null or NUL-terminated.
unsafe fn read_call(
    url: *const c_char,
    encoding: FfiParameterEncoding,
    params_json: *const c_char,
    headers_json: *const c_char,
    timeout_ms: u64,
    show_activity: bool,
) -> Option<Call> {
    let url = unsafe { read_str(url) }?.to_string();
    let params = match read_json(params_json)? {
        Some(value) => Parameters::from_value(value),
        None => Parameters::None,
    };
    let headers = match read_json(headers_json)? {
        Some(value) => serde_json::from_value::<BTreeMap<String, String>>(value).ok()?,
        None => BTreeMap::new(),
    };

    let mut options = RequestOptions::default().with_encoding(encoding.into());
    options.headers = headers;
    options.activity_indicator_visible = show_activity;
    if timeout_ms > 0 {
        options = options.with_timeout(Duration::from_millis(timeout_ms));
    }
    Some(Call {
        url,
        options,
        params,
    })
}

/// `Some(None)` for null, `None` for malformed text.
fn read_json(text: *const c_char) -> Option<Option<serde_json::Value>> {
    if text.is_null() {
        return Some(None);
    }
    let text = unsafe { read_str(text) }?;
    serde_json::from_str(text).ok().map(Some)
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install a `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects debug output for
/// the request façade and warnings only elsewhere. Returns `false` if a
/// subscriber was already installed.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_init_logging(verbose: bool) -> bool {
    catch_unwind(|| {
        let fallback = if verbose { "warn,httpreq_core=debug" } else { "warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Executor lifecycle
// ---------------------------------------------------------------------------

/// Create an executor backed by the bundled blocking transport.
///
/// `config_json` is a JSON object with any of `verbose_logging`, `platform`,
/// `app_version`, `language` and `app_display_name`; null selects defaults.
/// Returns null if the JSON is malformed or an internal panic occurs.
/// The caller must free the returned pointer with `httpreq_executor_free`.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_executor_new(config_json: *const c_char) -> *mut FfiExecutor {
    catch_unwind(|| {
        let config = if config_json.is_null() {
            ClientConfig::default()
        } else {
            let parsed = unsafe { read_str(config_json) }
                .and_then(|text| serde_json::from_str::<ClientConfig>(text).ok());
            match parsed {
                Some(config) => config,
                None => return ptr::null_mut(),
            }
        };
        let inner = RequestExecutor::builder(UreqTransport::new())
            .config(config)
            .build();
        Box::into_raw(Box::new(FfiExecutor { inner }))
    })
    .unwrap_or(ptr::null_mut())
}

/// Free an executor. Requests already dispatched still complete.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_executor_free(executor: *mut FfiExecutor) {
    if !executor.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(executor) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Host-performed requests
// ---------------------------------------------------------------------------

/// Adapt and encode a request for the host to send itself.
///
/// Default headers are merged in and `show_activity` reports what the
/// adapted options ask for. Returns null if `executor` or `url` is null,
/// a JSON argument is malformed, or the parameters cannot be encoded.
/// In the last case, when `error_out` is not null, it receives an
/// `EncodingFailure` outcome naming the cause; otherwise it is set to null.
/// The caller must free the returned pointer with `httpreq_free_request`
/// and any outcome written to `error_out` with `httpreq_free_outcome`.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn httpreq_build_request(
    executor: *const FfiExecutor,
    url: *const c_char,
    method: FfiHttpMethod,
    encoding: FfiParameterEncoding,
    params_json: *const c_char,
    headers_json: *const c_char,
    timeout_ms: u64,
    show_activity: bool,
    error_out: *mut *mut FfiOutcome,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if !error_out.is_null() {
            unsafe { *error_out = ptr::null_mut() };
        }
        if executor.is_null() {
            return ptr::null_mut();
        }
        let executor = unsafe { &*executor };
        let Some(call) = (unsafe {
            read_call(url, encoding, params_json, headers_json, timeout_ms, show_activity)
        }) else {
            return ptr::null_mut();
        };
        let (options, request) =
            executor
                .inner
                .prepare(&call.url, HttpMethod::from(method), call.options, call.params);
        match request {
            Ok(request) => FfiHttpRequest::from_core(request, options.activity_indicator_visible),
            Err(kind) => {
                if !error_out.is_null() {
                    let outcome = FfiOutcome::from_outcome(Err(kind), executor.inner.config());
                    unsafe { *error_out = outcome };
                }
                ptr::null_mut()
            }
        }
    }))
    .unwrap_or(ptr::null_mut())
}

/// Classify what the host's transport produced into an outcome.
///
/// Returns an outcome with `NullArg` if either pointer is null.
/// The caller must free the returned pointer with `httpreq_free_outcome`.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_classify_response(
    executor: *const FfiExecutor,
    response: *const FfiHttpResponse,
) -> *mut FfiOutcome {
    catch_unwind(AssertUnwindSafe(|| {
        if executor.is_null() {
            return FfiOutcome::null_arg("executor");
        }
        if response.is_null() {
            return FfiOutcome::null_arg("response");
        }
        let executor = unsafe { &*executor };
        let outcome = classify(unsafe { (*response).to_core() });
        FfiOutcome::from_outcome(outcome, executor.inner.config())
    }))
    .unwrap_or_else(|_| FfiOutcome::panic("panic in httpreq_classify_response"))
}

// ---------------------------------------------------------------------------
// Executor-performed requests
// ---------------------------------------------------------------------------

/// Send a request and deliver its parsed JSON body to `callback`.
///
/// The callback runs exactly once on a worker thread, unless the request is
/// cancelled first. Returns null, without invoking the callback, if a
/// required argument is null or a JSON argument is malformed.
/// The caller must release the handle with `httpreq_request_wait` or
/// `httpreq_request_free`.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn httpreq_json_request(
    executor: *const FfiExecutor,
    url: *const c_char,
    method: FfiHttpMethod,
    encoding: FfiParameterEncoding,
    params_json: *const c_char,
    headers_json: *const c_char,
    timeout_ms: u64,
    show_activity: bool,
    callback: Option<FfiOutcomeCallback>,
    user_data: *mut c_void,
) -> *mut FfiRequestHandle {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(callback), false) = (callback, executor.is_null()) else {
            return ptr::null_mut();
        };
        let executor = unsafe { &*executor };
        let Some(call) = (unsafe {
            read_call(url, encoding, params_json, headers_json, timeout_ms, show_activity)
        }) else {
            return ptr::null_mut();
        };
        let config = executor.inner.config().clone();
        let user_data = UserData::new(user_data);
        let inner = executor.inner.json_request(
            &call.url,
            method.into(),
            call.options,
            call.params,
            move |outcome| {
                callback(FfiOutcome::from_outcome(outcome, &config), user_data.into_raw());
            },
        );
        Box::into_raw(Box::new(FfiRequestHandle { inner }))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Send a request and deliver the raw body of a 200 response in the
/// outcome's `body`.
///
/// Same argument and ownership rules as `httpreq_json_request`.
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn httpreq_data_request(
    executor: *const FfiExecutor,
    url: *const c_char,
    method: FfiHttpMethod,
    encoding: FfiParameterEncoding,
    params_json: *const c_char,
    headers_json: *const c_char,
    timeout_ms: u64,
    show_activity: bool,
    callback: Option<FfiOutcomeCallback>,
    user_data: *mut c_void,
) -> *mut FfiRequestHandle {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(callback), false) = (callback, executor.is_null()) else {
            return ptr::null_mut();
        };
        let executor = unsafe { &*executor };
        let Some(call) = (unsafe {
            read_call(url, encoding, params_json, headers_json, timeout_ms, show_activity)
        }) else {
            return ptr::null_mut();
        };
        let config = executor.inner.config().clone();
        let user_data = UserData::new(user_data);
        let inner = executor.inner.data_request(
            &call.url,
            method.into(),
            call.options,
            call.params,
            move |outcome| {
                callback(FfiOutcome::from_data(outcome, &config), user_data.into_raw());
            },
        );
        Box::into_raw(Box::new(FfiRequestHandle { inner }))
    }))
    .unwrap_or(ptr::null_mut())
}

/// Download `url` into `destination`, replacing any existing file.
///
/// On success the outcome's `json` is `{"path", "status", "bytes"}`. A
/// non-200 status writes nothing. Same ownership rules as
/// `httpreq_json_request`.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_download(
    executor: *const FfiExecutor,
    url: *const c_char,
    destination: *const c_char,
    headers_json: *const c_char,
    callback: Option<FfiOutcomeCallback>,
    user_data: *mut c_void,
) -> *mut FfiRequestHandle {
    catch_unwind(AssertUnwindSafe(|| {
        let (Some(callback), false) = (callback, executor.is_null()) else {
            return ptr::null_mut();
        };
        let executor = unsafe { &*executor };
        let (Some(url), Some(destination)) =
            (unsafe { read_str(url) }, unsafe { read_str(destination) })
        else {
            return ptr::null_mut();
        };
        let headers = match read_json(headers_json) {
            Some(Some(value)) => match serde_json::from_value::<BTreeMap<String, String>>(value) {
                Ok(headers) => headers,
                Err(_) => return ptr::null_mut(),
            },
            Some(None) => BTreeMap::new(),
            None => return ptr::null_mut(),
        };
        let destination = PathBuf::from(destination);
        let config = executor.inner.config().clone();
        let user_data = UserData::new(user_data);
        let inner = executor.inner.download(
            url,
            headers,
            move |_: &ResponseHead| destination,
            None,
            move |outcome| {
                let outcome = outcome.map(|file| {
                    json!({
                        "path": file.path.to_string_lossy(),
                        "status": file.status,
                        "bytes": file.bytes,
                    })
                });
                callback(FfiOutcome::from_outcome(outcome, &config), user_data.into_raw());
            },
        );
        Box::into_raw(Box::new(FfiRequestHandle { inner }))
    }))
    .unwrap_or(ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Request handles
// ---------------------------------------------------------------------------

/// The request's id as a C string, for correlating log lines.
///
/// Returns null if `handle` is null. Free with `httpreq_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_request_id(handle: *const FfiRequestHandle) -> *mut c_char {
    catch_unwind(AssertUnwindSafe(|| {
        if handle.is_null() {
            return ptr::null_mut();
        }
        c_string(unsafe { &*handle }.inner.id().to_string())
    }))
    .unwrap_or(ptr::null_mut())
}

/// Suppress the callback. Returns `false` if it was already delivered,
/// the request was already cancelled, or `handle` is null.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_request_cancel(handle: *const FfiRequestHandle) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        !handle.is_null() && unsafe { &*handle }.inner.cancel()
    }))
    .unwrap_or(false)
}

/// Block until the request has finished, then free the handle.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_request_wait(handle: *mut FfiRequestHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let handle = unsafe { Box::from_raw(handle) };
            handle.inner.wait();
        }));
    }
}

/// Free a handle without waiting. The request still completes.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_request_free(handle: *mut FfiRequestHandle) {
    if !handle.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(handle) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `httpreq_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        unsafe { req.free_fields() };
    });
}

/// Free an `FfiOutcome`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_free_outcome(outcome: *mut FfiOutcome) {
    if outcome.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let outcome = unsafe { Box::from_raw(outcome) };
        unsafe { outcome.free_fields() };
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn httpreq_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
