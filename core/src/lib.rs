//! Client-side HTTP request façade.
//!
//! # Overview
//! Maps per-call options and parameters onto an HTTP transport, runs the
//! configured adapt/inject hooks, and reshapes every response into an
//! `Outcome<T>` whose failure side is the closed, localized `ErrorKind`
//! taxonomy. UI is reached only through the `StatusSurface` trait.
//!
//! # Design
//! - `RequestExecutor` dispatches each request on its own worker thread and
//!   delivers the classified outcome to a callback exactly once.
//! - Request construction (`encoding`) and classification (`classify`) are
//!   pure, so hosts that perform I/O themselves can use them directly.
//! - `Transport` is the only I/O seam. `UreqTransport` is the bundled
//!   implementation; any `Fn(&HttpRequest) -> TransportOutcome` also works.
//! - Types use owned fields so they move freely across threads and FFI.

pub mod classify;
pub mod download;
pub mod encoding;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod http;
pub mod locale;
pub mod multipart;
pub mod options;
pub mod transport;

pub use classify::{classify, resolve_data, resolve_status};
pub use download::DownloadedFile;
pub use encoding::{build_multipart_request, build_request};
pub use error::{EncodingCause, ErrorKind, NetworkCause, NetworkFailureKind, Outcome};
pub use executor::{
    DestinationResolver, ExecutorBuilder, ProgressCallback, RequestExecutor, RequestHandle,
};
pub use hooks::{RequestAdapter, ResponseInjector, SilentSurface, StatusSurface};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Progress, ResponseHead, TransportOutcome};
pub use locale::Language;
pub use multipart::MultipartForm;
pub use options::{ClientConfig, ParameterEncoding, Parameters, RequestOptions};
pub use transport::{DownloadSink, Transport};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
