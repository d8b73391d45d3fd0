//! Dispatches requests and delivers classified outcomes.
//!
//! # Design
//! `RequestExecutor` is one configured façade instance: a transport, an
//! adapter/injector pair, a status surface and a `ClientConfig`, all shared
//! immutably behind an `Arc`. Cloning an executor is cheap.
//!
//! Every operation follows the same path:
//! 1. the adapter runs synchronously on the caller's thread;
//! 2. the request is built (encoding failures are kept as an `Outcome`);
//! 3. a named worker thread performs the blocking transport call, classifies
//!    the result and delivers it to the callback exactly once.
//!
//! A `RequestHandle` shares a tri-state flag with its worker. `cancel` and
//! delivery race through `compare_exchange`, so once `cancel` returns `true`
//! the callback is never invoked.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use serde_json::{Map, Value};
use tracing::{debug, debug_span, info, warn};
use uuid::Uuid;

use crate::classify::{classify, resolve_data};
use crate::download::{DownloadedFile, FileSink};
use crate::encoding::{build_multipart_request, build_request};
use crate::error::{codes, EncodingCause, ErrorKind, NetworkCause, Outcome};
use crate::hooks::{
    self, identity_adapter, noop_injector, RequestAdapter, ResponseInjector, SilentSurface,
    StatusSurface,
};
use crate::http::{HttpMethod, HttpRequest, Progress, ResponseHead, TransportOutcome};
use crate::locale;
use crate::multipart::MultipartForm;
use crate::options::{ClientConfig, Parameters, RequestOptions};
use crate::transport::Transport;

/// Receives transfer progress on the worker thread.
pub type ProgressCallback = Box<dyn FnMut(Progress) + Send>;

/// Picks the file path for a download once its response head is known.
pub type DestinationResolver = Box<dyn FnOnce(&ResponseHead) -> PathBuf + Send>;

type Job = Box<dyn FnOnce(Option<io::Error>) + Send>;

const PENDING: u8 = 0;
const DELIVERED: u8 = 1;
const CANCELLED: u8 = 2;

/// Delivery state shared between a handle and its worker.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestState(Arc<AtomicU8>);

impl RequestState {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) == CANCELLED
    }

    pub(crate) fn cancel(&self) -> bool {
        self.0
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn claim_delivery(&self) -> bool {
        self.0
            .compare_exchange(PENDING, DELIVERED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Handle to one in-flight request.
///
/// Dropping the handle detaches the request; it still completes.
#[derive(Debug)]
pub struct RequestHandle {
    id: Uuid,
    state: RequestState,
    worker: Option<JoinHandle<()>>,
}

impl RequestHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Suppress the callback. Returns `false` if the outcome was already
    /// delivered or the request was cancelled before.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Block until the worker has finished, callback included.
    pub fn wait(self) {
        if let Some(worker) = self.worker {
            if worker.join().is_err() {
                warn!(id = %self.id, "request worker panicked");
            }
        }
    }
}

struct Shared {
    transport: Arc<dyn Transport>,
    adapter: RequestAdapter,
    injector: ResponseInjector,
    surface: Arc<dyn StatusSurface>,
    config: ClientConfig,
    default_headers: BTreeMap<String, String>,
}

impl Shared {
    fn log_request(&self, request: &HttpRequest) {
        if !self.config.verbose_logging {
            return;
        }
        let body = match request.body.as_deref() {
            None => String::new(),
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => text.to_string(),
                Err(_) => format!("<{} bytes>", bytes.len()),
            },
        };
        info!(
            method = %request.method,
            url = %request.url,
            headers = ?request.headers,
            body = %body,
            "sending request"
        );
    }

    fn log_outcome<T>(&self, outcome: &Outcome<T>) {
        if !self.config.verbose_logging {
            return;
        }
        match outcome {
            Ok(_) => debug!("request succeeded"),
            Err(err) => debug!(error = %err, "request failed"),
        }
    }

    fn execute(
        &self,
        request: &HttpRequest,
        progress: Option<&mut dyn FnMut(Progress)>,
    ) -> TransportOutcome {
        self.log_request(request);
        self.transport.execute(request, progress)
    }

    /// Classify a JSON response and let the injector observe a success.
    fn json_outcome(&self, outcome: TransportOutcome) -> Outcome<Value> {
        let value = classify(outcome)?;
        (self.injector)(&value);
        Ok(value)
    }
}

/// Builder for [`RequestExecutor`].
pub struct ExecutorBuilder {
    transport: Arc<dyn Transport>,
    adapter: RequestAdapter,
    injector: ResponseInjector,
    surface: Arc<dyn StatusSurface>,
    config: ClientConfig,
}

impl ExecutorBuilder {
    pub fn adapter<F>(mut self, adapter: F) -> Self
    where
        F: Fn(RequestOptions, Parameters) -> (RequestOptions, Parameters) + Send + Sync + 'static,
    {
        self.adapter = Arc::new(adapter);
        self
    }

    pub fn injector<F>(mut self, injector: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.injector = Arc::new(injector);
        self
    }

    pub fn surface(mut self, surface: Arc<dyn StatusSurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> RequestExecutor {
        let default_headers = self.config.default_headers();
        RequestExecutor {
            inner: Arc::new(Shared {
                transport: self.transport,
                adapter: self.adapter,
                injector: self.injector,
                surface: self.surface,
                config: self.config,
                default_headers,
            }),
        }
    }
}

/// Asynchronous request façade.
#[derive(Clone)]
pub struct RequestExecutor {
    inner: Arc<Shared>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Executor with identity hooks, a silent surface and default config.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: impl Transport + 'static) -> ExecutorBuilder {
        ExecutorBuilder {
            transport: Arc::new(transport),
            adapter: identity_adapter(),
            injector: noop_injector(),
            surface: Arc::new(SilentSurface),
            config: ClientConfig::default(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Run the adapter over one request's options and parameters.
    pub fn adapt(&self, options: RequestOptions, params: Parameters) -> (RequestOptions, Parameters) {
        (self.inner.adapter)(options, params)
    }

    /// Adapt and encode a request without dispatching it.
    ///
    /// Returns the adapted options alongside the request so hosts that
    /// perform I/O themselves can honor the activity and timeout settings.
    pub fn prepare(
        &self,
        url: &str,
        method: HttpMethod,
        options: RequestOptions,
        params: Parameters,
    ) -> (RequestOptions, Outcome<HttpRequest>) {
        let (options, params) = self.adapt(options, params);
        let request = build_request(url, method, &options, &params, &self.inner.default_headers);
        (options, request)
    }

    /// Dispatch a request and deliver the raw body of a 200 response.
    pub fn data_request<F>(
        &self,
        url: &str,
        method: HttpMethod,
        options: RequestOptions,
        params: Parameters,
        callback: F,
    ) -> RequestHandle
    where
        F: FnOnce(Outcome<Vec<u8>>) + Send + 'static,
    {
        let (options, request) = self.prepare(url, method, options, params);
        self.dispatch(
            "data",
            options.activity_indicator_visible,
            move |shared, _| resolve_data(shared.execute(&request?, None)),
            callback,
        )
    }

    /// Dispatch a request and deliver the parsed JSON body of a 200 response.
    ///
    /// The injector sees every successfully parsed body before the callback.
    pub fn json_request<F>(
        &self,
        url: &str,
        method: HttpMethod,
        options: RequestOptions,
        params: Parameters,
        callback: F,
    ) -> RequestHandle
    where
        F: FnOnce(Outcome<Value>) + Send + 'static,
    {
        let (options, request) = self.prepare(url, method, options, params);
        self.dispatch(
            "json",
            options.activity_indicator_visible,
            move |shared, _| shared.json_outcome(shared.execute(&request?, None)),
            callback,
        )
    }

    /// POST a `multipart/form-data` body and deliver the JSON response.
    ///
    /// `params` become text fields ahead of the parts added by `build_parts`,
    /// which runs on the caller's thread.
    pub fn upload_multipart<B, F>(
        &self,
        url: &str,
        options: RequestOptions,
        params: Option<Map<String, Value>>,
        build_parts: B,
        progress: Option<ProgressCallback>,
        callback: F,
    ) -> RequestHandle
    where
        B: FnOnce(&mut MultipartForm) -> io::Result<()>,
        F: FnOnce(Outcome<Value>) + Send + 'static,
    {
        let params = params.map(Parameters::Form).unwrap_or_default();
        let (options, params) = self.adapt(options, params);
        let request = multipart_form(&params, build_parts).and_then(|form| {
            build_multipart_request(url, &options, &form, &self.inner.default_headers)
        });
        self.dispatch(
            "upload",
            options.activity_indicator_visible,
            move |shared, state| {
                let request = request?;
                let state = state.clone();
                let mut report = progress.map(|mut report| {
                    move |update: Progress| {
                        if !state.is_cancelled() {
                            report(update);
                        }
                    }
                });
                let reporter = report.as_mut().map(|r| r as &mut dyn FnMut(Progress));
                shared.json_outcome(shared.execute(&request, reporter))
            },
            callback,
        )
    }

    /// GET `url` and stream the body into the file chosen by `resolver`.
    ///
    /// Intermediate directories are created and an existing file is
    /// replaced. A non-200 status writes nothing. The activity indicator stays
    /// hidden unless the adapter turns it on.
    pub fn download<R, F>(
        &self,
        url: &str,
        headers: BTreeMap<String, String>,
        resolver: R,
        progress: Option<ProgressCallback>,
        callback: F,
    ) -> RequestHandle
    where
        R: FnOnce(&ResponseHead) -> PathBuf + Send + 'static,
        F: FnOnce(Outcome<DownloadedFile>) + Send + 'static,
    {
        let options = RequestOptions {
            headers,
            ..RequestOptions::silent()
        };
        let (options, request) = self.prepare(url, HttpMethod::Get, options, Parameters::None);
        self.dispatch(
            "download",
            options.activity_indicator_visible,
            move |shared, state| {
                let request = request?;
                shared.log_request(&request);
                let mut sink = FileSink::new(Box::new(resolver), progress, state.clone());
                let result = shared.transport.download(&request, &mut sink);
                sink.finish(result)
            },
            callback,
        )
    }

    /// Show `kind` on the status surface, as an alert when `escalate_as_alert`
    /// is set and the kind qualifies.
    pub fn handle_error(&self, kind: &ErrorKind, escalate_as_alert: bool) {
        hooks::handle_error(
            self.inner.surface.as_ref(),
            kind,
            escalate_as_alert,
            &self.inner.config,
        );
    }

    /// Localized description of `kind` in the configured language.
    pub fn describe(&self, kind: &ErrorKind) -> String {
        locale::describe(
            kind,
            self.inner.config.message_language(),
            &self.inner.config.app_display_name,
        )
    }

    fn dispatch<T, W, C>(
        &self,
        operation: &'static str,
        show_activity: bool,
        work: W,
        callback: C,
    ) -> RequestHandle
    where
        T: Send + 'static,
        W: FnOnce(&Shared, &RequestState) -> Outcome<T> + Send + 'static,
        C: FnOnce(Outcome<T>) + Send + 'static,
    {
        let id = Uuid::new_v4();
        let state = RequestState::default();
        let span = debug_span!("request", %id, operation);
        if show_activity {
            self.inner.surface.show_activity();
        }

        let shared = Arc::clone(&self.inner);
        let job_state = state.clone();
        let job: Job = Box::new(move |spawn_error: Option<io::Error>| {
            let _entered = span.enter();
            let outcome = match spawn_error {
                None => work(&shared, &job_state),
                Some(err) => Err(ErrorKind::NetworkFailure(spawn_cause(&err))),
            };
            shared.log_outcome(&outcome);
            if show_activity {
                shared.surface.dismiss_activity();
            }
            if job_state.claim_delivery() {
                callback(outcome);
            } else {
                debug!("request cancelled, dropping outcome");
            }
        });

        // The job lives in a slot so it can still run inline if no thread
        // can be spawned.
        let slot = Arc::new(Mutex::new(Some(job)));
        let worker_slot = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name(format!("httpreq-{operation}"))
            .spawn(move || {
                if let Some(job) = take_job(&worker_slot) {
                    job(None);
                }
            });
        let worker = match spawned {
            Ok(worker) => Some(worker),
            Err(err) => {
                warn!(%id, error = %err, "cannot spawn request worker");
                if let Some(job) = take_job(&slot) {
                    job(Some(err));
                }
                None
            }
        };
        RequestHandle { id, state, worker }
    }
}

fn take_job(slot: &Mutex<Option<Job>>) -> Option<Job> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn spawn_cause(err: &io::Error) -> NetworkCause {
    let code = err.raw_os_error().map(i64::from).unwrap_or(codes::UNKNOWN);
    NetworkCause::posix(code, err.to_string())
}

fn multipart_form<B>(params: &Parameters, build_parts: B) -> Outcome<MultipartForm>
where
    B: FnOnce(&mut MultipartForm) -> io::Result<()>,
{
    let mut form = MultipartForm::new();
    match params {
        Parameters::None => {}
        Parameters::Form(map) => {
            form.append_fields(map);
        }
        Parameters::Json(_) => {
            return Err(ErrorKind::EncodingFailure(EncodingCause::UnsupportedParameters {
                encoding: "multipart form fields",
            }));
        }
    }
    build_parts(&mut form)
        .map_err(|e| ErrorKind::EncodingFailure(EncodingCause::Multipart(e.to_string())))?;
    Ok(form)
}
