//! The transport-dispatch primitive.
//!
//! # Design
//! `Transport` is a blocking round-trip: the executor already runs each
//! request on its own worker thread, so implementations stay synchronous.
//! Connection reuse, TLS and redirects belong to the implementation.
//!
//! Failures are reported as `NetworkCause` values in the URL/POSIX domain
//! table so the classifier treats every transport alike. Any
//! `Fn(&HttpRequest) -> TransportOutcome` is a transport, which keeps test
//! doubles to a single closure.

use std::io;

use crate::error::{codes, NetworkCause};
use crate::http::{HttpRequest, HttpResponse, Progress, ResponseHead, TransportOutcome};

/// Receiver of a streamed download.
pub trait DownloadSink {
    /// Called once with the status line and headers, before any body bytes.
    fn start(&mut self, head: &ResponseHead) -> io::Result<()>;

    /// Called for each body chunk. An error aborts the transfer.
    fn write(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// Executes HTTP requests.
pub trait Transport: Send + Sync {
    /// Send `request` and collect the full response.
    ///
    /// When `progress` is given the request body is streamed and progress is
    /// reported as bytes are written.
    fn execute(
        &self,
        request: &HttpRequest,
        progress: Option<&mut dyn FnMut(Progress)>,
    ) -> TransportOutcome;

    /// Send `request` and stream the response body into `sink`.
    ///
    /// `Err` means the sink aborted the transfer. The returned outcome never
    /// carries a body. Implementations that follow redirects report the final
    /// URL in the head. The default implementation buffers the whole body via
    /// [`Transport::execute`] and, knowing nothing of redirects, reports the
    /// request URL.
    fn download(
        &self,
        request: &HttpRequest,
        sink: &mut dyn DownloadSink,
    ) -> io::Result<TransportOutcome> {
        let outcome = self.execute(request, None);
        let Some(response) = outcome.response else {
            return Ok(outcome);
        };
        sink.start(&ResponseHead {
            url: request.url.clone(),
            status: response.status,
            headers: response.headers.clone(),
        })?;
        if let Some(body) = &response.body {
            sink.write(body)?;
        }
        Ok(TransportOutcome::completed(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: None,
        }))
    }
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> TransportOutcome + Send + Sync,
{
    fn execute(
        &self,
        request: &HttpRequest,
        _progress: Option<&mut dyn FnMut(Progress)>,
    ) -> TransportOutcome {
        self(request)
    }
}

/// Map an I/O error from connecting or sending onto the domain table.
pub fn io_cause(err: &io::Error) -> NetworkCause {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => codes::TIMED_OUT,
        io::ErrorKind::ConnectionRefused => codes::CANNOT_CONNECT_TO_HOST,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => codes::NETWORK_CONNECTION_LOST,
        _ => codes::UNKNOWN,
    };
    NetworkCause::url(code, err.to_string())
}

/// Map an I/O error while receiving a body. Once headers have arrived any
/// failure other than a timeout means the connection dropped.
pub fn body_io_cause(err: &io::Error) -> NetworkCause {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            NetworkCause::url(codes::TIMED_OUT, err.to_string())
        }
        _ => NetworkCause::url(codes::NETWORK_CONNECTION_LOST, err.to_string()),
    }
}

#[cfg(feature = "ureq")]
mod ureq_impl {
    use std::io::{self, Read};
    use std::time::Duration;

    use ureq::http::{request::Builder, Request, Response};
    use ureq::{Agent, Body, ResponseExt, SendBody};

    use super::*;

    const CHUNK_SIZE: usize = 16 * 1024;

    /// Blocking transport backed by `ureq`.
    ///
    /// Each request gets an agent configured with its own timeout. Non-2xx
    /// statuses are returned as data, never as errors.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UreqTransport;

    impl UreqTransport {
        pub fn new() -> Self {
            Self
        }
    }

    /// `whole_call` bounds the entire exchange; otherwise only connecting and
    /// waiting for the response head are bounded, so long downloads survive.
    fn agent(timeout: Duration, whole_call: bool) -> Agent {
        let config = Agent::config_builder().http_status_as_error(false);
        let config = if whole_call {
            config.timeout_global(Some(timeout))
        } else {
            config
                .timeout_connect(Some(timeout))
                .timeout_recv_response(Some(timeout))
        };
        config.build().new_agent()
    }

    fn request_builder(request: &HttpRequest) -> Builder {
        let mut builder = Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn network_cause(err: &ureq::Error) -> NetworkCause {
        match err {
            ureq::Error::Timeout(_) => NetworkCause::url(codes::TIMED_OUT, err.to_string()),
            ureq::Error::HostNotFound => NetworkCause::url(codes::CANNOT_FIND_HOST, err.to_string()),
            ureq::Error::ConnectionFailed => {
                NetworkCause::url(codes::CANNOT_CONNECT_TO_HOST, err.to_string())
            }
            ureq::Error::BadUri(_) => NetworkCause::url(codes::BAD_URL, err.to_string()),
            ureq::Error::Io(io) => io_cause(io),
            _ => NetworkCause::url(codes::UNKNOWN, err.to_string()),
        }
    }

    fn body_cause(err: &ureq::Error) -> NetworkCause {
        match err {
            ureq::Error::Timeout(_) => NetworkCause::url(codes::TIMED_OUT, err.to_string()),
            ureq::Error::Io(io) => body_io_cause(io),
            _ => NetworkCause::url(codes::NETWORK_CONNECTION_LOST, err.to_string()),
        }
    }

    fn bad_request(err: ureq::http::Error) -> NetworkCause {
        NetworkCause::url(codes::BAD_URL, err.to_string())
    }

    /// Request body reader that reports bytes handed to the connection.
    struct ProgressReader<'a, 'r> {
        inner: &'a [u8],
        sent: u64,
        total: u64,
        report: &'r mut dyn FnMut(Progress),
    }

    impl Read for ProgressReader<'_, '_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            if n > 0 {
                self.sent += n as u64;
                (self.report)(Progress {
                    completed: self.sent,
                    total: Some(self.total),
                });
            }
            Ok(n)
        }
    }

    fn send(
        agent: &Agent,
        request: &HttpRequest,
        progress: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<Response<Body>, NetworkCause> {
        let builder = request_builder(request);
        let result = match (&request.body, progress) {
            (None, _) => agent.run(builder.body(()).map_err(bad_request)?),
            (Some(body), None) => agent.run(builder.body(body.as_slice()).map_err(bad_request)?),
            (Some(body), Some(report)) => {
                let mut reader = ProgressReader {
                    inner: body.as_slice(),
                    sent: 0,
                    total: body.len() as u64,
                    report,
                };
                agent.run(
                    builder
                        .body(SendBody::from_reader(&mut reader))
                        .map_err(bad_request)?,
                )
            }
        };
        result.map_err(|e| network_cause(&e))
    }

    fn response_headers(response: &Response<Body>) -> Vec<(String, String)> {
        response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    impl Transport for UreqTransport {
        fn execute(
            &self,
            request: &HttpRequest,
            progress: Option<&mut dyn FnMut(Progress)>,
        ) -> TransportOutcome {
            let agent = agent(request.timeout, true);
            let mut response = match send(&agent, request, progress) {
                Ok(response) => response,
                Err(cause) => return TransportOutcome::failed(cause),
            };
            let status = response.status().as_u16();
            let headers = response_headers(&response);
            // `read_to_vec` alone stops at 10 MiB; size is the server's call.
            match response.body_mut().with_config().limit(u64::MAX).read_to_vec() {
                Ok(body) => TransportOutcome::completed(HttpResponse {
                    status,
                    headers,
                    body: (!body.is_empty()).then_some(body),
                }),
                Err(err) => TransportOutcome::failed(body_cause(&err)),
            }
        }

        fn download(
            &self,
            request: &HttpRequest,
            sink: &mut dyn DownloadSink,
        ) -> io::Result<TransportOutcome> {
            let agent = agent(request.timeout, false);
            let mut response = match send(&agent, request, None) {
                Ok(response) => response,
                Err(cause) => return Ok(TransportOutcome::failed(cause)),
            };
            let status = response.status().as_u16();
            let headers = response_headers(&response);
            sink.start(&ResponseHead {
                url: response.get_uri().to_string(),
                status,
                headers: headers.clone(),
            })?;

            let mut reader = response.body_mut().as_reader();
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => sink.write(&buf[..n])?,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Ok(TransportOutcome::failed(body_io_cause(&e))),
                }
            }
            Ok(TransportOutcome::completed(HttpResponse {
                status,
                headers,
                body: None,
            }))
        }
    }
}

#[cfg(feature = "ureq")]
pub use ureq_impl::UreqTransport;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkFailureKind;
    use crate::http::HttpMethod;
    use std::time::Duration;

    #[derive(Default)]
    struct VecSink {
        head: Option<ResponseHead>,
        bytes: Vec<u8>,
    }

    impl DownloadSink for VecSink {
        fn start(&mut self, head: &ResponseHead) -> io::Result<()> {
            self.head = Some(head.clone());
            Ok(())
        }
        fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
            self.bytes.extend_from_slice(chunk);
            Ok(())
        }
    }

    fn request() -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/file.bin".to_string(),
            headers: Vec::new(),
            body: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn closure_default_download_feeds_sink() {
        let transport = |_: &HttpRequest| TransportOutcome::completed(HttpResponse::new(200, "abc"));
        let mut sink = VecSink::default();
        let outcome = transport.download(&request(), &mut sink).unwrap();
        assert_eq!(sink.bytes, b"abc");
        assert_eq!(sink.head.unwrap().status, 200);
        assert_eq!(outcome.response.unwrap().body, None);
    }

    #[test]
    fn default_download_passes_failures_through() {
        let transport = |_: &HttpRequest| TransportOutcome::failed(NetworkCause::url(codes::TIMED_OUT, ""));
        let mut sink = VecSink::default();
        let outcome = transport.download(&request(), &mut sink).unwrap();
        assert!(sink.head.is_none());
        assert_eq!(outcome.error.unwrap().kind(), NetworkFailureKind::TimedOut);
    }

    #[test]
    fn io_errors_map_onto_the_table() {
        let lost = io_cause(&io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(lost.kind(), NetworkFailureKind::ConnectionLost);
        let refused = io_cause(&io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(refused.kind(), NetworkFailureKind::HostUnreachable);
        let other = io_cause(&io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(other.kind(), NetworkFailureKind::Other);
        let mid_body = body_io_cause(&io::Error::from(io::ErrorKind::Other));
        assert_eq!(mid_body.kind(), NetworkFailureKind::ConnectionLost);
    }
}
