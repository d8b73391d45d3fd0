//! Placement of streamed downloads on disk.
//!
//! # Design
//! Bytes go to a temporary file created next to the destination, so the final
//! `persist` is a rename on the same filesystem and an existing file is
//! replaced in one step. A failed or cancelled transfer drops the temporary
//! file and leaves the destination untouched.
//!
//! The destination is resolved from the response head only once the status
//! is known to be 200; other statuses write nothing.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::classify::{resolve_status, SUCCESS_STATUS};
use crate::error::{codes, ErrorKind, NetworkCause, Outcome};
use crate::executor::{DestinationResolver, ProgressCallback, RequestState};
use crate::http::{Progress, ResponseHead, TransportOutcome};
use crate::transport::DownloadSink;

/// A download placed at its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Number of body bytes written.
    pub bytes: u64,
}

pub(crate) struct FileSink {
    resolver: Option<DestinationResolver>,
    progress: Option<ProgressCallback>,
    state: RequestState,
    destination: Option<PathBuf>,
    file: Option<NamedTempFile>,
    written: u64,
    total: Option<u64>,
    failure: Option<ErrorKind>,
}

impl FileSink {
    pub(crate) fn new(
        resolver: DestinationResolver,
        progress: Option<ProgressCallback>,
        state: RequestState,
    ) -> Self {
        Self {
            resolver: Some(resolver),
            progress,
            state,
            destination: None,
            file: None,
            written: 0,
            total: None,
            failure: None,
        }
    }

    fn fail(&mut self, path: &Path, err: io::Error) -> io::Error {
        self.failure = Some(ErrorKind::Destination {
            path: path.to_path_buf(),
            message: err.to_string(),
        });
        err
    }

    fn open(&mut self, destination: PathBuf) -> io::Result<()> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if let Err(err) = fs::create_dir_all(&dir) {
            return Err(self.fail(&destination, err));
        }
        match NamedTempFile::new_in(&dir) {
            Ok(file) => {
                self.file = Some(file);
                self.destination = Some(destination);
                Ok(())
            }
            Err(err) => Err(self.fail(&destination, err)),
        }
    }

    /// Resolve the transfer into its final outcome, persisting the file on
    /// success.
    pub(crate) fn finish(self, result: io::Result<TransportOutcome>) -> Outcome<DownloadedFile> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) if self.state.is_cancelled() => {
                return Err(ErrorKind::NetworkFailure(NetworkCause::url(
                    codes::CANCELLED,
                    err.to_string(),
                )));
            }
            Err(err) => {
                return Err(ErrorKind::NetworkFailure(NetworkCause::url(
                    codes::UNKNOWN,
                    err.to_string(),
                )));
            }
        };
        let response = resolve_status(outcome)?;
        let (Some(mut file), Some(destination)) = (self.file, self.destination) else {
            return Err(ErrorKind::EmptyResponse);
        };
        if let Err(err) = file.flush() {
            return Err(ErrorKind::Destination {
                path: destination,
                message: err.to_string(),
            });
        }
        if let Err(err) = file.persist(&destination) {
            return Err(ErrorKind::Destination {
                path: destination,
                message: err.error.to_string(),
            });
        }
        Ok(DownloadedFile {
            path: destination,
            status: response.status,
            headers: response.headers,
            bytes: self.written,
        })
    }
}

impl DownloadSink for FileSink {
    fn start(&mut self, head: &ResponseHead) -> io::Result<()> {
        if head.status != SUCCESS_STATUS {
            return Ok(());
        }
        self.total = head.content_length();
        let Some(resolver) = self.resolver.take() else {
            return Ok(());
        };
        self.open(resolver(head))
    }

    fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.state.is_cancelled() {
            return Err(io::Error::other("download cancelled"));
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        if let Err(err) = file.write_all(chunk) {
            let path = self.destination.clone().unwrap_or_default();
            return Err(self.fail(&path, err));
        }
        self.written += chunk.len() as u64;
        if let Some(report) = self.progress.as_mut() {
            report(Progress {
                completed: self.written,
                total: self.total,
            });
        }
        Ok(())
    }
}
