//! Adapt/inject hooks and the status surface collaborators.
//!
//! # Design
//! Hooks are plain shared closures bound once per executor. They may run
//! concurrently from several completions, hence `Send + Sync`.
//!
//! `StatusSurface` is the only path from the core to UI: activity indicator,
//! passive error text, and blocking alerts. Every method defaults to a no-op
//! so hosts implement only what they show.

use std::sync::Arc;

use serde_json::Value;

use crate::error::ErrorKind;
use crate::locale::{alert_title, describe};
use crate::options::{ClientConfig, Parameters, RequestOptions};

/// Pre-dispatch transformation of (options, parameters).
pub type RequestAdapter =
    Arc<dyn Fn(RequestOptions, Parameters) -> (RequestOptions, Parameters) + Send + Sync>;

/// Observer of every successfully parsed JSON body.
pub type ResponseInjector = Arc<dyn Fn(&Value) + Send + Sync>;

pub fn identity_adapter() -> RequestAdapter {
    Arc::new(|options, params| (options, params))
}

pub fn noop_injector() -> ResponseInjector {
    Arc::new(|_| {})
}

/// UI collaborator reached by the executor.
pub trait StatusSurface: Send + Sync {
    fn show_activity(&self) {}

    fn dismiss_activity(&self) {}

    /// Passive, non-blocking error text (toast, banner).
    fn show_error(&self, _message: &str) {}

    /// Blocking modal alert.
    fn show_alert(&self, _title: &str, _message: &str) {}
}

/// Surface that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSurface;

impl StatusSurface for SilentSurface {}

/// Route an error to the surface.
///
/// With `escalate_as_alert` set, kinds that qualify for escalation open an
/// alert carrying the `domain-code` tag; everything else shows the localized
/// description as passive error text.
pub fn handle_error(
    surface: &dyn StatusSurface,
    kind: &ErrorKind,
    escalate_as_alert: bool,
    config: &ClientConfig,
) {
    let language = config.message_language();
    if escalate_as_alert && kind.should_escalate() {
        if let ErrorKind::NetworkFailure(cause) = kind {
            surface.show_alert(alert_title(language), &cause.tag());
            return;
        }
    }
    surface.show_error(&describe(kind, language, &config.app_display_name));
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{codes, NetworkCause};
    use std::sync::Mutex;

    /// Surface that records every call, shared by executor tests.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl RecordingSurface {
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl StatusSurface for RecordingSurface {
        fn show_activity(&self) {
            self.calls.lock().unwrap().push("show".to_string());
        }
        fn dismiss_activity(&self) {
            self.calls.lock().unwrap().push("dismiss".to_string());
        }
        fn show_error(&self, message: &str) {
            self.calls.lock().unwrap().push(format!("error:{message}"));
        }
        fn show_alert(&self, title: &str, message: &str) {
            self.calls.lock().unwrap().push(format!("alert:{title}:{message}"));
        }
    }

    #[test]
    fn connection_lost_escalates_to_alert() {
        let surface = RecordingSurface::default();
        let kind = ErrorKind::NetworkFailure(NetworkCause::url(codes::NETWORK_CONNECTION_LOST, ""));
        handle_error(&surface, &kind, true, &ClientConfig::default());
        assert_eq!(surface.calls(), vec!["alert:Notice:NSURLErrorDomain--1005".to_string()]);
    }

    #[test]
    fn without_escalation_everything_is_passive() {
        let surface = RecordingSurface::default();
        let kind = ErrorKind::NetworkFailure(NetworkCause::url(codes::NOT_CONNECTED_TO_INTERNET, ""));
        handle_error(&surface, &kind, false, &ClientConfig::default());
        let calls = surface.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("error:Your device is not connected"));
    }

    #[test]
    fn non_qualifying_kind_stays_passive_when_escalated() {
        let surface = RecordingSurface::default();
        handle_error(&surface, &ErrorKind::HttpStatus(500), true, &ClientConfig::default());
        let calls = surface.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("500"));
        assert!(calls[0].contains("Internal Server Error"));
    }

    #[test]
    fn alert_title_follows_config_language() {
        let surface = RecordingSurface::default();
        let config = ClientConfig {
            language: "zh-Hans".to_string(),
            ..ClientConfig::default()
        };
        let kind = ErrorKind::NetworkFailure(NetworkCause::posix(codes::POSIX_NETWORK_DOWN, ""));
        handle_error(&surface, &kind, true, &config);
        assert_eq!(surface.calls(), vec!["alert:提示:NSPOSIXErrorDomain-50".to_string()]);
    }

    #[test]
    fn identity_adapter_returns_inputs() {
        let adapter = identity_adapter();
        let options = RequestOptions::silent();
        let (out, params) = adapter(options.clone(), Parameters::None);
        assert_eq!(out, options);
        assert!(params.is_none());
    }
}
