//! Resolves raw transport outcomes into `Outcome` values.
//!
//! # Design
//! Classification is a pure, total function over `TransportOutcome`:
//!
//! | response | body | error | result |
//! |---|---|---|---|
//! | status 200 | JSON | - | success |
//! | status 200 | not JSON | - | `BodyNotJson(bytes)` |
//! | status 200 | absent | - | `EmptyBody` |
//! | status != 200 | any | - | `HttpStatus(code)` |
//! | absent | - | present | `NetworkFailure(cause)` |
//! | absent | - | absent | `EmptyResponse` |

use serde_json::Value;

use crate::error::{ErrorKind, Outcome};
use crate::http::{HttpResponse, TransportOutcome};

/// The only status treated as success.
pub const SUCCESS_STATUS: u16 = 200;

/// Accept the response if its status is 200, ignoring the body.
pub fn resolve_status(outcome: TransportOutcome) -> Outcome<HttpResponse> {
    match outcome {
        TransportOutcome {
            response: Some(response),
            ..
        } => {
            if response.status == SUCCESS_STATUS {
                Ok(response)
            } else {
                Err(ErrorKind::HttpStatus(response.status))
            }
        }
        TransportOutcome {
            response: None,
            error: Some(cause),
        } => Err(ErrorKind::NetworkFailure(cause)),
        TransportOutcome {
            response: None,
            error: None,
        } => Err(ErrorKind::EmptyResponse),
    }
}

/// Raw body bytes of a successful response.
pub fn resolve_data(outcome: TransportOutcome) -> Outcome<Vec<u8>> {
    resolve_status(outcome)?.body.ok_or(ErrorKind::EmptyBody)
}

/// Parse body bytes as JSON, keeping the bytes on failure.
pub fn parse_json(bytes: Vec<u8>) -> Outcome<Value> {
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(_) => Err(ErrorKind::BodyNotJson(bytes)),
    }
}

/// Full classification of a JSON endpoint's outcome.
pub fn classify(outcome: TransportOutcome) -> Outcome<Value> {
    resolve_data(outcome).and_then(parse_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{codes, NetworkCause, NetworkFailureKind};
    use serde_json::json;

    #[test]
    fn ok_with_json_body_succeeds() {
        let value = classify(TransportOutcome::completed(HttpResponse::new(200, r#"{"code":0}"#))).unwrap();
        assert_eq!(value, json!({"code": 0}));
    }

    #[test]
    fn ok_with_scalar_json_succeeds() {
        assert_eq!(classify(TransportOutcome::completed(HttpResponse::new(200, "42"))).unwrap(), json!(42));
    }

    #[test]
    fn ok_with_invalid_body_keeps_bytes() {
        let bytes = b"\x00\xffnot json".to_vec();
        let err = classify(TransportOutcome::completed(HttpResponse::new(200, bytes.clone()))).unwrap_err();
        assert_eq!(err, ErrorKind::BodyNotJson(bytes));
    }

    #[test]
    fn ok_without_body_is_empty_body() {
        let err = classify(TransportOutcome::completed(HttpResponse::without_body(200))).unwrap_err();
        assert_eq!(err, ErrorKind::EmptyBody);
    }

    #[test]
    fn other_status_is_preserved_exactly() {
        for status in [100, 201, 204, 301, 304, 400, 401, 404, 418, 500, 503, 599] {
            let outcome = TransportOutcome::completed(HttpResponse::new(status, r#"{"ok":true}"#));
            assert_eq!(classify(outcome).unwrap_err(), ErrorKind::HttpStatus(status));
        }
    }

    #[test]
    fn response_wins_over_error() {
        let outcome = TransportOutcome {
            response: Some(HttpResponse::without_body(401)),
            error: Some(NetworkCause::url(codes::TIMED_OUT, "late")),
        };
        assert_eq!(classify(outcome).unwrap_err(), ErrorKind::HttpStatus(401));
    }

    #[test]
    fn transport_error_is_network_failure() {
        let cause = NetworkCause::url(codes::NETWORK_CONNECTION_LOST, "reset");
        let err = classify(TransportOutcome::failed(cause.clone())).unwrap_err();
        assert_eq!(err.network_kind(), Some(NetworkFailureKind::ConnectionLost));
        assert_eq!(err, ErrorKind::NetworkFailure(cause));
    }

    #[test]
    fn nothing_at_all_is_empty_response() {
        assert_eq!(classify(TransportOutcome::empty()).unwrap_err(), ErrorKind::EmptyResponse);
    }

    #[test]
    fn resolve_data_returns_raw_bytes() {
        let bytes = resolve_data(TransportOutcome::completed(HttpResponse::new(200, "plain text"))).unwrap();
        assert_eq!(bytes, b"plain text");
    }
}
