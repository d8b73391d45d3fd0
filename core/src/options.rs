//! Per-call request options, parameters and the executor-wide configuration.
//!
//! # Design
//! `ClientConfig` replaces process-wide globals: it is handed to the executor
//! once and supplies the default header triple plus the logging switch.
//! `RequestOptions` is built per call and consumed by that call only.
//! `Parameters` is a tagged variant so the "mapping vs. arbitrary JSON"
//! question is answered by the type, and mismatches with the chosen encoding
//! become recoverable failures.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::locale::Language;

pub const PLATFORM_HEADER: &str = "Platform";
pub const VERSION_HEADER: &str = "Version";
pub const LANGUAGE_HEADER: &str = "Language";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executor-wide settings, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Emit outgoing requests and completed outcomes as tracing events.
    pub verbose_logging: bool,
    pub platform: String,
    pub app_version: String,
    /// BCP 47 tag sent in the `Language` header; also picks the message catalog.
    pub language: String,
    /// Shown in messages that ask the user to change app permissions.
    pub app_display_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            platform: std::env::consts::OS.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            language: Language::English.tag().to_string(),
            app_display_name: "this app".to_string(),
        }
    }
}

impl ClientConfig {
    /// The platform/version/locale triple every request carries.
    pub fn default_headers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (PLATFORM_HEADER.to_string(), self.platform.clone()),
            (VERSION_HEADER.to_string(), self.app_version.clone()),
            (LANGUAGE_HEADER.to_string(), self.language.clone()),
        ])
    }

    pub fn message_language(&self) -> Language {
        Language::from_tag(&self.language)
    }
}

/// How parameters are placed on the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterEncoding {
    /// Percent-encoded query string appended to the URL.
    #[default]
    UrlQuery,
    /// `application/x-www-form-urlencoded` body; falls back to the query
    /// string for GET, HEAD and DELETE.
    FormBody,
    /// `application/json` body.
    JsonBody,
}

impl ParameterEncoding {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ParameterEncoding::UrlQuery => "a URL query",
            ParameterEncoding::FormBody => "a form body",
            ParameterEncoding::JsonBody => "a JSON body",
        }
    }
}

/// Options for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub activity_indicator_visible: bool,
    pub timeout: Duration,
    pub encoding: ParameterEncoding,
    /// Caller headers, merged over the configured defaults at dispatch.
    pub headers: BTreeMap<String, String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            activity_indicator_visible: true,
            timeout: DEFAULT_TIMEOUT,
            encoding: ParameterEncoding::UrlQuery,
            headers: BTreeMap::new(),
        }
    }
}

impl RequestOptions {
    /// Defaults with the activity indicator hidden.
    pub fn silent() -> Self {
        Self {
            activity_indicator_visible: false,
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Request parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Parameters {
    #[default]
    None,
    /// String-keyed mapping; valid with every encoding.
    Form(Map<String, Value>),
    /// Any other JSON value; only valid with `ParameterEncoding::JsonBody`.
    Json(Value),
}

impl Parameters {
    /// Sort a loose JSON value into the matching variant.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Parameters::None,
            Value::Object(map) => Parameters::Form(map),
            other => Parameters::Json(other),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Parameters::None)
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Parameters::Form(map)
    }
}

/// Overlay caller headers on the defaults. Keys compare case-sensitively.
pub fn merge_headers(
    defaults: &BTreeMap<String, String>,
    caller: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut merged = defaults.clone();
    merged.extend(caller.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn caller_headers_override_defaults() {
        let config = ClientConfig {
            platform: "iOS".to_string(),
            app_version: "2.3.0".to_string(),
            ..ClientConfig::default()
        };
        let caller = BTreeMap::from([
            ("Version".to_string(), "9.9.9".to_string()),
            ("Authorization".to_string(), "Bearer t".to_string()),
        ]);
        let merged = merge_headers(&config.default_headers(), &caller);
        assert_eq!(
            merged,
            vec![
                ("Authorization".to_string(), "Bearer t".to_string()),
                ("Language".to_string(), "en".to_string()),
                ("Platform".to_string(), "iOS".to_string()),
                ("Version".to_string(), "9.9.9".to_string()),
            ]
        );
    }

    #[test]
    fn header_override_is_case_sensitive() {
        let config = ClientConfig::default();
        let caller = BTreeMap::from([("platform".to_string(), "custom".to_string())]);
        let merged = merge_headers(&config.default_headers(), &caller);
        assert!(merged.contains(&("Platform".to_string(), config.platform.clone())));
        assert!(merged.contains(&("platform".to_string(), "custom".to_string())));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"verbose_logging":true,"language":"zh-Hans"}"#).unwrap();
        assert!(config.verbose_logging);
        assert_eq!(config.message_language(), Language::SimplifiedChinese);
        assert_eq!(config.platform, std::env::consts::OS);
    }

    #[test]
    fn silent_options_hide_indicator() {
        let options = RequestOptions::silent();
        assert!(!options.activity_indicator_visible);
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert_eq!(options.encoding, ParameterEncoding::UrlQuery);
    }

    #[test]
    fn parameters_from_value() {
        assert_eq!(Parameters::from_value(Value::Null), Parameters::None);
        assert!(matches!(Parameters::from_value(json!({"a": 1})), Parameters::Form(_)));
        assert!(matches!(Parameters::from_value(json!([1, 2])), Parameters::Json(_)));
    }

    #[test]
    fn encoding_deserializes_snake_case() {
        let encoding: ParameterEncoding = serde_json::from_str(r#""json_body""#).unwrap();
        assert_eq!(encoding, ParameterEncoding::JsonBody);
    }
}
