//! Localized, user-facing descriptions of `ErrorKind` values.
//!
//! # Design
//! Rendering is a pure function of the error's data plus the display
//! language and the app name; nothing here performs I/O. HTTP status text
//! comes from the canonical reason phrase so `401` reads "Unauthorized" in
//! every language.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{EncodingCause, ErrorKind, NetworkFailureKind};

/// Languages with a message catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh-Hans")]
    SimplifiedChinese,
}

impl Language {
    /// Pick a catalog for a BCP 47 language tag. Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        if primary.eq_ignore_ascii_case("zh") {
            Language::SimplifiedChinese
        } else {
            Language::English
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::SimplifiedChinese => "zh-Hans",
        }
    }
}

/// Title of the blocking alert used for escalated errors.
pub fn alert_title(language: Language) -> &'static str {
    match language {
        Language::English => "Notice",
        Language::SimplifiedChinese => "提示",
    }
}

/// Canonical reason phrase for a status code, `"Unknown"` when there is none.
pub fn status_text(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown")
}

/// Render the localized message for `kind`.
///
/// `app_name` is embedded in the cellular-data message.
pub fn describe(kind: &ErrorKind, language: Language, app_name: &str) -> String {
    match language {
        Language::English => describe_en(kind, app_name),
        Language::SimplifiedChinese => describe_zh(kind, app_name),
    }
}

fn describe_en(kind: &ErrorKind, app_name: &str) -> String {
    match kind {
        ErrorKind::EmptyBody => {
            "Server error: the response contained no data. Please contact support.".to_string()
        }
        ErrorKind::EmptyResponse => {
            "Server error: no response was received. Please contact support.".to_string()
        }
        ErrorKind::BodyNotJson(_) => {
            "Server error: the response data is malformed (NOT JSON). Please contact support."
                .to_string()
        }
        ErrorKind::HttpStatus(code) => {
            format!("Server error: response status code {code}, {}", status_text(*code))
        }
        ErrorKind::NetworkFailure(cause) => match cause.kind() {
            NetworkFailureKind::TimedOut => {
                "The request timed out. Please try again later.".to_string()
            }
            NetworkFailureKind::NotConnected => {
                "Your device is not connected to the internet. Please check your network settings."
                    .to_string()
            }
            NetworkFailureKind::ConnectionLost => {
                "Request failed: the connection was lost. Please try again later.".to_string()
            }
            NetworkFailureKind::DnsFailed => {
                "Request failed: the server name could not be resolved.".to_string()
            }
            NetworkFailureKind::HostUnreachable => {
                "Request failed: could not connect to the server. Please try again later."
                    .to_string()
            }
            NetworkFailureKind::CellularDataDisabled => {
                format!("Request failed: please allow \"{app_name}\" to use cellular data.")
            }
            NetworkFailureKind::Other => {
                format!("Request failed: please check your network.\n{}", cause.tag())
            }
        },
        ErrorKind::EncodingFailure(EncodingCause::Multipart(_)) => {
            "Multipart form data encoding error.".to_string()
        }
        ErrorKind::EncodingFailure(_) => "The request parameters could not be encoded.".to_string(),
        ErrorKind::Destination { .. } => "The downloaded file could not be saved.".to_string(),
    }
}

fn describe_zh(kind: &ErrorKind, app_name: &str) -> String {
    match kind {
        ErrorKind::EmptyBody => "服务器错误，无响应数据，请联系客服".to_string(),
        ErrorKind::EmptyResponse => "服务器错误，无响应，请联系客服".to_string(),
        ErrorKind::BodyNotJson(_) => "服务器错误，响应数据格式错误(NOT JSON)，请联系客服".to_string(),
        ErrorKind::HttpStatus(code) => {
            format!("服务器错误，响应状态码-{code}，{}", status_text(*code))
        }
        ErrorKind::NetworkFailure(cause) => match cause.kind() {
            NetworkFailureKind::TimedOut => "网络请求超时，请稍后重试".to_string(),
            NetworkFailureKind::NotConnected => "您的设备尚未接入互联网，请检查手机网络".to_string(),
            NetworkFailureKind::ConnectionLost => "网络请求失败，连接丢失，请稍后重试".to_string(),
            NetworkFailureKind::DnsFailed => "网络请求失败，域名解析失败".to_string(),
            NetworkFailureKind::HostUnreachable => {
                "网络请求失败，服务器连接失败，请稍后重试".to_string()
            }
            NetworkFailureKind::CellularDataDisabled => {
                format!("网络请求失败，请允许\"{app_name}\"使用无线数据")
            }
            NetworkFailureKind::Other => format!("网络请求失败，请检查手机网络\n{}", cause.tag()),
        },
        ErrorKind::EncodingFailure(EncodingCause::Multipart(_)) => {
            "Multipart Form Data编码错误".to_string()
        }
        ErrorKind::EncodingFailure(_) => "请求参数编码错误".to_string(),
        ErrorKind::Destination { .. } => "下载文件保存失败".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{codes, NetworkCause};

    #[test]
    fn status_401_names_unauthorized() {
        let text = describe(&ErrorKind::HttpStatus(401), Language::English, "Demo");
        assert!(text.contains("401"));
        assert!(text.contains("Unauthorized"));

        let text = describe(&ErrorKind::HttpStatus(401), Language::SimplifiedChinese, "Demo");
        assert!(text.contains("401"));
        assert!(text.contains("Unauthorized"));
    }

    #[test]
    fn unassigned_status_has_fallback_text() {
        assert_eq!(status_text(599), "Unknown");
        assert_eq!(status_text(42), "Unknown");
        assert_eq!(status_text(404), "Not Found");
    }

    #[test]
    fn unknown_network_pair_embeds_domain_and_code() {
        let kind = ErrorKind::NetworkFailure(NetworkCause::new("kCFErrorDomainCFNetwork", 310, "proxy"));
        let text = describe(&kind, Language::English, "Demo");
        assert!(text.ends_with("kCFErrorDomainCFNetwork-310"), "{text}");
    }

    #[test]
    fn cellular_message_names_the_app() {
        let kind = ErrorKind::NetworkFailure(NetworkCause::posix(codes::POSIX_NETWORK_DOWN, ""));
        assert!(describe(&kind, Language::English, "Printer").contains("\"Printer\""));
        assert!(describe(&kind, Language::SimplifiedChinese, "Printer").contains("\"Printer\""));
    }

    #[test]
    fn each_network_kind_has_its_own_template() {
        let codes = [
            codes::TIMED_OUT,
            codes::NOT_CONNECTED_TO_INTERNET,
            codes::NETWORK_CONNECTION_LOST,
            codes::CANNOT_FIND_HOST,
            codes::CANNOT_CONNECT_TO_HOST,
        ];
        let mut seen: Vec<String> = codes
            .iter()
            .map(|code| describe(&ErrorKind::NetworkFailure(NetworkCause::url(*code, "")), Language::English, "x"))
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), codes.len());
    }

    #[test]
    fn language_from_tag() {
        assert_eq!(Language::from_tag("zh-Hans"), Language::SimplifiedChinese);
        assert_eq!(Language::from_tag("zh_CN"), Language::SimplifiedChinese);
        assert_eq!(Language::from_tag("en-GB"), Language::English);
        assert_eq!(Language::from_tag("fr"), Language::English);
        assert_eq!(Language::from_tag(""), Language::English);
    }
}
