//! Turns (URL, method, options, parameters) into a dispatchable `HttpRequest`.
//!
//! # Design
//! Request construction is pure: it validates the URL, merges headers, and
//! places parameters according to `ParameterEncoding`. Every misuse is
//! reported as `ErrorKind::EncodingFailure` instead of aborting.
//!
//! Nested form values are flattened the way web backends expect:
//! `tags[]=a&tags[]=b` for arrays, `user[name]=x` for objects, and `1`/`0`
//! for booleans.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use url::{form_urlencoded, Url};

use crate::error::{EncodingCause, ErrorKind, Outcome};
use crate::http::{HttpMethod, HttpRequest};
use crate::multipart::MultipartForm;
use crate::options::{merge_headers, ParameterEncoding, Parameters, RequestOptions};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Flatten one key/value pair into query components, appending to `out`.
pub fn query_components(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (nested_key, nested) in map {
                query_components(&format!("{key}[{nested_key}]"), nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                query_components(&format!("{key}[]"), item, out);
            }
        }
        Value::Bool(flag) => out.push((key.to_string(), if *flag { "1" } else { "0" }.to_string())),
        Value::Null => out.push((key.to_string(), String::new())),
        Value::Number(number) => out.push((key.to_string(), number.to_string())),
        Value::String(text) => out.push((key.to_string(), text.clone())),
    }
}

/// Flatten a whole parameter mapping, keys in sorted order.
pub fn form_components(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();
    let mut out = Vec::new();
    for key in keys {
        query_components(key, &params[key.as_str()], &mut out);
    }
    out
}

/// `application/x-www-form-urlencoded` serialization of `params`.
pub fn encode_form(params: &Map<String, Value>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form_components(params))
        .finish()
}

fn parse_url(url: &str) -> Outcome<Url> {
    Url::parse(url)
        .map_err(|e| ErrorKind::EncodingFailure(EncodingCause::InvalidUrl(format!("{url}: {e}"))))
}

fn append_query(url: &mut Url, params: &Map<String, Value>) {
    let components = form_components(params);
    if components.is_empty() {
        return;
    }
    url.query_pairs_mut().extend_pairs(components);
}

fn json_body(value: &Value) -> Outcome<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ErrorKind::EncodingFailure(EncodingCause::Json(e.to_string())))
}

/// Add `name: value` unless a header with that name (any case) is present.
fn set_if_absent(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if !headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name)) {
        headers.push((name.to_string(), value.to_string()));
    }
}

/// Build the request for a data or JSON call.
///
/// `defaults` is the configured header triple; `options.headers` override it.
pub fn build_request(
    url: &str,
    method: HttpMethod,
    options: &RequestOptions,
    params: &Parameters,
    defaults: &BTreeMap<String, String>,
) -> Outcome<HttpRequest> {
    let mut target = parse_url(url)?;
    let mut headers = merge_headers(defaults, &options.headers);
    let mut body = None;

    match (params, options.encoding) {
        (Parameters::None, _) => {}
        (Parameters::Form(map), ParameterEncoding::UrlQuery) => append_query(&mut target, map),
        (Parameters::Form(map), ParameterEncoding::FormBody) => {
            if method.encodes_in_url() {
                append_query(&mut target, map);
            } else {
                body = Some(encode_form(map).into_bytes());
                set_if_absent(&mut headers, CONTENT_TYPE, FORM_CONTENT_TYPE);
            }
        }
        (Parameters::Form(map), ParameterEncoding::JsonBody) => {
            body = Some(json_body(&Value::Object(map.clone()))?);
            set_if_absent(&mut headers, CONTENT_TYPE, JSON_CONTENT_TYPE);
        }
        (Parameters::Json(value), ParameterEncoding::JsonBody) => {
            body = Some(json_body(value)?);
            set_if_absent(&mut headers, CONTENT_TYPE, JSON_CONTENT_TYPE);
        }
        (Parameters::Json(_), encoding) => {
            return Err(ErrorKind::EncodingFailure(EncodingCause::UnsupportedParameters {
                encoding: encoding.label(),
            }));
        }
    }

    Ok(HttpRequest {
        method,
        url: target.to_string(),
        headers,
        body,
        timeout: options.timeout,
    })
}

/// Build a multipart POST carrying `form` as its body.
pub fn build_multipart_request(
    url: &str,
    options: &RequestOptions,
    form: &MultipartForm,
    defaults: &BTreeMap<String, String>,
) -> Outcome<HttpRequest> {
    let target = parse_url(url)?;
    let mut headers = merge_headers(defaults, &options.headers);
    set_if_absent(&mut headers, CONTENT_TYPE, &form.content_type());
    Ok(HttpRequest {
        method: HttpMethod::Post,
        url: target.to_string(),
        headers,
        body: Some(form.encode()),
        timeout: options.timeout,
    })
}
