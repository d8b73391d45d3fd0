use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Redirect},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Marker that precedes every part name in a multipart body.
const PART_NAME_MARKER: &str = "form-data; name=\"";

/// What `/echo` saw of a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// What `/upload` saw of a multipart body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub content_type: String,
    pub bytes: usize,
    pub fields: Vec<String>,
}

pub type Hits = Arc<RwLock<HashMap<String, u64>>>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/json", get(json_payload))
        .route("/text", get(text_payload))
        .route("/empty", get(empty_payload))
        .route("/status/{code}", get(status))
        .route("/echo", any(echo))
        .route("/upload", post(upload))
        .route("/download/{name}", get(download))
        .route("/redirect/{name}", get(redirect))
        .route("/bytes/{count}", get(bytes))
        .route("/slow/{millis}", get(slow))
        .route("/hits/{key}", get(hit))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Body served by `/download/{name}`: the name followed by a byte ramp large
/// enough to arrive in several chunks.
pub fn download_body(name: &str) -> Vec<u8> {
    let mut body = name.as_bytes().to_vec();
    body.extend((0..70_000u32).map(|i| (i % 251) as u8));
    body
}

/// Names of the parts in a multipart body, in order.
pub fn part_names(body: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(body);
    text.split(PART_NAME_MARKER)
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

async fn json_payload() -> Json<Value> {
    Json(json!({"code": 0, "data": {"name": "httpreq", "tags": ["a", "b"]}}))
}

async fn text_payload() -> &'static str {
    "plain text, not json"
}

async fn empty_payload() -> StatusCode {
    StatusCode::OK
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status": code})))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn upload(headers: HeaderMap, body: Bytes) -> Json<UploadReceipt> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(UploadReceipt {
        content_type,
        bytes: body.len(),
        fields: part_names(&body),
    })
}

async fn download(Path(name): Path<String>) -> Result<impl IntoResponse, StatusCode> {
    if name == "missing" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        download_body(&name),
    ))
}

async fn redirect(Path(name): Path<String>) -> Redirect {
    Redirect::to(&format!("/download/{name}"))
}

/// `count` bytes of the download ramp, for bodies of arbitrary size.
async fn bytes(Path(count): Path<usize>) -> impl IntoResponse {
    let body: Vec<u8> = (0..count).map(|i| (i % 251) as u8).collect();
    ([(header::CONTENT_TYPE, "application/octet-stream")], body)
}

async fn slow(Path(millis): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Json(json!({"slept": millis}))
}

async fn hit(State(hits): State<Hits>, Path(key): Path<String>) -> Json<Value> {
    let mut hits = hits.write().await;
    let count = hits.entry(key.clone()).or_insert(0);
    *count += 1;
    Json(json!({"key": key, "count": *count}))
}
