use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, download_body, Echo, UploadReceipt};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- payload shapes ---

#[tokio::test]
async fn json_endpoint_serves_json() {
    let resp = app().oneshot(get("/json")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let value: Value = body_json(resp).await;
    assert_eq!(value["code"], 0);
    assert_eq!(value["data"]["name"], "httpreq");
}

#[tokio::test]
async fn text_endpoint_is_not_json() {
    let resp = app().oneshot(get("/text")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert!(serde_json::from_slice::<Value>(&bytes).is_err());
}

#[tokio::test]
async fn empty_endpoint_has_no_body() {
    let resp = app().oneshot(get("/empty")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());
}

// --- status ---

#[tokio::test]
async fn status_endpoint_returns_requested_code() {
    for code in [201u16, 401, 404, 500, 503] {
        let resp = app().oneshot(get(&format!("/status/{code}"))).await.unwrap();
        assert_eq!(resp.status().as_u16(), code);
        let value: Value = body_json(resp).await;
        assert_eq!(value["status"], code);
    }
}

#[tokio::test]
async fn status_endpoint_rejects_non_numeric_code() {
    let resp = app().oneshot(get("/status/teapot")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- echo ---

#[tokio::test]
async fn echo_reflects_method_query_headers_and_body() {
    let request = Request::builder()
        .method("PUT")
        .uri("/echo?id=7&tag=a")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("Platform", "iOS")
        .body(r#"{"name":"x"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.query.as_deref(), Some("id=7&tag=a"));
    assert_eq!(echo.headers["platform"], "iOS");
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.body, r#"{"name":"x"}"#);
}

// --- upload ---

#[tokio::test]
async fn upload_lists_part_names() {
    let body = "--XyZ\r\nContent-Disposition: form-data; name=\"album\"\r\n\r\ntrip\r\n\
--XyZ\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\nPNG\r\n\
--XyZ--\r\n";
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=XyZ")
        .body(body.to_string())
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let receipt: UploadReceipt = body_json(resp).await;
    assert_eq!(receipt.content_type, "multipart/form-data; boundary=XyZ");
    assert_eq!(receipt.bytes, body.len());
    assert_eq!(receipt.fields, vec!["album", "photo"]);
}

#[tokio::test]
async fn upload_requires_post() {
    let resp = app().oneshot(get("/upload")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- download ---

#[tokio::test]
async fn download_serves_named_body() {
    let resp = app().oneshot(get("/download/report.bin")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert_eq!(body_bytes(resp).await, download_body("report.bin"));
}

#[tokio::test]
async fn download_of_missing_file_is_404() {
    let resp = app().oneshot(get("/download/missing")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn redirect_points_at_download() {
    let resp = app().oneshot(get("/redirect/report.bin")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[http::header::LOCATION], "/download/report.bin");
}

#[tokio::test]
async fn bytes_serves_requested_length() {
    let resp = app().oneshot(get("/bytes/1000")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_bytes(resp).await;
    assert_eq!(body.len(), 1000);
    assert_eq!(body[252], 1);
}

// --- stateful endpoints ---

#[tokio::test]
async fn hits_count_per_key() {
    use tower::Service;

    let mut app = app().into_service();

    for expected in 1..=3 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get("/hits/login"))
            .await
            .unwrap();
        let value: Value = body_json(resp).await;
        assert_eq!(value["count"], expected);
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/hits/other"))
        .await
        .unwrap();
    let value: Value = body_json(resp).await;
    assert_eq!(value["key"], "other");
    assert_eq!(value["count"], 1);
}

#[tokio::test]
async fn slow_endpoint_eventually_answers() {
    let resp = app().oneshot(get("/slow/10")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let value: Value = body_json(resp).await;
    assert_eq!(value["slept"], 10);
}
