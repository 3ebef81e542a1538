use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use schema_crud::{
    build_openapi, common_routes, object_routes, openapi_routes, tags, ApiGenerator, AppState, FieldConfig,
    FieldType, MemoryObjectStorage, MemoryStore, ModelConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "X-BOUNDARY";

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn upload_request(field: &str, filename: &str, data: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: text/plain\r\n\r\n{data}\r\n--{b}--\r\n",
        b = BOUNDARY,
    );
    Request::builder()
        .method("POST")
        .uri("/objects")
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

fn json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn upload_download_and_url() {
    let app = object_routes(Arc::new(MemoryObjectStorage::new("http://files.local")), 1024 * 1024);

    let (status, body) = call(&app, upload_request("file", "notes.TXT", "hello objects")).await;
    assert_eq!(status, StatusCode::CREATED);
    let uploaded = json(&body);
    let name = uploaded["name"].as_str().unwrap().to_string();
    assert!(name.ends_with(".txt"));
    assert_eq!(uploaded["size"], json!(13));

    let (status, bytes) = call(&app, get(&format!("/objects/{}", name))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"hello objects");

    let (status, body) = call(&app, get(&format!("/objects/{}/url?presigned=false", name))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["url"], json!(format!("http://files.local/{}", name)));

    let (_, body) = call(&app, get(&format!("/objects/{}/url?expiry_secs=60", name))).await;
    assert!(json(&body)["url"].as_str().unwrap().ends_with("expires_in=60"));
}

#[tokio::test]
async fn object_errors_use_the_error_envelope() {
    let app = object_routes(Arc::new(MemoryObjectStorage::new("http://files.local")), 1024 * 1024);

    let (status, body) = call(&app, get("/objects/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"]["code"], json!("not_found"));

    let (status, _) = call(&app, upload_request("attachment", "a.txt", "x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_ready_version() {
    let app = common_routes(AppState {
        store: Arc::new(MemoryStore::new()),
    });
    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), json!({"status": "ok"}));

    let (status, body) = call(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["backend"], json!("memory"));

    let (_, body) = call(&app, get("/version")).await;
    assert_eq!(json(&body)["name"], json!("schema-crud"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let api = ApiGenerator::new(Arc::new(MemoryStore::new())).with_prefix("/api").generate([ModelConfig::new(
        "Order",
    )
    .field(FieldConfig::new("id", FieldType::Int).tag(tags::READ_OUTPUT))
    .field(FieldConfig::new("customer", FieldType::String).tags([tags::CREATE_INPUT, tags::READ_OUTPUT]))]);
    let app = openapi_routes(build_openapi(&api, "orders", "0.1.0"));

    let (status, body) = call(&app, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    let doc = json(&body);
    assert_eq!(doc["info"]["title"], json!("orders"));
    assert!(doc["paths"]["/api/order/{id}"]["get"].is_object());
    assert!(doc["components"]["schemas"]["OrderOut"].is_object());
}
