//! HTTP API tests, driven through the router with `oneshot`.

use atprompt::server::{
    AppState, ErrorResponse, FormatPromptResponse, LoadFolderResponse, ServerConfig, build_app,
    create_router,
};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum::routing::get;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn oneshot_post(path: &str, body: serde_json::Value) -> Response {
    let req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request");
    create_router(AppState::default())
        .oneshot(req)
        .await
        .expect("oneshot failed")
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), 16 * 1024 * 1024)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not valid JSON")
}

fn write(base: &Path, relative: &str, content: &str) {
    let path = base.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn folder(temp_dir: &TempDir) -> String {
    temp_dir.path().to_string_lossy().into_owned()
}

/// Serves a single page on an ephemeral port, returns its URL
async fn spawn_page(body: &'static str) -> String {
    let app = axum::Router::new().route("/doc", get(move || async move { body }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/doc")
}

// ---------------------------------------------------------------------------
// /load-folder
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_load_folder_lists_supported_files() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "z.md", "");
    write(temp_dir.path(), "src/app.py", "");
    write(temp_dir.path(), "src/app.rs", "");
    write(temp_dir.path(), "logo.png", "");

    let resp = oneshot_post(
        "/load-folder",
        serde_json::json!({ "path": folder(&temp_dir) }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: LoadFolderResponse = body_json(resp).await;
    assert_eq!(body.files, vec!["src/app.py", "z.md"]);
}

#[tokio::test]
async fn test_load_folder_rejects_file_path() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "a.txt", "x");
    let file_path = temp_dir.path().join("a.txt");

    let resp = oneshot_post(
        "/load-folder",
        serde_json::json!({ "path": file_path.to_string_lossy() }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = body_json(resp).await;
    assert!(body.detail.starts_with("Invalid folder path"), "{}", body.detail);
}

#[tokio::test]
async fn test_load_folder_rejects_missing_path() {
    let resp = oneshot_post(
        "/load-folder",
        serde_json::json!({ "path": "/definitely/not/here" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_load_folder_malformed_body() {
    let resp = oneshot_post("/load-folder", serde_json::json!({ "folder": "x" })).await;
    assert!(resp.status().is_client_error());
}

// ---------------------------------------------------------------------------
// /format-prompt
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_format_prompt_inlines_file() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "a.txt", "hello");

    let resp = oneshot_post(
        "/format-prompt",
        serde_json::json!({ "input_text": "Read   @a.txt\nnow", "folder_path": folder(&temp_dir) }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: FormatPromptResponse = body_json(resp).await;
    assert_eq!(
        body.formatted_text,
        "Read \n<file>#a.txt\nhello\n</file>\n now"
    );
}

#[tokio::test]
async fn test_format_prompt_folder_structure_respects_gitignore() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), ".gitignore", "build/\n");
    write(temp_dir.path(), "build/out.txt", "");
    write(temp_dir.path(), "src/main.py", "");

    let resp = oneshot_post(
        "/format-prompt",
        serde_json::json!({ "input_text": "@folder_structure", "folder_path": folder(&temp_dir) }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: FormatPromptResponse = body_json(resp).await;
    assert_eq!(
        body.formatted_text,
        "\n<folder_structure>\n.gitignore\nsrc/main.py\n</folder_structure>\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_format_prompt_inlines_web_page() {
    let temp_dir = TempDir::new().unwrap();
    let url = spawn_page("remote docs").await;

    let resp = oneshot_post(
        "/format-prompt",
        serde_json::json!({ "input_text": format!("see @{url}"), "folder_path": folder(&temp_dir) }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: FormatPromptResponse = body_json(resp).await;
    assert_eq!(
        body.formatted_text,
        format!("see \n<web_page>#{url}\nremote docs\n</web_page>\n")
    );
}

#[tokio::test]
async fn test_format_prompt_missing_file_names_target() {
    let temp_dir = TempDir::new().unwrap();

    let resp = oneshot_post(
        "/format-prompt",
        serde_json::json!({ "input_text": "@nonexistent.txt", "folder_path": folder(&temp_dir) }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = body_json(resp).await;
    assert!(
        body.detail.starts_with("Error reading file nonexistent.txt"),
        "{}",
        body.detail
    );
}

#[tokio::test]
async fn test_format_prompt_fetch_failure_names_url() {
    let temp_dir = TempDir::new().unwrap();

    let resp = oneshot_post(
        "/format-prompt",
        serde_json::json!({ "input_text": "@http://127.0.0.1:1/x", "folder_path": folder(&temp_dir) }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = body_json(resp).await;
    assert!(
        body.detail.starts_with("Error fetching URL http://127.0.0.1:1/x"),
        "{}",
        body.detail
    );
}

#[tokio::test]
async fn test_format_prompt_invalid_folder() {
    let resp = oneshot_post(
        "/format-prompt",
        serde_json::json!({ "input_text": "no refs", "folder_path": "/definitely/not/here" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Full app
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = create_router(AppState::default()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_static_front_end() {
    let static_dir = TempDir::new().unwrap();
    write(static_dir.path(), "index.html", "<h1>atprompt</h1>");
    write(static_dir.path(), "app.js", "console.log(1)");

    let config = ServerConfig {
        static_dir: Some(static_dir.path().to_path_buf()),
        ..ServerConfig::default()
    };
    let app = build_app(&config).unwrap();

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>atprompt</h1>");

    let req = Request::builder()
        .uri("/static/app.js")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_no_front_end_without_static_dir() {
    let app = build_app(&ServerConfig::default()).unwrap();
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let app = build_app(&ServerConfig::default()).unwrap();
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/format-prompt")
        .header(header::ORIGIN, "http://127.0.0.1:8000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://127.0.0.1:8000")
    );
}

#[tokio::test]
async fn test_body_limit_follows_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = ServerConfig {
        max_body_bytes: 256,
        ..ServerConfig::default()
    };
    let app = build_app(&config).unwrap();

    let body = serde_json::json!({
        "input_text": "x ".repeat(512),
        "folder_path": folder(&temp_dir),
    });
    let req = Request::builder()
        .method("POST")
        .uri("/format-prompt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body = serde_json::json!({ "input_text": "small", "folder_path": folder(&temp_dir) });
    let req = Request::builder()
        .method("POST")
        .uri("/format-prompt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
