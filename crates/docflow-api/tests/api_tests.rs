//! HTTP tests driving the router with `oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use docflow_api::{create_router, ApiConfig, AppState};
use docflow_db::{JobRepository, SqliteJobRepository};
use docflow_models::{JobStatus, NewJob, ProcessingOptions};
use docflow_queue::JobReceiver;
use docflow_storage::FileStorage;
use docflow_tools::testing::{FakeBehavior, RecordingRunner};
use docflow_tools::{ToolAdapter, ToolConfig};
use docflow_worker::{JobExecutor, ProcessingContext, WorkerConfig};

const BOUNDARY: &str = "docflow-test-boundary";

struct TestApp {
    _dir: tempfile::TempDir,
    router: Router,
    repo: Arc<SqliteJobRepository>,
    storage: FileStorage,
    receiver: Option<JobReceiver>,
}

impl TestApp {
    async fn new(config: ApiConfig) -> Self {
        Self::with_tools(config, ToolConfig::default()).await
    }

    async fn with_tools(config: ApiConfig, tools: ToolConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.ensure_layout().await.unwrap();
        let repo = Arc::new(SqliteJobRepository::open_in_memory().unwrap());
        let (queue, receiver) = docflow_queue::channel();

        let state = AppState::new(config, repo.clone(), storage.clone(), queue, tools);
        Self {
            _dir: dir,
            router: create_router(state, None),
            repo,
            storage,
            receiver: Some(receiver),
        }
    }

    /// Run a real executor over the fake tool runner.
    fn start_worker(&mut self, runner: RecordingRunner) {
        let ctx = ProcessingContext::new(
            self.repo.clone(),
            self.storage.clone(),
            ToolAdapter::new(Arc::new(runner), ToolConfig::default()),
        );
        let executor = JobExecutor::new(WorkerConfig::default(), ctx);
        let receiver = self.receiver.take().unwrap();
        tokio::spawn(async move { executor.run(receiver).await });
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn upload(&self, field: &str, filename: &str, bytes: &[u8]) -> (StatusCode, Value) {
        let (status, _, body) = self.send(multipart_request(field, filename, bytes)).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn wait_terminal(&self, id: &str) -> Value {
        for _ in 0..300 {
            let (_, list) = self.get_json("/processed-files").await;
            let entry = list["data"]
                .as_array()
                .unwrap()
                .iter()
                .find(|e| e["id"] == id)
                .cloned()
                .unwrap();
            if entry["status"] != "in-progress" {
                return entry;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", id);
    }
}

fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let body = multipart_body(field, filename, bytes);
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(ApiConfig::default()).await;

    let (status, headers, body) = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers["x-content-type-options"], "nosniff");

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::new(ApiConfig::default()).await;

    let (_, headers, _) = app
        .send(
            Request::builder()
                .uri("/healthz")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(headers["x-request-id"], "abc-123");
}

#[cfg(unix)]
#[tokio::test]
async fn test_ready_when_tools_resolve() {
    let tools = ToolConfig {
        reflow_bin: "sh".to_string(),
        dehyphenate_bin: "sh".to_string(),
        ..Default::default()
    };
    let app = TestApp::with_tools(ApiConfig::default(), tools).await;

    let (status, body) = app.get_json("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["storage"]["status"], "ok");
}

#[tokio::test]
async fn test_ready_degraded_without_tools() {
    let tools = ToolConfig {
        reflow_bin: "docflow-no-such-reflow-tool".to_string(),
        ..Default::default()
    };
    let app = TestApp::with_tools(ApiConfig::default(), tools).await;

    let (status, body) = app.get_json("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["tools"]["status"], "error");
    assert!(body["checks"]["tools"]["error"]
        .as_str()
        .unwrap()
        .contains("docflow-no-such-reflow-tool"));
}

#[tokio::test]
async fn test_upload_stores_file() {
    let app = TestApp::new(ApiConfig::default()).await;

    let (status, body) = app.upload("file", "My Book.pdf", b"%PDF-1.4 test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["filename"], "My Book.pdf");

    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("uploads/temp/"));
    assert!(path.ends_with(".pdf"));
    assert!(tokio_test::assert_ok!(app.storage.exists(path).await));
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let app = TestApp::new(ApiConfig::default()).await;

    let (status, body) = app.upload("document", "book.pdf", b"data").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let config = ApiConfig {
        max_upload_bytes: 16,
        ..Default::default()
    };
    let app = TestApp::new(config).await;

    let (status, body) = app.upload("file", "big.pdf", &[b'x'; 64]).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_upload_over_body_limit_is_json_validation_error() {
    let config = ApiConfig {
        max_upload_bytes: 16,
        max_body_size: 64,
        ..Default::default()
    };
    let app = TestApp::new(config).await;

    let body = multipart_body("file", "big.pdf", &[b'x'; 200]);
    assert!(body.len() > 64);
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap();

    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_process_missing_file_creates_no_job() {
    let app = TestApp::new(ApiConfig::default()).await;

    let (status, body) = app
        .post_json(
            "/process",
            json!({"file_path": "uploads/temp/missing.pdf", "kindle_friendly": true}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "File not found at the specified path");
    assert!(app.repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_rejects_unsafe_paths() {
    let app = TestApp::new(ApiConfig::default()).await;

    for path in ["../etc/passwd", "/etc/passwd", "uploads/../../secret.pdf"] {
        let (status, body) = app.post_json("/process", json!({ "file_path": path })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "path {}", path);
        assert_eq!(body["success"], false);
    }
    assert!(app.repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_rejects_bad_types() {
    let app = TestApp::new(ApiConfig::default()).await;
    let (_, upload) = app.upload("file", "book.pdf", b"data").await;
    let path = upload["path"].as_str().unwrap();

    let bodies = [
        json!({"file_path": path, "kindle_friendly": "maybe"}),
        json!({"file_path": path, "width": "wide"}),
        json!({"file_path": path, "margin": -1}),
        json!({"kindle_friendly": true}),
    ];
    for body in bodies {
        let (status, response) = app.post_json("/process", body.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body {}", body);
        assert_eq!(response["success"], false);
    }
    assert!(app.repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_process_creates_pending_job_and_enqueues_it() {
    let mut app = TestApp::new(ApiConfig::default()).await;
    let (_, upload) = app.upload("file", "book.pdf", b"data").await;
    let path = upload["path"].as_str().unwrap().to_string();

    let (status, body) = app
        .post_json(
            "/process",
            json!({
                "file_path": path,
                "kindle_friendly": "true",
                "width": "1072",
                "height": 1448,
                "margin": 0.2
            }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "File processing started");

    let id: i64 = body["id"].as_str().unwrap().parse().unwrap();
    let queued = app.receiver.as_mut().unwrap().recv().await.unwrap();
    assert_eq!(queued.job_id.as_i64(), id);

    let job = app.repo.get(queued.job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.input_path, path);
    assert!(job.options.kindle_friendly);
    assert!(!job.options.remove_hyphens);
    assert_eq!(job.options.width, Some(1072));
    assert_eq!(job.options.height, Some(1448));
    assert_eq!(job.options.margin, Some(0.2));
}

#[tokio::test]
async fn test_process_marks_job_failed_when_queue_is_gone() {
    let mut app = TestApp::new(ApiConfig::default()).await;
    let (_, upload) = app.upload("file", "book.pdf", b"data").await;
    drop(app.receiver.take());

    let (status, body) = app
        .post_json("/process", json!({"file_path": upload["path"], "remove_hyphens": true}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let jobs = app.repo.list().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert!(jobs[0].error_message.is_some());
}

#[tokio::test]
async fn test_reflow_job_completes_and_downloads() {
    let mut app = TestApp::new(ApiConfig::default()).await;
    app.start_worker(RecordingRunner::new());

    let (_, upload) = app.upload("file", "book.pdf", b"%PDF-1.4").await;
    let (status, body) = app
        .post_json(
            "/process",
            json!({
                "file_path": upload["path"],
                "kindle_friendly": true,
                "width": 1072,
                "margin": 0.2,
                "output_name": "novel"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["id"].as_str().unwrap().to_string();

    let entry = app.wait_terminal(&id).await;
    assert_eq!(entry["status"], "complete");
    assert_eq!(entry["filename"], "novel.pdf");
    assert_eq!(entry["outputname"], "novel");
    assert!(entry.get("errorMessage").is_none());

    let url = entry["downloadUrl"].as_str().unwrap();
    assert_eq!(url, format!("/processed-files/{}/download", id));

    let (status, headers, bytes) = app
        .send(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"novel.pdf\""
    );
    assert_eq!(bytes, b"reflowed");
}

#[tokio::test]
async fn test_failed_tool_is_reported_and_not_downloadable() {
    let mut app = TestApp::new(ApiConfig::default()).await;
    app.start_worker(
        RecordingRunner::new().reflow(FakeBehavior::Fail("bad margin value".to_string())),
    );

    let (_, upload) = app.upload("file", "book.pdf", b"%PDF-1.4").await;
    let (_, body) = app
        .post_json(
            "/process",
            json!({"file_path": upload["path"], "kindle_friendly": true, "margin": 0.2}),
        )
        .await;
    let id = body["id"].as_str().unwrap().to_string();

    let entry = app.wait_terminal(&id).await;
    assert_eq!(entry["status"], "error");
    assert!(entry["errorMessage"]
        .as_str()
        .unwrap()
        .contains("bad margin value"));
    assert!(entry.get("downloadUrl").is_none());

    let (status, _) = app
        .get_json(&format!("/processed-files/{}/download", id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_is_most_recent_first() {
    let app = TestApp::new(ApiConfig::default()).await;

    let first = app
        .repo
        .create(NewJob::new("uploads/temp/a.pdf", ProcessingOptions::default()))
        .await
        .unwrap();
    let second = app
        .repo
        .create(NewJob::new(
            "uploads/temp/b.epub",
            ProcessingOptions {
                remove_hyphens: true,
                output_name: Some("clean.epub".to_string()),
                ..Default::default()
            },
        ))
        .await
        .unwrap();

    let (status, body) = app.get_json("/processed-files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], second.id.to_string());
    assert_eq!(data[1]["id"], first.id.to_string());

    assert_eq!(data[0]["filename"], "b.epub");
    assert_eq!(data[0]["outputname"], "clean.epub");
    assert_eq!(data[0]["status"], "in-progress");
    assert!(data[0].get("downloadUrl").is_none());
    assert_eq!(data[1]["outputname"], "a.pdf");
    assert!(data[1]["dateCreated"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_download_unknown_job() {
    let app = TestApp::new(ApiConfig::default()).await;

    let (status, body) = app.get_json("/processed-files/999/download").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = app.get_json("/processed-files/abc/download").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing_artifact() {
    let app = TestApp::new(ApiConfig::default()).await;

    let job = app
        .repo
        .create(NewJob::new("uploads/temp/a.pdf", ProcessingOptions::default()))
        .await
        .unwrap();
    app.repo
        .complete(job.id, "outputs/1/gone.pdf")
        .await
        .unwrap();

    let (status, _) = app
        .get_json(&format!("/processed-files/{}/download", job.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_write_routes_are_rate_limited() {
    let config = ApiConfig {
        rate_limit_rps: 1,
        ..Default::default()
    };
    let app = TestApp::new(config).await;

    let request = || {
        Request::builder()
            .method("POST")
            .uri("/process")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "192.168.1.100")
            .body(Body::from(json!({"file_path": "uploads/temp/x.pdf"}).to_string()))
            .unwrap()
    };

    let (first, _, _) = app.send(request()).await;
    assert_eq!(first, StatusCode::NOT_FOUND);

    let (second, headers, _) = app.send(request()).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(header::RETRY_AFTER));

    // Reads are not limited
    let (status, _) = app.get_json("/processed-files").await;
    assert_eq!(status, StatusCode::OK);
}
