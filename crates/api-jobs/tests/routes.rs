use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use api_jobs::{AppState, WorkflowStarter};
use murmur_embedder::{Embedder, HashEmbedder};
use murmur_job_interface::{ChunkDraft, JobStatus, Segment};
use murmur_progress::ProgressBus;
use murmur_search::SearchEngine;
use murmur_store::{JobStore, MemoryStore};

const TRANSCRIPT: &str = "Hello world. This is a test.";
const BOUNDARY: &str = "murmur-test-boundary";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    started: Arc<Mutex<Vec<i64>>>,
    _upload_dir: tempfile::TempDir,
    upload_path: std::path::PathBuf,
}

fn test_app() -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let upload_path = upload_dir.path().to_path_buf();
    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(HashEmbedder::new());
    let started: Arc<Mutex<Vec<i64>>> = Arc::default();
    let starter: WorkflowStarter = {
        let started = Arc::clone(&started);
        Arc::new(move |job_id| {
            started.lock().unwrap().push(job_id);
            true
        })
    };

    let state = AppState {
        store: Arc::clone(&store),
        search: SearchEngine::new(Arc::clone(&store), embedder),
        bus: ProgressBus::new(),
        starter,
        upload_dir: upload_path.clone(),
    };

    TestApp {
        router: api_jobs::router(state),
        store,
        started,
        _upload_dir: upload_dir,
        upload_path,
    }
}

fn multipart_body(filename: &str, content: &[u8]) -> Body {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: audio/wav\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn submit_request(user: &str, filename: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("x-user-id", user)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(filename, b"RIFF....WAVEfake-audio"))
        .unwrap()
}

fn get(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn segments() -> Vec<Segment> {
    vec![
        Segment {
            start: 0.0,
            end: 1.0,
            text: "Hello world.".to_string(),
        },
        Segment {
            start: 1.0,
            end: 2.5,
            text: "This is a test.".to_string(),
        },
    ]
}

async fn seed_completed_job(store: &MemoryStore, user: &str, chunk_text: &str) -> i64 {
    let job = store.create_job(user, "seed.wav", "/tmp/seed.wav").await.unwrap();
    let run = job.workflow_run_id;
    store
        .update_status(job.id, JobStatus::Processing, None)
        .await
        .unwrap();
    store
        .save_transcription(job.id, run, chunk_text, &segments(), "en")
        .await
        .unwrap();
    store
        .replace_chunks(
            job.id,
            run,
            &[ChunkDraft {
                chunk_index: 0,
                text: chunk_text.to_string(),
                topic_summary: String::new(),
                keywords: Vec::new(),
                confidence: 0.0,
                start_time: 0.0,
                end_time: 2.5,
                start_char_pos: 0,
                end_char_pos: chunk_text.chars().count(),
            }],
        )
        .await
        .unwrap();
    let mut vectors = BTreeMap::new();
    vectors.insert(0, HashEmbedder::new().embed_one(chunk_text).await.unwrap());
    store
        .patch_chunk_embeddings(job.id, run, &vectors)
        .await
        .unwrap();
    store
        .update_status(job.id, JobStatus::Completed, None)
        .await
        .unwrap();
    job.id
}

#[tokio::test]
async fn submit_creates_a_pending_job_and_starts_the_workflow() {
    let app = test_app();

    let response = app.router.clone().oneshot(submit_request("u1", "talk.wav")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = body_json(response).await;
    let job_id = body["job_id"].as_i64().unwrap();
    assert_eq!(body["status"], "pending");
    assert_eq!(*app.started.lock().unwrap(), vec![job_id]);

    let job = app.store.get_job(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.filename, "talk.wav");
    let on_disk = std::fs::read(&job.file_path).unwrap();
    assert_eq!(on_disk, b"RIFF....WAVEfake-audio");
    assert!(job.file_path.starts_with(app.upload_path.to_str().unwrap()));
}

#[tokio::test]
async fn submit_without_identity_is_unauthorized() {
    let app = test_app();
    let mut request = submit_request("u1", "talk.wav");
    request.headers_mut().remove("x-user-id");

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn submit_without_a_file_field_is_rejected() {
    let app = test_app();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"notes\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header("x-user-id", "u1")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn job_detail_is_owner_only() {
    let app = test_app();
    let job = app.store.create_job("u1", "a.wav", "/tmp/a.wav").await.unwrap();

    let ok = app
        .router
        .clone()
        .oneshot(get(&format!("/jobs/{}", job.id), "u1"))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    assert_eq!(body["id"].as_i64().unwrap(), job.id);
    assert_eq!(body["status"], "pending");

    let forbidden = app
        .router
        .clone()
        .oneshot(get(&format!("/jobs/{}", job.id), "intruder"))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let missing = app.router.oneshot(get("/jobs/999", "u1")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_returns_own_jobs_newest_first() {
    let app = test_app();
    let a = app.store.create_job("u1", "a.wav", "/tmp/a.wav").await.unwrap();
    let b = app.store.create_job("u1", "b.wav", "/tmp/b.wav").await.unwrap();
    app.store.create_job("u2", "c.wav", "/tmp/c.wav").await.unwrap();

    let response = app.router.oneshot(get("/jobs", "u1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![b.id, a.id]);
}

#[tokio::test]
async fn transcript_downloads_txt_and_srt_exactly() {
    let app = test_app();
    let job_id = seed_completed_job(&app.store, "u1", TRANSCRIPT).await;

    let txt = app
        .router
        .clone()
        .oneshot(get(&format!("/jobs/{job_id}/transcript"), "u1"))
        .await
        .unwrap();
    assert_eq!(txt.status(), StatusCode::OK);
    assert_eq!(
        txt.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(body_string(txt).await, TRANSCRIPT);

    let srt = app
        .router
        .clone()
        .oneshot(get(&format!("/jobs/{job_id}/transcript?format=srt"), "u1"))
        .await
        .unwrap();
    assert_eq!(srt.status(), StatusCode::OK);
    assert_eq!(srt.headers()[header::CONTENT_TYPE], "application/x-subrip");
    assert_eq!(
        body_string(srt).await,
        "1\n00:00:00,000 --> 00:00:01,000\nHello world.\n\n\
         2\n00:00:01,000 --> 00:00:02,500\nThis is a test.\n\n"
    );
}

#[tokio::test]
async fn transcript_of_an_unfinished_job_is_not_found() {
    let app = test_app();
    let job = app.store.create_job("u1", "a.wav", "/tmp/a.wav").await.unwrap();

    let response = app
        .router
        .oneshot(get(&format!("/jobs/{}/transcript", job.id), "u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "transcript_not_ready");
}

#[tokio::test]
async fn search_finds_own_chunks_only() {
    let app = test_app();
    seed_completed_job(&app.store, "u1", "photosynthesis in plants").await;
    seed_completed_job(&app.store, "u2", "photosynthesis in plants").await;

    let response = app
        .router
        .clone()
        .oneshot(get("/search?q=plants&limit=5", "u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let hits = body["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["text"], "photosynthesis in plants");

    let empty_query = app.router.oneshot(get("/search?q=%20", "u1")).await.unwrap();
    assert_eq!(empty_query.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_sets_the_durable_flag() {
    let app = test_app();
    let job = app.store.create_job("u1", "a.wav", "/tmp/a.wav").await.unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/jobs/{}/cancel", job.id))
        .header("x-user-id", "u1")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(app.store.is_cancel_requested(job.id).await.unwrap());
}

#[tokio::test]
async fn delete_removes_the_job_and_its_upload() {
    let app = test_app();

    let created = app
        .router
        .clone()
        .oneshot(submit_request("u1", "talk.wav"))
        .await
        .unwrap();
    let job_id = body_json(created).await["job_id"].as_i64().unwrap();
    let file_path = app.store.get_job(job_id).await.unwrap().file_path;
    assert!(std::path::Path::new(&file_path).exists());

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/jobs/{job_id}"))
        .header("x-user-id", "u1")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(!std::path::Path::new(&file_path).exists());
    let gone = app.router.oneshot(get(&format!("/jobs/{job_id}"), "u1")).await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn event_stream_replays_a_terminal_snapshot_and_closes() {
    let app = test_app();
    let job_id = seed_completed_job(&app.store, "u1", TRANSCRIPT).await;

    let response = app
        .router
        .oneshot(get(&format!("/jobs/{job_id}/events"), "u1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let body = body_string(response).await;
    assert!(body.contains("\"type\":\"progress\""));
    assert!(body.contains("\"status\":\"completed\""));
}
