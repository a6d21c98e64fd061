//! Shared test scaffolding: an in-process stub of the composer service.
//!
//! The stub serves the four composer endpoints on an ephemeral port and
//! exposes call counters so tests can assert exactly which requests the
//! client issued.  Status responses are scripted per test.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::broadcast;

use cadenza_client::api::UploadFile;
use cadenza_client::events::SessionEvent;
use cadenza_core::status::JobStatus;

/// One scripted reply for `GET /status/{job_id}`.
pub enum StatusReply {
    Ok {
        status: &'static str,
        message: &'static str,
    },
    Error(u16),
}

/// Handle to the stub composer service.
#[derive(Clone)]
pub struct StubService {
    /// Times `POST /upload-and-train` was hit.
    pub upload_calls: Arc<AtomicUsize>,
    /// Multipart parts named `files` in the most recent upload.
    pub uploaded_parts: Arc<AtomicUsize>,
    /// Times `GET /status/{job_id}` was hit.
    pub status_calls: Arc<AtomicUsize>,
    /// Times `POST /stop/{job_id}` was hit.
    pub stop_calls: Arc<AtomicUsize>,
    /// Times `GET /generate/{job_id}` was hit.
    pub generate_calls: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<StatusReply>>>,
    artifact: Arc<Vec<u8>>,
}

impl StubService {
    fn new(script: Vec<StatusReply>, artifact: Vec<u8>) -> Self {
        Self {
            upload_calls: Arc::new(AtomicUsize::new(0)),
            uploaded_parts: Arc::new(AtomicUsize::new(0)),
            status_calls: Arc::new(AtomicUsize::new(0)),
            stop_calls: Arc::new(AtomicUsize::new(0)),
            generate_calls: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(script.into())),
            artifact: Arc::new(artifact),
        }
    }
}

/// Start the stub on an ephemeral port.  Returns the handle and base URL.
pub async fn spawn_stub(script: Vec<StatusReply>, artifact: Vec<u8>) -> (StubService, String) {
    let stub = StubService::new(script, artifact);

    let app = Router::new()
        .route("/upload-and-train", post(upload))
        .route("/status/{job_id}", get(status))
        .route("/stop/{job_id}", post(stop))
        .route("/generate/{job_id}", get(generate))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    (stub, format!("http://{addr}"))
}

async fn upload(State(stub): State<StubService>, mut multipart: Multipart) -> Json<serde_json::Value> {
    stub.upload_calls.fetch_add(1, Ordering::SeqCst);

    let mut parts = 0;
    while let Some(field) = multipart.next_field().await.expect("well-formed multipart") {
        if field.name() == Some("files") {
            parts += 1;
        }
        let _ = field.bytes().await.expect("readable multipart field");
    }
    stub.uploaded_parts.store(parts, Ordering::SeqCst);

    Json(json!({ "job_id": "j1", "message": "queued" }))
}

async fn status(Path(_job_id): Path<String>, State(stub): State<StubService>) -> Response {
    stub.status_calls.fetch_add(1, Ordering::SeqCst);

    let reply = stub.script.lock().expect("script lock").pop_front();
    match reply {
        Some(StatusReply::Ok { status, message }) => {
            Json(json!({ "status": status, "message": message })).into_response()
        }
        Some(StatusReply::Error(code)) => (
            StatusCode::from_u16(code).expect("valid status code"),
            "stub failure",
        )
            .into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "status script exhausted").into_response(),
    }
}

async fn stop(Path(_job_id): Path<String>, State(stub): State<StubService>) -> Json<serde_json::Value> {
    stub.stop_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "stopped": true }))
}

async fn generate(Path(_job_id): Path<String>, State(stub): State<StubService>) -> Vec<u8> {
    stub.generate_calls.fetch_add(1, Ordering::SeqCst);
    stub.artifact.as_ref().clone()
}

/// A selection of `n` well-named MIDI files with distinct contents.
pub fn midi_files(n: usize) -> Vec<UploadFile> {
    (0..n)
        .map(|i| UploadFile {
            name: format!("track{i}.mid"),
            bytes: format!("MThd-track-{i}").into_bytes(),
        })
        .collect()
}

/// Receive events until a `StatusChanged` with the wanted status arrives.
/// Returns its message.  Panics after five seconds.
pub async fn wait_for_status(
    events: &mut broadcast::Receiver<SessionEvent>,
    want: JobStatus,
) -> String {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await.expect("event channel open") {
                SessionEvent::StatusChanged {
                    status, message, ..
                } if status == want => return message,
                _ => {}
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for status {want}"))
}
