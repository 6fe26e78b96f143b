#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::routing::post;
use axum::{serve, Json, Router};
use serde_json::Value;
use snapbloom_lib::models::{DetectionVerdict, MediaAsset, MediaKind, MediaPayload, UserRecord};
use snapbloom_lib::services::record_store::default_user;
use snapbloom_lib::services::RecordStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned answer for every request the mock detector receives.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone)]
struct MockState {
    reply: Reply,
    requests: Arc<Mutex<Vec<Value>>>,
}

/// In-process detection service bound to a random local port.
pub struct MockDetector {
    pub url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    _server: JoinHandle<()>,
}

impl MockDetector {
    pub async fn start(reply: Reply) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reply,
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/detect-deepfake", post(detect))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock detector");
        let addr = listener.local_addr().expect("mock detector addr");
        let server = tokio::spawn(async move {
            serve(listener, app).await.expect("mock detector server");
        });

        Self {
            url: format!("http://{}/detect-deepfake", addr),
            requests,
            _server: server,
        }
    }

    /// JSON bodies received so far, in arrival order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("requests lock").clone()
    }
}

async fn detect(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, [(HeaderName, &'static str); 1], String) {
    state.requests.lock().expect("requests lock").push(body);

    let reply = state.reply;
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], reply.body)
}

/// An endpoint nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let addr = listener.local_addr().expect("free port addr");
    drop(listener);
    format!("http://{}/detect-deepfake", addr)
}

/// Record store in a temp dir, seeded with the default user.
pub struct TestStore {
    _tmp: TempDir,
    pub store: RecordStore,
}

impl TestStore {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let store = RecordStore::new(tmp.path().join("data"));
        store.ensure_user(default_user()).expect("seed user");
        Self { _tmp: tmp, store }
    }

    /// Another handle on the same data dir.
    pub fn reopen(&self) -> RecordStore {
        RecordStore::new(self.store.data_dir().to_path_buf())
    }

    pub fn user(&self) -> UserRecord {
        self.store.current_user().expect("current user")
    }
}

pub fn image_asset() -> MediaAsset {
    MediaAsset::new(
        MediaKind::Image,
        "image/png",
        MediaPayload::Binary(vec![0x89, b'P', b'N', b'G', 1, 2, 3]),
    )
}

pub fn video_asset() -> MediaAsset {
    MediaAsset::new(
        MediaKind::Video,
        "video/mp4",
        MediaPayload::Binary(vec![0u8, 0, 0, 0x20, b'f', b't', b'y', b'p']),
    )
}

pub fn image_verdict(is_deepfake: bool, confidence: f64) -> DetectionVerdict {
    DetectionVerdict::Image { is_deepfake, confidence }
}
