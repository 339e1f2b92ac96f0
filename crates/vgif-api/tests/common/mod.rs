#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use vgif_api::{create_router, ApiConfig, AppState};
use vgif_jobs::JobsConfig;
use vgif_media::{MediaError, MediaResult, Transcoder};
use vgif_models::Fps;

pub const API_KEY: &str = "test-api-key";
pub const BOUNDARY: &str = "vgif-test-boundary";

/// Router plus the state and scratch directory behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn videos_dir(&self) -> &Path {
        self.state.dispatcher.layout().videos_dir()
    }

    pub fn gifs_dir(&self) -> &Path {
        self.state.dispatcher.layout().gifs_dir()
    }
}

pub async fn build_test_app(transcoder: Arc<dyn Transcoder>) -> TestApp {
    build_test_app_with(transcoder, |_| {}).await
}

/// Build the full router over a temp directory layout, letting the caller
/// tweak the config first.
pub async fn build_test_app_with(
    transcoder: Arc<dyn Transcoder>,
    configure: impl FnOnce(&mut ApiConfig),
) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = ApiConfig {
        jobs: JobsConfig {
            videos_dir: dir.path().join("videos"),
            gifs_dir: dir.path().join("gifs"),
            ..JobsConfig::default()
        },
        metrics_enabled: false,
        ..ApiConfig::new(API_KEY)
    };
    configure(&mut config);

    let state = AppState::with_transcoder(config, transcoder);
    state.dispatcher.layout().ensure_dirs().await.unwrap();
    let router = create_router(state.clone(), None);

    TestApp { router, state, dir }
}

/// Writes a GIF header followed by the input bytes.
pub struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn convert(&self, input: &Path, output: &Path, _fps: Fps) -> MediaResult<()> {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend(tokio::fs::read(input).await?);
        tokio::fs::write(output, bytes).await?;
        Ok(())
    }
}

/// Fails like FFmpeg rejecting a corrupt input.
pub struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn convert(&self, _input: &Path, _output: &Path, _fps: Fps) -> MediaResult<()> {
        Err(MediaError::ffmpeg_failed(
            "palette generation: FFmpeg exited with exit status: 1",
            Some("Invalid data found when processing input".to_string()),
            Some(1),
        ))
    }
}

/// Never completes, pinning jobs in `processing`.
pub struct StuckTranscoder;

#[async_trait]
impl Transcoder for StuckTranscoder {
    async fn convert(&self, _input: &Path, _output: &Path, _fps: Fps) -> MediaResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Hand-built multipart/form-data body.
pub fn multipart_body(fps: Option<&str>, file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(fps) = fps {
        body.extend(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"fps\"\r\n\r\n{fps}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn submit_request(api_key: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/jobs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::CONTENT_LENGTH, body.len());
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn get_request(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::HOST, "localhost:8000");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit a clip and return its job id.
pub async fn submit(app: &TestApp, fps: Option<&str>, filename: &str) -> String {
    let response = app
        .send(submit_request(
            Some(API_KEY),
            multipart_body(fps, Some((filename, b"fake video bytes".as_slice()))),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll the status endpoint until the job is terminal.
pub async fn wait_for_terminal(app: &TestApp, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let response = app
            .send(get_request(&format!("/jobs/{job_id}"), Some(API_KEY)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        if json["status"] == "finished" || json["status"] == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not reach a terminal state");
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}
