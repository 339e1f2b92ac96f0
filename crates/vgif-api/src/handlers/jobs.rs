//! Job submission, status and download handlers.

use std::io::ErrorKind;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use scopeguard::ScopeGuard;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;

use vgif_jobs::{Dispatcher, JobError, PendingUpload};
use vgif_models::{InvalidFps, JobId, JobStatus, DEFAULT_FPS};

use crate::auth::ApiKey;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response to an accepted submission.
#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub job_id: String,
}

/// Response to a status poll.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

/// Submit a video for conversion.
///
/// Accepts a multipart form with a required `file` field and an optional
/// `fps` field (default 10). The upload is streamed to disk, registered as a
/// `queued` job and converted in the background; the response carries only
/// the job id.
///
/// Until the job is registered the upload is owned by this handler. Any
/// early return, including the request future being dropped on a client
/// disconnect, removes whatever was written.
pub async fn create_job(
    State(state): State<AppState>,
    _key: ApiKey,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    let mut multipart = multipart?;

    let mut pending = scopeguard::guard(None::<PendingUpload>, |pending| {
        if let Some(upload) = pending {
            remove_abandoned(upload.input_path());
        }
    });
    let fps = read_submission(&state.dispatcher, &mut multipart, &mut pending)
        .await?
        .unwrap_or(i64::from(DEFAULT_FPS));

    let upload = ScopeGuard::into_inner(pending)
        .ok_or_else(|| ApiError::bad_request("Missing required 'file' field"))?;
    let abandoned = scopeguard::guard(upload.input_path().to_path_buf(), |path| {
        remove_abandoned(&path)
    });
    let job_id = state.dispatcher.dispatch(upload, fps).await?;
    ScopeGuard::into_inner(abandoned);

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            job_id: job_id.to_string(),
        }),
    ))
}

/// Blocking removal of an upload that never became a job.
///
/// Runs from drop guards, where nothing can be awaited.
fn remove_abandoned(path: &FsPath) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed abandoned upload"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove abandoned upload"
        ),
    }
}

/// Walk the form, streaming the file field to its reserved location.
async fn read_submission(
    dispatcher: &Dispatcher,
    multipart: &mut Multipart,
    pending: &mut Option<PendingUpload>,
) -> ApiResult<Option<i64>> {
    let mut fps = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("fps") => {
                let raw = field.text().await?;
                fps = Some(parse_fps(&raw)?);
            }
            Some("file") => {
                if pending.is_some() {
                    return Err(ApiError::bad_request("Only one 'file' field is allowed"));
                }
                let upload = pending.insert(dispatcher.prepare(field.file_name()));
                let written = write_upload(&mut field, upload.input_path()).await?;
                info!(
                    job_id = %upload.id(),
                    bytes = written,
                    path = %upload.input_path().display(),
                    "Upload stored"
                );
            }
            other => debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    Ok(fps)
}

fn parse_fps(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::Validation(InvalidFps.to_string()))
}

async fn write_upload(field: &mut Field<'_>, path: &FsPath) -> ApiResult<u64> {
    let mut file = File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Poll a job's status.
pub async fn get_job_status(
    State(state): State<AppState>,
    _key: ApiKey,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<JobStatusResponse>> {
    let view = state.reporter.report(&JobId::from_string(job_id)).await?;

    Ok(Json(JobStatusResponse {
        download_url: view
            .download_path
            .as_deref()
            .map(|path| download_url(&state.config, &headers, path)),
        job_id: view.job_id,
        status: view.status,
        error: view.error,
    }))
}

/// Absolute download URL when one can be formed, else the bare path.
///
/// `PUBLIC_BASE_URL` wins; otherwise the request's `Host` header is used.
fn download_url(config: &ApiConfig, headers: &HeaderMap, path: &str) -> String {
    if let Some(base) = &config.public_base_url {
        return format!("{}{}", base.as_str().trim_end_matches('/'), path);
    }

    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .and_then(|host| Url::parse(&format!("http://{}{}", host, path)).ok())
        .filter(|url| url.path() == path)
        .map(String::from)
        .unwrap_or_else(|| path.to_string())
}

/// Stream the produced GIF of a finished job.
pub async fn get_job_gif(
    State(state): State<AppState>,
    _key: ApiKey,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let id = JobId::from_string(job_id);
    let path = state.fetcher.artifact(&id).await?;

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(JobError::ArtifactMissing(id).into())
        }
        Err(e) => return Err(e.into()),
    };
    let size = file.metadata().await?.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/gif")
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.gif\"", id),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
