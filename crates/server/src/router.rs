//! HTTP routes for the library API.
//!
//! Each handler validates its query, runs the matching `files` operation and
//! maps failures through [`ApiError`], which is the only place internal
//! errors are turned into client-facing status codes and messages.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use protocol::error::{ErrorBody, ErrorCode, ProtocolError};
use protocol::listing::{ExtractResponse, ListingQuery, ListingResponse};
use protocol::range::RANGE_UNIT;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::config::Config;
use crate::files::archive::{self, ArchiveError};
use crate::files::browser::BrowserError;
use crate::files::classify::{self, AllowList};
use crate::files::collate::{CollateError, NameCollator};
use crate::files::listing::{DirectoryListing, ListingError, ListingRequest};
use crate::files::resolver::{LibraryRoot, ResolveError};
use crate::files::thumbnail;
use crate::files::transfer::{FileStreamer, TransferError};

/// Errors returned by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required query parameter is absent or empty.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// A query parameter has an unsupported value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ProtocolError),

    /// The query string could not be deserialized.
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] QueryRejection),

    /// Listing failure.
    #[error("listing error: {0}")]
    Listing(#[from] ListingError),

    /// File open or stream failure.
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Archive extraction failure.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Collator construction failure.
    #[error("collation error: {0}")]
    Collate(#[from] CollateError),

    /// Anything else that should never reach the client in detail.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable code of the error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::MissingParameter(_) => ErrorCode::MissingParameter,
            ApiError::InvalidParameter(_) | ApiError::MalformedQuery(_) => {
                ErrorCode::InvalidParameter
            }
            ApiError::Listing(ListingError::AccessDenied(_)) => ErrorCode::AccessDenied,
            ApiError::Listing(ListingError::NotFound(BrowserError::NotADirectory(_))) => {
                ErrorCode::NotADirectory
            }
            ApiError::Listing(ListingError::NotFound(_)) => ErrorCode::NotFound,
            ApiError::Transfer(TransferError::AccessDenied(_)) => ErrorCode::AccessDenied,
            ApiError::Transfer(TransferError::NotFound(_)) => ErrorCode::NotFound,
            ApiError::Transfer(TransferError::NotAFile(_)) => ErrorCode::NotAFile,
            ApiError::Transfer(TransferError::UnsupportedExtension { .. }) => {
                ErrorCode::UnsupportedExtension
            }
            ApiError::Archive(ArchiveError::AccessDenied(_)) => ErrorCode::AccessDenied,
            ApiError::Archive(ArchiveError::NotFound(_)) => ErrorCode::NotAFile,
            ApiError::Archive(ArchiveError::NotAZip(_)) => ErrorCode::InvalidParameter,
            ApiError::Transfer(TransferError::Io(_))
            | ApiError::Archive(ArchiveError::Extract(_) | ArchiveError::Io(_))
            | ApiError::Collate(_)
            | ApiError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Generic message sent to the client.
    fn public_message(&self) -> &'static str {
        match self {
            ApiError::Listing(ListingError::NotFound(_)) => "Directory not found",
            ApiError::Transfer(TransferError::NotFound(_)) => "File not found",
            ApiError::Archive(ArchiveError::NotFound(_)) => "ZIP file not found",
            ApiError::Archive(ArchiveError::NotAZip(_)) => "File is not a ZIP archive",
            other => other.code().public_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if code == ErrorCode::Internal {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, ?code, "Request rejected");
        }

        if let ApiError::Archive(ArchiveError::Extract(_) | ArchiveError::Io(_)) = self {
            let body = ExtractResponse {
                success: false,
                message: "Failed to extract ZIP file".to_string(),
                extracted_to: None,
            };
            return (status, Json(body)).into_response();
        }

        let body = ErrorBody::with_message(code, self.public_message());
        (status, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

/// Shared, immutable request context.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    root: Arc<LibraryRoot>,
}

impl AppState {
    /// Build the state, canonicalizing the configured root.
    pub fn new(config: Config) -> Result<Self, ResolveError> {
        let root = LibraryRoot::new(&config.library.root)?;
        Ok(Self {
            config: Arc::new(config),
            root: Arc::new(root),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &LibraryRoot {
        &self.root
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/directory-pagination", get(list_directory))
        .route("/api/directory", get(list_directory))
        .route("/api/image", get(serve_image))
        .route("/api/audio", get(serve_audio))
        .route("/api/video", get(serve_video))
        .route("/api/file", get(serve_download))
        .route("/api/extract-zip", post(extract_zip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Effective page size: absent means the configured default, and anything
/// above the configured maximum is clamped. Zero yields an empty page.
fn effective_limit(requested: Option<usize>, config: &Config) -> usize {
    match requested {
        None => config.library.page_size,
        Some(limit) => limit.min(config.library.max_page_size),
    }
}

/// GET /api/directory-pagination
async fn list_directory(
    State(state): State<AppState>,
    query: Result<Query<ListingQuery>, QueryRejection>,
) -> Result<Json<ListingResponse>, ApiError> {
    let Query(query) = query?;
    let request = ListingRequest {
        path: query.path.clone(),
        offset: query.offset.unwrap_or(0),
        limit: effective_limit(query.limit, &state.config),
        sort_by: query.sort_by()?,
        sort_order: query.sort_order()?,
    };

    let root = Arc::clone(&state.root);
    let locale = state.config.library.locale.clone();

    let response = tokio::task::spawn_blocking(move || -> Result<ListingResponse, ApiError> {
        let collator = NameCollator::new(&locale)?;
        let page = DirectoryListing::new(&root, &collator).page(&request)?;
        Ok(page.to_protocol())
    })
    .await??;

    Ok(Json(response))
}

/// Query string of the file endpoints.
#[derive(Debug, Deserialize)]
struct FileQuery {
    path: Option<String>,
    #[serde(default)]
    thumbnail: bool,
}

impl FileQuery {
    fn required_path(&self) -> Result<&str, ApiError> {
        self.path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ApiError::MissingParameter("path"))
    }
}

/// How a streamed file is presented to the client.
enum Presentation {
    /// Displayed in the page, cacheable.
    Inline { max_age: u64 },
    /// Saved by the browser, never cached.
    Attachment,
}

async fn serve_image(
    State(state): State<AppState>,
    query: Result<Query<FileQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    if query.thumbnail {
        return serve_thumbnail(&state, query.required_path()?).await;
    }
    let max_age = state.config.media.cache_max_age;
    serve_file(
        &state,
        &query,
        &headers,
        &AllowList::IMAGE,
        Presentation::Inline { max_age },
    )
    .await
}

async fn serve_audio(
    State(state): State<AppState>,
    query: Result<Query<FileQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let max_age = state.config.media.cache_max_age;
    serve_file(
        &state,
        &query,
        &headers,
        &AllowList::AUDIO,
        Presentation::Inline { max_age },
    )
    .await
}

async fn serve_video(
    State(state): State<AppState>,
    query: Result<Query<FileQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let max_age = state.config.media.cache_max_age;
    serve_file(
        &state,
        &query,
        &headers,
        &AllowList::VIDEO,
        Presentation::Inline { max_age },
    )
    .await
}

async fn serve_download(
    State(state): State<AppState>,
    query: Result<Query<FileQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    serve_file(&state, &query, &headers, &AllowList::DOWNLOAD, Presentation::Attachment).await
}

/// Stream a file, honouring a single-range `Range` header.
async fn serve_file(
    state: &AppState,
    query: &FileQuery,
    headers: &HeaderMap,
    allow_list: &AllowList,
    presentation: Presentation,
) -> Result<Response, ApiError> {
    let path = query.required_path()?;
    let file = FileStreamer::new(&state.root).open(path, allow_list).await?;

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let plan = file.plan(range);

    let content_type = file.content_type;
    let disposition = match presentation {
        Presentation::Inline { .. } => "inline".to_string(),
        Presentation::Attachment => format!(
            "attachment; filename=\"{}\"",
            urlencoding::encode(&file.name)
        ),
    };
    let cache_control = match presentation {
        Presentation::Inline { max_age } => format!("public, max-age={max_age}"),
        Presentation::Attachment => "no-cache".to_string(),
    };

    let stream = file.stream(&plan).await?;

    let mut builder = Response::builder()
        .status(plan.status())
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, plan.content_length().to_string())
        .header(header::ACCEPT_RANGES, RANGE_UNIT)
        .header(header::CACHE_CONTROL, cache_control)
        .header(header::CONTENT_DISPOSITION, disposition);

    if let Some(content_range) = plan.content_range() {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")))
}

/// Serve a reduced-size variant of an image. Range requests are not
/// honoured for thumbnails.
async fn serve_thumbnail(state: &AppState, path: &str) -> Result<Response, ApiError> {
    let file = FileStreamer::new(&state.root)
        .open(path, &AllowList::IMAGE)
        .await?;

    let extension = classify::extension(&file.name).unwrap_or_default();
    let original_type = file.content_type;
    let max_side = state.config.media.thumbnail_size;
    let original = file.read_all().await?;

    let thumb = tokio::task::spawn_blocking(move || {
        thumbnail::thumbnail_or_original(original, &extension, original_type, max_side)
    })
    .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, thumb.content_type.to_string()),
            (header::CONTENT_LENGTH, thumb.bytes.len().to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.config.media.cache_max_age),
            ),
            (header::CONTENT_DISPOSITION, "inline".to_string()),
        ],
        thumb.bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    path: Option<String>,
}

/// POST /api/extract-zip
async fn extract_zip(
    State(state): State<AppState>,
    query: Result<Query<ExtractQuery>, QueryRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Query(query) = query?;
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::MissingParameter("path"))?;

    let root = Arc::clone(&state.root);
    let extracted = tokio::task::spawn_blocking(move || archive::extract_zip(&root, &path)).await??;

    Ok(Json(ExtractResponse {
        success: true,
        message: "ZIP file extracted successfully".to_string(),
        extracted_to: Some(extracted.relative_path),
    }))
}
