//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/body parameters via axum extractors,
//! interacts with AppState services, and returns JSON responses.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use chatscan_ocr::{ConversationReport, TextReport};

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying a single screenshot.
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the batch upload's screenshots.
pub const FILES_FIELD: &str = "files";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct HelloRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis_result: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub ocr_engine: String,
    pub detection_enabled: bool,
}

/// One uploaded file read out of a multipart body.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

// =============================================================================
// Multipart helpers
// =============================================================================

/// Read every field named `name`, in body order. Other fields are skipped.
async fn read_files(multipart: &mut Multipart, name: &str) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            debug!(field = ?field.name(), "Skipping multipart field");
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?.to_vec();
        files.push(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(files)
}

async fn read_single_file(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    read_files(&mut multipart, FILE_FIELD)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' field", FILE_FIELD)))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Hello World".to_string(),
    })
}

/// GET /hello/{name}
pub async fn say_hello(Path(name): Path<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("Hello {}", name),
    })
}

/// POST /hello
///
/// Always 200: model failures come back as the fallback reply.
pub async fn hello(
    State(state): State<AppState>,
    Json(body): Json<HelloRequest>,
) -> Json<HelloResponse> {
    let response = state.responder.reply_to(&body.text).await;
    Json(HelloResponse { response })
}

/// POST /api/upload-multiple
///
/// Runs OCR with and without the detection pre-pass on every file and logs
/// the texts. The response body is JSON `null`.
pub async fn upload_multiple(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<()>, ApiError> {
    let files = read_files(&mut multipart, FILES_FIELD).await?;
    if files.is_empty() {
        return Err(ApiError::BadRequest(format!("Missing '{}' field", FILES_FIELD)));
    }

    let batch = Uuid::new_v4();
    info!(%batch, files = files.len(), "Processing upload batch");

    for (index, file) in files.iter().enumerate() {
        let name = file.file_name.as_deref().unwrap_or("<unnamed>");

        let detected = state.ocr.read_with_detection(&file.bytes).await?;
        info!(%batch, index, file = name, texts = ?detected, "Detection + OCR result");

        let full = state.ocr.read_full(&file.bytes).await?;
        info!(%batch, index, file = name, texts = ?full, "Full-image OCR result");
    }

    Ok(Json(()))
}

/// POST /api/ocr
pub async fn ocr_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TextReport>, ApiError> {
    let file = read_single_file(multipart).await?;
    let report = state.ocr.text_report(&file.bytes).await?;
    Ok(Json(report))
}

/// POST /api/ocr/conversation
pub async fn ocr_conversation(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConversationReport>, ApiError> {
    let file = read_single_file(multipart).await?;
    let report = state.ocr.conversation_report(&file.bytes).await?;
    Ok(Json(report))
}

/// POST /api/analyze-image
pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let file = read_single_file(multipart).await?;
    let analysis_result = state
        .analyzer
        .analyze(&file.bytes, file.content_type.as_deref())
        .await;
    Ok(Json(AnalysisResponse { analysis_result }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        ocr_engine: state.ocr.engine_name().to_string(),
        detection_enabled: state.ocr.has_detector(),
    })
}
