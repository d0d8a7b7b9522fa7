use std::{
    net::SocketAddr,
    path::{Path as FsPath, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
};
use docchat_rag::{
    DocumentId, DocumentQa, PdfExtractor, RetryingEmbedder, TextExtractor,
    openai::{OpenAIEmbedder, OpenAIGenerator},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::ServerConfig,
    error::ApiError,
    store::{DocumentRecord, DocumentStore},
};

const UPLOAD_MESSAGE: &str = "PDF uploaded and processed successfully";

#[derive(Clone)]
pub struct AppState {
    pub qa: Arc<DocumentQa>,
    pub store: DocumentStore,
    pub extractor: Arc<dyn TextExtractor>,
    pub upload_dir: PathBuf,
    cors_origin: Option<HeaderValue>,
    max_upload_bytes: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("upload_dir", &self.upload_dir)
            .field("cors_origin", &self.cors_origin)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State with an empty document store, any CORS origin and a 25 MiB
    /// upload limit.
    pub fn new(
        qa: Arc<DocumentQa>,
        extractor: Arc<dyn TextExtractor>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            qa,
            store: DocumentStore::new(),
            extractor,
            upload_dir: upload_dir.into(),
            cors_origin: None,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }

    /// Only allow cross-origin requests from `origin`.
    pub fn with_cors_origin(mut self, origin: HeaderValue) -> Self {
        self.cors_origin = Some(origin);
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document_id: u64,
    pub message: String,
    pub filename: String,
    pub file_path: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = match &state.cors_origin {
        Some(origin) => CorsLayer::new().allow_origin(origin.clone()),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(health))
        .route("/upload/", post(upload_document))
        .route("/ask/{document_id}", post(ask_question))
        .route("/documents/", get(list_documents))
        .route("/documents/{document_id}", delete(delete_document))
        .layer(body_limit)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| {
            format!("failed to create upload dir {}", config.upload_dir.display())
        })?;

    let embedder = OpenAIEmbedder::new(config.openai_api_key.clone())?
        .with_model(&config.embedding_model);
    let generator =
        OpenAIGenerator::new(config.openai_api_key.clone())?.with_model(&config.chat_model);
    let qa = DocumentQa::builder()
        .config(config.rag.clone())
        .embedder(Arc::new(RetryingEmbedder::new(embedder)))
        .generator(Arc::new(generator))
        .build()
        .context("failed to build the document QA pipeline")?;

    let cors_origin: HeaderValue = config
        .cors_origin
        .parse()
        .with_context(|| format!("invalid CORS origin {:?}", config.cors_origin))?;
    let state = AppState::new(Arc::new(qa), Arc::new(PdfExtractor), config.upload_dir.clone())
        .with_cors_origin(cors_origin)
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = app_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docchat")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        "docchat listening on http://{}",
        addr
    );
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let (original_filename, bytes) = read_file_field(&mut multipart).await?;
    if !original_filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(ApiError::bad_request("Only PDF files are allowed"));
    }

    let stored_name = format!("{}_{}", Uuid::new_v4(), original_filename);
    let path = state.upload_dir.join(&stored_name);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("failed to save upload: {e}")))?;
    let file_path = path.display().to_string();

    let record = state
        .store
        .insert(stored_name, original_filename.clone(), file_path.clone())
        .await;
    info!(
        document.id = record.id,
        filename = %original_filename,
        bytes = bytes.len(),
        "stored upload"
    );

    if let Err(err) = index_upload(&state, &record, bytes).await {
        warn!(document.id = record.id, error = %err, "indexing failed, discarding upload");
        state.store.remove(record.id).await;
        discard_file(&path).await;
        return Err(err);
    }

    // A delete that ran while indexing removed the record before the index
    // was published; drop the index it could not see.
    if state.store.get(record.id).await.is_none() {
        state.qa.remove_document(&DocumentId::from(record.id));
        discard_file(&path).await;
        warn!(document.id = record.id, "document deleted during indexing, index dropped");
        return Err(ApiError::not_found("Document not found"));
    }

    Ok(Json(UploadResponse {
        document_id: record.id,
        message: UPLOAD_MESSAGE.to_string(),
        filename: original_filename,
        file_path,
    }))
}

async fn index_upload(
    state: &AppState,
    record: &DocumentRecord,
    bytes: Bytes,
) -> Result<(), ApiError> {
    let extractor = state.extractor.clone();
    let text = tokio::task::spawn_blocking(move || extractor.extract(&bytes))
        .await
        .map_err(|e| ApiError::internal(format!("text extraction did not complete: {e}")))??;

    let summary = state.qa.index_document(DocumentId::from(record.id), &text).await?;
    info!(document.id = record.id, segments = summary.segments, "upload indexed");
    Ok(())
}

/// Return the name and contents of the `file` field.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("invalid multipart body", e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .and_then(base_filename)
            .ok_or_else(|| ApiError::bad_request("uploaded file has no name"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error("failed to read upload", e))?;
        return Ok((filename, bytes));
    }
    Err(ApiError::bad_request("missing `file` field"))
}

/// Body-limit failures become 413; anything else is a malformed request.
fn multipart_error(context: &str, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(format!("{context}: {err}"))
    } else {
        ApiError::bad_request(format!("{context}: {err}"))
    }
}

/// Strip any directory part a client put in the filename.
fn base_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    (!base.is_empty() && base != "." && base != "..").then(|| base.to_string())
}

async fn discard_file(path: impl AsRef<FsPath>) {
    let path = path.as_ref();
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove stored file");
        }
    }
}

async fn ask_question(
    Path(document_id): Path<u64>,
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let record = state
        .store
        .get(document_id)
        .await
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("question cannot be empty"));
    }

    let answer = state.qa.answer_question(&DocumentId::from(record.id), question).await?;
    Ok(Json(AnswerResponse { answer }))
}

async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentRecord>> {
    Json(state.store.list().await)
}

async fn delete_document(
    Path(document_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .store
        .remove(document_id)
        .await
        .ok_or_else(|| ApiError::not_found("Document not found"))?;

    let had_index = state.qa.remove_document(&DocumentId::from(record.id));
    discard_file(&record.file_path).await;
    info!(document.id = record.id, had_index, "deleted document");

    Ok(Json(json!({
        "document_id": record.id,
        "message": "Document deleted successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_filename_drops_directories() {
        assert_eq!(base_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(base_filename("../../etc/passwd.pdf").as_deref(), Some("passwd.pdf"));
        assert_eq!(base_filename("C:\\docs\\scan.pdf").as_deref(), Some("scan.pdf"));
        assert_eq!(base_filename("dir/"), None);
        assert_eq!(base_filename(".."), None);
    }
}
