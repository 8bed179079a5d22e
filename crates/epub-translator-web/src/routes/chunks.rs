//! Chunk routes - EPUB upload/scan and single-chunk translation.

use axum::{
    Json,
    extract::{Form, FromRequest, Request, State},
    http::header,
};
use axum_extra::extract::Multipart;
use epub_translator_core::{EpubBook, TargetLanguage, util};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::helpers::{ApiError, OptionExt, ResultExt, RouteResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TotalChunkResponse {
    pub total: usize,
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessChunkResponse {
    pub output: String,
    pub original: String,
    pub chunk_number: usize,
}

/// Upload an EPUB and return how many chunks it has.
///
/// The file id is the SHA-256 of the upload, so the same book uploaded twice
/// is only parsed once while its scan is cached.
pub async fn total_chunk(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> RouteResult<Json<TotalChunkResponse>> {
    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        if field.name() != Some("file") {
            continue;
        }

        let data = field.bytes().await.or_bad_request()?;
        let file_id = util::sha256_hex(&data);

        if let Some(chunks) = state.scans.get(&file_id).await {
            info!("Scan cache hit for {}", util::short_id(&file_id));
            return Ok(Json(TotalChunkResponse {
                total: chunks.len(),
                file_id,
            }));
        }

        // Parse in a blocking task to avoid blocking the async runtime
        let book = tokio::task::spawn_blocking(move || EpubBook::from_bytes(data))
            .await
            .or_internal_error()??;

        let chunks = state.translator.scan(&book).await;
        info!(
            "Scanned {} ({} bytes): {} chunks",
            util::short_id(&file_id),
            book.size(),
            chunks.len()
        );

        return Ok(Json(TotalChunkResponse {
            total: chunks.len(),
            file_id,
        }));
    }

    Err(ApiError::bad_request("No file uploaded"))
}

/// Fields of a `/process-chunk` request, from a multipart or url-encoded form.
#[derive(Debug)]
pub struct ChunkForm {
    pub file_id: String,
    pub chunk: usize,
    pub target_language: TargetLanguage,
}

impl ChunkForm {
    fn from_fields(mut fields: HashMap<String, String>) -> RouteResult<Self> {
        let file_id = fields
            .remove("file_id")
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::unprocessable("Field 'file_id' is required"))?;

        let chunk = fields
            .remove("chunk")
            .ok_or_else(|| ApiError::unprocessable("Field 'chunk' is required"))?
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ApiError::unprocessable("Field 'chunk' must be a positive integer"))?;

        let target_language = match fields.remove("target_language") {
            Some(lang) if !lang.trim().is_empty() => lang.parse::<TargetLanguage>()?,
            _ => TargetLanguage::default(),
        };

        Ok(Self {
            file_id: file_id.trim().to_string(),
            chunk,
            target_language,
        })
    }
}

impl<S: Send + Sync> FromRequest<S> for ChunkForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let fields = if is_multipart {
            let mut multipart = Multipart::from_request(req, state).await.or_bad_request()?;

            let mut fields = HashMap::new();
            while let Some(field) = multipart.next_field().await.or_bad_request()? {
                let name = field.name().unwrap_or_default().to_string();
                let value = field.text().await.or_bad_request()?;
                fields.insert(name, value);
            }
            fields
        } else {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::unprocessable(e.body_text()))?;
            fields
        };

        Self::from_fields(fields)
    }
}

/// Translate one chunk of a previously uploaded book.
pub async fn process_chunk(
    State(state): State<Arc<AppState>>,
    form: ChunkForm,
) -> RouteResult<Json<ProcessChunkResponse>> {
    let chunks = state
        .scans
        .get(&form.file_id)
        .await
        .or_not_found("File not found. Please upload the file via /total-chunk first.")?;

    let result = state
        .translator
        .translate_chunk(&chunks, form.chunk, &form.target_language.into())
        .await?;

    Ok(Json(ProcessChunkResponse {
        output: result.translation,
        original: result.original,
        chunk_number: result.number,
    }))
}
