//! Informational routes.

use axum::{Json, extract::State};
use epub_translator_core::TargetLanguage;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub backend: &'static str,
}

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Arabic EPUB translation API. Upload a book to /total-chunk, then translate it with /process-chunk."
    }))
}

/// Target language names accepted by `/process-chunk`.
pub async fn languages() -> Json<Vec<&'static str>> {
    Json(TargetLanguage::all().into_iter().map(TargetLanguage::name).collect())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let info = state.translator.translator_info();
    Json(HealthResponse {
        status: "ok",
        model: info.model,
        backend: info.name,
    })
}
