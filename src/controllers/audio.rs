use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::{
    domain::audio::{AudioServiceApi, Manifest},
    error::{AppError, AppResult},
};

/// Floor for the `minWords` knob; below this the text is unusable anyway.
const MIN_WORDS_FLOOR: usize = 50;
const MIN_WORDS_DEFAULT: usize = 500;

/// Request for POST /api/books/:bookId/audio-chunks
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub voice_id: i64,
    #[serde(default)]
    pub force: bool,
    pub min_words: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub reused: bool,
    pub manifest: Manifest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestQuery {
    pub voice_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeQuery {
    pub voice_id: i64,
    pub word: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    pub chunk_index: usize,
}

/// Request for POST /api/books/:bookId/text
#[derive(Debug, Serialize, Deserialize)]
pub struct ManualTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ManualTextResponse {
    pub url: String,
    pub words: usize,
}

pub struct AudioController {
    audio_service: Arc<dyn AudioServiceApi>,
    generation_timeout: Duration,
}

impl AudioController {
    pub fn new(audio_service: Arc<dyn AudioServiceApi>, generation_timeout: Duration) -> Self {
        Self {
            audio_service,
            generation_timeout,
        }
    }

    /// POST /api/books/:bookId/audio-chunks - Generate or reuse narration
    pub async fn generate(
        State(controller): State<Arc<AudioController>>,
        Path(book_id): Path<i64>,
        Json(request): Json<GenerateRequest>,
    ) -> AppResult<Json<GenerateResponse>> {
        let min_words = request
            .min_words
            .unwrap_or(MIN_WORDS_DEFAULT)
            .max(MIN_WORDS_FLOOR);

        let generation = controller.audio_service.generate(
            book_id,
            request.voice_id,
            request.force,
            min_words,
        );

        let outcome = tokio::time::timeout(controller.generation_timeout, generation)
            .await
            .map_err(|_| {
                AppError::GatewayTimeout(format!(
                    "Generation for book {book_id} exceeded {} seconds",
                    controller.generation_timeout.as_secs()
                ))
            })?
            .map_err(AppError::from)?;

        Ok(Json(GenerateResponse {
            reused: outcome.reused,
            manifest: (*outcome.manifest).clone(),
        }))
    }

    /// GET /api/books/:bookId/audio-chunks - Fetch the stored manifest
    pub async fn manifest(
        State(controller): State<Arc<AudioController>>,
        Path(book_id): Path<i64>,
        Query(query): Query<ManifestQuery>,
    ) -> AppResult<Json<Manifest>> {
        let manifest = controller
            .audio_service
            .manifest(book_id, query.voice_id)
            .await
            .map_err(AppError::from)?;

        Ok(Json((*manifest).clone()))
    }

    /// GET /api/books/:bookId/resume - Map a word offset to a chunk position
    pub async fn resume(
        State(controller): State<Arc<AudioController>>,
        Path(book_id): Path<i64>,
        Query(query): Query<ResumeQuery>,
    ) -> AppResult<Json<ResumeResponse>> {
        let chunk_index = controller
            .audio_service
            .locate(book_id, query.voice_id, query.word)
            .await
            .map_err(AppError::from)?;

        Ok(Json(ResumeResponse { chunk_index }))
    }

    /// POST /api/books/:bookId/text - Store operator-supplied plain text
    pub async fn store_text(
        State(controller): State<Arc<AudioController>>,
        Path(book_id): Path<i64>,
        Json(request): Json<ManualTextRequest>,
    ) -> AppResult<Json<ManualTextResponse>> {
        let stored = controller
            .audio_service
            .store_manual_text(book_id, request.text)
            .await
            .map_err(AppError::from)?;

        Ok(Json(ManualTextResponse {
            url: stored.url,
            words: stored.words,
        }))
    }
}
