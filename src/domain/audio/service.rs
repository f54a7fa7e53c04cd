use super::error::AudioServiceError;
use super::planner::{plan, PlannedChunk, PlannerParams};
use super::synthesis::SynthesisOrchestrator;
use super::{Manifest, ManifestChunk, SynthesisParameters, MANIFEST_SCHEMA_VERSION};
use crate::domain::catalog::{Book, Voice};
use crate::domain::extraction::{word_count, ExtractionPolicy, Extractor};
use crate::infrastructure::repositories::{CatalogRepository, ManifestRepository};
use crate::infrastructure::storage::{BlobStore, ObjectLocation};
use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
const TEXT_CONTENT_TYPE: &str = "text/plain";
const MANUAL_TEXT_MIN_WORDS: usize = 100;

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub source_bucket: String,
    pub audio_bucket: String,
    pub planner: PlannerParams,
    pub extraction: ExtractionPolicy,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub manifest: Arc<Manifest>,
    /// True when an existing manifest satisfied the request and no
    /// synthesis happened.
    pub reused: bool,
}

#[derive(Debug, Clone)]
pub struct StoredText {
    pub url: String,
    pub words: usize,
}

pub struct AudioService {
    catalog: Arc<dyn CatalogRepository>,
    store: Arc<dyn BlobStore>,
    manifests: Arc<ManifestRepository>,
    orchestrator: Arc<SynthesisOrchestrator>,
    extractor: Arc<Extractor>,
    settings: GenerationSettings,
}

impl AudioService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        store: Arc<dyn BlobStore>,
        manifests: Arc<ManifestRepository>,
        orchestrator: Arc<SynthesisOrchestrator>,
        extractor: Arc<Extractor>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            manifests,
            orchestrator,
            extractor,
            settings,
        }
    }
}

#[async_trait]
pub trait AudioServiceApi: Send + Sync {
    /// Generate (or reuse) the chunked narration for a book under a voice.
    ///
    /// This operation:
    /// - Validates book and voice exist
    /// - Reuses an existing manifest unless `force` or it covers fewer than
    ///   `min_words` words
    /// - Extracts text (cached sibling, parsers, optical recognition)
    /// - Plans chunks, synthesizes and uploads each, writes the manifest last
    async fn generate(
        &self,
        book_id: i64,
        voice_id: i64,
        force: bool,
        min_words: usize,
    ) -> Result<GenerationOutcome, AudioServiceError>;

    /// Fetch the stored manifest for a pairing.
    async fn manifest(
        &self,
        book_id: i64,
        voice_id: i64,
    ) -> Result<Arc<Manifest>, AudioServiceError>;

    /// Map a word offset onto a chunk position for playback resume.
    async fn locate(
        &self,
        book_id: i64,
        voice_id: i64,
        word_offset: i64,
    ) -> Result<usize, AudioServiceError>;

    /// Store operator-supplied plain text as the book's cached text sibling,
    /// bypassing extraction on the next generation run.
    async fn store_manual_text(
        &self,
        book_id: i64,
        text: String,
    ) -> Result<StoredText, AudioServiceError>;
}

#[async_trait]
impl AudioServiceApi for AudioService {
    async fn generate(
        &self,
        book_id: i64,
        voice_id: i64,
        force: bool,
        min_words: usize,
    ) -> Result<GenerationOutcome, AudioServiceError> {
        validate_id(book_id, "bookId")?;
        validate_id(voice_id, "voiceId")?;

        tracing::info!(book_id, voice_id, force, min_words, "Generation request");

        let book = self.find_book(book_id).await?;
        let voice = self.find_voice(voice_id).await?;

        if !force {
            if let Some(manifest) = self.manifests.get(book_id, voice_id).await? {
                if manifest.total_words >= min_words {
                    tracing::info!(
                        book_id,
                        voice_id,
                        total_chunks = manifest.total_chunks,
                        total_words = manifest.total_words,
                        "Existing manifest reused"
                    );
                    return Ok(GenerationOutcome {
                        manifest,
                        reused: true,
                    });
                }
                tracing::info!(
                    book_id,
                    voice_id,
                    total_words = manifest.total_words,
                    min_words,
                    "Existing manifest covers too little text, regenerating"
                );
            }
        } else {
            // Forced runs drop every previously generated object before the
            // first new write so a failure cannot leave mixed generations.
            self.manifests.invalidate(book_id, voice_id).await?;
        }

        let text = self.resolve_text(&book, min_words).await?;
        let words: Vec<&str> = text.split_whitespace().collect();

        let chunks = plan(&words, &self.settings.planner);
        let total_words = words.len();
        if chunks.is_empty() {
            return Err(AudioServiceError::InsufficientText {
                words: total_words,
                required: min_words,
            });
        }
        let total_seconds: f64 = chunks.iter().map(|c| c.estimated_seconds).sum();
        tracing::info!(
            book_id,
            voice_id,
            total_words,
            chunk_count = chunks.len(),
            estimated_total_seconds = total_seconds,
            "Chunk plan ready"
        );

        let mut manifest_chunks: Vec<ManifestChunk> = futures::stream::iter(
            chunks.into_iter().map(|chunk| {
                let voice_short_name = voice.short_name.clone();
                async move {
                    self.synthesize_and_upload(
                        book_id,
                        voice_id,
                        &voice_short_name,
                        chunk,
                        total_seconds,
                    )
                    .await
                }
            }),
        )
        .buffered(self.orchestrator.concurrency())
        .try_collect()
        .await?;
        manifest_chunks.sort_by_key(|c| c.index);

        let manifest = Manifest {
            schema_version: MANIFEST_SCHEMA_VERSION,
            document_id: book_id,
            voice_id,
            voice_short_name: voice.short_name,
            created_at: Utc::now(),
            total_chunks: manifest_chunks.len(),
            total_words,
            synthesis_parameters: SynthesisParameters {
                words_per_second: self.settings.planner.words_per_second,
                target_seconds: self.settings.planner.target_seconds,
                format_kbps: 48,
            },
            estimated_total_duration_seconds: total_seconds,
            chunks: manifest_chunks,
        };

        let url = self.manifests.put(&manifest).await?;
        tracing::info!(
            book_id,
            voice_id,
            total_chunks = manifest.total_chunks,
            manifest_url = %url,
            "Generation completed"
        );

        Ok(GenerationOutcome {
            manifest: Arc::new(manifest),
            reused: false,
        })
    }

    async fn manifest(
        &self,
        book_id: i64,
        voice_id: i64,
    ) -> Result<Arc<Manifest>, AudioServiceError> {
        validate_id(book_id, "bookId")?;
        validate_id(voice_id, "voiceId")?;

        self.manifests
            .get(book_id, voice_id)
            .await?
            .ok_or_else(|| {
                AudioServiceError::NotFound(format!(
                    "No manifest for book {book_id} and voice {voice_id}"
                ))
            })
    }

    async fn locate(
        &self,
        book_id: i64,
        voice_id: i64,
        word_offset: i64,
    ) -> Result<usize, AudioServiceError> {
        let manifest = self.manifest(book_id, voice_id).await?;
        Ok(manifest.locate(word_offset))
    }

    async fn store_manual_text(
        &self,
        book_id: i64,
        text: String,
    ) -> Result<StoredText, AudioServiceError> {
        validate_id(book_id, "bookId")?;

        let text = text.replace('\u{0}', "").trim().to_string();
        let words = word_count(&text);
        if words < MANUAL_TEXT_MIN_WORDS {
            return Err(AudioServiceError::InsufficientText {
                words,
                required: MANUAL_TEXT_MIN_WORDS,
            });
        }

        let book = self.find_book(book_id).await?;
        let location = ObjectLocation::resolve(&book.source_path, &self.settings.source_bucket);
        let sibling = location.text_sibling();

        let url = self
            .store
            .upload(
                &location.bucket,
                &sibling,
                text.into_bytes(),
                TEXT_CONTENT_TYPE,
            )
            .await?;

        tracing::info!(book_id, words, path = %sibling, "Manual text stored");
        Ok(StoredText { url, words })
    }
}

impl AudioService {
    async fn find_book(&self, book_id: i64) -> Result<Book, AudioServiceError> {
        self.catalog
            .find_book(book_id)
            .await
            .map_err(|e| AudioServiceError::Dependency(e.to_string()))?
            .ok_or_else(|| AudioServiceError::NotFound(format!("Book {book_id} not found")))
    }

    async fn find_voice(&self, voice_id: i64) -> Result<Voice, AudioServiceError> {
        self.catalog
            .find_voice(voice_id)
            .await
            .map_err(|e| AudioServiceError::Dependency(e.to_string()))?
            .ok_or_else(|| AudioServiceError::NotFound(format!("Voice {voice_id} not found")))
    }

    /// Narration text for the book: the cached plain-text sibling when it
    /// already holds enough words, otherwise a fresh extraction from the
    /// source document, cached for the next run.
    async fn resolve_text(
        &self,
        book: &Book,
        min_words: usize,
    ) -> Result<String, AudioServiceError> {
        let location = ObjectLocation::resolve(&book.source_path, &self.settings.source_bucket);
        let sibling = location.text_sibling();

        if let Some(bytes) = self.store.download(&location.bucket, &sibling).await? {
            let cached = String::from_utf8_lossy(&bytes).trim().to_string();
            let words = word_count(&cached);
            if words >= min_words {
                tracing::info!(book_id = book.id, words, path = %sibling, "Cached text reused");
                return Ok(cached);
            }
            tracing::info!(
                book_id = book.id,
                words,
                min_words,
                "Cached text too short, re-extracting"
            );
        }

        let source_bytes = self
            .store
            .download(&location.bucket, &location.path)
            .await?
            .ok_or_else(|| {
                AudioServiceError::NotFound(format!(
                    "Source document {} not found in bucket {}",
                    location.path, location.bucket
                ))
            })?;

        let policy = ExtractionPolicy {
            min_words,
            ..self.settings.extraction.clone()
        };
        let extracted = self.extractor.extract(source_bytes, &policy).await?;

        // Cache failures are non-fatal; the text is already in hand.
        match self
            .store
            .upload(
                &location.bucket,
                &sibling,
                extracted.text.clone().into_bytes(),
                TEXT_CONTENT_TYPE,
            )
            .await
        {
            Ok(_) => {
                tracing::info!(
                    book_id = book.id,
                    words = extracted.words,
                    origin = %extracted.origin,
                    path = %sibling,
                    "Extracted text cached"
                );
            }
            Err(e) => {
                tracing::warn!(book_id = book.id, error = %e, "Extracted text not cached");
            }
        }

        Ok(extracted.text)
    }

    async fn synthesize_and_upload(
        &self,
        book_id: i64,
        voice_id: i64,
        voice_short_name: &str,
        chunk: PlannedChunk,
        total_seconds: f64,
    ) -> Result<ManifestChunk, AudioServiceError> {
        let min_bytes = self
            .orchestrator
            .chunk_floor_bytes(chunk.estimated_seconds, total_seconds);

        let audio = self
            .orchestrator
            .synthesize_chunk(&chunk.text, voice_short_name, min_bytes)
            .await
            .map_err(|reason| AudioServiceError::SynthesisFailed {
                chunk_index: chunk.index,
                reason,
            })?;

        let file_name = format!("chunk-{:03}.mp3", chunk.index);
        let path = format!(
            "{}/{file_name}",
            ManifestRepository::pairing_prefix(book_id, voice_id)
        );
        let file_size_bytes = audio.len();
        let url = self
            .store
            .upload(&self.settings.audio_bucket, &path, audio, AUDIO_CONTENT_TYPE)
            .await?;

        tracing::info!(
            book_id,
            voice_id,
            chunk_index = chunk.index,
            words = chunk.end_word - chunk.start_word + 1,
            file_size_bytes,
            "Chunk uploaded"
        );

        Ok(ManifestChunk {
            index: chunk.index,
            file_name,
            url,
            start_word: chunk.start_word,
            end_word: chunk.end_word,
            file_size_bytes,
            estimated_duration_seconds: chunk.estimated_seconds,
        })
    }
}

fn validate_id(id: i64, field: &str) -> Result<(), AudioServiceError> {
    if id <= 0 {
        return Err(AudioServiceError::Invalid(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(())
}
