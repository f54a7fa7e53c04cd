//! In-memory doubles for the generation pipeline's seams.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bookcast_backend::domain::audio::{
    AudioService, GenerationSettings, PlannerParams, RetryPolicy, SynthesisConfig,
    SynthesisOrchestrator,
};
use bookcast_backend::domain::catalog::{Book, Voice};
use bookcast_backend::domain::extraction::{
    ExtractionError, ExtractionPolicy, ExtractionStrategy, Extractor, OcrEngine, TextOrigin,
};
use bookcast_backend::error::AppResult;
use bookcast_backend::infrastructure::repositories::{
    CatalogRepository, ManifestRepository, SpeechError, SpeechRepository,
};
use bookcast_backend::infrastructure::storage::{BlobStore, StorageError};

pub const SOURCE_BUCKET: &str = "book-files";
pub const AUDIO_BUCKET: &str = "book-audio";

/// Blob store backed by a map, recording every mutating operation in order.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    ops: Mutex<Vec<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, bucket: &str, path: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), path.to_string()), bytes);
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn paths_in(&self, bucket: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Mutating operations in the order they happened, as `"op bucket/path"`.
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: &str, bucket: &str, path: &str) {
        self.ops.lock().unwrap().push(format!("{op} {bucket}/{path}"));
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, bucket: &str, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.object(bucket, path))
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.record("upload", bucket, path);
        self.seed(bucket, path, bytes);
        Ok(self.public_url(bucket, path))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, p)| b == bucket && p.starts_with(prefix))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(&(bucket.to_string(), path.clone()));
        }
        drop(objects);
        for path in paths {
            self.record("remove", bucket, path);
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{bucket}/{path}")
    }
}

pub struct StaticCatalog {
    books: HashMap<i64, Book>,
    voices: HashMap<i64, Voice>,
}

impl StaticCatalog {
    pub fn new(books: Vec<Book>, voices: Vec<Voice>) -> Arc<Self> {
        Arc::new(Self {
            books: books.into_iter().map(|b| (b.id, b)).collect(),
            voices: voices.into_iter().map(|v| (v.id, v)).collect(),
        })
    }

    pub fn single(book_id: i64, source_path: &str, voice_id: i64) -> Arc<Self> {
        Self::new(
            vec![Book {
                id: book_id,
                title: "Moby-Dick".into(),
                description: None,
                source_path: source_path.into(),
            }],
            vec![Voice {
                id: voice_id,
                short_name: "es-CO-GonzaloNeural".into(),
            }],
        )
    }
}

#[async_trait]
impl CatalogRepository for StaticCatalog {
    async fn find_book(&self, book_id: i64) -> AppResult<Option<Book>> {
        Ok(self.books.get(&book_id).cloned())
    }

    async fn find_voice(&self, voice_id: i64) -> AppResult<Option<Voice>> {
        Ok(self.voices.get(&voice_id).cloned())
    }
}

/// How a [`ScriptedSpeech`] behaves once its script runs out.
pub enum AfterScript {
    Succeed,
    FailTransient,
}

/// Speech provider that replays a scripted sequence of responses, then
/// falls back to a fixed behavior. Counts calls.
pub struct ScriptedSpeech {
    name: &'static str,
    responses: Mutex<VecDeque<Result<Vec<u8>, SpeechError>>>,
    after: AfterScript,
    calls: AtomicUsize,
}

pub const TEST_AUDIO_BYTES: usize = 4096;

impl ScriptedSpeech {
    pub fn scripted(
        name: &'static str,
        responses: Vec<Result<Vec<u8>, SpeechError>>,
        after: AfterScript,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            responses: Mutex::new(responses.into()),
            after,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn succeeding(name: &'static str) -> Arc<Self> {
        Self::scripted(name, vec![], AfterScript::Succeed)
    }

    pub fn always_failing(name: &'static str) -> Arc<Self> {
        Self::scripted(name, vec![], AfterScript::FailTransient)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ok_audio() -> Result<Vec<u8>, SpeechError> {
        Ok(vec![0u8; TEST_AUDIO_BYTES])
    }
}

#[async_trait]
impl SpeechRepository for ScriptedSpeech {
    fn provider_name(&self) -> &'static str {
        self.name
    }

    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<Vec<u8>, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        match self.after {
            AfterScript::Succeed => Ok(vec![0u8; TEST_AUDIO_BYTES]),
            AfterScript::FailTransient => Err(SpeechError::Transient("scripted failure".into())),
        }
    }
}

/// Extraction strategy that reads the document bytes as UTF-8 text.
pub struct Utf8Strategy;

impl ExtractionStrategy for Utf8Strategy {
    fn origin(&self) -> TextOrigin {
        TextOrigin::EmbeddedText
    }

    fn try_extract(&self, bytes: &[u8]) -> Option<String> {
        let text = String::from_utf8(bytes.to_vec()).ok()?;
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

pub struct ScriptedOcr {
    pub pages: Vec<String>,
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(
        &self,
        _bytes: &[u8],
        max_pages: usize,
    ) -> Result<Vec<String>, ExtractionError> {
        Ok(self.pages.iter().take(max_pages).cloned().collect())
    }
}

pub fn text_of_words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

pub struct PipelineBuilder {
    pub store: Arc<MemoryBlobStore>,
    pub catalog: Arc<StaticCatalog>,
    pub primary: Arc<ScriptedSpeech>,
    pub fallback: Option<Arc<ScriptedSpeech>>,
    pub extractor: Extractor,
}

impl PipelineBuilder {
    pub fn new(store: Arc<MemoryBlobStore>, catalog: Arc<StaticCatalog>) -> Self {
        Self {
            store,
            catalog,
            primary: ScriptedSpeech::succeeding("primary"),
            fallback: None,
            extractor: Extractor::with_strategies(vec![Box::new(Utf8Strategy)], None),
        }
    }

    pub fn primary(mut self, primary: Arc<ScriptedSpeech>) -> Self {
        self.primary = primary;
        self
    }

    pub fn fallback(mut self, fallback: Arc<ScriptedSpeech>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn build(self) -> AudioService {
        let store: Arc<dyn BlobStore> = self.store;
        let manifests = Arc::new(ManifestRepository::new(
            store.clone(),
            AUDIO_BUCKET.to_string(),
            false,
        ));
        let primary: Arc<dyn SpeechRepository> = self.primary;
        let fallback: Option<Arc<dyn SpeechRepository>> =
            self.fallback.map(|f| f as Arc<dyn SpeechRepository>);
        let orchestrator = Arc::new(SynthesisOrchestrator::new(
            primary,
            fallback,
            SynthesisConfig {
                retry: RetryPolicy {
                    max_attempts: 3,
                    backoff: Duration::from_millis(1),
                },
                min_run_bytes: 2048,
                concurrency: 1,
            },
        ));

        AudioService::new(
            self.catalog,
            store,
            manifests,
            orchestrator,
            Arc::new(self.extractor),
            GenerationSettings {
                source_bucket: SOURCE_BUCKET.to_string(),
                audio_bucket: AUDIO_BUCKET.to_string(),
                planner: PlannerParams::default(),
                extraction: ExtractionPolicy::default(),
            },
        )
    }
}
