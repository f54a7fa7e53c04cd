use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookcast_backend::controllers::audio::AudioController;
use bookcast_backend::domain::audio::{
    AudioService, GenerationSettings, PlannerParams, RetryPolicy, SynthesisConfig,
    SynthesisOrchestrator,
};
use bookcast_backend::domain::extraction::{ExtractionPolicy, Extractor, PdfiumTesseractOcr};
use bookcast_backend::infrastructure::config::{Config, LogFormat};
use bookcast_backend::infrastructure::db::{check_connection, create_pool};
use bookcast_backend::infrastructure::http::start_http_server;
use bookcast_backend::infrastructure::repositories::{
    ManifestRepository, OpenAiSpeechRepository, PollySpeechRepository, PostgresCatalogRepository,
    SpeechRepository,
};
use bookcast_backend::infrastructure::storage::{BlobStore, SupabaseStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting Bookcast Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    // Create AWS Polly client
    tracing::info!(
        "Initializing AWS Polly client with region: {}",
        config.aws_region
    );
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Storage and repositories
    let store: Arc<dyn BlobStore> = Arc::new(SupabaseStorage::new(
        config.storage_url.clone(),
        config.storage_service_key.clone(),
    )?);
    let catalog = Arc::new(PostgresCatalogRepository::new(pool.clone()));
    let manifests = Arc::new(ManifestRepository::new(
        store.clone(),
        config.audio_bucket.clone(),
        config.manifest_cache_enabled,
    ));

    // 2. Speech providers: Polly primary, OpenAI fallback when a key is set
    let primary: Arc<dyn SpeechRepository> = Arc::new(PollySpeechRepository::new(polly_client));
    let fallback: Option<Arc<dyn SpeechRepository>> = match &config.openai_api_key {
        Some(api_key) => {
            let openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
            let client = Arc::new(async_openai::Client::with_config(openai_config));
            tracing::info!(
                model = %config.openai_tts_model,
                "OpenAI fallback provider enabled"
            );
            Some(Arc::new(OpenAiSpeechRepository::new(
                client,
                config.openai_tts_model.clone(),
                config.openai_tts_voice.clone(),
            )))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY not set, no fallback speech provider");
            None
        }
    };

    let orchestrator = Arc::new(SynthesisOrchestrator::new(
        primary,
        fallback,
        SynthesisConfig {
            retry: RetryPolicy {
                max_attempts: config.tts_max_attempts,
                backoff: Duration::from_secs(1),
            },
            min_run_bytes: config.tts_min_run_bytes,
            concurrency: config.synthesis_concurrency,
        },
    ));

    // 3. Extraction chain with optical recognition
    let extractor = Arc::new(Extractor::new(Some(Arc::new(PdfiumTesseractOcr))));

    // 4. Services and controllers
    let audio_service = Arc::new(AudioService::new(
        catalog,
        store,
        manifests,
        orchestrator,
        extractor,
        GenerationSettings {
            source_bucket: config.source_bucket.clone(),
            audio_bucket: config.audio_bucket.clone(),
            planner: PlannerParams {
                words_per_second: config.tts_words_per_second,
                target_seconds: config.tts_target_chunk_seconds,
                ..PlannerParams::default()
            },
            extraction: ExtractionPolicy {
                ocr_word_threshold: config.ocr_word_threshold,
                ocr_max_pages: config.ocr_max_pages,
                force_ocr: config.force_ocr,
                ..ExtractionPolicy::default()
            },
        },
    ));
    let audio_controller = Arc::new(AudioController::new(
        audio_service,
        Duration::from_secs(config.generation_timeout_secs),
    ));

    // Start HTTP server with all routes
    start_http_server(pool, config, audio_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "bookcast_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "bookcast_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
