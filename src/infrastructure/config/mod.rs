use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    // Blob storage
    pub storage_url: String,
    pub storage_service_key: String,
    pub source_bucket: String,
    pub audio_bucket: String,
    // Speech providers
    pub aws_region: String,
    pub openai_api_key: Option<String>,
    pub openai_tts_model: String,
    pub openai_tts_voice: String,
    // Synthesis tuning
    pub tts_words_per_second: f64,
    pub tts_target_chunk_seconds: f64,
    pub tts_max_attempts: u32,
    pub tts_min_run_bytes: usize,
    pub synthesis_concurrency: usize,
    // Extraction
    pub ocr_word_threshold: usize,
    pub ocr_max_pages: usize,
    pub force_ocr: bool,
    // Request handling
    pub generation_timeout_secs: u64,
    pub manifest_cache_enabled: bool,
    pub environment: Environment,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            storage_url: env::var("STORAGE_URL")?,
            storage_service_key: env::var("STORAGE_SERVICE_KEY")?,
            source_bucket: env::var("SOURCE_BUCKET").unwrap_or_else(|_| "book-files".to_string()),
            audio_bucket: env::var("AUDIO_BUCKET").unwrap_or_else(|_| "book-audio".to_string()),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_tts_model: env::var("OPENAI_TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string()),
            openai_tts_voice: env::var("OPENAI_TTS_VOICE").unwrap_or_else(|_| "alloy".to_string()),
            tts_words_per_second: env::var("TTS_WORDS_PER_SECOND")
                .unwrap_or_else(|_| "2.7".to_string())
                .parse()?,
            tts_target_chunk_seconds: env::var("TTS_TARGET_CHUNK_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            tts_max_attempts: env::var("TTS_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            tts_min_run_bytes: env::var("TTS_MIN_RUN_BYTES")
                .unwrap_or_else(|_| "50000".to_string())
                .parse()?,
            synthesis_concurrency: env::var("SYNTHESIS_CONCURRENCY")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
            ocr_word_threshold: env::var("OCR_WORD_THRESHOLD")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
            ocr_max_pages: env::var("OCR_MAX_PAGES")
                .unwrap_or_else(|_| "40".to_string())
                .parse()?,
            force_ocr: env::var("FORCE_OCR")
                .unwrap_or_else(|_| "false".to_string())
                .parse::<String>()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            generation_timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()?,
            manifest_cache_enabled: env::var("MANIFEST_CACHE_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse::<String>()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(true),
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
