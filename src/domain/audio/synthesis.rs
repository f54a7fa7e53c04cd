use crate::infrastructure::repositories::{SpeechError, SpeechRepository};
use std::sync::Arc;
use std::time::Duration;

/// Retry behavior against a single provider. Backoff grows linearly with
/// the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub retry: RetryPolicy,
    /// Floor for a whole run's audio size; individual chunks get a
    /// duration-proportional share via [`SynthesisOrchestrator::chunk_floor_bytes`].
    pub min_run_bytes: usize,
    /// How many chunks may synthesize at once.
    pub concurrency: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            min_run_bytes: 50_000,
            concurrency: 1,
        }
    }
}

/// Drives per-chunk synthesis: retries transient failures against the
/// primary provider, then gives the fallback provider the same retry
/// budget. A fatal provider error skips straight to the fallback.
pub struct SynthesisOrchestrator {
    primary: Arc<dyn SpeechRepository>,
    fallback: Option<Arc<dyn SpeechRepository>>,
    config: SynthesisConfig,
}

impl SynthesisOrchestrator {
    pub fn new(
        primary: Arc<dyn SpeechRepository>,
        fallback: Option<Arc<dyn SpeechRepository>>,
        config: SynthesisConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            config,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// Minimum plausible audio size for one chunk: the run floor scaled by
    /// the chunk's share of the estimated total duration, never below 1 KiB.
    pub fn chunk_floor_bytes(&self, chunk_seconds: f64, total_seconds: f64) -> usize {
        if total_seconds <= 0.0 {
            return 1024;
        }
        let share = self.config.min_run_bytes as f64 * (chunk_seconds / total_seconds);
        (share as usize).max(1024)
    }

    /// Synthesize one chunk, exhausting the primary provider before the
    /// fallback. Returns the final failure reason when both are exhausted.
    pub async fn synthesize_chunk(
        &self,
        text: &str,
        voice_short_name: &str,
        min_bytes: usize,
    ) -> Result<Vec<u8>, String> {
        let primary_reason = match self
            .attempt_provider(&self.primary, text, voice_short_name, min_bytes)
            .await
        {
            Ok(audio) => return Ok(audio),
            Err(reason) => reason,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_reason);
        };

        tracing::warn!(
            primary = self.primary.provider_name(),
            fallback = fallback.provider_name(),
            reason = %primary_reason,
            "Primary provider exhausted, trying fallback"
        );

        self.attempt_provider(fallback, text, voice_short_name, min_bytes)
            .await
            .map_err(|fallback_reason| {
                format!("primary: {primary_reason}; fallback: {fallback_reason}")
            })
    }

    async fn attempt_provider(
        &self,
        provider: &Arc<dyn SpeechRepository>,
        text: &str,
        voice_short_name: &str,
        min_bytes: usize,
    ) -> Result<Vec<u8>, String> {
        let mut last_reason = String::new();

        for attempt in 1..=self.config.retry.max_attempts {
            match provider.synthesize(text, voice_short_name).await {
                Ok(audio) if audio.len() >= min_bytes => return Ok(audio),
                // Suspiciously small output usually means a truncated
                // stream, worth the same retry as a transport failure.
                Ok(audio) => {
                    last_reason = format!(
                        "{} returned {} bytes, expected at least {}",
                        provider.provider_name(),
                        audio.len(),
                        min_bytes
                    );
                    tracing::warn!(
                        provider = provider.provider_name(),
                        attempt,
                        audio_size = audio.len(),
                        min_bytes,
                        "Audio shorter than plausible, retrying"
                    );
                }
                Err(SpeechError::Fatal(reason)) => {
                    tracing::error!(
                        provider = provider.provider_name(),
                        attempt,
                        reason = %reason,
                        "Fatal provider error"
                    );
                    return Err(reason);
                }
                Err(SpeechError::Transient(reason)) => {
                    last_reason = reason;
                    tracing::warn!(
                        provider = provider.provider_name(),
                        attempt,
                        reason = %last_reason,
                        "Transient provider error"
                    );
                }
            }

            if attempt < self.config.retry.max_attempts {
                tokio::time::sleep(self.config.retry.backoff * attempt).await;
            }
        }

        Err(last_reason)
    }
}
