use super::speech_repository::{split_for_limit, SpeechError, SpeechRepository};
use async_trait::async_trait;
use aws_sdk_polly::{
    error::{ProvideErrorMetadata, SdkError},
    operation::synthesize_speech::SynthesizeSpeechError,
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// AWS Polly has a limit of 3000 characters per request
const MAX_RUN_CHARS: usize = 3000;

/// AWS Polly implementation of the speech provider. Chunks longer than the
/// per-request character limit are synthesized as consecutive runs and the
/// MP3 frames concatenated in order.
pub struct PollySpeechRepository {
    polly_client: Arc<PollyClient>,
}

impl PollySpeechRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    async fn call_polly(&self, text: &str, voice_short_name: &str) -> Result<Vec<u8>, SpeechError> {
        let voice_id = VoiceId::from(voice_short_name);

        tracing::debug!(
            voice = voice_short_name,
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Mp3)
            .engine(Engine::Neural)
            .send()
            .await
            .map_err(classify)?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            SpeechError::Transient(format!("failed to read Polly audio stream: {e}"))
        })?;

        Ok(audio_stream.into_bytes().to_vec())
    }
}

fn classify<R: std::fmt::Debug>(err: SdkError<SynthesizeSpeechError, R>) -> SpeechError {
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            SpeechError::Transient(format!("AWS Polly transport failure: {err:?}"))
        }
        SdkError::ServiceError(ctx) => {
            let service_err = ctx.err();
            // Throttling arrives unmodeled, identified only by its code.
            if service_err.is_service_failure_exception()
                || service_err.code() == Some("ThrottlingException")
            {
                SpeechError::Transient(format!("AWS Polly service failure: {service_err}"))
            } else {
                SpeechError::Fatal(format!("AWS Polly rejected the request: {service_err}"))
            }
        }
        _ => SpeechError::Fatal(format!("AWS Polly request could not be sent: {err:?}")),
    }
}

#[async_trait]
impl SpeechRepository for PollySpeechRepository {
    fn provider_name(&self) -> &'static str {
        "polly"
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_short_name: &str,
    ) -> Result<Vec<u8>, SpeechError> {
        let start_time = std::time::Instant::now();

        let runs = split_for_limit(text, MAX_RUN_CHARS);
        let mut merged_audio = Vec::new();
        for (index, run) in runs.iter().enumerate() {
            let audio_data = self.call_polly(run, voice_short_name).await?;
            tracing::debug!(
                run_index = index,
                run_chars = run.len(),
                audio_size = audio_data.len(),
                "Run synthesized"
            );
            merged_audio.extend(audio_data);
        }

        tracing::info!(
            provider = "polly",
            voice = voice_short_name,
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.len(),
            run_count = runs.len(),
            audio_size_bytes = merged_audio.len(),
            "Speech synthesis completed"
        );

        Ok(merged_audio)
    }
}
