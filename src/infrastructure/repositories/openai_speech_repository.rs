use super::speech_repository::{split_for_limit, SpeechError, SpeechRepository};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI has a limit of 4096 characters per request
const MAX_RUN_CHARS: usize = 4096;

/// OpenAI speech implementation, used as the fallback provider. The catalog
/// stores provider-native voice identifiers for the primary provider, so the
/// fallback maps them onto a fixed OpenAI voice.
pub struct OpenAiSpeechRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    voice: String,
}

impl OpenAiSpeechRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String, voice: String) -> Self {
        Self {
            client,
            model,
            voice,
        }
    }

    async fn call_openai(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let model = match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        };

        let voice = match self.voice.to_lowercase().as_str() {
            "alloy" => Voice::Alloy,
            "echo" => Voice::Echo,
            "fable" => Voice::Fable,
            "onyx" => Voice::Onyx,
            "nova" => Voice::Nova,
            "shimmer" => Voice::Shimmer,
            _ => Voice::Alloy,
        };

        tracing::debug!(
            model = %self.model,
            voice = %self.voice,
            text_length = text.len(),
            "Calling OpenAI speech API"
        );

        let request = CreateSpeechRequest {
            model,
            input: text.to_string(),
            voice,
            response_format: Some(SpeechResponseFormat::Mp3),
            speed: None,
        };

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(classify)?;

        Ok(response.bytes.to_vec())
    }
}

fn classify(err: OpenAIError) -> SpeechError {
    match &err {
        OpenAIError::Reqwest(_) => {
            SpeechError::Transient(format!("OpenAI transport failure: {err}"))
        }
        _ => SpeechError::Fatal(format!("OpenAI speech error: {err}")),
    }
}

#[async_trait]
impl SpeechRepository for OpenAiSpeechRepository {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(
        &self,
        text: &str,
        _voice_short_name: &str,
    ) -> Result<Vec<u8>, SpeechError> {
        let start_time = std::time::Instant::now();

        let runs = split_for_limit(text, MAX_RUN_CHARS);
        let mut merged_audio = Vec::new();
        for (index, run) in runs.iter().enumerate() {
            let audio_data = self.call_openai(run).await?;
            tracing::debug!(
                run_index = index,
                run_chars = run.len(),
                audio_size = audio_data.len(),
                "Run synthesized"
            );
            merged_audio.extend(audio_data);
        }

        tracing::info!(
            provider = "openai",
            model = %self.model,
            voice = %self.voice,
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.len(),
            run_count = runs.len(),
            audio_size_bytes = merged_audio.len(),
            "Speech synthesis completed"
        );

        Ok(merged_audio)
    }
}
