//! Speech-to-text transcription via the OpenAI Whisper API

use crate::audio::{UtteranceSegment, samples_to_wav};
use crate::{Error, Result};

/// Response from the Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes finished utterance segments to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: Option<String>,
    sample_rate: u32,
}

impl SpeechToText {
    /// Create a new transcriber.
    ///
    /// `language` is an ISO-639-1 hint passed to the model (e.g. "fr").
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing.
    pub fn new(
        api_key: String,
        model: String,
        language: Option<String>,
        sample_rate: u32,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::InvalidConfig(
                "OpenAI API key required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            language,
            sample_rate,
        })
    }

    /// Transcribe an utterance segment.
    ///
    /// Returns `None` when the model recognized no speech (empty transcript).
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding or the API call fails.
    pub async fn transcribe(&self, segment: &UtteranceSegment) -> Result<Option<String>> {
        let wav = samples_to_wav(segment.samples(), self.sample_rate)?;
        tracing::debug!(
            audio_bytes = wav.len(),
            duration_ms = segment.duration().as_millis(),
            "starting transcription"
        );

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        let text = result.text.trim().to_string();
        if text.is_empty() {
            tracing::debug!("no speech recognized");
            return Ok(None);
        }

        tracing::info!(transcript = %text, "transcription complete");
        Ok(Some(text))
    }
}
