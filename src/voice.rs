//! ElevenLabs voice gateway (text-to-speech / speech-to-text)
//!
//! Both directions fail soft: a missing credential or a non-success
//! status yields no audio (TTS) or an empty transcript (STT), never an
//! error past this boundary.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

pub const DEFAULT_VOICE_ID: &str = "tnSpp4vdxKPjI9w0GnoV";

const TTS_MODEL_ID: &str = "eleven_multilingual_v2";
const TTS_OUTPUT_FORMAT: &str = "mp3_44100_128";
const STT_MODEL_ID: &str = "scribe_v1";

/// Seam for the voice provider; mockable in tests.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Render text as audio bytes. `None` on any failure.
    async fn text_to_speech(&self, api_key: &str, voice_id: &str, text: &str) -> Option<Vec<u8>>;

    /// Transcribe audio bytes. Empty string on any failure.
    async fn speech_to_text(&self, api_key: &str, audio: Vec<u8>) -> String;
}

pub struct ElevenLabsClient {
    client: Client,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Honors `ELEVENLABS_BASE_URL` for endpoint overrides.
    pub fn from_env() -> Self {
        match std::env::var("ELEVENLABS_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url),
            _ => Self::new(),
        }
    }
}

impl Default for ElevenLabsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceGateway for ElevenLabsClient {
    async fn text_to_speech(&self, api_key: &str, voice_id: &str, text: &str) -> Option<Vec<u8>> {
        if api_key.is_empty() {
            warn!("ELEVENLABS_API_KEY not provided; skipping text-to-speech");
            return None;
        }

        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);
        let payload = json!({
            "text": text,
            "model_id": TTS_MODEL_ID,
            "output_format": TTS_OUTPUT_FORMAT,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.7
            }
        });

        let response = match self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Text-to-speech request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                "Text-to-speech returned non-success status"
            );
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => {
                info!("Text-to-speech produced {} bytes", bytes.len());
                Some(bytes.to_vec())
            }
            Err(e) => {
                warn!("Failed to read text-to-speech body: {}", e);
                None
            }
        }
    }

    async fn speech_to_text(&self, api_key: &str, audio: Vec<u8>) -> String {
        if api_key.is_empty() {
            warn!("ELEVENLABS_API_KEY not provided; skipping speech-to-text");
            return String::new();
        }

        let part = match Part::bytes(audio)
            .file_name("voice_query.wav")
            .mime_str("audio/wav")
        {
            Ok(part) => part,
            Err(e) => {
                warn!("Failed to build audio upload part: {}", e);
                return String::new();
            }
        };

        let form = Form::new().text("model_id", STT_MODEL_ID).part("file", part);

        let url = format!("{}/v1/speech-to-text", self.base_url);
        let response = match self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Speech-to-text request failed: {}", e);
                return String::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                status = %response.status(),
                "Speech-to-text returned non-success status"
            );
            return String::new();
        }

        match response.json::<Value>().await {
            Ok(body) => body
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Err(e) => {
                warn!("Failed to parse speech-to-text body: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tts_without_credential_yields_no_audio() {
        let client = ElevenLabsClient::new();
        let audio = client
            .text_to_speech("", DEFAULT_VOICE_ID, "hello")
            .await;
        assert!(audio.is_none());
    }

    #[tokio::test]
    async fn test_stt_without_credential_yields_empty_transcript() {
        let client = ElevenLabsClient::new();
        let transcript = client.speech_to_text("", vec![0u8; 16]).await;
        assert!(transcript.is_empty());
    }
}
