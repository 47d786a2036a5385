// Remote whisper-compatible HTTP backend
//
// Local files are reduced to 16 kHz mono audio through the transcoder
// before upload; remote URLs are handed to the backend as-is.

use reqwest::multipart;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use async_trait::async_trait;

use super::{Source, Transcriber, Transcript, TranscriptSegment};
use crate::config::TranscriberConfig;
use crate::error::{Result, VietsubError};
use crate::media::Transcoder;

/// Segment as returned by the inference backend (verbose_json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Response payload of the inference backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTranscriptionResponse {
    pub language: Option<String>,
    pub segments: Vec<RemoteSegment>,
}

/// HTTP-backed transcriber
pub struct RemoteTranscriber {
    config: TranscriberConfig,
    transcoder: Arc<dyn Transcoder>,
    client: Client,
}

impl RemoteTranscriber {
    pub fn new(config: TranscriberConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("HTTP client creation should not fail");

        Self {
            config,
            transcoder,
            client,
        }
    }

    fn endpoint_url(&self) -> String {
        let endpoint = self.config.endpoint.clone().unwrap_or_default();
        format!(
            "{}/v1/audio/transcriptions",
            endpoint.trim_end_matches('/')
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn to_transcript(&self, payload: RemoteTranscriptionResponse) -> Transcript {
        let language = payload
            .language
            .unwrap_or_else(|| self.config.language.clone());

        let segments = payload
            .segments
            .into_iter()
            .map(|seg| TranscriptSegment {
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
            })
            .collect();

        Transcript::new(language, segments)
    }

    async fn parse_response(&self, response: reqwest::Response) -> Result<Transcript> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VietsubError::Transcription(format!(
                "Backend error {}: {}",
                status, error_text
            )));
        }

        let payload: RemoteTranscriptionResponse = response
            .json()
            .await
            .map_err(|e| VietsubError::Transcription(format!("Failed to parse response: {}", e)))?;

        if payload.segments.is_empty() {
            return Err(VietsubError::Transcription(
                "Backend returned no segments".to_string(),
            ));
        }

        Ok(self.to_transcript(payload))
    }

    /// Upload extracted audio from a local video file
    async fn transcribe_file(&self, video_path: &Path) -> Result<Transcript> {
        let scratch = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .map_err(VietsubError::Io)?;

        self.transcoder
            .extract_audio(video_path, scratch.path())
            .await?;

        let audio = tokio::fs::read(scratch.path()).await?;

        let part = multipart::Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VietsubError::Transcription(format!("Invalid upload part: {}", e)))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone())
            .text("response_format", "verbose_json");

        let url = self.endpoint_url();
        debug!("Sending transcription upload to: {}", url);

        let response = self
            .authorized(self.client.post(&url).multipart(form))
            .send()
            .await
            .map_err(|e| VietsubError::Transcription(format!("HTTP request failed: {}", e)))?;

        self.parse_response(response).await
    }

    /// Hand a remote URL to the backend without downloading it here
    async fn transcribe_url(&self, video_url: &str) -> Result<Transcript> {
        let request = json!({
            "url": video_url,
            "model": self.config.model,
            "language": self.config.language,
            "response_format": "verbose_json",
        });

        let url = self.endpoint_url();
        debug!("Sending transcription request to: {}", url);

        let response = self
            .authorized(self.client.post(&url).json(&request))
            .send()
            .await
            .map_err(|e| VietsubError::Transcription(format!("HTTP request failed: {}", e)))?;

        self.parse_response(response).await
    }
}

#[async_trait]
impl Transcriber for RemoteTranscriber {
    async fn transcribe(&self, source: &Source) -> Result<Transcript> {
        info!("Transcribing {}", source.describe());

        match source {
            Source::File(path) => self.transcribe_file(path).await,
            Source::Url(url) => self.transcribe_url(url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcriber() -> RemoteTranscriber {
        let config = TranscriberConfig {
            endpoint: Some("http://localhost:9000/".to_string()),
            ..TranscriberConfig::default()
        };
        let transcoder =
            crate::media::TranscoderFactory::create(crate::config::TranscoderConfig::default());
        RemoteTranscriber::new(config, transcoder)
    }

    #[test]
    fn test_endpoint_url_normalizes_trailing_slash() {
        assert_eq!(
            transcriber().endpoint_url(),
            "http://localhost:9000/v1/audio/transcriptions"
        );
    }

    #[test]
    fn test_response_mapping_trims_text_and_sorts() {
        let payload = RemoteTranscriptionResponse {
            language: None,
            segments: vec![
                RemoteSegment {
                    start: 4.0,
                    end: 6.0,
                    text: " sau ".to_string(),
                },
                RemoteSegment {
                    start: 0.0,
                    end: 2.0,
                    text: " trước ".to_string(),
                },
            ],
        };

        let transcript = transcriber().to_transcript(payload);
        assert_eq!(transcript.language, "vi");
        assert_eq!(transcript.segments[0].text, "trước");
        assert_eq!(transcript.segments[1].text, "sau");
    }
}
