// Deterministic offline stand-in
//
// Used when no inference endpoint is configured, so an unconfigured
// install still produces well-formed subtitle artifacts end to end.

use async_trait::async_trait;
use tracing::warn;

use super::{Source, Transcriber, Transcript, TranscriptSegment};
use crate::config::TranscriberConfig;
use crate::error::Result;

/// Fallback transcriber yielding fixed placeholder segments
pub struct OfflineTranscriber {
    config: TranscriberConfig,
}

impl OfflineTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transcriber for OfflineTranscriber {
    async fn transcribe(&self, source: &Source) -> Result<Transcript> {
        warn!(
            "Transcription backend not configured, using offline placeholder for {}",
            source.describe()
        );

        let segments = vec![
            TranscriptSegment {
                start: 0.0,
                end: 2.8,
                text: format!("Phụ đề tự động cho {}", source.label()),
            },
            TranscriptSegment {
                start: 2.8,
                end: 5.6,
                text: "Dịch vụ nhận dạng giọng nói chưa được cấu hình.".to_string(),
            },
            TranscriptSegment {
                start: 5.6,
                end: 8.4,
                text: "Phụ đề sẽ được tạo lại khi backend sẵn sàng.".to_string(),
            },
        ];

        Ok(Transcript::new(self.config.language.clone(), segments))
    }
}
