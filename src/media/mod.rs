// Transcoder invocation layer
//
// Wraps the external ffmpeg process behind a trait so the pipeline and
// tests can swap implementations:
// - Commands: argument builders over the transcoder binary
// - Processor: ffmpeg-backed implementation

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;

use crate::config::TranscoderConfig;
use crate::error::Result;

/// Main trait for transcoder operations
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Burn a subtitle file into the video stream, copying audio
    async fn burn_in(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()>;

    /// Extract audio from video for transcription
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Check if the transcoder binary is available
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating transcoder instances
pub struct TranscoderFactory;

impl TranscoderFactory {
    /// Create the default transcoder implementation (ffmpeg-based)
    pub fn create(config: TranscoderConfig) -> Arc<dyn Transcoder> {
        Arc::new(processor::FfmpegTranscoder::new(config))
    }
}
