use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tracing::info;

use super::{MediaCommandBuilder, Transcoder};
use crate::config::TranscoderConfig;
use crate::error::{Result, VietsubError};

/// ffmpeg-backed transcoder implementation
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegTranscoder {
    pub fn new(config: TranscoderConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn burn_in(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Burning subtitles from {} into {} -> {}",
            subtitle_path.display(),
            video_path.display(),
            output_path.display()
        );

        let command = self.command_builder.burn_in_subtitles(
            video_path,
            subtitle_path,
            output_path,
            &self.config.encode_options,
        );

        command.execute_with_timeout(self.deadline()).await?;

        info!("Subtitle burn-in completed successfully");
        Ok(())
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!(
            "Extracting audio from {} to {}",
            video_path.display(),
            audio_path.display()
        );

        let command = self.command_builder.extract_audio(video_path, audio_path);
        command.execute_with_timeout(self.deadline()).await?;

        info!("Audio extraction completed");
        Ok(())
    }

    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| VietsubError::Transcode(format!("Transcoder not found: {}", e)))?;

        if output.status.success() {
            info!("Transcoder is available");
            Ok(())
        } else {
            Err(VietsubError::Transcode(
                "Transcoder version check failed".to_string(),
            ))
        }
    }
}
