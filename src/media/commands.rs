use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VietsubError};

/// Escape a path for use inside an ffmpeg filter expression.
///
/// The filter grammar treats backslash, quote and colon as separators,
/// so Windows drive letters and quoted paths must be escaped.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Abstract transcoder command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new transcoder command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy audio stream without re-encoding
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    /// Set audio sample rate
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    /// Set audio channels
    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Execute the command, waiting for process exit
    pub async fn execute(&self) -> Result<()> {
        debug!(
            "Executing transcoder command: {} {:?}",
            self.binary_path, self.args
        );
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);
        // Reap the child if this future is dropped on timeout
        cmd.kill_on_drop(true);

        let output = cmd.output().await.map_err(|e| {
            VietsubError::Transcode(format!("Failed to execute transcoder: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VietsubError::Transcode(format!(
                "{} failed: {}",
                self.description, stderr
            )));
        }

        Ok(())
    }

    /// Execute with a wall-clock deadline; the child is killed on overrun
    pub async fn execute_with_timeout(&self, deadline: Duration) -> Result<()> {
        match tokio::time::timeout(deadline, self.execute()).await {
            Ok(result) => result,
            Err(_) => Err(VietsubError::Timeout(format!(
                "{} exceeded {}s deadline",
                self.description,
                deadline.as_secs()
            ))),
        }
    }
}

/// Builder for common transcoder operations
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build subtitle burn-in command
    pub fn burn_in_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        encode_options: &[String],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Subtitle burn-in")
            .overwrite()
            .input(&video_path)
            .video_filter(format!(
                "subtitles='{}'",
                escape_filter_path(subtitle_path.as_ref())
            ))
            .video_codec("libx264")
            .copy_audio();

        for option in encode_options {
            cmd = cmd.arg(option);
        }

        cmd.output(output_path)
    }

    /// Build audio extraction command (16 kHz mono PCM, the format
    /// transcription backends expect)
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("/tmp/task_1_vi.srt")),
            "/tmp/task_1_vi.srt"
        );
        assert_eq!(
            escape_filter_path(Path::new("C:\\subs\\it's.srt")),
            "C\\:\\\\subs\\\\it\\'s.srt"
        );
    }

    #[test]
    fn test_burn_in_command_args() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.burn_in_subtitles(
            PathBuf::from("/videos/in.mp4"),
            PathBuf::from("/subs/task_1_vi.srt"),
            PathBuf::from("/exports/task_1_vi.mp4"),
            &["-preset".to_string(), "fast".to_string()],
        );

        let args = cmd.args.join(" ");
        assert!(args.starts_with("-y -i /videos/in.mp4"));
        assert!(args.contains("-vf subtitles='/subs/task_1_vi.srt'"));
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-c:a copy"));
        assert!(args.contains("-preset fast"));
        assert!(args.ends_with("/exports/task_1_vi.mp4"));
    }

    #[test]
    fn test_extract_audio_command_args() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.extract_audio(PathBuf::from("in.mp4"), PathBuf::from("out.wav"));

        let args = cmd.args.join(" ");
        assert!(args.contains("-vn"));
        assert!(args.contains("-c:a pcm_s16le"));
        assert!(args.contains("-ar 16000"));
        assert!(args.contains("-ac 1"));
    }
}
