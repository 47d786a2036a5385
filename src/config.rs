use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VietsubError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub storage: StorageConfig,
    pub queue: QueueConfig,
    pub transcoder: TranscoderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Inference endpoint URL. When unset, the deterministic offline
    /// backend is used instead of a remote service.
    pub endpoint: Option<String>,
    /// Bearer token for the inference endpoint
    pub api_key: Option<String>,
    /// Model name passed to the backend
    pub model: String,
    /// Subtitle language code
    pub language: String,
    /// Request timeout for backend calls, in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory all artifact paths are relative to
    pub root: PathBuf,
    /// Subtitle artifact directory under the root
    pub subtitle_dir: String,
    /// Export artifact directory under the root
    pub export_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Total attempts per job before it is dropped (initial + retries)
    pub max_attempts: u32,
    /// Pause between jobs, in milliseconds
    pub pause_ms: u64,
    /// Wall-clock deadline for a single generation run, in seconds
    pub job_timeout_secs: u64,
    /// Capacity of the completion event channel
    pub event_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    /// - preset: encoding speed (ultrafast, fast, medium, slow, veryslow)
    /// - crf: quality (0-51, lower = better quality, 23 is default)
    /// - pix_fmt: pixel format for compatibility
    pub encode_options: Vec<String>,
    /// Wall-clock deadline for a transcoder run, in seconds
    pub timeout_secs: u64,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: "whisper-1".to_string(),
            language: "vi".to_string(),
            timeout_secs: 600,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            subtitle_dir: "subtitles".to_string(),
            export_dir: "exports".to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pause_ms: 500,
            job_timeout_secs: 600,
            event_capacity: 64,
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            encode_options: vec![],
            timeout_secs: 1800,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VietsubError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| VietsubError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VietsubError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| VietsubError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.transcriber.language, "vi");
        assert_eq!(parsed.queue.max_attempts, 3);
        assert_eq!(parsed.storage.subtitle_dir, "subtitles");
        assert_eq!(parsed.transcoder.binary_path, "ffmpeg");
    }

    #[test]
    fn test_offline_backend_selected_when_unconfigured() {
        let config = TranscriberConfig::default();
        assert!(config.endpoint.is_none());
    }
}
