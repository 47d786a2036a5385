use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Vtt,
    Srt,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Srt => "srt",
        }
    }
}

/// A video associated with a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub task_id: i64,
    /// Local file path when the video was uploaded
    pub local_path: Option<PathBuf>,
    /// Remote URL when the video lives elsewhere
    pub remote_url: Option<String>,
    /// Canonical source for subtitle and export operations
    pub is_primary: bool,
}

/// Persisted subtitle artifact metadata
///
/// A video may accumulate multiple tracks across languages and
/// re-generations; deduplication is a caller policy, not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub video_id: i64,
    pub language_code: String,
    /// Storage-root-relative path; the file must exist before the record
    /// is created (write-then-record)
    pub storage_path: String,
    pub format: SubtitleFormat,
    pub is_auto_generated: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository seam for video and subtitle track persistence
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// All videos associated with a task, in insertion order
    async fn videos_for_task(&self, task_id: i64) -> Result<Vec<VideoRecord>>;

    /// Record a subtitle track artifact
    async fn add_subtitle_track(&self, track: SubtitleTrack) -> Result<()>;

    /// All subtitle tracks recorded for a video
    async fn subtitle_tracks(&self, video_id: i64) -> Result<Vec<SubtitleTrack>>;
}

/// In-memory store used by the CLI and tests
#[derive(Default)]
pub struct MemoryStore {
    videos: RwLock<Vec<VideoRecord>>,
    tracks: RwLock<Vec<SubtitleTrack>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_video(&self, video: VideoRecord) {
        self.videos.write().await.push(video);
    }
}

#[async_trait]
impl TrackStore for MemoryStore {
    async fn videos_for_task(&self, task_id: i64) -> Result<Vec<VideoRecord>> {
        let videos = self.videos.read().await;
        Ok(videos
            .iter()
            .filter(|v| v.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn add_subtitle_track(&self, track: SubtitleTrack) -> Result<()> {
        self.tracks.write().await.push(track);
        Ok(())
    }

    async fn subtitle_tracks(&self, video_id: i64) -> Result<Vec<SubtitleTrack>> {
        let tracks = self.tracks.read().await;
        Ok(tracks
            .iter()
            .filter(|t| t.video_id == video_id)
            .cloned()
            .collect())
    }
}
