// Subtitle generation and export orchestration
//
// Composes the store, the transcription backend and the transcoder for a
// task's primary video. Generation is invoked by the job queue through
// the SubtitleGenerator seam; export is an on-demand synchronous path.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::info;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, VietsubError};
use crate::media::{Transcoder, TranscoderFactory};
use crate::store::{SubtitleFormat, SubtitleTrack, TrackStore, VideoRecord};
use crate::subtitle::{write_srt, write_vtt};
use crate::transcribe::{Source, Transcriber, TranscriberFactory};

/// Storage-root-relative paths of a completed generation run
#[derive(Debug, Clone)]
pub struct GeneratedTracks {
    pub vtt_path: PathBuf,
    pub srt_path: PathBuf,
}

/// Seam between the job queue and the generation pipeline
#[async_trait]
pub trait SubtitleGenerator: Send + Sync {
    async fn generate(&self, task_id: i64) -> Result<GeneratedTracks>;
}

pub struct SubtitlePipeline {
    config: Config,
    store: Arc<dyn TrackStore>,
    transcriber: Box<dyn Transcriber>,
    transcoder: Arc<dyn Transcoder>,
}

impl SubtitlePipeline {
    pub fn new(config: Config, store: Arc<dyn TrackStore>) -> Self {
        let transcoder = TranscoderFactory::create(config.transcoder.clone());
        let transcriber = TranscriberFactory::create(config.transcriber.clone(), transcoder.clone());

        Self {
            config,
            store,
            transcriber,
            transcoder,
        }
    }

    /// Construct from explicit collaborators
    pub fn with_parts(
        config: Config,
        store: Arc<dyn TrackStore>,
        transcriber: Box<dyn Transcriber>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            config,
            store,
            transcriber,
            transcoder,
        }
    }

    /// Produce subtitle artifacts for the task's primary video.
    ///
    /// Re-invocation appends a new track record and overwrites same-date
    /// files; callers wanting single-track-per-language semantics must
    /// check `TrackStore::subtitle_tracks` before invoking.
    pub async fn generate_for_task(&self, task_id: i64) -> Result<GeneratedTracks> {
        info!("Generating subtitles for task {}", task_id);

        let video = self.primary_video(task_id).await?;
        let source = resolve_source(&video)?;

        let transcript = self.transcriber.transcribe(&source).await?;
        info!(
            "Transcription returned {} segments ({})",
            transcript.segments.len(),
            transcript.language
        );

        let vtt_rel = self.dated_rel_path(&self.config.storage.subtitle_dir, task_id, "vtt");
        let srt_rel = self.dated_rel_path(&self.config.storage.subtitle_dir, task_id, "srt");
        let vtt_abs = self.absolute(&vtt_rel);
        let srt_abs = self.absolute(&srt_rel);

        if let Some(parent) = vtt_abs.parent() {
            fs::create_dir_all(parent).await?;
        }
        write_vtt(&transcript, &vtt_abs).await?;
        write_srt(&transcript, &srt_abs).await?;

        // Files are on disk before the track record is created
        self.store
            .add_subtitle_track(SubtitleTrack {
                video_id: video.id,
                language_code: self.config.transcriber.language.clone(),
                storage_path: vtt_rel.to_string_lossy().to_string(),
                format: SubtitleFormat::Vtt,
                is_auto_generated: true,
                created_at: Utc::now(),
            })
            .await?;

        info!("Subtitle generation for task {} completed", task_id);
        Ok(GeneratedTracks {
            vtt_path: vtt_rel,
            srt_path: srt_rel,
        })
    }

    /// Burn subtitles into the task's primary video, producing a new
    /// dated export file. Subtitles are generated just-in-time when
    /// today's SRT artifact is missing.
    pub async fn export(&self, task_id: i64) -> Result<PathBuf> {
        // Probe first so callers can report "transcoder unavailable"
        // instead of a generic pipeline failure
        self.transcoder.check_availability()?;

        let video = self.primary_video(task_id).await?;
        let video_path = video
            .local_path
            .as_ref()
            .filter(|p| p.exists())
            .ok_or_else(|| {
                VietsubError::SourceNotFound(format!(
                    "Burn-in requires a local file for video {}",
                    video.id
                ))
            })?;

        let srt_rel = self.dated_rel_path(&self.config.storage.subtitle_dir, task_id, "srt");
        let srt_abs = self.absolute(&srt_rel);
        if !srt_abs.exists() {
            info!("No subtitle artifact for task {} today, generating", task_id);
            self.generate_for_task(task_id).await?;
        }

        let output_rel = self.dated_rel_path(&self.config.storage.export_dir, task_id, "mp4");
        let output_abs = self.absolute(&output_rel);
        if let Some(parent) = output_abs.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = self
            .transcoder
            .burn_in(video_path, &srt_abs, &output_abs)
            .await
        {
            // Never leave a partial export behind looking like a result
            if output_abs.exists() {
                let _ = fs::remove_file(&output_abs).await;
            }
            return Err(e);
        }

        info!(
            "Export for task {} completed: {}",
            task_id,
            output_rel.display()
        );
        Ok(output_rel)
    }

    /// Export artifacts on disk for a task, discovered by the
    /// `task_<id>_` filename convention
    pub fn list_exports(&self, task_id: i64) -> Vec<PathBuf> {
        let export_root = self
            .config
            .storage
            .root
            .join(&self.config.storage.export_dir);
        let prefix = format!("task_{}_", task_id);

        let mut found = Vec::new();
        for entry in WalkDir::new(&export_root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file()
                && entry.file_name().to_string_lossy().starts_with(&prefix)
            {
                let rel = pathdiff::diff_paths(entry.path(), &self.config.storage.root)
                    .unwrap_or_else(|| entry.path().to_path_buf());
                found.push(rel);
            }
        }
        found.sort();
        found
    }

    async fn primary_video(&self, task_id: i64) -> Result<VideoRecord> {
        let videos = self.store.videos_for_task(task_id).await?;
        if videos.is_empty() {
            return Err(VietsubError::NoVideo(task_id));
        }

        Ok(videos
            .iter()
            .find(|v| v.is_primary)
            .cloned()
            .unwrap_or_else(|| videos[0].clone()))
    }

    fn dated_rel_path(&self, dir: &str, task_id: i64, ext: &str) -> PathBuf {
        let today = Utc::now();
        PathBuf::from(dir)
            .join(format!("{:04}", today.year()))
            .join(format!("{:02}", today.month()))
            .join(format!("{:02}", today.day()))
            .join(format!(
                "task_{}_{}.{}",
                task_id, self.config.transcriber.language, ext
            ))
    }

    fn absolute(&self, rel: &Path) -> PathBuf {
        self.config.storage.root.join(rel)
    }
}

#[async_trait]
impl SubtitleGenerator for SubtitlePipeline {
    async fn generate(&self, task_id: i64) -> Result<GeneratedTracks> {
        self.generate_for_task(task_id).await
    }
}

/// Resolve a playable reference: an uploaded local file wins, a remote
/// URL is the fallback
fn resolve_source(video: &VideoRecord) -> Result<Source> {
    if let Some(path) = &video.local_path {
        if path.exists() {
            return Ok(Source::File(path.clone()));
        }
    }

    if let Some(url) = &video.remote_url {
        return Ok(Source::Url(url.clone()));
    }

    Err(VietsubError::SourceNotFound(format!(
        "Video {} has no playable source",
        video.id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::store::MemoryStore;
    use crate::transcribe::offline::OfflineTranscriber;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StubTranscoder {
        available: bool,
        fail_burn_in: bool,
        burn_in_calls: AtomicUsize,
    }

    impl StubTranscoder {
        fn new() -> Self {
            Self {
                available: true,
                fail_burn_in: false,
                burn_in_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail_burn_in: true,
                ..Self::new()
            }
        }

        fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Transcoder for StubTranscoder {
        async fn burn_in(
            &self,
            _video_path: &Path,
            _subtitle_path: &Path,
            output_path: &Path,
        ) -> Result<()> {
            self.burn_in_calls.fetch_add(1, Ordering::SeqCst);
            // A real transcoder writes output as it goes, so a failed run
            // can leave a partial file behind
            fs::write(output_path, b"mp4").await?;
            if self.fail_burn_in {
                Err(VietsubError::Transcode("simulated failure".to_string()))
            } else {
                Ok(())
            }
        }

        async fn extract_audio(&self, _video_path: &Path, audio_path: &Path) -> Result<()> {
            fs::write(audio_path, b"").await?;
            Ok(())
        }

        fn check_availability(&self) -> Result<()> {
            if self.available {
                Ok(())
            } else {
                Err(VietsubError::Transcode("unavailable".to_string()))
            }
        }
    }

    struct Fixture {
        pipeline: SubtitlePipeline,
        store: Arc<MemoryStore>,
        transcoder: Arc<StubTranscoder>,
        root: TempDir,
    }

    fn fixture(transcoder: StubTranscoder) -> Fixture {
        let root = TempDir::new().unwrap();
        let config = Config {
            storage: StorageConfig {
                root: root.path().to_path_buf(),
                ..StorageConfig::default()
            },
            ..Config::default()
        };

        let store = Arc::new(MemoryStore::new());
        let transcoder = Arc::new(transcoder);
        let transcriber = Box::new(OfflineTranscriber::new(config.transcriber.clone()));
        let pipeline = SubtitlePipeline::with_parts(
            config,
            store.clone(),
            transcriber,
            transcoder.clone(),
        );

        Fixture {
            pipeline,
            store,
            transcoder,
            root,
        }
    }

    async fn add_local_video(fx: &Fixture, id: i64, task_id: i64, is_primary: bool) -> PathBuf {
        let path = fx.root.path().join(format!("video_{}.mp4", id));
        fs::write(&path, b"source").await.unwrap();
        fx.store
            .add_video(VideoRecord {
                id,
                task_id,
                local_path: Some(path.clone()),
                remote_url: None,
                is_primary,
            })
            .await;
        path
    }

    #[tokio::test]
    async fn test_generate_offline_end_to_end() {
        let fx = fixture(StubTranscoder::new());
        add_local_video(&fx, 10, 1, true).await;

        let tracks = fx.pipeline.generate_for_task(1).await.unwrap();

        let vtt_abs = fx.root.path().join(&tracks.vtt_path);
        let srt_abs = fx.root.path().join(&tracks.srt_path);
        let vtt = fs::read_to_string(&vtt_abs).await.unwrap();
        let srt = fs::read_to_string(&srt_abs).await.unwrap();

        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains(" --> "));
        assert!(srt.starts_with("1\n"));
        assert!(tracks
            .vtt_path
            .to_string_lossy()
            .starts_with("subtitles/"));
        assert!(tracks.vtt_path.to_string_lossy().ends_with("task_1_vi.vtt"));
    }

    #[tokio::test]
    async fn test_generate_records_track_after_write() {
        let fx = fixture(StubTranscoder::new());
        add_local_video(&fx, 10, 1, true).await;

        fx.pipeline.generate_for_task(1).await.unwrap();

        let recorded = fx.store.subtitle_tracks(10).await.unwrap();
        assert_eq!(recorded.len(), 1);
        let track = &recorded[0];
        assert_eq!(track.language_code, "vi");
        assert_eq!(track.format, SubtitleFormat::Vtt);
        assert!(track.is_auto_generated);
        // write-then-record: the referenced file exists
        assert!(fx.root.path().join(&track.storage_path).exists());
    }

    #[tokio::test]
    async fn test_regeneration_appends_track_rows() {
        let fx = fixture(StubTranscoder::new());
        add_local_video(&fx, 10, 1, true).await;

        fx.pipeline.generate_for_task(1).await.unwrap();
        fx.pipeline.generate_for_task(1).await.unwrap();

        assert_eq!(fx.store.subtitle_tracks(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generate_prefers_primary_flag() {
        let fx = fixture(StubTranscoder::new());
        add_local_video(&fx, 10, 1, false).await;
        add_local_video(&fx, 11, 1, true).await;

        fx.pipeline.generate_for_task(1).await.unwrap();

        assert!(fx.store.subtitle_tracks(10).await.unwrap().is_empty());
        assert_eq!(fx.store.subtitle_tracks(11).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_without_videos_fails() {
        let fx = fixture(StubTranscoder::new());

        let err = fx.pipeline.generate_for_task(42).await.unwrap_err();
        assert!(matches!(err, VietsubError::NoVideo(42)));
    }

    #[tokio::test]
    async fn test_generate_without_playable_source_fails() {
        let fx = fixture(StubTranscoder::new());
        fx.store
            .add_video(VideoRecord {
                id: 10,
                task_id: 1,
                local_path: Some(fx.root.path().join("missing.mp4")),
                remote_url: None,
                is_primary: true,
            })
            .await;

        let err = fx.pipeline.generate_for_task(1).await.unwrap_err();
        assert!(matches!(err, VietsubError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_local_file_falls_back_to_url() {
        let video = VideoRecord {
            id: 10,
            task_id: 1,
            local_path: Some(PathBuf::from("/nonexistent/video.mp4")),
            remote_url: Some("https://cdn.example.com/v/10.mp4".to_string()),
            is_primary: true,
        };

        match resolve_source(&video).unwrap() {
            Source::Url(url) => assert_eq!(url, "https://cdn.example.com/v/10.mp4"),
            Source::File(_) => panic!("expected URL fallback"),
        }
    }

    #[tokio::test]
    async fn test_export_generates_subtitles_just_in_time() {
        let fx = fixture(StubTranscoder::new());
        add_local_video(&fx, 10, 1, true).await;

        let output = fx.pipeline.export(1).await.unwrap();

        assert!(output.to_string_lossy().starts_with("exports/"));
        assert!(output.to_string_lossy().ends_with("task_1_vi.mp4"));
        assert!(fx.root.path().join(&output).exists());
        // Just-in-time generation recorded a track
        assert_eq!(fx.store.subtitle_tracks(10).await.unwrap().len(), 1);
        assert_eq!(fx.transcoder.burn_in_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_export_failure_removes_partial_output() {
        let fx = fixture(StubTranscoder::failing());
        add_local_video(&fx, 10, 1, true).await;

        let err = fx.pipeline.export(1).await.unwrap_err();
        assert!(matches!(err, VietsubError::Transcode(_)));

        let exports = fx.pipeline.list_exports(1);
        assert!(exports.is_empty());
    }

    #[tokio::test]
    async fn test_export_requires_local_source() {
        let fx = fixture(StubTranscoder::new());
        fx.store
            .add_video(VideoRecord {
                id: 10,
                task_id: 1,
                local_path: None,
                remote_url: Some("https://cdn.example.com/v/10.mp4".to_string()),
                is_primary: true,
            })
            .await;

        let err = fx.pipeline.export(1).await.unwrap_err();
        assert!(matches!(err, VietsubError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_export_with_unavailable_transcoder() {
        let fx = fixture(StubTranscoder::unavailable());
        add_local_video(&fx, 10, 1, true).await;

        let err = fx.pipeline.export(1).await.unwrap_err();
        assert!(matches!(err, VietsubError::Transcode(_)));
        assert_eq!(fx.transcoder.burn_in_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_exports_filters_by_task() {
        let fx = fixture(StubTranscoder::new());
        add_local_video(&fx, 10, 1, true).await;
        add_local_video(&fx, 20, 2, true).await;

        fx.pipeline.export(1).await.unwrap();

        assert_eq!(fx.pipeline.list_exports(1).len(), 1);
        assert!(fx.pipeline.list_exports(2).is_empty());
    }
}
