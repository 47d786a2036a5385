//! vietsub - Asynchronous Subtitle Generation Pipeline
//!
//! This is the main entry point for the vietsub application, which
//! transcribes video speech to timestamped text, renders SRT/VTT subtitle
//! files, and optionally burns subtitles into a new video via ffmpeg.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vietsub::cli::{Args, Commands};
use vietsub::config::Config;
use vietsub::error::VietsubError;
use vietsub::pipeline::SubtitlePipeline;
use vietsub::queue::{JobEvent, JobPriority, JobQueue};
use vietsub::store::{MemoryStore, VideoRecord};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting vietsub - Asynchronous Subtitle Generation Pipeline");

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Generate { task, input } => {
            info!("Generating subtitles for: {}", input.display());

            let store = Arc::new(MemoryStore::new());
            store
                .add_video(VideoRecord {
                    id: task,
                    task_id: task,
                    local_path: Some(input),
                    remote_url: None,
                    is_primary: true,
                })
                .await;

            let pipeline = SubtitlePipeline::new(config, store);
            let tracks = pipeline.generate_for_task(task).await?;

            println!("VTT: {}", tracks.vtt_path.display());
            println!("SRT: {}", tracks.srt_path.display());
        }
        Commands::Run { inputs, priority } => {
            let priority = parse_priority(&priority)?;
            let inputs: Vec<_> = inputs
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            if inputs.is_empty() {
                return Err(VietsubError::Config("No input files given".to_string()).into());
            }

            info!("Enqueueing {} subtitle jobs", inputs.len());

            let store = Arc::new(MemoryStore::new());
            for (index, input) in inputs.iter().enumerate() {
                let id = index as i64 + 1;
                store
                    .add_video(VideoRecord {
                        id,
                        task_id: id,
                        local_path: Some(input.into()),
                        remote_url: None,
                        is_primary: true,
                    })
                    .await;
            }

            let pipeline = Arc::new(SubtitlePipeline::new(config.clone(), store));
            let queue = JobQueue::new(pipeline, config.queue.clone());
            let mut events = queue.subscribe();

            for index in 0..inputs.len() {
                let id = index as i64 + 1;
                queue.enqueue(id, id, priority).await?;
            }

            let progress = ProgressBar::new(inputs.len() as u64);
            progress.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                    .expect("progress template should be valid"),
            );

            let mut completed = 0usize;
            let mut dropped = 0usize;
            while completed + dropped < inputs.len() {
                match events.recv().await {
                    Ok(JobEvent::Completed { task_id, tracks, .. }) => {
                        completed += 1;
                        progress.inc(1);
                        progress.set_message(format!("task {} done", task_id));
                        info!(
                            "Task {} completed: {}",
                            task_id,
                            tracks.vtt_path.display()
                        );
                    }
                    Ok(JobEvent::Retrying { task_id, retries, error, .. }) => {
                        warn!("Task {} retrying ({}): {}", task_id, retries, error);
                    }
                    Ok(JobEvent::Dropped { task_id, error, .. }) => {
                        dropped += 1;
                        progress.inc(1);
                        progress.set_message(format!("task {} failed", task_id));
                        warn!("Task {} dropped: {}", task_id, error);
                    }
                    Err(e) => {
                        warn!("Event stream closed: {}", e);
                        break;
                    }
                }
            }
            progress.finish();
            queue.shutdown().await;

            println!("Completed {} of {} jobs", completed, inputs.len());
        }
        Commands::Export { task, input } => {
            info!("Exporting subtitled video for: {}", input.display());

            let store = Arc::new(MemoryStore::new());
            store
                .add_video(VideoRecord {
                    id: task,
                    task_id: task,
                    local_path: Some(input),
                    remote_url: None,
                    is_primary: true,
                })
                .await;

            let pipeline = SubtitlePipeline::new(config, store);
            match pipeline.export(task).await {
                Ok(output) => println!("Export: {}", output.display()),
                Err(VietsubError::Transcode(e)) => {
                    // Distinguish transcoder problems from pipeline failures
                    eprintln!("Transcoder unavailable or failed: {}", e);
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    info!("vietsub completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let app_dir = std::env::current_dir()?.join(".vietsub");
    let log_dir = app_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "vietsub.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Parse scheduling priority from string
fn parse_priority(priority: &str) -> Result<JobPriority> {
    match priority.to_lowercase().as_str() {
        "high" => Ok(JobPriority::High),
        "normal" => Ok(JobPriority::Normal),
        "low" => Ok(JobPriority::Low),
        _ => Err(VietsubError::Config(format!(
            "Invalid priority '{}'. Valid priorities: high, normal, low",
            priority
        ))
        .into()),
    }
}
