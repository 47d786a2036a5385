// Subtitle generation job queue
//
// A single cooperative worker drains three priority bands, one job at a
// time. The worker task is spawned lazily on enqueue and exits when the
// bands are empty; queue state is shared behind a mutex that is only held
// for list surgery, never across an await on pipeline work.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::{Result, VietsubError};
use crate::pipeline::{GeneratedTracks, SubtitleGenerator};

/// Scheduling hint affecting queue insertion position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    High,
    Normal,
    Low,
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

/// One scheduled unit of subtitle-generation work
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub task_id: i64,
    pub video_id: i64,
    pub priority: JobPriority,
    /// Completed failed attempts; never exceeds the attempt bound
    pub retries: u32,
    pub created_at: DateTime<Utc>,
}

/// Pending job as reported by a status snapshot
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub task_id: i64,
    pub video_id: i64,
    pub priority: JobPriority,
    pub retries: u32,
    pub created_at: DateTime<Utc>,
}

/// Consistent point-in-time view of the queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub queue_length: usize,
    pub processing: bool,
    pub jobs: Vec<JobSnapshot>,
}

/// Completion events published to subscribers
#[derive(Debug, Clone)]
pub enum JobEvent {
    Completed {
        job_id: Uuid,
        task_id: i64,
        tracks: GeneratedTracks,
    },
    Retrying {
        job_id: Uuid,
        task_id: i64,
        retries: u32,
        error: String,
    },
    Dropped {
        job_id: Uuid,
        task_id: i64,
        retries: u32,
        error: String,
    },
}

struct QueueState {
    high: VecDeque<Job>,
    normal: VecDeque<Job>,
    low: VecDeque<Job>,
    processing: bool,
    closed: bool,
}

impl QueueState {
    fn new() -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
            low: VecDeque::new(),
            processing: false,
            closed: false,
        }
    }

    fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    fn pop_next(&mut self) -> Option<Job> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }

    fn snapshot(&self) -> Vec<JobSnapshot> {
        self.high
            .iter()
            .chain(self.normal.iter())
            .chain(self.low.iter())
            .map(|job| JobSnapshot {
                id: job.id,
                task_id: job.task_id,
                video_id: job.video_id,
                priority: job.priority,
                retries: job.retries,
                created_at: job.created_at,
            })
            .collect()
    }
}

struct QueueInner {
    state: Mutex<QueueState>,
    generator: Arc<dyn SubtitleGenerator>,
    config: QueueConfig,
    events: broadcast::Sender<JobEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Priority job queue with a single lazily-started worker
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<QueueInner>,
}

impl JobQueue {
    pub fn new(generator: Arc<dyn SubtitleGenerator>, config: QueueConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::new()),
                generator,
                config,
                events,
                worker: Mutex::new(None),
            }),
        }
    }

    /// Schedule subtitle generation for a task's primary video.
    ///
    /// Returns immediately with the job id; outcome is observable through
    /// `status` and `subscribe`. Starts the worker if it is idle.
    pub async fn enqueue(
        &self,
        task_id: i64,
        video_id: i64,
        priority: JobPriority,
    ) -> Result<Uuid> {
        let job = Job {
            id: Uuid::new_v4(),
            task_id,
            video_id,
            priority,
            retries: 0,
            created_at: Utc::now(),
        };
        let job_id = job.id;

        let start_worker = {
            let mut state = self.inner.state.lock().await;
            if state.closed {
                return Err(VietsubError::Config("Queue is shut down".to_string()));
            }

            match priority {
                // The newest high-priority job preempts everything pending,
                // including older high-priority jobs
                JobPriority::High => state.high.push_front(job),
                JobPriority::Normal => state.normal.push_back(job),
                JobPriority::Low => state.low.push_back(job),
            }
            debug!(
                "Enqueued job {} (task {}, {:?} priority, {} pending)",
                job_id,
                task_id,
                priority,
                state.len()
            );

            if state.processing {
                false
            } else {
                state.processing = true;
                true
            }
        };

        if start_worker {
            let handle = tokio::spawn(run_worker(self.inner.clone()));
            *self.inner.worker.lock().await = Some(handle);
        }

        Ok(job_id)
    }

    /// Non-blocking snapshot of pending jobs and worker activity
    pub async fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;
        QueueStatus {
            queue_length: state.len(),
            processing: state.processing,
            jobs: state.snapshot(),
        }
    }

    /// Subscribe to job completion events
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Stop accepting work and wait for the in-flight job to finish
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.lock().await;
            state.closed = true;
        }

        let handle = self.inner.worker.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_worker(inner: Arc<QueueInner>) {
    debug!("Subtitle worker started");

    loop {
        let job = {
            let mut state = inner.state.lock().await;
            if state.closed {
                state.processing = false;
                break;
            }
            match state.pop_next() {
                Some(job) => job,
                None => {
                    state.processing = false;
                    break;
                }
            }
        };

        info!(
            "Processing job {} (task {}, attempt {}/{})",
            job.id,
            job.task_id,
            job.retries + 1,
            inner.config.max_attempts
        );

        let deadline = Duration::from_secs(inner.config.job_timeout_secs);
        let result = match tokio::time::timeout(deadline, inner.generator.generate(job.task_id))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(VietsubError::Timeout(format!(
                "Subtitle generation for task {} exceeded {}s",
                job.task_id,
                deadline.as_secs()
            ))),
        };

        match result {
            Ok(tracks) => {
                info!("Job {} completed: {}", job.id, tracks.vtt_path.display());
                let _ = inner.events.send(JobEvent::Completed {
                    job_id: job.id,
                    task_id: job.task_id,
                    tracks,
                });
            }
            Err(e) => {
                let mut job = job;
                job.retries += 1;

                if job.retries < inner.config.max_attempts {
                    warn!(
                        "Job {} failed (attempt {}/{}): {}",
                        job.id, job.retries, inner.config.max_attempts, e
                    );
                    let _ = inner.events.send(JobEvent::Retrying {
                        job_id: job.id,
                        task_id: job.task_id,
                        retries: job.retries,
                        error: e.to_string(),
                    });
                    // A failed job cedes priority to everything already
                    // pending, so failing work cannot starve the queue
                    inner.state.lock().await.low.push_back(job);
                } else {
                    warn!(
                        "Job {} dropped after {} attempts: {}",
                        job.id, job.retries, e
                    );
                    let _ = inner.events.send(JobEvent::Dropped {
                        job_id: job.id,
                        task_id: job.task_id,
                        retries: job.retries,
                        error: e.to_string(),
                    });
                }
            }
        }

        // Breathe between jobs so downstream services are not saturated
        tokio::time::sleep(Duration::from_millis(inner.config.pause_ms)).await;
    }

    debug!("Subtitle worker idle");
}
