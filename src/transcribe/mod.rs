// Modular transcription architecture
//
// This module provides transcription backends through a factory pattern:
// - Remote: whisper-compatible HTTP inference endpoint
// - Offline: deterministic stand-in used when no endpoint is configured
//
// To add a new backend:
// 1. Create backend-specific data structures for parsing its responses
// 2. Implement the Transcriber trait for the backend
// 3. Add the backend to TranscriberBackend
// 4. Update the factory to create your implementation

pub mod common;
pub mod offline;
pub mod remote;

use async_trait::async_trait;
use std::sync::Arc;

pub use common::*;

use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::media::Transcoder;

/// Main trait for transcription operations
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a playable source into an ordered segment sequence
    async fn transcribe(&self, source: &Source) -> Result<Transcript>;
}

/// Transcriber backend type
#[derive(Debug, Clone)]
pub enum TranscriberBackend {
    Remote,
    Offline,
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create a transcriber based on backend type
    pub fn create_backend(
        backend: TranscriberBackend,
        config: TranscriberConfig,
        transcoder: Arc<dyn Transcoder>,
    ) -> Box<dyn Transcriber> {
        match backend {
            TranscriberBackend::Remote => {
                Box::new(remote::RemoteTranscriber::new(config, transcoder))
            }
            TranscriberBackend::Offline => Box::new(offline::OfflineTranscriber::new(config)),
        }
    }

    /// Select a backend from configuration: remote when an endpoint is
    /// configured, the deterministic offline stand-in otherwise
    pub fn create(
        config: TranscriberConfig,
        transcoder: Arc<dyn Transcoder>,
    ) -> Box<dyn Transcriber> {
        let backend = if config.endpoint.is_some() {
            TranscriberBackend::Remote
        } else {
            TranscriberBackend::Offline
        };

        Self::create_backend(backend, config, transcoder)
    }
}
