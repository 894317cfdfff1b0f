use std::time::Duration;

use murmur_transcribe::TranscribeOptions;

use crate::Activity;

/// Retry behavior for one activity. Backoff doubles per attempt, capped at
/// `max_backoff`; `max_attempts` counts the first attempt too.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub start_to_close: Duration,
    pub heartbeat_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: usize,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Concurrent workflows; additional jobs queue FIFO.
    pub worker_pool_size: usize,
    /// Liveness/cancellation polling cadence inside a running activity.
    pub heartbeat_interval: Duration,
    /// Options handed to the transcriber collaborator.
    pub transcribe: TranscribeOptions,
    /// Chunks per embedding call; also the progress-message granularity.
    pub embed_batch_size: usize,
    pub transcribe_policy: RetryPolicy,
    pub chunk_policy: RetryPolicy,
    pub embed_policy: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 3,
            heartbeat_interval: Duration::from_secs(5),
            transcribe: TranscribeOptions::default(),
            embed_batch_size: 32,
            transcribe_policy: RetryPolicy {
                start_to_close: Duration::from_secs(60 * 60),
                heartbeat_timeout: Duration::from_secs(5 * 60),
                initial_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(60),
                max_attempts: 3,
            },
            chunk_policy: RetryPolicy {
                start_to_close: Duration::from_secs(30 * 60),
                heartbeat_timeout: Duration::from_secs(60),
                initial_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(60),
                max_attempts: 3,
            },
            embed_policy: RetryPolicy {
                start_to_close: Duration::from_secs(10 * 60),
                heartbeat_timeout: Duration::from_secs(30),
                initial_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(30),
                max_attempts: 3,
            },
        }
    }
}

impl EngineConfig {
    pub(crate) fn policy(&self, activity: Activity) -> &RetryPolicy {
        match activity {
            Activity::Transcribe => &self.transcribe_policy,
            Activity::Chunk => &self.chunk_policy,
            Activity::Embed => &self.embed_policy,
        }
    }
}
