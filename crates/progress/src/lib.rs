//! In-process fan-out of per-job status events.
//!
//! Strictly ephemeral: nothing here survives a restart, and an observer that
//! reconnects must re-read current job state from the store. Each
//! subscription sits on a bounded buffer; when a subscriber falls behind the
//! oldest events are dropped and the gap is surfaced as a single
//! [`JobEvent::Lagging`] item.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use murmur_job_interface::JobEvent;

pub const DEFAULT_BUFFER: usize = 64;

#[derive(Clone)]
pub struct ProgressBus {
    inner: Arc<Inner>,
}

struct Inner {
    channels: Mutex<HashMap<i64, broadcast::Sender<JobEvent>>>,
    buffer: usize,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                channels: Mutex::new(HashMap::new()),
                buffer,
            }),
        }
    }

    /// Begin observing a job. Events published before this call are not
    /// replayed.
    pub fn subscribe(&self, job_id: i64) -> Subscription {
        let mut channels = self.inner.channels.lock().unwrap();
        let tx = channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.inner.buffer).0);
        Subscription {
            job_id,
            rx: tx.subscribe(),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Fire-and-forget. Events for jobs nobody is watching are dropped.
    pub fn publish(&self, event: JobEvent) {
        let job_id = event.job_id();
        let mut channels = self.inner.channels.lock().unwrap();
        if let Some(tx) = channels.get(&job_id) {
            if tx.send(event).is_err() {
                // All receivers vanished without running their Drop cleanup
                // (e.g. an aborted task); reap the routing entry here.
                channels.remove(&job_id);
            }
        }
    }

    /// Number of jobs with at least one live subscription.
    pub fn watched_jobs(&self) -> usize {
        self.inner.channels.lock().unwrap().len()
    }
}

/// A live view of one job's event stream. Dropping it (or calling
/// [`Subscription::close`]) releases the routing entry once the last
/// observer for that job is gone.
pub struct Subscription {
    job_id: i64,
    rx: broadcast::Receiver<JobEvent>,
    inner: Arc<Inner>,
}

impl Subscription {
    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    /// Next event, or `None` once the stream is exhausted. A lagged
    /// subscriber observes one `Lagging` item carrying the drop count, then
    /// resumes from the oldest retained event.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(job_id = self.job_id, skipped, "subscriber_lagged");
                Some(JobEvent::Lagging {
                    job_id: self.job_id,
                    skipped,
                })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    pub fn close(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut channels = self.inner.channels.lock().unwrap();
        if let Some(tx) = channels.get(&self.job_id) {
            // This receiver is still counted until we return, so 1 means we
            // are the last one out.
            if tx.receiver_count() <= 1 {
                channels.remove(&self.job_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_job_interface::JobStatus;

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = ProgressBus::new();
        let mut sub = bus.subscribe(1);

        bus.publish(JobEvent::status(1, JobStatus::Pending, 0));
        bus.publish(JobEvent::status(1, JobStatus::Processing, 0));
        bus.publish(JobEvent::status(1, JobStatus::Processing, 60));

        for pct in [0u8, 0, 60] {
            match sub.recv().await.unwrap() {
                JobEvent::Progress { progress_pct, .. } => {
                    assert_eq!(progress_pct, Some(pct));
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = ProgressBus::new();
        bus.publish(JobEvent::status(42, JobStatus::Processing, 0));
        assert_eq!(bus.watched_jobs(), 0);
    }

    #[tokio::test]
    async fn subscribers_of_different_jobs_do_not_cross() {
        let bus = ProgressBus::new();
        let mut sub_a = bus.subscribe(1);
        let _sub_b = bus.subscribe(2);

        bus.publish(JobEvent::status(2, JobStatus::Processing, 0));
        bus.publish(JobEvent::status(1, JobStatus::Completed, 100));

        let event = sub_a.recv().await.unwrap();
        assert_eq!(event.job_id(), 1);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_flags_the_gap() {
        let bus = ProgressBus::with_buffer(4);
        let mut sub = bus.subscribe(1);

        for i in 0..10u8 {
            bus.publish(JobEvent::status(1, JobStatus::Processing, i));
        }

        match sub.recv().await.unwrap() {
            JobEvent::Lagging { skipped, .. } => assert_eq!(skipped, 6),
            other => panic!("expected lagging marker, got {other:?}"),
        }

        // The retained tail is still delivered in order.
        let mut seen = Vec::new();
        for _ in 0..4 {
            if let JobEvent::Progress { progress_pct, .. } = sub.recv().await.unwrap() {
                seen.push(progress_pct.unwrap());
            }
        }
        assert_eq!(seen, vec![6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn last_unsubscribe_removes_the_route() {
        let bus = ProgressBus::new();
        let sub_a = bus.subscribe(1);
        let sub_b = bus.subscribe(1);
        assert_eq!(bus.watched_jobs(), 1);

        sub_a.close();
        assert_eq!(bus.watched_jobs(), 1);

        sub_b.close();
        assert_eq!(bus.watched_jobs(), 0);
    }
}
