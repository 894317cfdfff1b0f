use std::collections::BTreeMap;
use std::path::Path;

use backon::{ExponentialBuilder, Retryable};
use tracing::Instrument;

use murmur_chunker::TopicOracle;
use murmur_embedder::Embedder;
use murmur_job_interface::{ActivityError, Job, JobEvent, JobStatus};
use murmur_store::JobStore;
use murmur_transcribe::Transcriber;

use crate::{Activity, Inner};

pub(crate) async fn run<S, T, O, E>(inner: &Inner<S, T, O, E>, job_id: i64)
where
    S: JobStore,
    T: Transcriber,
    O: TopicOracle,
    E: Embedder,
{
    let span = tracing::info_span!("workflow", job_id);
    run_inner(inner, job_id).instrument(span).await
}

async fn run_inner<S, T, O, E>(inner: &Inner<S, T, O, E>, job_id: i64)
where
    S: JobStore,
    T: Transcriber,
    O: TopicOracle,
    E: Embedder,
{
    let job = match inner.store.get_job(job_id).await {
        Ok(job) => job,
        Err(err) => {
            tracing::error!(error = %err, "workflow_job_load_failed");
            return;
        }
    };
    if job.status.is_terminal() {
        tracing::debug!(status = %job.status, "workflow_job_already_terminal");
        return;
    }

    let run_id = job.workflow_run_id;

    if job.status == JobStatus::Pending {
        inner.bus.publish(JobEvent::status(job_id, JobStatus::Pending, 0));
        if let Err(err) = inner
            .store
            .update_status(job_id, JobStatus::Processing, None)
            .await
        {
            tracing::error!(error = %err, "workflow_admission_failed");
            return;
        }
    }
    inner
        .bus
        .publish(JobEvent::status(job_id, JobStatus::Processing, 0));
    tracing::info!(%run_id, "workflow_started");

    for activity in Activity::ALL {
        // Resume rule: the first activity without a marker is where this
        // run (re)starts; everything before it already committed.
        match inner.store.is_activity_complete(run_id, activity.name()).await {
            Ok(true) => {
                tracing::info!(activity = %activity, "activity_marker_present_skipping");
                continue;
            }
            Ok(false) => {}
            Err(err) => {
                // Can't even read markers; leave the job in `processing` for
                // the next recovery pass rather than guessing.
                tracing::error!(activity = %activity, error = %err, "marker_lookup_failed");
                return;
            }
        }

        match run_activity(inner, &job, activity).await {
            Ok(()) => {
                tracing::info!(activity = %activity, "activity_completed");
                if activity != Activity::Embed {
                    inner.bus.publish(JobEvent::status(
                        job_id,
                        JobStatus::Processing,
                        activity.milestone(),
                    ));
                }
            }
            Err(err) => {
                tracing::warn!(
                    activity = %activity,
                    kind = %err.kind,
                    error = %err,
                    "workflow_failed"
                );
                match inner
                    .store
                    .update_status(job_id, JobStatus::Failed, Some(&err.message))
                    .await
                {
                    Ok(_) => inner.bus.publish(JobEvent::failed(job_id, err.message)),
                    Err(store_err) => {
                        tracing::error!(error = %store_err, "failed_status_write_failed")
                    }
                }
                return;
            }
        }
    }

    match inner
        .store
        .update_status(job_id, JobStatus::Completed, None)
        .await
    {
        Ok(_) => {
            inner
                .bus
                .publish(JobEvent::status(job_id, JobStatus::Completed, 100));
            tracing::info!("workflow_completed");
        }
        Err(err) => tracing::error!(error = %err, "completed_status_write_failed"),
    }
}

async fn run_activity<S, T, O, E>(
    inner: &Inner<S, T, O, E>,
    job: &Job,
    activity: Activity,
) -> Result<(), ActivityError>
where
    S: JobStore,
    T: Transcriber,
    O: TopicOracle,
    E: Embedder,
{
    let policy = inner.config.policy(activity);
    let backoff = ExponentialBuilder::default()
        .with_min_delay(policy.initial_backoff)
        .with_max_delay(policy.max_backoff)
        .with_factor(2.0)
        .with_max_times(policy.max_attempts.saturating_sub(1));

    (|| attempt(inner, job, activity))
        .retry(backoff)
        .when(ActivityError::is_retryable)
        .notify(|err, dur| {
            tracing::warn!(
                activity = %activity,
                error = %err,
                retry_delay_ms = dur.as_millis() as u64,
                "activity_retrying"
            );
        })
        .await
}

/// One attempt: the activity body raced against its start-to-close deadline
/// and a heartbeat ticker that doubles as the cancellation observer. Losing
/// either race drops the body future, and with it any open transaction.
async fn attempt<S, T, O, E>(
    inner: &Inner<S, T, O, E>,
    job: &Job,
    activity: Activity,
) -> Result<(), ActivityError>
where
    S: JobStore,
    T: Transcriber,
    O: TopicOracle,
    E: Embedder,
{
    if inner.store.is_cancel_requested(job.id).await.map_err(ActivityError::from)? {
        return Err(ActivityError::cancelled());
    }

    let policy = inner.config.policy(activity);
    let deadline = tokio::time::Instant::now() + policy.start_to_close;
    let mut heartbeat = tokio::time::interval(inner.config.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_beat = tokio::time::Instant::now();

    let body = execute(inner, job, activity);
    tokio::pin!(body);

    loop {
        tokio::select! {
            result = &mut body => return result,
            _ = tokio::time::sleep_until(deadline) => {
                return Err(ActivityError::transient(format!(
                    "{activity} timed out after {:?}",
                    policy.start_to_close
                )));
            }
            _ = heartbeat.tick() => {
                match inner.store.is_cancel_requested(job.id).await {
                    Ok(true) => return Err(ActivityError::cancelled()),
                    Ok(false) => last_beat = tokio::time::Instant::now(),
                    Err(err) => {
                        tracing::warn!(error = %err, "heartbeat_check_failed");
                    }
                }
                if last_beat.elapsed() > policy.heartbeat_timeout {
                    return Err(ActivityError::transient(format!(
                        "{activity} missed heartbeats for {:?}",
                        policy.heartbeat_timeout
                    )));
                }
            }
        }
    }
}

async fn execute<S, T, O, E>(
    inner: &Inner<S, T, O, E>,
    job: &Job,
    activity: Activity,
) -> Result<(), ActivityError>
where
    S: JobStore,
    T: Transcriber,
    O: TopicOracle,
    E: Embedder,
{
    let run_id = job.workflow_run_id;
    match activity {
        Activity::Transcribe => {
            let result = inner
                .transcriber
                .transcribe(Path::new(&job.file_path), &inner.config.transcribe)
                .await?;
            tracing::debug!(
                chars = result.transcript.chars().count(),
                segments = result.segments.len(),
                language = %result.language,
                "transcription_finished"
            );
            inner
                .store
                .save_transcription(
                    job.id,
                    run_id,
                    &result.transcript,
                    &result.segments,
                    &result.language,
                )
                .await?;
            Ok(())
        }
        Activity::Chunk => {
            // Activities carry only the job id; state is always re-read so
            // the workflow never holds large payloads in memory.
            let fresh = inner.store.get_job(job.id).await?;
            let transcript = fresh.transcript.unwrap_or_default();
            let segments = fresh.segments.unwrap_or_default();
            let drafts = inner.chunker.chunk(&transcript, &segments).await;
            tracing::debug!(chunks = drafts.len(), "chunking_finished");
            inner.store.replace_chunks(job.id, run_id, &drafts).await?;
            Ok(())
        }
        Activity::Embed => {
            let chunks = inner.store.get_chunks(job.id).await?;
            let total = chunks.len();
            let mut vectors = BTreeMap::new();
            for batch in chunks.chunks(inner.config.embed_batch_size.max(1)) {
                let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                let embedded = inner.embedder.embed_batch(&texts).await?;
                for (chunk, vec) in batch.iter().zip(embedded) {
                    vectors.insert(chunk.chunk_index, vec);
                }
                inner.bus.publish(JobEvent::message(
                    job.id,
                    format!("embedded {}/{} chunks", vectors.len(), total),
                ));
            }
            inner
                .store
                .patch_chunk_embeddings(job.id, run_id, &vectors)
                .await?;
            Ok(())
        }
    }
}
