pub(crate) mod jobs;
pub(crate) mod search;

use axum::{
    Router,
    routing::{get, post},
};

use murmur_embedder::Embedder;
use murmur_store::JobStore;

use crate::AppState;

pub fn router<S, E>(state: AppState<S, E>) -> Router
where
    S: JobStore,
    E: Embedder + 'static,
{
    Router::new()
        .route(
            "/jobs",
            post(jobs::create_job::<S, E>).get(jobs::list_jobs::<S, E>),
        )
        .route(
            "/jobs/{id}",
            get(jobs::get_job::<S, E>).delete(jobs::delete_job::<S, E>),
        )
        .route("/jobs/{id}/transcript", get(jobs::download_transcript::<S, E>))
        .route("/jobs/{id}/events", get(jobs::job_events::<S, E>))
        .route("/jobs/{id}/cancel", post(jobs::cancel_job::<S, E>))
        .route("/search", get(search::search::<S, E>))
        .with_state(state)
}
