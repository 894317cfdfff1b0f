//! The intake surface: axum routes that turn uploads into jobs, serve
//! status and transcripts, bridge live progress onto SSE, and expose
//! semantic search. Identity stays out of scope; the caller arrives with an
//! opaque `x-user-id` header that an upstream gateway is trusted to have
//! verified.

mod error;
mod openapi;
mod routes;
mod srt;

pub use error::{ApiError, ErrorDetails, ErrorResponse};
pub use openapi::openapi;
pub use routes::router;
pub use srt::render_srt;

use std::path::PathBuf;
use std::sync::Arc;

use murmur_progress::ProgressBus;
use murmur_search::SearchEngine;

/// Hands a freshly created job to the scheduler. Returns `false` when the
/// scheduler is no longer admitting work.
pub type WorkflowStarter = Arc<dyn Fn(i64) -> bool + Send + Sync>;

pub struct AppState<S, E> {
    pub store: Arc<S>,
    pub search: SearchEngine<S, E>,
    pub bus: ProgressBus,
    pub starter: WorkflowStarter,
    pub upload_dir: PathBuf,
}

impl<S, E> Clone for AppState<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            search: self.search.clone(),
            bus: self.bus.clone(),
            starter: Arc::clone(&self.starter),
            upload_dir: self.upload_dir.clone(),
        }
    }
}
