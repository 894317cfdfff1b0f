use utoipa::OpenApi;

use crate::error::{ErrorDetails, ErrorResponse};
use crate::routes::jobs::{CancelResponse, CreateJobResponse, JobDetail, JobSummary};
use crate::routes::search::SearchResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "murmur",
        description = "Durable audio transcription pipeline with semantic search"
    ),
    components(schemas(
        CreateJobResponse,
        CancelResponse,
        JobSummary,
        JobDetail,
        SearchResponse,
        ErrorResponse,
        ErrorDetails,
    ))
)]
struct ApiDoc;

pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
