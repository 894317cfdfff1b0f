mod env;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::{
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::prelude::*;

use murmur_api_jobs::{AppState, WorkflowStarter};
use murmur_chunker::{Chunker, ChunkerConfig, LlmTopicOracle};
use murmur_embedder::{Embedder, HashEmbedder, HttpEmbedder};
use murmur_engine::{Engine, EngineConfig};
use murmur_job_interface::EMBEDDING_DIM;
use murmur_progress::ProgressBus;
use murmur_search::SearchEngine;
use murmur_store::{JobStore, MemoryStore, PgStore};
use murmur_transcribe::{HttpTranscriber, TranscribeOptions};

use env::{Env, env};

fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // The store schema, the embedder contract, and the search index all
    // assume one dimension; refuse to boot if the build disagrees.
    assert_eq!(EMBEDDING_DIM, 384, "embedding dimension must be 384");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(env()))
}

async fn run(env: &'static Env) -> std::io::Result<()> {
    match &env.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .unwrap_or_else(|err| panic!("could not open database: {err}"));
            with_embedder(Arc::new(store), env).await
        }
        None => {
            tracing::warn!("database_url_not_set_using_in_memory_store");
            with_embedder(Arc::new(MemoryStore::new()), env).await
        }
    }
}

async fn with_embedder<S: JobStore>(store: Arc<S>, env: &'static Env) -> std::io::Result<()> {
    match &env.embeddings_base_url {
        Some(base_url) => {
            let mut builder = HttpEmbedder::builder().api_base(base_url);
            if let Some(key) = &env.embeddings_api_key {
                builder = builder.api_key(key);
            }
            if let Some(model) = &env.embeddings_model {
                builder = builder.model(model);
            }
            serve(store, Arc::new(builder.build()), env).await
        }
        None => {
            tracing::info!("embeddings_endpoint_not_set_using_hash_embedder");
            serve(store, Arc::new(HashEmbedder::new()), env).await
        }
    }
}

async fn serve<S, E>(store: Arc<S>, embedder: Arc<E>, env: &'static Env) -> std::io::Result<()>
where
    S: JobStore,
    E: Embedder + 'static,
{
    let bus = ProgressBus::new();

    let mut transcriber = HttpTranscriber::builder().api_base(&env.transcribe_base_url);
    if let Some(key) = &env.transcribe_api_key {
        transcriber = transcriber.api_key(key);
    }

    let mut oracle = LlmTopicOracle::builder().api_base(&env.oracle_base_url);
    if let Some(key) = &env.oracle_api_key {
        oracle = oracle.api_key(key);
    }
    if let Some(model) = &env.oracle_model {
        oracle = oracle.model(model);
    }
    let chunker = Chunker::new(
        oracle.build(),
        ChunkerConfig {
            strategy: env.chunking_strategy,
            sentences_per_chunk: env.sentences_per_chunk,
            ..Default::default()
        },
    );

    let config = EngineConfig {
        worker_pool_size: env.worker_pool_size,
        heartbeat_interval: Duration::from_secs(env.heartbeat_interval_seconds),
        transcribe: TranscribeOptions {
            model_size: env.transcribe_model_size,
            force_language: None,
        },
        ..Default::default()
    };

    let engine = Engine::new(
        config,
        Arc::clone(&store),
        transcriber.build(),
        chunker,
        Arc::clone(&embedder),
        bus.clone(),
    );

    match engine.recover().await {
        Ok(0) => {}
        Ok(count) => tracing::info!(jobs = count, "requeued_unfinished_jobs"),
        Err(err) => tracing::error!(error = %err, "startup_recovery_failed"),
    }

    let starter: WorkflowStarter = {
        let engine = engine.clone();
        Arc::new(move |job_id| engine.start(job_id))
    };

    let state = AppState {
        store: Arc::clone(&store),
        search: SearchEngine::new(store, embedder),
        bus,
        starter,
        upload_dir: env.upload_dir.clone().into(),
    };

    let app = Router::new()
        .route("/health", axum::routing::get(health))
        .route("/openapi.json", axum::routing::get(openapi_json))
        .merge(murmur_api_jobs::router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods(cors::Any)
                .allow_headers(cors::Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], env.port));
    tracing::info!(addr = %addr, "server_listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(engine))
        .await
}

async fn shutdown_signal<S, T, O, E>(engine: Engine<S, T, O, E>)
where
    S: JobStore,
    T: murmur_transcribe::Transcriber + 'static,
    O: murmur_chunker::TopicOracle + 'static,
    E: Embedder + 'static,
{
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown_signal_received");
    engine.shutdown();
}

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(murmur_api_jobs::openapi())
}

async fn health() -> &'static str {
    "ok"
}
