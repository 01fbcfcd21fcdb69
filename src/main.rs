use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use embedserve::config::Args;
use embedserve::model::EmbeddingModel;
use embedserve::server::{build_router, AppState};
use embedserve::BatchScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    args.validate()?;
    info!(
        model_id = %args.model_id,
        dimensions = ?args.dimensions,
        max_batch_size = args.max_batch_size,
        max_wait_ms = args.max_wait_ms,
        "starting embedding server"
    );

    // The model is expensive to initialize: load it once, before accepting
    // traffic, and share it through the scheduler for the process lifetime.
    let model_args = args.clone();
    let model = tokio::task::spawn_blocking(move || {
        EmbeddingModel::load(&model_args.model_id, model_args.dimensions, model_args.cpu)
    })
    .await??;

    let scheduler = Arc::new(BatchScheduler::new(args.batcher_config(), model));
    let state = AppState {
        scheduler,
        model_id: args.model_id.clone(),
    };

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = build_router(state).layer(cors_layer);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", args.host, args.port)).await?;
    info!("server started at http://{}:{}/", args.host, args.port);
    axum::serve(listener, app).await?;

    Ok(())
}
