use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, info};
use uuid::Uuid;

use crate::batching::BatchScheduler;
use crate::model::EmbeddingModel;
use crate::server::requests::{EmbeddingInput, EmbeddingRequest};
use crate::server::responses::{APIError, EmbeddingData, EmbeddingResponse};

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<BatchScheduler<EmbeddingModel>>,
    pub model_id: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/embeddings", post(embeddings_handler))
        .route("/v1/embeddings", post(embeddings_handler))
        .with_state(state)
}

async fn ping_handler() -> Json<&'static str> {
    Json("pong")
}

async fn embeddings_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbeddingRequest>,
) -> Result<Json<EmbeddingResponse>, APIError> {
    let request_id = format!("embd-{}", Uuid::new_v4());
    info!(
        request_id,
        inputs = request.input.len(),
        "embedding request received"
    );

    if request.input.is_empty() {
        return Err(APIError::bad_request("input must not be empty"));
    }

    let model = request.model.unwrap_or_else(|| state.model_id.clone());
    let embeddings = match request.input {
        EmbeddingInput::Single(text) => vec![state.scheduler.submit(text).await?],
        EmbeddingInput::Multiple(texts) => state.scheduler.submit_many(texts).await?,
    };

    debug!(request_id, count = embeddings.len(), "embedding request served");
    let data = embeddings
        .into_iter()
        .enumerate()
        .map(|(index, embedding)| EmbeddingData::new(embedding, index))
        .collect();
    Ok(Json(EmbeddingResponse::new(data, model)))
}
