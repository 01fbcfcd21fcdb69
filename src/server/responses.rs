use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::batching::BatchError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    pub object: String,
    pub embedding: Vec<f32>,
    pub index: usize,
}

impl EmbeddingData {
    pub fn new(embedding: Vec<f32>, index: usize) -> Self {
        Self {
            object: "embedding".to_string(),
            embedding,
            index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageData {
    pub prompt_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub object: String,
    pub data: Vec<EmbeddingData>,
    pub model: String,
    pub usage: UsageData,
}

impl EmbeddingResponse {
    pub fn new(data: Vec<EmbeddingData>, model: String) -> Self {
        Self {
            object: "list".to_string(),
            data,
            model,
            usage: UsageData {
                prompt_tokens: 0,
                total_tokens: 0,
            },
        }
    }
}

/// API error carrying the status that distinguishes a bad request from a
/// backend failure. Serialized as `{"detail": "..."}`.
#[derive(Debug)]
pub struct APIError {
    status: StatusCode,
    detail: String,
}

impl APIError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl std::fmt::Display for APIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl From<BatchError> for APIError {
    fn from(err: BatchError) -> Self {
        let status = match err {
            BatchError::Validation(_) => StatusCode::BAD_REQUEST,
            BatchError::Worker(_) | BatchError::LengthMismatch { .. } | BatchError::Closed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = APIError::from(BatchError::Validation("empty".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn worker_errors_map_to_internal_error() {
        let err = APIError::from(BatchError::Worker("model exploded".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail().contains("model exploded"));

        let err = APIError::from(BatchError::LengthMismatch {
            expected: 2,
            actual: 1,
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn response_wire_shape() {
        let response = EmbeddingResponse::new(
            vec![EmbeddingData::new(vec![0.1, 0.2], 0)],
            "bert".to_string(),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["object"], "list");
        assert_eq!(value["data"][0]["object"], "embedding");
        assert_eq!(value["data"][0]["index"], 0);
        assert_eq!(value["model"], "bert");
        assert_eq!(value["usage"]["prompt_tokens"], 0);
    }
}
