use serde::{Deserialize, Serialize};

/// The `input` field of an embedding request: a single text or an ordered
/// list of texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Multiple(Vec<String>),
}

impl EmbeddingInput {
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Multiple(texts) => texts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, EmbeddingInput::Multiple(texts) if texts.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub input: EmbeddingInput,
    #[serde(default)]
    pub model: Option<String>,
    /// Accepted for wire compatibility; the served dimension count is fixed
    /// at startup and this field does not override it.
    #[serde(default)]
    pub dimensions: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_input_deserializes() {
        let req: EmbeddingRequest = serde_json::from_str(r#"{"input": "hello"}"#).unwrap();
        assert!(matches!(req.input, EmbeddingInput::Single(ref s) if s == "hello"));
        assert_eq!(req.model, None);
    }

    #[test]
    fn sequence_input_deserializes() {
        let req: EmbeddingRequest =
            serde_json::from_str(r#"{"input": ["p", "q"], "model": "bert", "dimensions": 256}"#)
                .unwrap();
        match req.input {
            EmbeddingInput::Multiple(ref texts) => assert_eq!(texts, &["p", "q"]),
            _ => panic!("expected a sequence"),
        }
        assert_eq!(req.model.as_deref(), Some("bert"));
        assert_eq!(req.dimensions, Some(256));
    }

    #[test]
    fn empty_sequence_is_detected() {
        let req: EmbeddingRequest = serde_json::from_str(r#"{"input": []}"#).unwrap();
        assert!(req.input.is_empty());
        assert_eq!(req.input.len(), 0);
    }
}
