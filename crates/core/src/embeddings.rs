use crate::error::IndexError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Seam over the hosted embedding service. Any failure is fatal for the
/// current batch; callers do not retry.
#[async_trait]
pub trait Embedder {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;
}

pub struct OpenAiEmbedder {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": text,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::BackendResponse {
                backend: "embeddings".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        payload_to_vector(&parsed)
    }
}

fn payload_to_vector(payload: &Value) -> Result<Vec<f32>, IndexError> {
    let components = payload
        .pointer("/data/0/embedding")
        .and_then(Value::as_array)
        .ok_or_else(|| IndexError::Embedding("response carried no embedding".to_string()))?;

    let mut vector = Vec::with_capacity(components.len());
    for component in components {
        let value = component.as_f64().ok_or_else(|| {
            IndexError::Embedding(format!(
                "response embedding had a non-numeric component: {component}"
            ))
        })?;
        vector.push(value as f32);
    }

    if vector.is_empty() {
        return Err(IndexError::Embedding(
            "response embedding was empty".to_string(),
        ));
    }

    Ok(vector)
}
