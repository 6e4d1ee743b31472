//! Ollama-compatible embedding client (sync HTTP).

use crate::error::{EmbedError, EmbedResult};
use crate::gate::ServiceGate;

use super::{Embedding, EmbeddingProvider};

/// Configuration for the Ollama embedding client.
#[derive(Debug, Clone)]
pub struct OllamaEmbedConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent requests to the server.
    pub max_in_flight: usize,
}

impl Default for OllamaEmbedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            timeout_secs: 60,
            max_in_flight: 4,
        }
    }
}

/// Client for the Ollama embeddings endpoint.
pub struct OllamaEmbeddings {
    config: OllamaEmbedConfig,
    gate: ServiceGate,
}

impl OllamaEmbeddings {
    pub fn new(config: OllamaEmbedConfig) -> Self {
        let gate = ServiceGate::new(config.max_in_flight);
        Self { config, gate }
    }

    /// Probe the server with a lightweight request to check availability.
    pub fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(5))
            .build();
        matches!(agent.get(&url).call(), Ok(resp) if resp.status() == 200)
    }

    fn request(&self, text: &str) -> EmbedResult<Embedding> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": text,
        });
        let body_str = serde_json::to_string(&body).map_err(|e| EmbedError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| EmbedError::RequestFailed {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| EmbedError::ParseError {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| EmbedError::ParseError {
                message: e.to_string(),
            })?;

        let values = json["embedding"]
            .as_array()
            .ok_or_else(|| EmbedError::ParseError {
                message: "missing 'embedding' field".into(),
            })?
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| EmbedError::ParseError {
                message: "non-numeric value in 'embedding'".into(),
            })?;

        if values.is_empty() {
            return Err(EmbedError::ParseError {
                message: "empty embedding vector".into(),
            });
        }

        Ok(Embedding::new(values))
    }
}

impl EmbeddingProvider for OllamaEmbeddings {
    fn embed(&self, text: &str) -> EmbedResult<Embedding> {
        self.gate.run(|| self.request(text))
    }
}
