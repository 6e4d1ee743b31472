//! Generation service client.
//!
//! The text-generation service is an external collaborator behind the
//! [`GenerationProvider`] seam. It takes an assembled prompt and returns
//! free-form text with no structural guarantee — only the argument validator
//! ever interprets it.

use crate::error::{GenError, GenResult};
use crate::gate::ServiceGate;

/// Seam to the external text-generation service.
pub trait GenerationProvider: Send + Sync {
    fn generate(&self, prompt: &str) -> GenResult<String>;
}

/// Configuration for the Ollama generation client.
#[derive(Debug, Clone)]
pub struct OllamaGenConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model name to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum concurrent requests to the server.
    pub max_in_flight: usize,
}

impl Default for OllamaGenConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "qwen2.5-coder".into(),
            timeout_secs: 120,
            max_in_flight: 2,
        }
    }
}

/// Client for the Ollama generate endpoint.
pub struct OllamaGenerator {
    config: OllamaGenConfig,
    gate: ServiceGate,
}

impl OllamaGenerator {
    pub fn new(config: OllamaGenConfig) -> Self {
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

    fn request(&self, prompt: &str) -> GenResult<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });
        let body_str = serde_json::to_string(&body).map_err(|e| GenError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| GenError::RequestFailed {
                message: e.to_string(),
            })?;

        let resp_str = resp.into_string().map_err(|e| GenError::ParseError {
            message: e.to_string(),
        })?;
        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| GenError::ParseError {
                message: e.to_string(),
            })?;

        json["response"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GenError::ParseError {
                message: "missing 'response' field".into(),
            })
    }
}

impl GenerationProvider for OllamaGenerator {
    fn generate(&self, prompt: &str) -> GenResult<String> {
        self.gate.run(|| self.request(prompt))
    }
}
