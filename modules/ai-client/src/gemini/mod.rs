mod client;
pub(crate) mod types;

use crate::error::{AiError, Result};

use client::GeminiClient;
use types::*;

// =============================================================================
// Gemini
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    base_url: Option<String>,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            max_output_tokens: 2048,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Send a single user prompt and return the model's raw text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest::user(prompt).config(GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        });

        let response = self.client().generate(&self.model, &request).await?;

        response
            .text()
            .ok_or_else(|| AiError::EmptyResponse(response.empty_reason()))
    }
}
