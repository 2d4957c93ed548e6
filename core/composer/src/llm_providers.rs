//! Text generators for weekly summaries
//! Supports OpenAI, Ollama and Claude; all take one rendered prompt and return free text

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";

/// External text-generation collaborator. Implementations do not retry.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Short label used in logs
    fn name(&self) -> &str;
}

/// OpenAI chat completions
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl SummaryGenerator for OpenAIProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request_body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });

        debug!("Calling OpenAI model {}", self.model);

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("OpenAI API error ({}): {}", status, error_text));
        }

        let response_json: OpenAIResponse = response.json().await?;

        response_json
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("Empty response from OpenAI"))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Ollama for local inference
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SummaryGenerator for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request_body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        debug!("Calling Ollama model {} at {}", self.model, self.base_url);

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Ollama API error: {}", error_text));
        }

        let response_json: OllamaResponse = response.json().await?;
        Ok(response_json.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Anthropic messages API
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_CLAUDE_MODEL.to_string()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl SummaryGenerator for ClaudeProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request_body = json!({
            "model": self.model,
            "max_tokens": 1000,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        });

        debug!("Calling Claude model {}", self.model);

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Claude API error: {}", error_text));
        }

        let response_json: ClaudeResponse = response.json().await?;

        response_json
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| anyhow!("Empty response from Claude"))
    }

    fn name(&self) -> &str {
        "claude"
    }
}

// Response structures
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let openai = OpenAIProvider::new("sk-test".to_string(), None);
        assert_eq!(openai.model(), DEFAULT_OPENAI_MODEL);
        assert_eq!(openai.name(), "openai");

        let ollama = OllamaProvider::new(None, None);
        assert_eq!(ollama.model(), DEFAULT_OLLAMA_MODEL);
        assert_eq!(ollama.base_url(), DEFAULT_OLLAMA_URL);

        let claude = ClaudeProvider::new("key".to_string(), Some("claude-test".to_string()));
        assert_eq!(claude.model(), "claude-test");
    }

    #[test]
    fn test_openai_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  A calm week.  "}}]}"#;
        let parsed: OpenAIResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("  A calm week.  ")
        );
    }

    #[test]
    fn test_claude_response_parsing() {
        let body = r#"{"content":[{"type":"text","text":"Recap"}],"role":"assistant"}"#;
        let parsed: ClaudeResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.content[0].text.as_deref(), Some("Recap"));
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_an_error() {
        // Port 9 (discard) is not expected to serve HTTP
        let ollama = OllamaProvider::new(None, Some("http://127.0.0.1:9".to_string()));
        assert!(ollama.generate("prompt").await.is_err());
    }
}
