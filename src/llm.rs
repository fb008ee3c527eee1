use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible chat-completions client.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:1234/v1".to_string());
        let model =
            dotenv::var("LLM_MODEL").unwrap_or_else(|_| "qwen/qwen3-8b".to_string());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "max_tokens": 2048,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.context("LLM request failed")?;
        let text = resp.text().await.context("Failed to read LLM response")?;
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;

        let content = extract_content(&json);
        debug!(model = %self.model, len = content.len(), "LLM reply received");
        Ok(content)
    }
}

/// `choices[0].message.content`, empty when missing or null.
fn extract_content(json: &serde_json::Value) -> String {
    json["choices"]
        .get(0)
        .and_then(|c| c["message"]["content"].as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> LlmClient {
        LlmClient {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            model: "m".to_string(),
            api_key: None,
        }
    }

    #[test]
    fn test_endpoint_variants() {
        assert_eq!(
            client("http://localhost:1234/v1").endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
        assert_eq!(
            client("https://api.example.com/").endpoint(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            client("https://x/v1/chat/completions").endpoint(),
            "https://x/v1/chat/completions"
        );
    }

    #[test]
    fn test_extract_content() {
        let json = serde_json::json!({"choices": [{"message": {"content": "你好"}}]});
        assert_eq!(extract_content(&json), "你好");
        let null = serde_json::json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(extract_content(&null), "");
        assert_eq!(extract_content(&serde_json::json!({})), "");
    }
}
