//! Provider adapters: raw JSON over HTTP, no SDK crates.
//!
//! Each adapter classifies its failures into distinct [`LlmError`] kinds so
//! the gateway fallback is driven by explicit error variants instead of a
//! catch-all.

use crate::error::LlmError;
use crate::llm::gateway::CompletionProvider;

/// Outbound request timeout. Providers that hang count as a chain failure
/// rather than stalling the event handler indefinitely.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(45);

/// Shared HTTP client for all provider adapters.
pub fn shared_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn classify_transport(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout(error.to_string())
    } else {
        LlmError::Network(error.to_string())
    }
}

fn classify_status(status: reqwest::StatusCode, body: &serde_json::Value) -> LlmError {
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or("unknown error")
        .to_string();
    if status.as_u16() == 429 {
        LlmError::RateLimited(message)
    } else {
        LlmError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

async fn read_json(response: reqwest::Response) -> Result<(reqwest::StatusCode, serde_json::Value), LlmError> {
    let status = response.status();
    let text = response.text().await.map_err(classify_transport)?;
    let body: serde_json::Value = serde_json::from_str(&text).map_err(|error| {
        LlmError::MalformedResponse(format!("response ({status}) is not valid JSON: {error}"))
    })?;
    Ok((status, body))
}

// -- Gemini --

/// Google Gemini `generateContent` adapter.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let body = serde_json::json!({
            "system_instruction": {"parts": [{"text": system}]},
            "contents": [{"role": "user", "parts": [{"text": user}]}],
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let (status, body) = read_json(response).await?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::MalformedResponse("no candidate text in Gemini response".into()))
    }
}

// -- OpenAI-compatible chat completions --

async fn chat_completion(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    model: &str,
    system: &str,
    user: &str,
) -> Result<String, LlmError> {
    let body = serde_json::json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ],
    });

    let response = client
        .post(endpoint)
        .header("authorization", format!("Bearer {api_key}"))
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(classify_transport)?;

    let (status, body) = read_json(response).await?;
    if !status.is_success() {
        return Err(classify_status(status, &body));
    }

    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::MalformedResponse("no choice content in response".into()))
}

/// OpenAI chat completions adapter.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        chat_completion(
            &self.client,
            "https://api.openai.com/v1/chat/completions",
            &self.api_key,
            &self.model,
            system,
            user,
        )
        .await
    }
}

/// Groq adapter. Same wire shape as OpenAI, different host.
pub struct GroqProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GroqProvider {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        chat_completion(
            &self.client,
            "https://api.groq.com/openai/v1/chat/completions",
            &self.api_key,
            &self.model,
            system,
            user,
        )
        .await
    }
}
