//! Ordered provider fallback.
//!
//! The gateway tries each configured provider in priority order and returns
//! the first successful completion. Any failure, rate limit included,
//! advances the chain immediately: no backoff, no per-provider retry, no
//! memory of failures across calls. Total exhaustion is reported as a fixed
//! sentinel string because the caller is a chat message, not a `Result`
//! consumer.

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::llm::providers;
use crate::prompts;

/// Reply returned when every provider in the chain has failed.
pub const EXHAUSTED_REPLY: &str =
    "❌ All AI systems are exhausted. Please try again in a few minutes.";

/// One remote text-completion endpoint.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Run one completion. Every failure mode is a distinct [`LlmError`]
    /// kind so the gateway's fallback decision is explicit.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// The failover chain. Provider order is fixed at construction.
pub struct Gateway {
    chain: Vec<Box<dyn CompletionProvider>>,
}

impl Gateway {
    /// Build the chain from configuration. A provider with no key is left
    /// out of the chain entirely.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = providers::shared_client();
        let mut chain: Vec<Box<dyn CompletionProvider>> = Vec::new();

        if let Some(key) = &config.gemini_key {
            chain.push(Box::new(providers::GeminiProvider::new(
                client.clone(),
                key.clone(),
                config.gemini_model.clone(),
            )));
        }
        if let Some(key) = &config.openai_key {
            chain.push(Box::new(providers::OpenAiProvider::new(
                client.clone(),
                key.clone(),
                config.openai_model.clone(),
            )));
        }
        if let Some(key) = &config.groq_key {
            chain.push(Box::new(providers::GroqProvider::new(
                client.clone(),
                key.clone(),
                config.groq_model.clone(),
            )));
        }

        for provider in &chain {
            tracing::info!(provider = provider.name(), "provider configured");
        }

        Self { chain }
    }

    /// Build a gateway over an explicit chain.
    pub fn new(chain: Vec<Box<dyn CompletionProvider>>) -> Self {
        Self { chain }
    }

    /// Run a completion through the chain. `architect` selects the server
    /// architect system prompt instead of the plain tutor persona.
    ///
    /// Never fails: exhaustion of the whole chain yields [`EXHAUSTED_REPLY`].
    pub async fn query(&self, prompt: &str, architect: bool) -> String {
        let system = if architect {
            prompts::architect_prompt()
        } else {
            prompts::TUTOR_PROMPT.to_string()
        };

        for provider in &self.chain {
            match provider.complete(&system, prompt).await {
                Ok(text) => return text,
                Err(error) => {
                    tracing::warn!(
                        provider = provider.name(),
                        %error,
                        "provider failed, advancing chain"
                    );
                }
            }
        }

        tracing::error!("all providers exhausted");
        EXHAUSTED_REPLY.to_string()
    }

    /// Whether a reply is the exhaustion sentinel.
    pub fn is_exhausted(reply: &str) -> bool {
        reply == EXHAUSTED_REPLY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider(&'static str, fn() -> LlmError);
    struct EchoProvider(&'static str, &'static str);

    #[async_trait::async_trait]
    impl CompletionProvider for FailingProvider {
        fn name(&self) -> &str {
            self.0
        }
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err(self.1())
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for EchoProvider {
        fn name(&self) -> &str {
            self.0
        }
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Ok(self.1.to_string())
        }
    }

    #[tokio::test]
    async fn empty_chain_returns_sentinel() {
        let gateway = Gateway::new(vec![]);
        let reply = gateway.query("hello", false).await;
        assert_eq!(reply, EXHAUSTED_REPLY);
        assert!(Gateway::is_exhausted(&reply));
    }

    #[tokio::test]
    async fn all_providers_failing_returns_sentinel() {
        let gateway = Gateway::new(vec![
            Box::new(FailingProvider("a", || {
                LlmError::RateLimited("quota".into())
            })),
            Box::new(FailingProvider("b", || LlmError::Api {
                status: 500,
                message: "boom".into(),
            })),
            Box::new(FailingProvider("c", || {
                LlmError::Network("unreachable".into())
            })),
        ]);
        assert_eq!(gateway.query("hello", false).await, EXHAUSTED_REPLY);
    }

    #[tokio::test]
    async fn second_provider_response_is_verbatim() {
        let gateway = Gateway::new(vec![
            Box::new(FailingProvider("a", || {
                LlmError::RateLimited("429".into())
            })),
            Box::new(EchoProvider("b", "the verbatim answer")),
        ]);
        assert_eq!(gateway.query("hello", true).await, "the verbatim answer");
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let gateway = Gateway::new(vec![
            Box::new(EchoProvider("a", "first")),
            Box::new(EchoProvider("b", "second")),
        ]);
        assert_eq!(gateway.query("hello", false).await, "first");
    }
}
