use async_trait::async_trait;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::gemini;

use crate::domain::{ports::ResponseComposer, DomainError};
use crate::infrastructure::config::AppConfig;

/// Answers grounded prompts with a Gemini chat model. The presale system
/// prompt from `prompts.yaml` is sent as the preamble.
pub struct GeminiComposer {
    client: gemini::Client,
    model: String,
    system_prompt: String,
    temperature: f64,
    max_tokens: u64,
}

impl GeminiComposer {
    pub fn new(config: &AppConfig) -> Self {
        let llm = &config.config.llm;
        Self {
            client: gemini::Client::from_env(),
            model: llm.model.clone(),
            system_prompt: config.prompts.agent.system.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        }
    }
}

#[async_trait]
impl ResponseComposer for GeminiComposer {
    /// `context` already embeds the user prompt, so it is sent as the only
    /// message.
    async fn generate(&self, _prompt: &str, context: &str) -> Result<String, DomainError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(&self.system_prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build();

        agent
            .prompt(context.to_string())
            .await
            .map_err(|e| DomainError::transient(format!("response generation failed: {e}")))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
