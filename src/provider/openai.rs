use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{filter_models, Model, ModelFamily, ModelVendor, ProviderClient, ProviderKind, Response};
use crate::error::ProviderError;
use crate::http_client::HttpClient;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

// ==================================================================================================
// Wire types for /chat/completions and /models
// ==================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListedModel {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ListedModel>,
}

// ==================================================================================================
// OpenAI-compatible chat client
// ==================================================================================================

/// Client for any service speaking the OpenAI chat completions API
#[derive(Clone)]
pub struct ChatCompletionsClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl ChatCompletionsClient {
    pub fn new(http: HttpClient, base_url: &str, api_key: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Send one user message and return the first choice's text
    pub async fn complete(&self, model_id: &str, message: &str) -> Result<Response, ProviderError> {
        let request = ChatCompletionRequest {
            model: model_id,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(message.to_string()),
            }],
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response: ChatCompletionResponse =
            self.http.post_json(&url, &self.api_key, &request).await?;

        let completion = response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyCompletion)?
            .message
            .content
            .unwrap_or_default();

        Ok(Response { completion })
    }

    /// List remote models; an empty listing counts as denied access
    pub async fn verify(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.base_url);
        let list: ModelList = self.http.get_json(&url, &self.api_key).await?;

        if list.data.is_empty() {
            return Err(ProviderError::AccessDenied(
                "model listing returned no models".to_string(),
            ));
        }

        Ok(())
    }
}

/// Resolve an API key: explicit value first, then the environment
pub(crate) fn resolve_api_key(
    api_key: Option<String>,
    env: &'static str,
) -> Result<String, ProviderError> {
    api_key
        .filter(|key| !key.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|key| !key.is_empty()))
        .ok_or(ProviderError::ApiKeyNotFound { env })
}

// ==================================================================================================
// OpenAI provider
// ==================================================================================================

pub struct OpenAi {
    chat: ChatCompletionsClient,
    models: Vec<Model>,
}

impl OpenAi {
    /// Create an OpenAI client; falls back to `OPENAI_API_KEY` when no key is given
    pub fn new(http: HttpClient, api_key: Option<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(http, api_key, OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        http: HttpClient,
        api_key: Option<String>,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let api_key = resolve_api_key(api_key, ProviderKind::OpenAi.credential_env())?;

        Ok(Self {
            chat: ChatCompletionsClient::new(http, base_url, api_key),
            models: openai_catalog(),
        })
    }
}

#[async_trait]
impl ProviderClient for OpenAi {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn list_models(&self, filter: &str) -> Vec<Model> {
        filter_models(&self.models, filter)
    }

    async fn send(&self, message: &str, model: &Model) -> Result<Response, ProviderError> {
        tracing::debug!(model = %model.id, "Sending message");
        self.chat.complete(&model.id, message).await
    }

    async fn verify_access(&self) -> Result<(), ProviderError> {
        self.chat.verify().await
    }
}

fn openai_catalog() -> Vec<Model> {
    let gpt = |id: &str, name: &str| {
        Model::new(
            id,
            name,
            ProviderKind::OpenAi,
            ModelVendor::OpenAi,
            ModelFamily::Gpt,
        )
    };

    vec![
        gpt("gpt-4-1106-preview", "GPT 4 1106 Preview"),
        gpt("gpt-3.5-turbo", "GPT 3.5 Turbo"),
        gpt("gpt-3.5-turbo-0125", "GPT 3.5 Turbo 0125"),
        gpt("o1-mini", "O1 Mini"),
        gpt("o1-mini-2024-09-12", "O1 Mini 2024 09 12"),
        gpt("o1-2024-12-17", "O1 2024 12 17"),
        gpt("gpt-3.5-turbo-16k", "GPT 3.5 Turbo 16k"),
        gpt("o1", "O1"),
        gpt("o1-preview-2024-09-12", "O1 Preview 2024 09 12"),
        gpt("o1-preview", "O1 Preview"),
        gpt("gpt-4", "GPT 4"),
        gpt("gpt-4-0613", "GPT 4 0613"),
        gpt("chatgpt-4o-latest", "ChatGPT 4o Latest"),
        gpt("gpt-4o-2024-08-06", "GPT 4o 2024 08 06"),
        gpt("gpt-4o", "GPT 4o"),
        gpt("gpt-3.5-turbo-1106", "GPT 3.5 Turbo 1106"),
        gpt("gpt-4-turbo-2024-04-09", "GPT 4 Turbo 2024 04 09"),
        gpt("gpt-4-turbo", "GPT 4 Turbo"),
        gpt("gpt-4-turbo-preview", "GPT 4 Turbo Preview"),
        gpt("gpt-4o-2024-05-13", "GPT 4o 2024 05 13"),
        gpt("gpt-4o-2024-11-20", "GPT 4o 2024 11 20"),
        gpt("gpt-4o-mini-2024-07-18", "GPT 4o Mini 2024 07 18"),
        gpt("gpt-4o-mini", "GPT 4o Mini"),
        gpt("gpt-4-0125-preview", "GPT 4 0125 Preview"),
    ]
}
