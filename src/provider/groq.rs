use async_trait::async_trait;

use super::openai::{resolve_api_key, ChatCompletionsClient};
use super::{filter_models, Model, ModelFamily, ModelVendor, ProviderClient, ProviderKind, Response};
use crate::error::ProviderError;
use crate::http_client::HttpClient;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq serves open-weight models over the OpenAI-compatible API
pub struct Groq {
    chat: ChatCompletionsClient,
    models: Vec<Model>,
}

impl Groq {
    /// Create a Groq client; falls back to `GROQ_API_KEY` when no key is given
    pub fn new(http: HttpClient, api_key: Option<String>) -> Result<Self, ProviderError> {
        Self::with_base_url(http, api_key, GROQ_BASE_URL)
    }

    pub fn with_base_url(
        http: HttpClient,
        api_key: Option<String>,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let api_key = resolve_api_key(api_key, ProviderKind::Groq.credential_env())?;

        Ok(Self {
            chat: ChatCompletionsClient::new(http, base_url, api_key),
            models: groq_catalog(),
        })
    }
}

#[async_trait]
impl ProviderClient for Groq {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Groq
    }

    fn list_models(&self, filter: &str) -> Vec<Model> {
        filter_models(&self.models, filter)
    }

    async fn send(&self, message: &str, model: &Model) -> Result<Response, ProviderError> {
        match model.vendor {
            ModelVendor::Google
            | ModelVendor::Meta
            | ModelVendor::MistralAi
            | ModelVendor::DeepSeek => self.chat.complete(&model.id, message).await,
            other => Err(ProviderError::UnsupportedModel {
                vendor: other.to_string(),
                family: model.family.to_string(),
            }),
        }
    }

    async fn verify_access(&self) -> Result<(), ProviderError> {
        self.chat.verify().await
    }
}

fn groq_catalog() -> Vec<Model> {
    use ModelFamily::*;
    use ModelVendor::*;

    let model = |id: &str, name: &str, vendor: ModelVendor, family: ModelFamily| {
        Model::new(id, name, ProviderKind::Groq, vendor, family)
    };

    vec![
        model("gemma2-9b-it", "Gemma 2 9B IT", Google, Gemma),
        model("llama-3.3-70b-versatile", "Llama 3.3 70b Versatile", Meta, Llama3),
        model("llama-3.1-8b-instant", "Llama 3.1 8b Instant", Meta, Llama3),
        model("llama-guard-3-8b", "Llama Guard 3 8B", Meta, Llama3),
        model("llama3-70b-8192", "Llama3 70b 8192", Meta, Llama3),
        model("llama3-8b-8192", "Llama3 8b 8192", Meta, Llama3),
        model("mixtral-8x7b-32768", "Mixtral 8x7b 32768", MistralAi, Mixtral),
        model(
            "deepseek-r1-distill-llama-70b",
            "DeepSeek R1 Distill Llama 70B",
            DeepSeek,
            R1,
        ),
        model("llama-3.2-1b-preview", "Llama 3.2 1b Preview", Meta, Llama3),
        model("llama-3.2-3b-preview", "Llama 3.2 3b Preview", Meta, Llama3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http() -> HttpClient {
        HttpClient::new(4, 5).unwrap()
    }

    #[test]
    fn test_catalog() {
        let groq = Groq::new(http(), Some("gsk-test".to_string())).unwrap();
        let models = groq.list_models("");
        assert_eq!(models.len(), 10);
        assert!(models.iter().all(|m| m.provider == ProviderKind::Groq));

        let llamas = groq.list_models("llama");
        assert_eq!(llamas.len(), 8);
    }

    #[tokio::test]
    async fn test_send_through_compatible_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gemma2-9b-it"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"pong"}}]}"#)
            .create_async()
            .await;

        let groq =
            Groq::with_base_url(http(), Some("gsk-test".to_string()), &server.url()).unwrap();
        let gemma = groq.list_models("gemma")[0].clone();

        let response = groq.send("ping", &gemma).await.unwrap();
        assert_eq!(response.completion, "pong");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unsupported_vendor() {
        let groq = Groq::new(http(), Some("gsk-test".to_string())).unwrap();
        let model = Model::new(
            "claude",
            "Claude",
            ProviderKind::Groq,
            ModelVendor::Anthropic,
            ModelFamily::Claude,
        );

        let err = groq.send("ping", &model).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedModel { .. }));
    }
}
