// Provider abstraction: model catalog types and the client capability set

pub mod bedrock;
pub mod groq;
pub mod openai;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ProviderError;
use crate::http_client::HttpClient;
use crate::prompt::Prompt;

pub use bedrock::Bedrock;
pub use groq::Groq;
pub use openai::OpenAi;

/// API-compatibility grouping of a vendor's models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    Titan,
    Nova,
    Gpt,
    Claude,
    Jurassic,
    Jamba,
    Command,
    CommandR,
    Llama3,
    Mistral,
    Mixtral,
    Gemma,
    R1,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelFamily::Titan => "Titan",
            ModelFamily::Nova => "Nova",
            ModelFamily::Gpt => "GPT",
            ModelFamily::Claude => "Claude",
            ModelFamily::Jurassic => "Jurassic",
            ModelFamily::Jamba => "Jamba",
            ModelFamily::Command => "Command",
            ModelFamily::CommandR => "Command R",
            ModelFamily::Llama3 => "Llama 3",
            ModelFamily::Mistral => "Mistral",
            ModelFamily::Mixtral => "Mixtral",
            ModelFamily::Gemma => "Gemma",
            ModelFamily::R1 => "R1",
        };
        f.write_str(name)
    }
}

/// Service a model is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    Bedrock,
    OpenAi,
    Groq,
}

impl ProviderKind {
    /// Environment variable holding this provider's credential
    pub fn credential_env(&self) -> &'static str {
        match self {
            ProviderKind::Bedrock => "AWS_BEARER_TOKEN_BEDROCK",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Bedrock => "Bedrock",
            ProviderKind::OpenAi => "Open AI",
            ProviderKind::Groq => "Groq",
        };
        f.write_str(name)
    }
}

/// Company that built a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVendor {
    OpenAi,
    Amazon,
    Ai21Labs,
    Anthropic,
    Cohere,
    Meta,
    MistralAi,
    Google,
    DeepSeek,
}

impl fmt::Display for ModelVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelVendor::OpenAi => "Open AI",
            ModelVendor::Amazon => "Amazon",
            ModelVendor::Ai21Labs => "AI21 Labs",
            ModelVendor::Anthropic => "Anthropic",
            ModelVendor::Cohere => "Cohere",
            ModelVendor::Meta => "Meta",
            ModelVendor::MistralAi => "Mistral AI",
            ModelVendor::Google => "Google",
            ModelVendor::DeepSeek => "DeepSeek",
        };
        f.write_str(name)
    }
}

/// Immutable identity of one model in a provider catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Identifier sent on the wire
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub family: ModelFamily,
    pub provider: ProviderKind,
    pub vendor: ModelVendor,
}

impl Model {
    pub fn new(
        id: &str,
        name: &str,
        provider: ProviderKind,
        vendor: ModelVendor,
        family: ModelFamily,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            family,
            provider,
            vendor,
        }
    }
}

/// Completion returned by one provider call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub completion: String,
}

/// One timed provider call
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub latency: Duration,
    pub response: Response,
}

/// Capability set every vendor client provides
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which service this client talks to
    fn kind(&self) -> ProviderKind;

    /// Models whose name contains `filter` (case-insensitive); empty filter returns all
    fn list_models(&self, filter: &str) -> Vec<Model>;

    /// Send a single user message to a model
    async fn send(&self, message: &str, model: &Model) -> Result<Response, ProviderError>;

    /// Time one `send` of the prompt content
    async fn measure(&self, model: &Model, prompt: &Prompt) -> Result<Sample, ProviderError> {
        let start = Instant::now();
        let response = self.send(&prompt.content, model).await?;
        let latency = start.elapsed();

        tracing::debug!(
            model = %model.id,
            latency_ms = latency.as_millis() as u64,
            "Provider call completed"
        );

        Ok(Sample { latency, response })
    }

    /// Cheap authenticated call used once at startup
    async fn verify_access(&self) -> Result<(), ProviderError>;
}

/// Case-insensitive substring filter over model names, preserving catalog order
pub fn filter_models(models: &[Model], filter: &str) -> Vec<Model> {
    let query = filter.to_lowercase();
    models
        .iter()
        .filter(|model| model.name.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

/// Build every provider, keeping those whose credential is present and whose
/// access check passes. Order is OpenAI, Bedrock, Groq.
pub async fn init_providers(config: &Config, http: &HttpClient) -> Vec<Arc<dyn ProviderClient>> {
    let candidates: Vec<(ProviderKind, Result<Arc<dyn ProviderClient>, ProviderError>)> = vec![
        (
            ProviderKind::OpenAi,
            OpenAi::new(http.clone(), config.openai_api_key.clone())
                .map(|p| Arc::new(p) as Arc<dyn ProviderClient>),
        ),
        (
            ProviderKind::Bedrock,
            Bedrock::new(
                http.clone(),
                config.bedrock_api_key.clone(),
                &config.aws_region,
            )
            .map(|p| Arc::new(p) as Arc<dyn ProviderClient>),
        ),
        (
            ProviderKind::Groq,
            Groq::new(http.clone(), config.groq_api_key.clone())
                .map(|p| Arc::new(p) as Arc<dyn ProviderClient>),
        ),
    ];

    retain_accessible(candidates).await
}

/// Drop providers that failed to build or to verify access
pub async fn retain_accessible(
    candidates: Vec<(ProviderKind, Result<Arc<dyn ProviderClient>, ProviderError>)>,
) -> Vec<Arc<dyn ProviderClient>> {
    let mut providers = Vec::with_capacity(candidates.len());

    for (kind, candidate) in candidates {
        let provider = match candidate {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(
                    provider = %kind,
                    env = kind.credential_env(),
                    error = %e,
                    "Provider unavailable, set the credential to enable it"
                );
                continue;
            }
        };

        match provider.verify_access().await {
            Ok(()) => {
                tracing::info!(provider = %kind, "Provider ready");
                providers.push(provider);
            }
            Err(e) => {
                tracing::warn!(
                    provider = %kind,
                    env = kind.credential_env(),
                    error = %e,
                    "Provider access check failed, excluding its models"
                );
            }
        }
    }

    providers
}
