//! AWS Bedrock provider.
//!
//! Every Bedrock model family expects its own request body and answers with
//! its own response shape. Instead of branching on vendor and family for each
//! call, the provider resolves a [`FamilyCodec`] per model once, at
//! construction, from a `(vendor, family)` capability table.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::openai::resolve_api_key;
use super::{filter_models, Model, ModelFamily, ModelVendor, ProviderClient, ProviderKind, Response};
use crate::error::ProviderError;
use crate::http_client::HttpClient;

pub const DEFAULT_AWS_REGION: &str = "us-east-1";

const MAX_TOKENS: u32 = 1024;

/// Request builder and response parser for one family
#[derive(Clone, Copy)]
pub struct FamilyCodec {
    pub build_request: fn(&str) -> Value,
    pub parse_response: fn(&Value) -> Option<String>,
}

/// Look up the codec for a vendor/family pair
pub fn codec_for(vendor: ModelVendor, family: ModelFamily) -> Option<FamilyCodec> {
    use ModelFamily as F;
    use ModelVendor as V;

    let codec = match (vendor, family) {
        (V::Amazon, F::Titan) => FamilyCodec {
            build_request: titan_request,
            parse_response: |v| text_at(v, "/results/0/outputText"),
        },
        (V::Amazon, F::Nova) => FamilyCodec {
            build_request: nova_request,
            parse_response: |v| text_at(v, "/output/message/content/0/text"),
        },
        (V::Ai21Labs, F::Jurassic) => FamilyCodec {
            build_request: jurassic_request,
            parse_response: |v| text_at(v, "/completions/0/data/text"),
        },
        (V::Ai21Labs, F::Jamba) => FamilyCodec {
            build_request: jamba_request,
            parse_response: |v| text_at(v, "/choices/0/message/content"),
        },
        (V::Anthropic, _) => FamilyCodec {
            build_request: claude_request,
            parse_response: |v| text_at(v, "/content/0/text"),
        },
        (V::Cohere, F::Command) => FamilyCodec {
            build_request: command_request,
            parse_response: |v| text_at(v, "/text").or_else(|| text_at(v, "/generations/0/text")),
        },
        (V::Cohere, F::CommandR) => FamilyCodec {
            build_request: command_r_request,
            parse_response: |v| text_at(v, "/text"),
        },
        (V::Meta, _) => FamilyCodec {
            build_request: llama3_request,
            parse_response: |v| text_at(v, "/generation"),
        },
        (V::MistralAi, _) => FamilyCodec {
            build_request: mistral_request,
            parse_response: |v| {
                text_at(v, "/generation")
                    .or_else(|| text_at(v, "/outputs/0/text"))
                    .or_else(|| text_at(v, "/choices/0/message/content"))
            },
        },
        _ => return None,
    };

    Some(codec)
}

fn text_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn titan_request(message: &str) -> Value {
    json!({
        "inputText": message,
        "textGenerationConfig": {
            "maxTokenCount": MAX_TOKENS,
            "temperature": 0.1,
            "topP": 0.5,
            "stopSequences": []
        }
    })
}

fn nova_request(message: &str) -> Value {
    json!({
        "messages": [
            {"role": "user", "content": [{"text": message}]}
        ]
    })
}

fn jurassic_request(message: &str) -> Value {
    json!({
        "prompt": message,
        "maxTokens": MAX_TOKENS,
        "temperature": 0.5,
        "topP": 0.5
    })
}

fn jamba_request(message: &str) -> Value {
    json!({
        "messages": [{"role": "user", "content": message}]
    })
}

fn claude_request(message: &str) -> Value {
    json!({
        "messages": [{"role": "user", "content": message}],
        "max_tokens": MAX_TOKENS,
        "temperature": 0.5,
        "top_p": 0.5,
        "anthropic_version": "bedrock-2023-05-31"
    })
}

fn command_request(message: &str) -> Value {
    json!({
        "prompt": message,
        "temperature": 0.1,
        "max_tokens": MAX_TOKENS
    })
}

fn command_r_request(message: &str) -> Value {
    json!({
        "message": message,
        "temperature": 0.1,
        "max_tokens": MAX_TOKENS
    })
}

fn llama3_request(message: &str) -> Value {
    json!({
        "prompt": message,
        "temperature": 0.1,
        "top_p": 0.5,
        "max_gen_len": MAX_TOKENS
    })
}

fn mistral_request(message: &str) -> Value {
    json!({
        "messages": [{"role": "user", "content": message}],
        "temperature": 0.1,
        "top_p": 0.5,
        "max_tokens": MAX_TOKENS
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundationModels {
    #[serde(default)]
    model_summaries: Vec<Value>,
}

/// Bedrock runtime client authenticated with a Bedrock API key
pub struct Bedrock {
    http: HttpClient,
    api_key: String,
    runtime_url: String,
    control_url: String,
    models: Vec<Model>,
    codecs: HashMap<String, FamilyCodec>,
}

impl Bedrock {
    /// Create a Bedrock client for `region`; the key falls back to
    /// `AWS_BEARER_TOKEN_BEDROCK`
    pub fn new(
        http: HttpClient,
        api_key: Option<String>,
        region: &str,
    ) -> Result<Self, ProviderError> {
        let runtime_url = format!("https://bedrock-runtime.{}.amazonaws.com", region);
        let control_url = format!("https://bedrock.{}.amazonaws.com", region);
        Self::with_endpoints(http, api_key, &runtime_url, &control_url)
    }

    pub fn with_endpoints(
        http: HttpClient,
        api_key: Option<String>,
        runtime_url: &str,
        control_url: &str,
    ) -> Result<Self, ProviderError> {
        let api_key = resolve_api_key(api_key, ProviderKind::Bedrock.credential_env())?;

        let mut models = Vec::new();
        let mut codecs = HashMap::new();
        for model in bedrock_catalog() {
            match codec_for(model.vendor, model.family) {
                Some(codec) => {
                    codecs.insert(model.id.clone(), codec);
                    models.push(model);
                }
                None => {
                    tracing::warn!(
                        model = %model.id,
                        vendor = %model.vendor,
                        family = %model.family,
                        "No request shape for model, dropping it from the catalog"
                    );
                }
            }
        }

        Ok(Self {
            http,
            api_key,
            runtime_url: runtime_url.trim_end_matches('/').to_string(),
            control_url: control_url.trim_end_matches('/').to_string(),
            models,
            codecs,
        })
    }
}

#[async_trait]
impl ProviderClient for Bedrock {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Bedrock
    }

    fn list_models(&self, filter: &str) -> Vec<Model> {
        filter_models(&self.models, filter)
    }

    async fn send(&self, message: &str, model: &Model) -> Result<Response, ProviderError> {
        let codec = self
            .codecs
            .get(&model.id)
            .copied()
            .ok_or_else(|| ProviderError::UnsupportedModel {
                vendor: model.vendor.to_string(),
                family: model.family.to_string(),
            })?;

        let body = (codec.build_request)(message);
        let url = format!("{}/model/{}/invoke", self.runtime_url, model.id);
        tracing::debug!(model = %model.id, "Invoking Bedrock model");

        let value: Value = self.http.post_json(&url, &self.api_key, &body).await?;
        let completion = (codec.parse_response)(&value).ok_or_else(|| {
            ProviderError::Decode(format!(
                "unexpected {} response shape from {}",
                model.family, model.id
            ))
        })?;

        Ok(Response { completion })
    }

    async fn verify_access(&self) -> Result<(), ProviderError> {
        let url = format!("{}/foundation-models", self.control_url);
        let listing: FoundationModels = self.http.get_json(&url, &self.api_key).await?;

        if listing.model_summaries.is_empty() {
            return Err(ProviderError::AccessDenied(
                "foundation model listing returned no models".to_string(),
            ));
        }

        Ok(())
    }
}

fn bedrock_catalog() -> Vec<Model> {
    use ModelFamily::*;
    use ModelVendor::*;

    let model = |id: &str, name: &str, vendor: ModelVendor, family: ModelFamily| {
        Model::new(id, name, ProviderKind::Bedrock, vendor, family)
    };

    vec![
        // Mistral family.
        model("mistral.mistral-large-2402-v1:0", "Mistral Large (24.02)", MistralAi, Mistral),
        model("mistral.mistral-small-2402-v1:0", "Mistral Small (24.02)", MistralAi, Mistral),
        // Meta family.
        model("meta.llama3-8b-instruct-v1:0", "Llama 3 8B Instruct", Meta, Llama3),
        model("meta.llama3-70b-instruct-v1:0", "Llama 3 70B Instruct", Meta, Llama3),
        // Command family.
        model("cohere.command-text-v14", "Command", Cohere, Command),
        model("cohere.command-r-v1:0", "Command R", Cohere, CommandR),
        model("cohere.command-r-plus-v1:0", "Command R+", Cohere, CommandR),
        model("cohere.command-light-text-v14", "Command Light", Cohere, Command),
        // Jamba family.
        model("ai21.jamba-1-5-large-v1:0", "Jamba 1.5 Large", Ai21Labs, Jamba),
        model("ai21.jamba-1-5-mini-v1:0", "Jamba 1.5 Mini", Ai21Labs, Jamba),
        // Jurassic family.
        model("ai21.j2-mid-v1", "Jurassic-2 Mid", Ai21Labs, Jurassic),
        model("ai21.j2-ultra", "Jurassic-2 Ultra", Ai21Labs, Jurassic),
        // Nova family.
        model("amazon.nova-pro-v1:0", "Nova Pro", Amazon, Nova),
        model("amazon.nova-lite-v1:0", "Nova Lite", Amazon, Nova),
        model("amazon.nova-micro-v1:0", "Nova Micro", Amazon, Nova),
        // Titan family.
        model("amazon.titan-tg1-large", "Titan Text Large", Amazon, Titan),
        model("amazon.titan-text-premier-v1:0", "Titan Text G1 - Premier", Amazon, Titan),
        model("amazon.titan-text-lite-v1", "Titan Text G1 - Lite", Amazon, Titan),
        model("amazon.titan-text-express-v1", "Titan Text G1 - Express", Amazon, Titan),
        // Claude family.
        model("anthropic.claude-instant-v1", "Claude Instant v1", Anthropic, Claude),
        model("anthropic.claude-v2:1", "Claude v2:1", Anthropic, Claude),
        model("anthropic.claude-v2", "Claude v2", Anthropic, Claude),
        model("us.anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku", Anthropic, Claude),
        model("us.anthropic.claude-3-sonnet-20240229-v1:0", "Claude 3 Sonnet", Anthropic, Claude),
        model("us.anthropic.claude-3-5-haiku-20241022-v1:0", "Claude 3.5 Haiku", Anthropic, Claude),
        model("us.anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet v1", Anthropic, Claude),
        model("us.anthropic.claude-3-5-sonnet-20241022-v2:0", "Claude 3.5 Sonnet v2", Anthropic, Claude),
    ]
}
