// Error handling module
// Defines error types for evaluation, provider calls and prompt loading

use thiserror::Error;

/// Errors raised by a single provider call or provider setup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Credential missing from the environment
    #[error("API key not found, `{env}` envar is required")]
    ApiKeyNotFound { env: &'static str },

    /// Provider answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Request never produced a response
    #[error("request failed ({kind}): {message}")]
    Request { kind: &'static str, message: String },

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Response had no completion text in it
    #[error("response contained no completion")]
    EmptyCompletion,

    /// No request shape is known for this vendor/family pair
    #[error("unsupported model: vendor {vendor}, family {family}")]
    UnsupportedModel { vendor: String, family: String },

    /// Access verification failed at startup
    #[error("access denied: {0}")]
    AccessDenied(String),
}

/// Errors returned by `Evaluator::evaluate`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("no provider specified")]
    NoProvider,

    #[error("no model provided")]
    NoModel,

    #[error("no prompt(s) provided")]
    NoPrompt,

    #[error("sample size must be 1 or more")]
    SampleSize,

    /// A provider call failed and aborted the run
    #[error(transparent)]
    Transport(#[from] ProviderError),
}

impl EvalError {
    /// True for precondition failures raised before any I/O
    pub fn is_validation(&self) -> bool {
        !matches!(self, EvalError::Transport(_))
    }
}

/// Errors raised while loading prompts
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("failed to read prompts: {0}")]
    Io(#[from] std::io::Error),

    #[error("no prompts available")]
    Empty,
}
